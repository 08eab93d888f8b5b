use std::fmt;

/// Bluetooth device address of a central
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceAddress {
    /// Address bytes, least significant first as they appear on the air
    pub bytes: [u8; 6],
}

impl DeviceAddress {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = slice.get(..6)?.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.bytes[5],
            self.bytes[4],
            self.bytes[3],
            self.bytes[2],
            self.bytes[1],
            self.bytes[0]
        )
    }
}

/// Opaque identifier for the one live connection.
///
/// The id increases with every accepted connection, so a handle from an
/// evicted or closed link never compares equal to the current one even when
/// the same central reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionHandle {
    device: DeviceAddress,
    id: u64,
}

impl ConnectionHandle {
    pub(crate) fn new(device: DeviceAddress, id: u64) -> Self {
        Self { device, id }
    }

    pub fn device(&self) -> DeviceAddress {
        self.device
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.device, self.id)
    }
}

/// Link state as reported by the Bluetooth stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}
