//! Common types for GATT operations

use bitflags::bitflags;

/// Client Characteristic Configuration descriptor UUID
pub const CLIENT_CHAR_CONFIG_UUID: u16 = 0x2902;

/// CCCD bit enabling notifications
pub const CCCD_NOTIFY: u16 = 0x0001;
/// CCCD bit enabling indications
pub const CCCD_INDICATE: u16 = 0x0002;

/// Default ATT MTU before any exchange
pub const ATT_DEFAULT_MTU: u16 = 23;

bitflags! {
    /// Characteristic properties as declared in the characteristic declaration
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CharacteristicProperties: u8 {
        const BROADCAST = 0x01;
        const READ = 0x02;
        const WRITE_WITHOUT_RESPONSE = 0x04;
        const WRITE = 0x08;
        const NOTIFY = 0x10;
        const INDICATE = 0x20;
    }
}

impl CharacteristicProperties {
    pub fn can_read(&self) -> bool {
        self.contains(Self::READ)
    }

    pub fn can_write(&self) -> bool {
        self.intersects(Self::WRITE | Self::WRITE_WITHOUT_RESPONSE)
    }

    pub fn can_notify(&self) -> bool {
        self.contains(Self::NOTIFY)
    }

    pub fn can_indicate(&self) -> bool {
        self.contains(Self::INDICATE)
    }
}

bitflags! {
    /// Attribute access permissions
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Permissions: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
    }
}

/// Status carried by responses and notification acks.
///
/// Codes follow the ATT error codes; `Success` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    InvalidHandle,
    ReadNotPermitted,
    WriteNotPermitted,
    InvalidOffset,
    RequestNotSupported,
    InvalidAttributeValueLength,
    Unlikely,
    Other(u8),
}

impl GattStatus {
    pub fn is_success(self) -> bool {
        self == GattStatus::Success
    }
}

impl From<u8> for GattStatus {
    fn from(code: u8) -> Self {
        match code {
            0x00 => GattStatus::Success,
            0x01 => GattStatus::InvalidHandle,
            0x02 => GattStatus::ReadNotPermitted,
            0x03 => GattStatus::WriteNotPermitted,
            0x06 => GattStatus::RequestNotSupported,
            0x07 => GattStatus::InvalidOffset,
            0x0D => GattStatus::InvalidAttributeValueLength,
            0x0E => GattStatus::Unlikely,
            other => GattStatus::Other(other),
        }
    }
}

impl From<GattStatus> for u8 {
    fn from(status: GattStatus) -> Self {
        match status {
            GattStatus::Success => 0x00,
            GattStatus::InvalidHandle => 0x01,
            GattStatus::ReadNotPermitted => 0x02,
            GattStatus::WriteNotPermitted => 0x03,
            GattStatus::RequestNotSupported => 0x06,
            GattStatus::InvalidOffset => 0x07,
            GattStatus::InvalidAttributeValueLength => 0x0D,
            GattStatus::Unlikely => 0x0E,
            GattStatus::Other(code) => code,
        }
    }
}
