//! Advertising settings, payload encoding and failure taxonomy

use super::constants::*;
use crate::uuid::Uuid;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io;
use thiserror::Error;

/// Trade-off between advertising interval and power draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertiseMode {
    /// ~1 s interval
    #[default]
    LowPower,
    /// ~250 ms interval
    Balanced,
    /// ~100 ms interval
    LowLatency,
}

/// Transmit power requested from the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    #[default]
    Medium,
    High,
}

impl TxPowerLevel {
    /// Nominal output in dBm, as advertised in the TX power AD field
    pub fn dbm(self) -> i8 {
        match self {
            TxPowerLevel::UltraLow => -21,
            TxPowerLevel::Low => -15,
            TxPowerLevel::Medium => -7,
            TxPowerLevel::High => 1,
        }
    }
}

/// Advertising parameters handed to the Bluetooth stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseSettings {
    pub mode: AdvertiseMode,
    pub tx_power: TxPowerLevel,
    pub connectable: bool,
    /// Milliseconds before the stack stops advertising on its own; 0 disables the limit
    pub timeout_ms: u32,
    pub include_device_name: bool,
    pub include_tx_power: bool,
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self {
            mode: AdvertiseMode::default(),
            tx_power: TxPowerLevel::default(),
            connectable: true,
            timeout_ms: 0,
            include_device_name: false,
            include_tx_power: false,
        }
    }
}

/// Advertising payload: flags, the single service UUID, optional name and TX power
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingData {
    pub flags: Option<u8>,
    pub service_uuid: Uuid,
    pub local_name: Option<String>,
    pub tx_power: Option<i8>,
}

impl AdvertisingData {
    /// Builds the payload announcing `service_uuid` under `settings`.
    pub fn for_service(
        service_uuid: Uuid,
        settings: &AdvertiseSettings,
        device_name: Option<&str>,
    ) -> Self {
        let flags = settings
            .connectable
            .then_some(ADV_FLAG_LE_GENERAL_DISCOVERABLE | ADV_FLAG_BR_EDR_NOT_SUPPORTED);

        Self {
            flags,
            service_uuid,
            local_name: device_name
                .filter(|_| settings.include_device_name)
                .map(str::to_owned),
            tx_power: settings.include_tx_power.then(|| settings.tx_power.dbm()),
        }
    }

    /// Encodes the AD structures (`[len][type][data]...`).
    ///
    /// Fails with [`AdvertiseError::DataTooLarge`] when the result would not
    /// fit in a legacy advertising PDU.
    pub fn encode(&self) -> Result<Vec<u8>, AdvertiseError> {
        let data = self
            .write_structures()
            .map_err(|_| AdvertiseError::InternalError)?;
        if data.len() > MAX_LEGACY_ADV_DATA_LEN {
            return Err(AdvertiseError::DataTooLarge);
        }
        Ok(data)
    }

    fn write_structures(&self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(MAX_LEGACY_ADV_DATA_LEN);

        if let Some(flags) = self.flags {
            buf.write_u8(2)?;
            buf.write_u8(ADV_TYPE_FLAGS)?;
            buf.write_u8(flags)?;
        }

        if let Some(short) = self.service_uuid.as_u16() {
            buf.write_u8(3)?;
            buf.write_u8(ADV_TYPE_16BIT_SERVICE_UUID_COMPLETE)?;
            buf.write_u16::<LittleEndian>(short)?;
        } else if let Some(short) = self.service_uuid.as_u32() {
            buf.write_u8(5)?;
            buf.write_u8(ADV_TYPE_32BIT_SERVICE_UUID_COMPLETE)?;
            buf.write_u32::<LittleEndian>(short)?;
        } else {
            buf.write_u8(17)?;
            buf.write_u8(ADV_TYPE_128BIT_SERVICE_UUID_COMPLETE)?;
            buf.extend_from_slice(self.service_uuid.as_bytes_le());
        }

        if let Some(name) = &self.local_name {
            let name = name.as_bytes();
            let len = u8::try_from(name.len() + 1)
                .map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;
            buf.write_u8(len)?;
            buf.write_u8(ADV_TYPE_COMPLETE_LOCAL_NAME)?;
            buf.extend_from_slice(name);
        }

        if let Some(power) = self.tx_power {
            buf.write_u8(2)?;
            buf.write_u8(ADV_TYPE_TX_POWER_LEVEL)?;
            buf.write_i8(power)?;
        }

        Ok(buf)
    }
}

/// Reasons an advertising attempt fails
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertiseError {
    #[error("advertising data too large")]
    DataTooLarge,

    #[error("too many advertisers")]
    TooManyAdvertisers,

    #[error("advertising already started")]
    AlreadyStarted,

    #[error("internal error in the Bluetooth stack")]
    InternalError,

    #[error("advertising not supported on this controller")]
    FeatureUnsupported,
}

impl AdvertiseError {
    /// Maps a host platform failure code. Unknown codes map to `InternalError`.
    pub fn from_code(code: i32) -> Self {
        match code {
            ADVERTISE_FAILED_DATA_TOO_LARGE => AdvertiseError::DataTooLarge,
            ADVERTISE_FAILED_TOO_MANY_ADVERTISERS => AdvertiseError::TooManyAdvertisers,
            ADVERTISE_FAILED_ALREADY_STARTED => AdvertiseError::AlreadyStarted,
            ADVERTISE_FAILED_FEATURE_UNSUPPORTED => AdvertiseError::FeatureUnsupported,
            _ => AdvertiseError::InternalError,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            AdvertiseError::DataTooLarge => ADVERTISE_FAILED_DATA_TOO_LARGE,
            AdvertiseError::TooManyAdvertisers => ADVERTISE_FAILED_TOO_MANY_ADVERTISERS,
            AdvertiseError::AlreadyStarted => ADVERTISE_FAILED_ALREADY_STARTED,
            AdvertiseError::InternalError => ADVERTISE_FAILED_INTERNAL_ERROR,
            AdvertiseError::FeatureUnsupported => ADVERTISE_FAILED_FEATURE_UNSUPPORTED,
        }
    }
}

/// Result of an advertising attempt, delivered by the stack after the fact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertiseOutcome {
    /// Advertising is running with the settings the stack actually applied
    Success(AdvertiseSettings),
    Failure(AdvertiseError),
}
