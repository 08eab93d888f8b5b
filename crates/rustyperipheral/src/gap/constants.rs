// Advertising data types
pub const ADV_TYPE_FLAGS: u8 = 0x01;
pub const ADV_TYPE_16BIT_SERVICE_UUID_COMPLETE: u8 = 0x03;
pub const ADV_TYPE_32BIT_SERVICE_UUID_COMPLETE: u8 = 0x05;
pub const ADV_TYPE_128BIT_SERVICE_UUID_COMPLETE: u8 = 0x07;
pub const ADV_TYPE_SHORT_LOCAL_NAME: u8 = 0x08;
pub const ADV_TYPE_COMPLETE_LOCAL_NAME: u8 = 0x09;
pub const ADV_TYPE_TX_POWER_LEVEL: u8 = 0x0A;

// Flags AD values
pub const ADV_FLAG_LE_GENERAL_DISCOVERABLE: u8 = 0x02;
pub const ADV_FLAG_BR_EDR_NOT_SUPPORTED: u8 = 0x04;

/// Legacy advertising PDU payload limit
pub const MAX_LEGACY_ADV_DATA_LEN: usize = 31;

// Host platform advertise failure codes
pub const ADVERTISE_FAILED_DATA_TOO_LARGE: i32 = 1;
pub const ADVERTISE_FAILED_TOO_MANY_ADVERTISERS: i32 = 2;
pub const ADVERTISE_FAILED_ALREADY_STARTED: i32 = 3;
pub const ADVERTISE_FAILED_INTERNAL_ERROR: i32 = 4;
pub const ADVERTISE_FAILED_FEATURE_UNSUPPORTED: i32 = 5;
