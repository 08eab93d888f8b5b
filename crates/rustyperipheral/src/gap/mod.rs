//! GAP (Generic Access Profile) types for the peripheral role
//!
//! Device addressing, connection handles and everything needed to describe an
//! advertising attempt.

pub mod advertising;
pub mod constants;
pub mod types;

pub use advertising::{
    AdvertiseError, AdvertiseMode, AdvertiseOutcome, AdvertiseSettings, AdvertisingData,
    TxPowerLevel,
};
pub use constants::*;
pub use types::*;
