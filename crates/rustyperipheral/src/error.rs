//! Error types for the rustyperipheral library
//!
//! None of the engine's runtime failures are returned to the caller: they are
//! logged where they happen and surfaced through
//! [`PeripheralEvent::Error`](crate::peripheral::PeripheralEvent::Error).
//! Only service construction returns a `Result`.

use crate::gap::{AdvertiseError, DeviceAddress};
use crate::gatt::GattStatus;
use crate::uuid::Uuid;
use thiserror::Error;

/// Failures raised while running the peripheral
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeripheralError {
    #[error("Advertising failed: {0}")]
    AdvertisingFailure(#[from] AdvertiseError),

    #[error("Notify requested with no central connected")]
    NotifyWithoutConnection,

    #[error("Unknown characteristic {0}")]
    UnknownCharacteristic(Uuid),

    #[error("Characteristic {0} does not support notifications")]
    CharacteristicNotNotifiable(Uuid),

    #[error("Central has not subscribed to {0}")]
    NotSubscribed(Uuid),

    #[error("Notification dropped for {0}: previous notification still in flight")]
    NotificationDropped(Uuid),

    #[error("Notification delivery failed with status {0:?}")]
    NotificationDeliveryFailure(GattStatus),

    #[error("Request from {0}, which does not hold the connection")]
    StaleRequest(DeviceAddress),

    #[error("Bluetooth stack error: {0}")]
    Sink(#[from] SinkError),
}

/// Errors reported by an [`EventSink`](crate::peripheral::EventSink) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Device {0} is not connected")]
    DeviceNotConnected(DeviceAddress),

    #[error("Request rejected by the Bluetooth stack: {0}")]
    Rejected(String),

    #[error("Bluetooth stack unavailable")]
    Unavailable,
}

/// Errors from building a service definition
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Characteristic {0} declared twice")]
    DuplicateCharacteristic(Uuid),

    #[error("Descriptor {descriptor} declared twice on characteristic {characteristic}")]
    DuplicateDescriptor { characteristic: Uuid, descriptor: Uuid },

    #[error("Characteristic {0} supports neither notify nor indicate and cannot carry a CCCD")]
    CccdWithoutNotify(Uuid),
}
