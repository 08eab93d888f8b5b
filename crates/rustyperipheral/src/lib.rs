//! RustyPeripheral - a BLE peripheral / GATT server engine
//!
//! This library implements the peripheral side of Bluetooth Low Energy on top
//! of a host Bluetooth stack: it advertises a single service, accepts one
//! central, answers characteristic and descriptor requests against a static
//! service definition and pushes notifications to the connected central.
//! The stack itself sits behind the [`EventSink`] trait and reports back
//! through [`GattEvent`]s.

pub mod error;
pub mod gap;
pub mod gatt;
pub mod peripheral;
pub mod uuid;

// Re-export common types for convenience
pub use error::{PeripheralError, RegistryError, SinkError};
pub use gap::{
    AdvertiseError, AdvertiseOutcome, AdvertiseSettings, AdvertisingData, ConnectionHandle,
    DeviceAddress, LinkState,
};
pub use gatt::{
    CharacteristicBuilder, CharacteristicProperties, GattEvent, GattResponse, GattStatus,
    Permissions, ServiceDescriptor, ServiceRegistry, SessionState,
};
pub use peripheral::{
    EventSink, Notification, NotificationPolicy, PeripheralConfig, PeripheralEngine,
    PeripheralEvent,
};
pub use uuid::Uuid;
