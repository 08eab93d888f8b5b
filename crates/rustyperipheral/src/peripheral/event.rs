use crate::error::PeripheralError;
use crate::gap::{AdvertiseSettings, ConnectionHandle, DeviceAddress};
use crate::gatt::{GattStatus, SessionEvent, Subscription};
use crate::uuid::Uuid;

/// Observable state changes and failures of the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeripheralEvent {
    AdvertisingStarted(AdvertiseSettings),
    AdvertisingStopped,
    Connected(ConnectionHandle),
    /// The connection slot was taken over by a new central
    Evicted(ConnectionHandle),
    Disconnected(ConnectionHandle),
    CharacteristicWritten {
        characteristic: Uuid,
        value: Vec<u8>,
    },
    DescriptorWritten {
        characteristic: Uuid,
        descriptor: Uuid,
        value: Vec<u8>,
    },
    SubscriptionChanged {
        characteristic: Uuid,
        subscription: Subscription,
    },
    MtuChanged(u16),
    NotificationDispatched {
        device: DeviceAddress,
        characteristic: Uuid,
    },
    NotificationSent {
        device: DeviceAddress,
        status: GattStatus,
    },
    Error(PeripheralError),
}

/// Observer invoked for every [`PeripheralEvent`]
pub type EventCallback = Box<dyn Fn(&PeripheralEvent) + Send + Sync + 'static>;

impl From<SessionEvent> for PeripheralEvent {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::CharacteristicWritten { characteristic, value } => {
                PeripheralEvent::CharacteristicWritten { characteristic, value }
            }
            SessionEvent::DescriptorWritten {
                characteristic,
                descriptor,
                value,
            } => PeripheralEvent::DescriptorWritten {
                characteristic,
                descriptor,
                value,
            },
            SessionEvent::SubscriptionChanged {
                characteristic,
                subscription,
            } => PeripheralEvent::SubscriptionChanged {
                characteristic,
                subscription,
            },
            SessionEvent::UnknownCharacteristic(uuid) => {
                PeripheralEvent::Error(PeripheralError::UnknownCharacteristic(uuid))
            }
        }
    }
}
