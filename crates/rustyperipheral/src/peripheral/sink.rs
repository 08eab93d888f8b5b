//! Outbound side of the Bluetooth stack

use crate::error::SinkError;
use crate::gap::{AdvertiseSettings, AdvertisingData, DeviceAddress};
use crate::gatt::GattResponse;
use crate::uuid::Uuid;

/// A characteristic value change to push to the central
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub device: DeviceAddress,
    pub characteristic: Uuid,
    pub value: Vec<u8>,
    /// `true` requests an indication (acknowledged by the central)
    pub confirm: bool,
}

/// Operations the engine asks of the host Bluetooth stack.
///
/// Every call is fire-and-forget: an `Ok` only means the stack accepted the
/// request. Outcomes come back later as [`GattEvent`](crate::gatt::GattEvent)s
/// or an [`AdvertiseOutcome`](crate::gap::AdvertiseOutcome).
///
/// The engine calls these while holding its state lock, so implementations
/// must not feed events back into the engine from inside a call.
pub trait EventSink: Send + Sync {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertisingData,
    ) -> Result<(), SinkError>;

    fn stop_advertising(&self) -> Result<(), SinkError>;

    /// Drops the link to `device`; used when a new central takes the slot.
    fn disconnect(&self, device: DeviceAddress) -> Result<(), SinkError>;

    fn send_response(&self, response: &GattResponse) -> Result<(), SinkError>;

    fn notify_characteristic_changed(&self, notification: &Notification) -> Result<(), SinkError>;
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertisingData,
    ) -> Result<(), SinkError> {
        (**self).start_advertising(settings, data)
    }

    fn stop_advertising(&self) -> Result<(), SinkError> {
        (**self).stop_advertising()
    }

    fn disconnect(&self, device: DeviceAddress) -> Result<(), SinkError> {
        (**self).disconnect(device)
    }

    fn send_response(&self, response: &GattResponse) -> Result<(), SinkError> {
        (**self).send_response(response)
    }

    fn notify_characteristic_changed(&self, notification: &Notification) -> Result<(), SinkError> {
        (**self).notify_characteristic_changed(notification)
    }
}
