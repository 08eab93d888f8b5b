//! Peripheral engine
//!
//! Owns the advertising lifecycle, the single connection slot and the
//! notification pipeline, and dispatches every [`GattEvent`] the Bluetooth
//! stack delivers. Nothing here blocks: requests to the stack are
//! fire-and-forget and their outcomes arrive as later events.

use super::config::{NotificationPolicy, PeripheralConfig};
use super::event::{EventCallback, PeripheralEvent};
use super::notifications::NotificationQueue;
use super::sink::{EventSink, Notification};
use crate::error::PeripheralError;
use crate::gap::{
    AdvertiseError, AdvertiseOutcome, AdvertisingData, ConnectionHandle, DeviceAddress, LinkState,
};
use crate::gatt::{
    AttributeTarget, CharacteristicDescriptor, GattEvent, GattResponse, GattSession, GattStatus,
    ReadRequest, ServiceRegistry, SessionEvent, SessionState, Transition, WriteRequest,
};
use crate::uuid::Uuid;
use log::{debug, error, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

/// Advertising lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingState {
    Idle,
    /// Requested from the stack, outcome not yet reported
    Starting,
    Advertising,
}

struct EngineState {
    advertising: AdvertisingState,
    session: GattSession,
    notifications: NotificationQueue,
}

/// A BLE peripheral serving one service to one central
pub struct PeripheralEngine<S: EventSink> {
    sink: S,
    registry: ServiceRegistry,
    config: PeripheralConfig,
    state: Mutex<EngineState>,
    event_callback: RwLock<Option<Arc<dyn Fn(&PeripheralEvent) + Send + Sync>>>,
}

impl<S: EventSink> PeripheralEngine<S> {
    /// Creates an engine that talks to the stack through `sink` and serves
    /// the service held by `registry`.
    pub fn new(sink: S, registry: ServiceRegistry, config: PeripheralConfig) -> Self {
        let session = GattSession::new(config.default_mtu);
        Self {
            sink,
            registry,
            config,
            state: Mutex::new(EngineState {
                advertising: AdvertisingState::Idle,
                session,
                notifications: NotificationQueue::default(),
            }),
            event_callback: RwLock::new(None),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &PeripheralConfig {
        &self.config
    }

    /// Installs the observer for [`PeripheralEvent`]s, replacing any previous one.
    ///
    /// The callback runs after the engine has released its state lock, so it
    /// may call back into the engine.
    pub fn set_event_callback(&self, callback: EventCallback) {
        *self
            .event_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::from(callback));
    }

    pub fn clear_event_callback(&self) {
        *self
            .event_callback
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn connection_state(&self) -> SessionState {
        self.lock_state().session.state()
    }

    pub fn connected_device(&self) -> Option<DeviceAddress> {
        self.lock_state().session.handle().map(|handle| handle.device())
    }

    pub fn advertising_state(&self) -> AdvertisingState {
        self.lock_state().advertising
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising_state() == AdvertisingState::Advertising
    }

    pub fn mtu(&self) -> u16 {
        self.lock_state().session.mtu()
    }

    /// Notifications queued behind an in-flight one
    pub fn pending_notifications(&self) -> usize {
        self.lock_state().notifications.pending_len()
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, events: Vec<PeripheralEvent>) {
        if events.is_empty() {
            return;
        }
        let callback = self
            .event_callback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            for event in &events {
                callback(event);
            }
        }
    }

    /// Advertises the registry's service.
    pub fn advertise(&self) {
        self.start_advertising(self.registry.service_uuid());
    }

    /// Asks the stack to start advertising `service_uuid`.
    ///
    /// The result is reported through [`handle_advertise_outcome`]; a failure
    /// ends the attempt and leaves the engine idle so the caller may retry.
    ///
    /// [`handle_advertise_outcome`]: Self::handle_advertise_outcome
    pub fn start_advertising(&self, service_uuid: Uuid) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            self.start_advertising_locked(&mut state, service_uuid, &mut events);
        }
        self.emit(events);
    }

    fn start_advertising_locked(
        &self,
        state: &mut EngineState,
        service_uuid: Uuid,
        events: &mut Vec<PeripheralEvent>,
    ) {
        if state.advertising != AdvertisingState::Idle {
            warn!("Advertising already {:?}, ignoring start request", state.advertising);
            events.push(PeripheralEvent::Error(AdvertiseError::AlreadyStarted.into()));
            return;
        }

        let data = AdvertisingData::for_service(
            service_uuid,
            &self.config.advertise,
            self.config.device_name.as_deref(),
        );
        if let Err(err) = data.encode() {
            error!("Cannot advertise {}: {}", service_uuid, err);
            events.push(PeripheralEvent::Error(err.into()));
            return;
        }

        match self.sink.start_advertising(&self.config.advertise, &data) {
            Ok(()) => {
                debug!("Advertising requested for service {}", service_uuid);
                state.advertising = AdvertisingState::Starting;
            }
            Err(err) => {
                error!("Bluetooth stack refused to advertise: {}", err);
                events.push(PeripheralEvent::Error(AdvertiseError::InternalError.into()));
            }
        }
    }

    /// Records the stack's verdict on the pending advertising attempt.
    pub fn handle_advertise_outcome(&self, outcome: AdvertiseOutcome) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            match outcome {
                AdvertiseOutcome::Success(settings) => {
                    if state.advertising == AdvertisingState::Starting {
                        info!("Start Advertising");
                        state.advertising = AdvertisingState::Advertising;
                        events.push(PeripheralEvent::AdvertisingStarted(settings));
                    } else {
                        debug!("Advertising success while {:?}, ignored", state.advertising);
                    }
                }
                AdvertiseOutcome::Failure(err) => {
                    error!("Advertising failed: {} (code {})", err, err.code());
                    state.advertising = AdvertisingState::Idle;
                    events.push(PeripheralEvent::Error(err.into()));
                }
            }
        }
        self.emit(events);
    }

    /// Stops advertising. Does nothing when not advertising.
    pub fn stop_advertising(&self) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            if state.advertising == AdvertisingState::Idle {
                debug!("Not advertising, nothing to stop");
                return;
            }
            if let Err(err) = self.sink.stop_advertising() {
                warn!("Failed to stop advertising: {}", err);
            }
            state.advertising = AdvertisingState::Idle;
            info!("Stop Advertising");
            events.push(PeripheralEvent::AdvertisingStopped);
        }
        self.emit(events);
    }

    /// Sets `characteristic` to `value` and notifies the connected central.
    ///
    /// Without a connection, for an unknown or non-notifying characteristic,
    /// or when the value is dropped by the [`NotificationPolicy`], the request
    /// is logged and reported as a [`PeripheralEvent::Error`].
    pub fn notify(&self, characteristic: &Uuid, value: &[u8]) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            self.notify_locked(&mut state, characteristic, value, &mut events);
        }
        self.emit(events);
    }

    /// Notifies on the first notify-capable characteristic of the service.
    pub fn notify_primary(&self, value: &[u8]) {
        match self.registry.primary_notify_characteristic() {
            Some(characteristic) => self.notify(&characteristic.uuid(), value),
            None => warn!(
                "Service {} has no notify characteristic",
                self.registry.service_uuid()
            ),
        }
    }

    fn notify_locked(
        &self,
        state: &mut EngineState,
        uuid: &Uuid,
        value: &[u8],
        events: &mut Vec<PeripheralEvent>,
    ) {
        let Some(handle) = state.session.handle() else {
            warn!("Notify on {} without a connected central", uuid);
            events.push(PeripheralEvent::Error(PeripheralError::NotifyWithoutConnection));
            return;
        };
        let Some(characteristic) = self.registry.characteristic(uuid) else {
            warn!("Notify on unknown characteristic {}", uuid);
            events.push(PeripheralEvent::Error(PeripheralError::UnknownCharacteristic(*uuid)));
            return;
        };
        if !characteristic.properties().can_notify() {
            warn!("Characteristic {} does not support notify", uuid);
            events.push(PeripheralEvent::Error(PeripheralError::CharacteristicNotNotifiable(*uuid)));
            return;
        }
        if self.config.require_subscription && !state.session.subscription(uuid).notify {
            debug!("Central has not subscribed to {}, notification skipped", uuid);
            events.push(PeripheralEvent::Error(PeripheralError::NotSubscribed(*uuid)));
            return;
        }

        if state.notifications.is_in_flight(uuid) {
            let queued = match self.config.notification_policy {
                NotificationPolicy::Queue => state.notifications.enqueue(
                    *uuid,
                    value.to_vec(),
                    self.config.max_pending_notifications,
                ),
                NotificationPolicy::DropWhileInFlight => false,
            };
            if queued {
                debug!("Notification for {} queued behind in-flight one", uuid);
            } else {
                warn!("Notification for {} dropped: previous one still in flight", uuid);
                events.push(PeripheralEvent::Error(PeripheralError::NotificationDropped(*uuid)));
            }
            return;
        }

        self.dispatch(state, handle, characteristic, value.to_vec(), events);
    }

    /// Stores `value` and hands the notification to the stack.
    fn dispatch(
        &self,
        state: &mut EngineState,
        handle: ConnectionHandle,
        characteristic: &CharacteristicDescriptor,
        value: Vec<u8>,
        events: &mut Vec<PeripheralEvent>,
    ) -> bool {
        let uuid = characteristic.uuid();
        characteristic.set_value(&value);

        let limit = usize::from(state.session.mtu().saturating_sub(3));
        let mut payload = value;
        if payload.len() > limit {
            warn!(
                "Notification for {} truncated from {} to {} bytes",
                uuid,
                payload.len(),
                limit
            );
            payload.truncate(limit);
        }

        let notification = Notification {
            device: handle.device(),
            characteristic: uuid,
            value: payload,
            confirm: false,
        };
        match self.sink.notify_characteristic_changed(&notification) {
            Ok(()) => {
                debug!(
                    "Notification dispatched to {} on {}: {}",
                    handle,
                    uuid,
                    hex::encode(&notification.value)
                );
                state.notifications.mark_dispatched(uuid);
                events.push(PeripheralEvent::NotificationDispatched {
                    device: handle.device(),
                    characteristic: uuid,
                });
                true
            }
            Err(err) => {
                error!("failed notification on {}: {}", uuid, err);
                events.push(PeripheralEvent::Error(err.into()));
                false
            }
        }
    }

    /// Dispatches one event from the Bluetooth stack.
    pub fn handle_event(&self, event: GattEvent) {
        let mut events = Vec::new();
        {
            let mut state = self.lock_state();
            self.dispatch_event(&mut state, event, &mut events);
        }
        self.emit(events);
    }

    fn dispatch_event(&self, state: &mut EngineState, event: GattEvent, events: &mut Vec<PeripheralEvent>) {
        let device = event.device();
        let mut changes = Vec::new();
        match event {
            GattEvent::ConnectionStateChange { status, new_state, .. } => {
                if !status.is_success() {
                    warn!("Connection state change from {} reported {:?}", device, status);
                }
                self.connection_state_changed(state, device, new_state, events);
            }
            GattEvent::CharacteristicReadRequest {
                request_id,
                offset,
                characteristic,
                ..
            } => {
                self.check_slot(state, device, events);
                let request = ReadRequest {
                    device,
                    request_id,
                    offset,
                    target: AttributeTarget::Characteristic(characteristic),
                };
                let response = state.session.read(
                    &self.registry,
                    &self.config.placeholder_value,
                    request,
                    &mut changes,
                );
                self.respond(&response, events);
            }
            GattEvent::DescriptorReadRequest {
                request_id,
                offset,
                characteristic,
                descriptor,
                ..
            } => {
                self.check_slot(state, device, events);
                let request = ReadRequest {
                    device,
                    request_id,
                    offset,
                    target: AttributeTarget::Descriptor {
                        characteristic,
                        descriptor,
                    },
                };
                let response = state.session.read(
                    &self.registry,
                    &self.config.placeholder_value,
                    request,
                    &mut changes,
                );
                self.respond(&response, events);
            }
            GattEvent::CharacteristicWriteRequest {
                request_id,
                characteristic,
                prepared_write,
                response_needed,
                offset,
                value,
                ..
            } => {
                let request = WriteRequest {
                    device,
                    request_id,
                    target: AttributeTarget::Characteristic(characteristic),
                    prepared_write,
                    response_needed,
                    offset,
                    value,
                };
                if let Some(response) = self.write(state, request, &mut changes, events) {
                    self.respond(&response, events);
                }
            }
            GattEvent::DescriptorWriteRequest {
                request_id,
                characteristic,
                descriptor,
                prepared_write,
                response_needed,
                offset,
                value,
                ..
            } => {
                let request = WriteRequest {
                    device,
                    request_id,
                    target: AttributeTarget::Descriptor {
                        characteristic,
                        descriptor,
                    },
                    prepared_write,
                    response_needed,
                    offset,
                    value,
                };
                if let Some(response) = self.write(state, request, &mut changes, events) {
                    self.respond(&response, events);
                }
            }
            GattEvent::ExecuteWrite {
                request_id,
                execute,
                ..
            } => {
                let response = if self.check_slot(state, device, events) {
                    state
                        .session
                        .execute_write(&self.registry, device, request_id, execute, &mut changes)
                } else {
                    GattResponse::success(device, request_id, 0, Vec::new())
                };
                self.respond(&response, events);
            }
            GattEvent::MtuChanged { mtu, .. } => {
                if !state.session.is_connected_to(device) {
                    debug!("Ignoring MTU {} from {}: not the connected central", mtu, device);
                    return;
                }
                state.session.set_mtu(mtu);
                debug!("MTU for {} is now {}", device, state.session.mtu());
                events.push(PeripheralEvent::MtuChanged(state.session.mtu()));
            }
            GattEvent::NotificationSent { status, .. } => {
                self.notification_sent(state, device, status, events);
            }
        }
        events.extend(changes.into_iter().map(PeripheralEvent::from));
    }

    /// Writes from the connected central are applied or staged; writes from
    /// any other central are only answered.
    fn write(
        &self,
        state: &mut EngineState,
        request: WriteRequest,
        changes: &mut Vec<SessionEvent>,
        events: &mut Vec<PeripheralEvent>,
    ) -> Option<GattResponse> {
        if self.check_slot(state, request.device, events) {
            state.session.write(&self.registry, request, changes)
        } else {
            GattSession::acknowledge(request)
        }
    }

    fn connection_state_changed(
        &self,
        state: &mut EngineState,
        device: DeviceAddress,
        new_state: LinkState,
        events: &mut Vec<PeripheralEvent>,
    ) {
        match state.session.connection_state_changed(device, new_state) {
            Transition::Connected(handle) => {
                events.push(PeripheralEvent::Connected(handle));
            }
            Transition::Replaced { evicted, current } => {
                if let Err(err) = self.sink.disconnect(evicted.device()) {
                    warn!("Failed to drop evicted central {}: {}", evicted, err);
                }
                state.notifications.clear();
                self.registry.reset_cccds();
                events.push(PeripheralEvent::Evicted(evicted));
                events.push(PeripheralEvent::Connected(current));
            }
            Transition::Disconnected(handle) => {
                let dropped = state.notifications.pending_len() + state.notifications.in_flight_len();
                if dropped > 0 {
                    debug!("Dropping {} notifications for {}", dropped, handle);
                }
                state.notifications.clear();
                self.registry.reset_cccds();
                events.push(PeripheralEvent::Disconnected(handle));
            }
            Transition::Unchanged => {}
        }
    }

    /// Whether `device` holds the connection slot. Requests from any other
    /// central are still answered but leave the session untouched.
    fn check_slot(&self, state: &EngineState, device: DeviceAddress, events: &mut Vec<PeripheralEvent>) -> bool {
        if state.session.is_connected_to(device) {
            return true;
        }
        warn!("Request from {}, which does not hold the connection: answering without applying", device);
        events.push(PeripheralEvent::Error(PeripheralError::StaleRequest(device)));
        false
    }

    fn respond(&self, response: &GattResponse, events: &mut Vec<PeripheralEvent>) {
        if let Err(err) = self.sink.send_response(response) {
            warn!(
                "Failed to answer request {} from {}: {}",
                response.request_id, response.device, err
            );
            events.push(PeripheralEvent::Error(err.into()));
        }
    }

    fn notification_sent(
        &self,
        state: &mut EngineState,
        device: DeviceAddress,
        status: GattStatus,
        events: &mut Vec<PeripheralEvent>,
    ) {
        if status.is_success() {
            debug!("sent operation succeeded");
        } else {
            warn!("sent operation failed: {:?}", status);
        }
        events.push(PeripheralEvent::NotificationSent { device, status });
        if !status.is_success() {
            events.push(PeripheralEvent::Error(
                PeripheralError::NotificationDeliveryFailure(status),
            ));
        }

        let Some(handle) = state.session.handle().filter(|h| h.device() == device) else {
            debug!("Ack from {} does not match the connected central", device);
            return;
        };
        let Some(uuid) = state.notifications.complete_oldest() else {
            debug!("Ack from {} with no notification in flight", device);
            return;
        };
        let Some(characteristic) = self.registry.characteristic(&uuid) else {
            return;
        };
        while let Some(value) = state.notifications.take_pending(&uuid) {
            if self.dispatch(state, handle, characteristic, value, events) {
                break;
            }
        }
    }
}
