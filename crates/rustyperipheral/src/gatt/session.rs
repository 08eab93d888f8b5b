//! GATT session state machine
//!
//! Tracks the single connection slot and answers the requests arriving on it.
//! Transitions are driven only by link-state events; while connected, read and
//! write requests are resolved against the [`ServiceRegistry`].
//!
//! Writes are never rejected at the protocol level: a request that needs a
//! response always gets `Success`, whether or not the target exists or the
//! payload could be applied. Anything that could not be applied is logged and
//! reported as an event instead.

use super::event::GattResponse;
use super::registry::{ServiceRegistry, Subscription};
use super::types::GattStatus;
use crate::gap::{ConnectionHandle, DeviceAddress, LinkState};
use crate::uuid::Uuid;
use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::Cursor;

/// Upper bound on staged prepared writes per connection
pub const MAX_PREPARED_WRITES: usize = 128;

/// Connection slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connected(ConnectionHandle),
}

/// What a link-state event did to the connection slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Connected(ConnectionHandle),
    /// A new central took the slot while another was still recorded
    Replaced {
        evicted: ConnectionHandle,
        current: ConnectionHandle,
    },
    Disconnected(ConnectionHandle),
    Unchanged,
}

/// The attribute a request addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeTarget {
    Characteristic(Uuid),
    Descriptor { characteristic: Uuid, descriptor: Uuid },
}

/// A characteristic or descriptor read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadRequest {
    pub device: DeviceAddress,
    pub request_id: u32,
    pub offset: u16,
    pub target: AttributeTarget,
}

/// A characteristic or descriptor write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub device: DeviceAddress,
    pub request_id: u32,
    pub target: AttributeTarget,
    pub prepared_write: bool,
    pub response_needed: bool,
    pub offset: u16,
    pub value: Vec<u8>,
}

/// Attribute changes and lookup failures observed while serving requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
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
    UnknownCharacteristic(Uuid),
}

#[derive(Debug, Clone)]
struct PreparedWrite {
    target: AttributeTarget,
    offset: u16,
    value: Vec<u8>,
}

/// Per-connection GATT state
#[derive(Debug)]
pub struct GattSession {
    state: SessionState,
    next_connection_id: u64,
    default_mtu: u16,
    mtu: u16,
    prepared: Vec<PreparedWrite>,
    subscriptions: HashMap<Uuid, Subscription>,
}

impl GattSession {
    pub fn new(default_mtu: u16) -> Self {
        Self {
            state: SessionState::Disconnected,
            next_connection_id: 1,
            default_mtu,
            mtu: default_mtu,
            prepared: Vec::new(),
            subscriptions: HashMap::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn handle(&self) -> Option<ConnectionHandle> {
        match self.state {
            SessionState::Connected(handle) => Some(handle),
            SessionState::Disconnected => None,
        }
    }

    pub fn is_connected_to(&self, device: DeviceAddress) -> bool {
        self.handle().is_some_and(|handle| handle.device() == device)
    }

    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    pub fn set_mtu(&mut self, mtu: u16) {
        self.mtu = mtu.max(self.default_mtu);
    }

    pub fn subscription(&self, characteristic: &Uuid) -> Subscription {
        self.subscriptions
            .get(characteristic)
            .copied()
            .unwrap_or_default()
    }

    pub fn pending_prepared_writes(&self) -> usize {
        self.prepared.len()
    }

    /// Applies a link-state change reported by the stack.
    pub fn connection_state_changed(&mut self, device: DeviceAddress, new_state: LinkState) -> Transition {
        match new_state {
            LinkState::Connected => {
                let current = ConnectionHandle::new(device, self.next_connection_id);
                self.next_connection_id += 1;
                let previous = std::mem::replace(&mut self.state, SessionState::Connected(current));
                self.reset_connection_state();

                match previous {
                    SessionState::Disconnected => {
                        info!("Central {} connected", current);
                        Transition::Connected(current)
                    }
                    SessionState::Connected(evicted) => {
                        warn!("Central {} replaces {} in the connection slot", current, evicted);
                        Transition::Replaced { evicted, current }
                    }
                }
            }
            LinkState::Disconnected => match self.state {
                SessionState::Connected(handle) if handle.device() == device => {
                    self.state = SessionState::Disconnected;
                    self.reset_connection_state();
                    info!("Central {} disconnected", handle);
                    Transition::Disconnected(handle)
                }
                _ => {
                    debug!("Ignoring disconnect from {}: not the connected central", device);
                    Transition::Unchanged
                }
            },
            LinkState::Connecting | LinkState::Disconnecting => {
                debug!("Link to {} is {:?}", device, new_state);
                Transition::Unchanged
            }
        }
    }

    fn reset_connection_state(&mut self) {
        self.mtu = self.default_mtu;
        self.prepared.clear();
        self.subscriptions.clear();
    }

    /// Answers a read request.
    ///
    /// Unknown characteristics and every descriptor read are answered with
    /// `placeholder` rather than an error.
    pub fn read(
        &self,
        registry: &ServiceRegistry,
        placeholder: &[u8],
        request: ReadRequest,
        events: &mut Vec<SessionEvent>,
    ) -> GattResponse {
        let ReadRequest {
            device,
            request_id,
            offset,
            target,
        } = request;
        let uuid = match target {
            AttributeTarget::Characteristic(uuid) => uuid,
            AttributeTarget::Descriptor { characteristic, descriptor } => {
                debug!("Descriptor read {} on {} (request {})", descriptor, characteristic, request_id);
                return GattResponse::success(device, request_id, offset, placeholder.to_vec());
            }
        };

        let Some(characteristic) = registry.characteristic(&uuid) else {
            warn!("Read of unknown characteristic {}, answering with placeholder", uuid);
            events.push(SessionEvent::UnknownCharacteristic(uuid));
            return GattResponse::success(device, request_id, offset, placeholder.to_vec());
        };

        match characteristic.value_from(usize::from(offset)) {
            Some(mut value) => {
                value.truncate(usize::from(self.mtu.saturating_sub(1)));
                debug!(
                    "Characteristic read {} offset {} (request {}): {}",
                    uuid,
                    offset,
                    request_id,
                    hex::encode(&value)
                );
                GattResponse::success(device, request_id, offset, value)
            }
            None => {
                warn!("Read of {} at offset {} is past the end of the value", uuid, offset);
                GattResponse::error(device, request_id, GattStatus::InvalidOffset, offset)
            }
        }
    }

    /// Applies or stages a write; returns the response when one is needed.
    pub fn write(
        &mut self,
        registry: &ServiceRegistry,
        request: WriteRequest,
        events: &mut Vec<SessionEvent>,
    ) -> Option<GattResponse> {
        debug!(
            "Write {:?} offset {} prepared={} (request {}): {}",
            request.target,
            request.offset,
            request.prepared_write,
            request.request_id,
            hex::encode(&request.value)
        );

        if request.prepared_write {
            if self.prepared.len() < MAX_PREPARED_WRITES {
                self.prepared.push(PreparedWrite {
                    target: request.target,
                    offset: request.offset,
                    value: request.value.clone(),
                });
            } else {
                warn!("Prepared write queue full, dropping write to {:?}", request.target);
            }
        } else {
            self.apply(registry, request.target, request.offset, &request.value, events);
        }

        Self::acknowledge(request)
    }

    /// Answers a write without applying or staging it.
    ///
    /// Used for requests arriving from a central that no longer holds the
    /// connection slot: the stack still expects a response.
    pub fn acknowledge(request: WriteRequest) -> Option<GattResponse> {
        request.response_needed.then(|| {
            GattResponse::success(request.device, request.request_id, request.offset, request.value)
        })
    }

    /// Commits or abandons the staged prepared writes, in arrival order.
    pub fn execute_write(
        &mut self,
        registry: &ServiceRegistry,
        device: DeviceAddress,
        request_id: u32,
        execute: bool,
        events: &mut Vec<SessionEvent>,
    ) -> GattResponse {
        let staged = std::mem::take(&mut self.prepared);
        if execute {
            debug!("Executing {} prepared writes", staged.len());
            for write in staged {
                self.apply(registry, write.target, write.offset, &write.value, events);
            }
        } else {
            debug!("Discarding {} prepared writes", staged.len());
        }
        GattResponse::success(device, request_id, 0, Vec::new())
    }

    fn apply(
        &mut self,
        registry: &ServiceRegistry,
        target: AttributeTarget,
        offset: u16,
        value: &[u8],
        events: &mut Vec<SessionEvent>,
    ) {
        match target {
            AttributeTarget::Characteristic(uuid) => {
                let Some(characteristic) = registry.characteristic(&uuid) else {
                    warn!("Write to unknown characteristic {} ignored", uuid);
                    events.push(SessionEvent::UnknownCharacteristic(uuid));
                    return;
                };
                if characteristic.write_at(usize::from(offset), value) {
                    events.push(SessionEvent::CharacteristicWritten {
                        characteristic: uuid,
                        value: characteristic.value(),
                    });
                } else {
                    warn!("Write to {} at offset {} is past the end of the value", uuid, offset);
                }
            }
            AttributeTarget::Descriptor { characteristic, descriptor } => {
                let Some(owner) = registry.characteristic(&characteristic) else {
                    warn!("Descriptor write on unknown characteristic {} ignored", characteristic);
                    events.push(SessionEvent::UnknownCharacteristic(characteristic));
                    return;
                };
                let Some(attr) = owner.descriptor(&descriptor) else {
                    warn!("Write to unknown descriptor {} on {} ignored", descriptor, characteristic);
                    return;
                };
                if !attr.write_at(usize::from(offset), value) {
                    warn!("Write to descriptor {} at offset {} is past the end", descriptor, offset);
                    return;
                }

                let value = attr.value();
                if attr.is_cccd() {
                    self.update_subscription(characteristic, &value, events);
                }
                events.push(SessionEvent::DescriptorWritten {
                    characteristic,
                    descriptor,
                    value,
                });
            }
        }
    }

    fn update_subscription(&mut self, characteristic: Uuid, value: &[u8], events: &mut Vec<SessionEvent>) {
        let bits = match Cursor::new(value).read_u16::<LittleEndian>() {
            Ok(bits) => bits,
            Err(_) => {
                warn!("Malformed CCCD value for {}: {}", characteristic, hex::encode(value));
                return;
            }
        };

        let subscription = Subscription::from_bits(bits);
        info!(
            "Central {} notifications for {} (indications {})",
            if subscription.notify { "enabled" } else { "disabled" },
            characteristic,
            if subscription.indicate { "on" } else { "off" }
        );
        self.subscriptions.insert(characteristic, subscription);
        events.push(SessionEvent::SubscriptionChanged {
            characteristic,
            subscription,
        });
    }
}
