//! Inbound GATT server events and outbound responses
//!
//! The host Bluetooth stack reports everything that happens on the server side
//! as one of the [`GattEvent`] variants. Requests are answered with a
//! [`GattResponse`] echoing the request id.

use super::types::GattStatus;
use crate::gap::{DeviceAddress, LinkState};
use crate::uuid::Uuid;

/// Events delivered by the Bluetooth stack to the peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GattEvent {
    ConnectionStateChange {
        device: DeviceAddress,
        status: GattStatus,
        new_state: LinkState,
    },
    CharacteristicReadRequest {
        device: DeviceAddress,
        request_id: u32,
        offset: u16,
        characteristic: Uuid,
    },
    CharacteristicWriteRequest {
        device: DeviceAddress,
        request_id: u32,
        characteristic: Uuid,
        prepared_write: bool,
        response_needed: bool,
        offset: u16,
        value: Vec<u8>,
    },
    DescriptorReadRequest {
        device: DeviceAddress,
        request_id: u32,
        offset: u16,
        characteristic: Uuid,
        descriptor: Uuid,
    },
    DescriptorWriteRequest {
        device: DeviceAddress,
        request_id: u32,
        characteristic: Uuid,
        descriptor: Uuid,
        prepared_write: bool,
        response_needed: bool,
        offset: u16,
        value: Vec<u8>,
    },
    /// Commit (`execute = true`) or abandon the prepared writes queued so far
    ExecuteWrite {
        device: DeviceAddress,
        request_id: u32,
        execute: bool,
    },
    MtuChanged {
        device: DeviceAddress,
        mtu: u16,
    },
    /// Ack for the oldest notification handed to the stack
    NotificationSent {
        device: DeviceAddress,
        status: GattStatus,
    },
}

impl GattEvent {
    /// The central the event concerns
    pub fn device(&self) -> DeviceAddress {
        match self {
            GattEvent::ConnectionStateChange { device, .. }
            | GattEvent::CharacteristicReadRequest { device, .. }
            | GattEvent::CharacteristicWriteRequest { device, .. }
            | GattEvent::DescriptorReadRequest { device, .. }
            | GattEvent::DescriptorWriteRequest { device, .. }
            | GattEvent::ExecuteWrite { device, .. }
            | GattEvent::MtuChanged { device, .. }
            | GattEvent::NotificationSent { device, .. } => *device,
        }
    }
}

/// Response to a read, write or execute-write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattResponse {
    pub device: DeviceAddress,
    pub request_id: u32,
    pub status: GattStatus,
    pub offset: u16,
    pub value: Vec<u8>,
}

impl GattResponse {
    pub fn success(device: DeviceAddress, request_id: u32, offset: u16, value: Vec<u8>) -> Self {
        Self {
            device,
            request_id,
            status: GattStatus::Success,
            offset,
            value,
        }
    }

    pub fn error(device: DeviceAddress, request_id: u32, status: GattStatus, offset: u16) -> Self {
        Self {
            device,
            request_id,
            status,
            offset,
            value: Vec::new(),
        }
    }
}
