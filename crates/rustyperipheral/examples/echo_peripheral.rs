//! Example demonstrating a simple echo peripheral
//!
//! This example serves one custom service with a notify characteristic,
//! drives the engine through a scripted central session, and echoes every
//! write back to the central as a notification. The Bluetooth stack is
//! replaced by a sink that only logs what it is asked to do.
//!
//! Run with `RUST_LOG=debug` to see the engine's own logging.

use log::info;
use rustyperipheral::gap::AdvertiseSettings;
use rustyperipheral::gatt::{Permissions, CLIENT_CHAR_CONFIG_UUID};
use rustyperipheral::{
    AdvertiseOutcome, AdvertisingData, CharacteristicBuilder, CharacteristicProperties,
    DeviceAddress, EventSink, GattEvent, GattResponse, GattStatus, LinkState, Notification,
    PeripheralConfig, PeripheralEngine, PeripheralEvent, ServiceDescriptor, ServiceRegistry,
    SinkError, Uuid,
};
use std::sync::Arc;

/// Stand-in for a host Bluetooth stack
struct LoggingSink;

impl EventSink for LoggingSink {
    fn start_advertising(
        &self,
        settings: &AdvertiseSettings,
        data: &AdvertisingData,
    ) -> Result<(), SinkError> {
        let payload = data.encode().map_err(|err| SinkError::Rejected(err.to_string()))?;
        info!(
            "stack: advertise {:?} at {:?}: {}",
            settings.mode,
            settings.tx_power,
            hex::encode(payload)
        );
        Ok(())
    }

    fn stop_advertising(&self) -> Result<(), SinkError> {
        info!("stack: stop advertising");
        Ok(())
    }

    fn disconnect(&self, device: DeviceAddress) -> Result<(), SinkError> {
        info!("stack: disconnect {}", device);
        Ok(())
    }

    fn send_response(&self, response: &GattResponse) -> Result<(), SinkError> {
        info!(
            "stack: response #{} to {} {:?}: {:?}",
            response.request_id,
            response.device,
            response.status,
            String::from_utf8_lossy(&response.value)
        );
        Ok(())
    }

    fn notify_characteristic_changed(&self, notification: &Notification) -> Result<(), SinkError> {
        info!(
            "stack: notify {} on {}: {}",
            notification.device,
            notification.characteristic,
            hex::encode(&notification.value)
        );
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let service_uuid: Uuid = "8d53dc1d-1db7-4cd3-868b-8a527460aa84".parse()?;
    let echo_uuid: Uuid = "da2e7828-fbce-4e01-ae9e-261174997c48".parse()?;
    let user_description = Uuid::from_u16(0x2901);

    let service = ServiceDescriptor::builder(service_uuid)
        .characteristic(
            CharacteristicBuilder::new(
                echo_uuid,
                CharacteristicProperties::READ
                    | CharacteristicProperties::WRITE
                    | CharacteristicProperties::NOTIFY,
            )
            .value(b"SAMPLE".to_vec())
            .descriptor(user_description, Permissions::READ, b"Echo".to_vec())
            .cccd(),
        )
        .build()?;
    let registry = ServiceRegistry::new(service);
    info!("Serving service {}", registry.service_uuid());

    let config = PeripheralConfig {
        require_subscription: true,
        ..PeripheralConfig::default()
    };
    let engine = Arc::new(PeripheralEngine::new(LoggingSink, registry, config));

    let weak = Arc::downgrade(&engine);
    engine.set_event_callback(Box::new(move |event| {
        info!("event: {:?}", event);
        if let PeripheralEvent::CharacteristicWritten { characteristic, value } = event {
            if let Some(engine) = weak.upgrade() {
                engine.notify(characteristic, value);
            }
        }
    }));

    engine.advertise();
    engine.handle_advertise_outcome(AdvertiseOutcome::Success(AdvertiseSettings::default()));

    // Scripted central
    let central = DeviceAddress::new([0x55, 0x44, 0x33, 0x22, 0x11, 0x00]);
    let script = vec![
        GattEvent::ConnectionStateChange {
            device: central,
            status: GattStatus::Success,
            new_state: LinkState::Connected,
        },
        GattEvent::MtuChanged {
            device: central,
            mtu: 185,
        },
        GattEvent::CharacteristicReadRequest {
            device: central,
            request_id: 1,
            offset: 0,
            characteristic: echo_uuid,
        },
        GattEvent::DescriptorWriteRequest {
            device: central,
            request_id: 2,
            characteristic: echo_uuid,
            descriptor: Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID),
            prepared_write: false,
            response_needed: true,
            offset: 0,
            value: vec![0x01, 0x00],
        },
        GattEvent::CharacteristicWriteRequest {
            device: central,
            request_id: 3,
            characteristic: echo_uuid,
            prepared_write: false,
            response_needed: true,
            offset: 0,
            value: b"hello".to_vec(),
        },
        GattEvent::CharacteristicWriteRequest {
            device: central,
            request_id: 4,
            characteristic: echo_uuid,
            prepared_write: false,
            response_needed: true,
            offset: 0,
            value: b"world".to_vec(),
        },
        GattEvent::NotificationSent {
            device: central,
            status: GattStatus::Success,
        },
        GattEvent::NotificationSent {
            device: central,
            status: GattStatus::Success,
        },
        GattEvent::ConnectionStateChange {
            device: central,
            status: GattStatus::Success,
            new_state: LinkState::Disconnected,
        },
    ];

    for event in script {
        engine.handle_event(event);
    }

    engine.stop_advertising();
    info!("Done");

    Ok(())
}
