//! Unit tests for the GATT session state machine

use super::*;
use crate::gap::{DeviceAddress, LinkState};
use crate::uuid::Uuid;

const PLACEHOLDER: &[u8] = b"NONE";

const SERVICE: Uuid = Uuid::from_u16(0x1234);
const READ_WRITE: Uuid = Uuid::from_u16(0x5678);
const NOTIFY: Uuid = Uuid::from_u16(0x5679);
const USER_DESCRIPTION: Uuid = Uuid::from_u16(0x2901);
const CCCD: Uuid = Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID);

fn central() -> DeviceAddress {
    DeviceAddress::new([0x55, 0x44, 0x33, 0x22, 0x11, 0x00])
}

fn registry() -> ServiceRegistry {
    let service = ServiceDescriptor::builder(SERVICE)
        .characteristic(
            CharacteristicBuilder::new(
                READ_WRITE,
                CharacteristicProperties::READ | CharacteristicProperties::WRITE,
            )
            .value(b"SAMPLE".to_vec())
            .descriptor(USER_DESCRIPTION, Permissions::READ | Permissions::WRITE, b"rw".to_vec()),
        )
        .characteristic(
            CharacteristicBuilder::new(NOTIFY, CharacteristicProperties::NOTIFY).cccd(),
        )
        .build()
        .unwrap();
    ServiceRegistry::new(service)
}

fn connected_session() -> GattSession {
    let mut session = GattSession::new(ATT_DEFAULT_MTU);
    session.connection_state_changed(central(), LinkState::Connected);
    session
}

fn read(target: AttributeTarget, offset: u16) -> ReadRequest {
    ReadRequest {
        device: central(),
        request_id: 7,
        offset,
        target,
    }
}

fn write(target: AttributeTarget, offset: u16, value: &[u8]) -> WriteRequest {
    WriteRequest {
        device: central(),
        request_id: 9,
        target,
        prepared_write: false,
        response_needed: true,
        offset,
        value: value.to_vec(),
    }
}

#[test]
fn test_connection_transitions() {
    let mut session = GattSession::new(ATT_DEFAULT_MTU);
    assert_eq!(session.state(), SessionState::Disconnected);

    let first = match session.connection_state_changed(central(), LinkState::Connected) {
        Transition::Connected(handle) => handle,
        other => panic!("unexpected transition {:?}", other),
    };
    assert_eq!(first.device(), central());
    assert_eq!(session.state(), SessionState::Connected(first));
    assert!(session.is_connected_to(central()));

    // A second central takes over the slot
    let other = DeviceAddress::new([1, 2, 3, 4, 5, 6]);
    let second = match session.connection_state_changed(other, LinkState::Connected) {
        Transition::Replaced { evicted, current } => {
            assert_eq!(evicted, first);
            current
        }
        transition => panic!("unexpected transition {:?}", transition),
    };
    assert_ne!(first, second);
    assert!(!session.is_connected_to(central()));

    // Disconnect from the evicted central is ignored
    assert_eq!(
        session.connection_state_changed(central(), LinkState::Disconnected),
        Transition::Unchanged
    );
    assert_eq!(
        session.connection_state_changed(other, LinkState::Disconnecting),
        Transition::Unchanged
    );
    assert_eq!(
        session.connection_state_changed(other, LinkState::Disconnected),
        Transition::Disconnected(second)
    );
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.handle(), None);
}

#[test]
fn test_read_characteristic_with_offset() {
    let registry = registry();
    let session = connected_session();
    let mut events = Vec::new();

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(READ_WRITE), 0),
        &mut events,
    );
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.request_id, 7);
    assert_eq!(response.value, b"SAMPLE".to_vec());

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(READ_WRITE), 2),
        &mut events,
    );
    assert_eq!(response.offset, 2);
    assert_eq!(response.value, b"MPLE".to_vec());

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(READ_WRITE), 7),
        &mut events,
    );
    assert_eq!(response.status, GattStatus::InvalidOffset);
    assert!(response.value.is_empty());
    assert!(events.is_empty());
}

#[test]
fn test_read_truncated_to_mtu() {
    let registry = registry();
    let session = connected_session();
    let characteristic = registry.characteristic(&READ_WRITE).unwrap();
    characteristic.set_value(&[0xAA; 40]);

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(READ_WRITE), 0),
        &mut Vec::new(),
    );
    assert_eq!(response.value.len(), usize::from(ATT_DEFAULT_MTU) - 1);

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(READ_WRITE), 22),
        &mut Vec::new(),
    );
    assert_eq!(response.value.len(), 18);
}

#[test]
fn test_read_unknown_characteristic_answers_placeholder() {
    let registry = registry();
    let session = connected_session();
    let mut events = Vec::new();
    let unknown = Uuid::from_u16(0xDEAD);

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(AttributeTarget::Characteristic(unknown), 0),
        &mut events,
    );
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.value, b"NONE".to_vec());
    assert_eq!(
        events,
        vec![SessionEvent::UnknownCharacteristic(unknown)]
    );
}

#[test]
fn test_descriptor_read_answers_placeholder() {
    let registry = registry();
    let session = connected_session();

    let response = session.read(
        &registry,
        PLACEHOLDER,
        read(
            AttributeTarget::Descriptor {
                characteristic: READ_WRITE,
                descriptor: USER_DESCRIPTION,
            },
            0,
        ),
        &mut Vec::new(),
    );
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.value, b"NONE".to_vec());
}

#[test]
fn test_write_replaces_value_and_echoes() {
    let registry = registry();
    let mut session = connected_session();
    let mut events = Vec::new();

    let response = session
        .write(
            &registry,
            write(AttributeTarget::Characteristic(READ_WRITE), 0, &[0x01, 0x02]),
            &mut events,
        )
        .unwrap();
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.request_id, 9);
    assert_eq!(response.offset, 0);
    assert_eq!(response.value, vec![0x01, 0x02]);
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), vec![0x01, 0x02]);
    assert_eq!(
        events,
        vec![SessionEvent::CharacteristicWritten {
            characteristic: READ_WRITE,
            value: vec![0x01, 0x02],
        }]
    );

    // Offset write splices into the existing value
    session.write(
        &registry,
        write(AttributeTarget::Characteristic(READ_WRITE), 1, &[0x09, 0x0A]),
        &mut events,
    );
    assert_eq!(
        registry.characteristic(&READ_WRITE).unwrap().value(),
        vec![0x01, 0x09, 0x0A]
    );
}

#[test]
fn test_write_is_never_rejected() {
    let registry = registry();
    let mut session = connected_session();
    let mut events = Vec::new();
    let unknown = Uuid::from_u16(0xDEAD);

    let response = session
        .write(
            &registry,
            write(AttributeTarget::Characteristic(unknown), 3, b"xyz"),
            &mut events,
        )
        .unwrap();
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.offset, 3);
    assert_eq!(
        events,
        vec![SessionEvent::UnknownCharacteristic(unknown)]
    );

    // Offset past the end is answered but not applied
    events.clear();
    let response = session
        .write(
            &registry,
            write(AttributeTarget::Characteristic(READ_WRITE), 50, b"xyz"),
            &mut events,
        )
        .unwrap();
    assert_eq!(response.status, GattStatus::Success);
    assert!(events.is_empty());
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), b"SAMPLE".to_vec());
}

#[test]
fn test_write_without_response() {
    let registry = registry();
    let mut session = connected_session();
    let mut request = write(AttributeTarget::Characteristic(READ_WRITE), 0, b"quiet");
    request.response_needed = false;

    assert!(session.write(&registry, request, &mut Vec::new()).is_none());
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), b"quiet".to_vec());
}

#[test]
fn test_prepared_writes_execute_in_order() {
    let registry = registry();
    let mut session = connected_session();
    let mut events = Vec::new();

    for (offset, chunk) in [(0u16, &b"long "[..]), (5, &b"value"[..])] {
        let mut request = write(AttributeTarget::Characteristic(READ_WRITE), offset, chunk);
        request.prepared_write = true;
        let response = session.write(&registry, request, &mut events).unwrap();
        assert_eq!(response.status, GattStatus::Success);
    }
    assert_eq!(session.pending_prepared_writes(), 2);
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), b"SAMPLE".to_vec());

    let response = session.execute_write(&registry, central(), 11, true, &mut events);
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.request_id, 11);
    assert_eq!(session.pending_prepared_writes(), 0);
    assert_eq!(
        registry.characteristic(&READ_WRITE).unwrap().value(),
        b"long value".to_vec()
    );
}

#[test]
fn test_prepared_writes_can_be_cancelled() {
    let registry = registry();
    let mut session = connected_session();
    let mut request = write(AttributeTarget::Characteristic(READ_WRITE), 0, b"staged");
    request.prepared_write = true;
    session.write(&registry, request, &mut Vec::new());

    session.execute_write(&registry, central(), 12, false, &mut Vec::new());
    assert_eq!(session.pending_prepared_writes(), 0);
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), b"SAMPLE".to_vec());
}

#[test]
fn test_descriptor_write_stores_value() {
    let registry = registry();
    let mut session = connected_session();
    let mut events = Vec::new();
    let target = AttributeTarget::Descriptor {
        characteristic: READ_WRITE,
        descriptor: USER_DESCRIPTION,
    };

    let response = session
        .write(&registry, write(target, 0, b"label"), &mut events)
        .unwrap();
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.value, b"label".to_vec());
    assert_eq!(
        registry.descriptor(&READ_WRITE, &USER_DESCRIPTION).unwrap().value(),
        b"label".to_vec()
    );
    assert_eq!(
        events,
        vec![SessionEvent::DescriptorWritten {
            characteristic: READ_WRITE,
            descriptor: USER_DESCRIPTION,
            value: b"label".to_vec(),
        }]
    );
}

#[test]
fn test_cccd_write_updates_subscription() {
    let registry = registry();
    let mut session = connected_session();
    let mut events = Vec::new();
    let target = AttributeTarget::Descriptor {
        characteristic: NOTIFY,
        descriptor: CCCD,
    };
    assert!(!session.subscription(&NOTIFY).notify);

    session.write(&registry, write(target, 0, &[0x01, 0x00]), &mut events);
    assert!(session.subscription(&NOTIFY).notify);
    assert!(events.contains(&SessionEvent::SubscriptionChanged {
        characteristic: NOTIFY,
        subscription: Subscription {
            notify: true,
            indicate: false,
        },
    }));

    // Malformed CCCD value keeps the previous subscription
    session.write(&registry, write(target, 0, &[0x00]), &mut Vec::new());
    assert!(session.subscription(&NOTIFY).notify);

    session.connection_state_changed(central(), LinkState::Disconnected);
    assert!(!session.subscription(&NOTIFY).notify);
}

#[test]
fn test_mtu_resets_on_disconnect() {
    let mut session = connected_session();
    session.set_mtu(185);
    assert_eq!(session.mtu(), 185);

    // Never below the default
    session.set_mtu(10);
    assert_eq!(session.mtu(), ATT_DEFAULT_MTU);

    session.set_mtu(247);
    session.connection_state_changed(central(), LinkState::Disconnected);
    assert_eq!(session.mtu(), ATT_DEFAULT_MTU);
}

#[test]
fn test_prepared_write_overflow_is_answered_but_dropped() {
    let registry = registry();
    let mut session = connected_session();

    for index in 0..session::MAX_PREPARED_WRITES {
        let offset = u16::try_from(index).unwrap();
        let mut request = write(AttributeTarget::Characteristic(READ_WRITE), offset, b"a");
        request.prepared_write = true;
        session.write(&registry, request, &mut Vec::new());
    }
    assert_eq!(session.pending_prepared_writes(), session::MAX_PREPARED_WRITES);

    let mut request = write(AttributeTarget::Characteristic(READ_WRITE), 128, b"z");
    request.prepared_write = true;
    let response = session.write(&registry, request, &mut Vec::new()).unwrap();
    assert_eq!(response.status, GattStatus::Success);
    assert_eq!(response.offset, 128);
    assert_eq!(response.value, b"z".to_vec());
    assert_eq!(session.pending_prepared_writes(), session::MAX_PREPARED_WRITES);

    session.execute_write(&registry, central(), 13, true, &mut Vec::new());
    let value = registry.characteristic(&READ_WRITE).unwrap().value();
    assert_eq!(value, vec![b'a'; session::MAX_PREPARED_WRITES]);
}

#[test]
fn test_intermediate_link_states_leave_slot_alone() {
    let mut session = GattSession::new(ATT_DEFAULT_MTU);
    assert_eq!(
        session.connection_state_changed(central(), LinkState::Connecting),
        Transition::Unchanged
    );
    assert_eq!(session.state(), SessionState::Disconnected);

    let handle = match session.connection_state_changed(central(), LinkState::Connected) {
        Transition::Connected(handle) => handle,
        other => panic!("unexpected transition {:?}", other),
    };
    session.set_mtu(185);

    for state in [LinkState::Connecting, LinkState::Disconnecting] {
        assert_eq!(
            session.connection_state_changed(central(), state),
            Transition::Unchanged
        );
    }
    assert_eq!(session.state(), SessionState::Connected(handle));
    assert_eq!(session.mtu(), 185);
}

#[test]
fn test_acknowledge_does_not_apply() {
    let registry = registry();
    let response = GattSession::acknowledge(write(AttributeTarget::Characteristic(READ_WRITE), 2, b"xy"));
    assert_eq!(response, Some(GattResponse::success(central(), 9, 2, b"xy".to_vec())));
    assert_eq!(registry.characteristic(&READ_WRITE).unwrap().value(), b"SAMPLE".to_vec());

    let mut request = write(AttributeTarget::Characteristic(READ_WRITE), 0, b"xy");
    request.response_needed = false;
    assert_eq!(GattSession::acknowledge(request), None);
}
