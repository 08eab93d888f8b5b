//! Service Registry
//!
//! The immutable definition of the one GATT service this peripheral exposes.
//! Layout (UUIDs, properties, descriptor lists) is fixed at construction; only
//! the attribute values change afterwards, each behind its own lock so a
//! reader always sees a whole value.

use super::types::{CharacteristicProperties, Permissions, CCCD_INDICATE, CCCD_NOTIFY, CLIENT_CHAR_CONFIG_UUID};
use crate::error::RegistryError;
use crate::uuid::Uuid;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

fn read_value(value: &RwLock<Vec<u8>>) -> RwLockReadGuard<'_, Vec<u8>> {
    value.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_value(value: &RwLock<Vec<u8>>) -> RwLockWriteGuard<'_, Vec<u8>> {
    value.write().unwrap_or_else(PoisonError::into_inner)
}

/// Replaces `value[offset..]` with `data`. Returns `false`, leaving the value
/// untouched, when `offset` lies past the end of the current value.
fn splice(value: &mut Vec<u8>, offset: usize, data: &[u8]) -> bool {
    if offset > value.len() {
        return false;
    }
    value.truncate(offset);
    value.extend_from_slice(data);
    true
}

/// A descriptor attached to a characteristic
#[derive(Debug)]
pub struct DescriptorDescriptor {
    uuid: Uuid,
    permissions: Permissions,
    value: RwLock<Vec<u8>>,
}

impl DescriptorDescriptor {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn is_cccd(&self) -> bool {
        self.uuid == CLIENT_CHAR_CONFIG_UUID
    }

    pub fn value(&self) -> Vec<u8> {
        read_value(&self.value).clone()
    }

    pub fn set_value(&self, data: &[u8]) {
        *write_value(&self.value) = data.to_vec();
    }

    pub fn write_at(&self, offset: usize, data: &[u8]) -> bool {
        splice(&mut write_value(&self.value), offset, data)
    }
}

/// A characteristic and its descriptors
#[derive(Debug)]
pub struct CharacteristicDescriptor {
    uuid: Uuid,
    properties: CharacteristicProperties,
    permissions: Permissions,
    value: RwLock<Vec<u8>>,
    descriptors: Vec<DescriptorDescriptor>,
}

impl CharacteristicDescriptor {
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn properties(&self) -> CharacteristicProperties {
        self.properties
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    pub fn descriptors(&self) -> &[DescriptorDescriptor] {
        &self.descriptors
    }

    pub fn descriptor(&self, uuid: &Uuid) -> Option<&DescriptorDescriptor> {
        self.descriptors.iter().find(|d| d.uuid == *uuid)
    }

    pub fn cccd(&self) -> Option<&DescriptorDescriptor> {
        self.descriptors.iter().find(|d| d.is_cccd())
    }

    /// Snapshot of the current value
    pub fn value(&self) -> Vec<u8> {
        read_value(&self.value).clone()
    }

    /// Value from `offset` onwards, or `None` if `offset` is past the end
    pub fn value_from(&self, offset: usize) -> Option<Vec<u8>> {
        read_value(&self.value).get(offset..).map(<[u8]>::to_vec)
    }

    /// Replaces the whole value
    pub fn set_value(&self, data: &[u8]) {
        *write_value(&self.value) = data.to_vec();
    }

    /// Writes `data` at `offset`, dropping whatever followed it.
    pub fn write_at(&self, offset: usize, data: &[u8]) -> bool {
        splice(&mut write_value(&self.value), offset, data)
    }
}

/// A GATT service definition
#[derive(Debug)]
pub struct ServiceDescriptor {
    uuid: Uuid,
    is_primary: bool,
    characteristics: Vec<CharacteristicDescriptor>,
}

impl ServiceDescriptor {
    pub fn builder(uuid: Uuid) -> ServiceBuilder {
        ServiceBuilder::new(uuid)
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Characteristics in declaration order
    pub fn characteristics(&self) -> &[CharacteristicDescriptor] {
        &self.characteristics
    }
}

/// Builds a [`ServiceDescriptor`]
#[derive(Debug)]
pub struct ServiceBuilder {
    uuid: Uuid,
    is_primary: bool,
    characteristics: Vec<CharacteristicBuilder>,
}

impl ServiceBuilder {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            is_primary: true,
            characteristics: Vec::new(),
        }
    }

    pub fn secondary(mut self) -> Self {
        self.is_primary = false;
        self
    }

    pub fn characteristic(mut self, characteristic: CharacteristicBuilder) -> Self {
        self.characteristics.push(characteristic);
        self
    }

    pub fn build(self) -> Result<ServiceDescriptor, RegistryError> {
        let mut seen = HashSet::new();
        let mut characteristics = Vec::with_capacity(self.characteristics.len());

        for builder in self.characteristics {
            if !seen.insert(builder.uuid) {
                return Err(RegistryError::DuplicateCharacteristic(builder.uuid));
            }
            characteristics.push(builder.build()?);
        }

        Ok(ServiceDescriptor {
            uuid: self.uuid,
            is_primary: self.is_primary,
            characteristics,
        })
    }
}

/// Builds a [`CharacteristicDescriptor`]
#[derive(Debug)]
pub struct CharacteristicBuilder {
    uuid: Uuid,
    properties: CharacteristicProperties,
    permissions: Option<Permissions>,
    value: Vec<u8>,
    descriptors: Vec<(Uuid, Permissions, Vec<u8>)>,
    with_cccd: bool,
}

impl CharacteristicBuilder {
    pub fn new(uuid: Uuid, properties: CharacteristicProperties) -> Self {
        Self {
            uuid,
            properties,
            permissions: None,
            value: Vec::new(),
            descriptors: Vec::new(),
            with_cccd: false,
        }
    }

    /// Overrides the permissions derived from the properties
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = Some(permissions);
        self
    }

    pub fn value(mut self, value: impl Into<Vec<u8>>) -> Self {
        self.value = value.into();
        self
    }

    pub fn descriptor(mut self, uuid: Uuid, permissions: Permissions, value: impl Into<Vec<u8>>) -> Self {
        self.descriptors.push((uuid, permissions, value.into()));
        self
    }

    /// Attaches a Client Characteristic Configuration descriptor, initially 0x0000
    pub fn cccd(mut self) -> Self {
        self.with_cccd = true;
        self
    }

    fn build(self) -> Result<CharacteristicDescriptor, RegistryError> {
        let mut descriptors = self.descriptors;
        if self.with_cccd {
            if !self.properties.can_notify() && !self.properties.can_indicate() {
                return Err(RegistryError::CccdWithoutNotify(self.uuid));
            }
            descriptors.push((
                Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID),
                Permissions::READ | Permissions::WRITE,
                vec![0, 0],
            ));
        }

        let mut seen = HashSet::new();
        for (uuid, _, _) in &descriptors {
            if !seen.insert(*uuid) {
                return Err(RegistryError::DuplicateDescriptor {
                    characteristic: self.uuid,
                    descriptor: *uuid,
                });
            }
        }

        let permissions = self.permissions.unwrap_or_else(|| {
            let mut permissions = Permissions::empty();
            if self.properties.can_read() {
                permissions |= Permissions::READ;
            }
            if self.properties.can_write() {
                permissions |= Permissions::WRITE;
            }
            permissions
        });

        Ok(CharacteristicDescriptor {
            uuid: self.uuid,
            properties: self.properties,
            permissions,
            value: RwLock::new(self.value),
            descriptors: descriptors
                .into_iter()
                .map(|(uuid, permissions, value)| DescriptorDescriptor {
                    uuid,
                    permissions,
                    value: RwLock::new(value),
                })
                .collect(),
        })
    }
}

/// Read-only access to the service definition, shared between the engine
/// and the application.
#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    service: Arc<ServiceDescriptor>,
}

impl ServiceRegistry {
    pub fn new(service: ServiceDescriptor) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// The static service layout
    pub fn describe(&self) -> &ServiceDescriptor {
        &self.service
    }

    pub fn service_uuid(&self) -> Uuid {
        self.service.uuid
    }

    pub fn characteristic(&self, uuid: &Uuid) -> Option<&CharacteristicDescriptor> {
        self.service.characteristics.iter().find(|c| c.uuid == *uuid)
    }

    pub fn descriptor(&self, characteristic: &Uuid, descriptor: &Uuid) -> Option<&DescriptorDescriptor> {
        self.characteristic(characteristic)?.descriptor(descriptor)
    }

    /// Clears every CCCD back to 0x0000; subscriptions do not outlive a connection.
    pub fn reset_cccds(&self) {
        for characteristic in &self.service.characteristics {
            if let Some(cccd) = characteristic.cccd() {
                cccd.set_value(&[0, 0]);
            }
        }
    }

    /// First characteristic that supports notifications
    pub fn primary_notify_characteristic(&self) -> Option<&CharacteristicDescriptor> {
        self.service
            .characteristics
            .iter()
            .find(|c| c.properties.can_notify())
    }
}

/// Decoded Client Characteristic Configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Subscription {
    pub notify: bool,
    pub indicate: bool,
}

impl Subscription {
    pub fn from_bits(bits: u16) -> Self {
        Self {
            notify: bits & CCCD_NOTIFY != 0,
            indicate: bits & CCCD_INDICATE != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let service = ServiceDescriptor::builder(Uuid::from_u16(0x1234))
            .characteristic(CharacteristicBuilder::new(
                Uuid::from_u16(0x5678),
                CharacteristicProperties::READ,
            ))
            .characteristic(
                CharacteristicBuilder::new(Uuid::from_u16(0x5679), CharacteristicProperties::NOTIFY)
                    .cccd(),
            )
            .build()
            .unwrap();
        let registry = ServiceRegistry::new(service);

        assert_eq!(registry.service_uuid(), Uuid::from_u16(0x1234));
        assert!(registry.describe().is_primary());
        for characteristic in registry.describe().characteristics() {
            let found = registry.characteristic(&characteristic.uuid()).unwrap();
            assert_eq!(found.uuid(), characteristic.uuid());
        }
        assert!(registry.characteristic(&Uuid::from_u16(0x9999)).is_none());
        assert_eq!(
            registry.primary_notify_characteristic().map(|c| c.uuid()),
            Some(Uuid::from_u16(0x5679))
        );
        assert!(registry
            .descriptor(&Uuid::from_u16(0x5679), &Uuid::from_u16(CLIENT_CHAR_CONFIG_UUID))
            .is_some_and(|d| d.is_cccd() && d.value() == vec![0, 0]));
    }

    #[test]
    fn test_derived_permissions() {
        let characteristic = CharacteristicBuilder::new(
            Uuid::from_u16(1),
            CharacteristicProperties::READ | CharacteristicProperties::WRITE_WITHOUT_RESPONSE,
        )
        .build()
        .unwrap();
        assert_eq!(characteristic.permissions(), Permissions::READ | Permissions::WRITE);

        let characteristic = CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::NOTIFY)
            .build()
            .unwrap();
        assert_eq!(characteristic.permissions(), Permissions::empty());
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let result = ServiceDescriptor::builder(Uuid::from_u16(0x1234))
            .characteristic(CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::READ))
            .characteristic(CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::WRITE))
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateCharacteristic(Uuid::from_u16(1))
        );

        let result = ServiceDescriptor::builder(Uuid::from_u16(0x1234))
            .characteristic(
                CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::NOTIFY)
                    .descriptor(Uuid::from_u16(0x2902), Permissions::READ, vec![0, 0])
                    .cccd(),
            )
            .build();
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateDescriptor { .. })
        ));
    }

    #[test]
    fn test_cccd_requires_notify_or_indicate() {
        let result = ServiceDescriptor::builder(Uuid::from_u16(0x1234))
            .characteristic(CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::READ).cccd())
            .build();
        assert_eq!(result.unwrap_err(), RegistryError::CccdWithoutNotify(Uuid::from_u16(1)));
    }

    #[test]
    fn test_value_access() {
        let characteristic = CharacteristicBuilder::new(Uuid::from_u16(1), CharacteristicProperties::READ)
            .value(b"SAMPLE".to_vec())
            .build()
            .unwrap();

        assert_eq!(characteristic.value_from(0), Some(b"SAMPLE".to_vec()));
        assert_eq!(characteristic.value_from(3), Some(b"PLE".to_vec()));
        assert_eq!(characteristic.value_from(6), Some(Vec::new()));
        assert_eq!(characteristic.value_from(7), None);

        assert!(characteristic.write_at(3, b"ond"));
        assert_eq!(characteristic.value(), b"SAMond".to_vec());
        assert!(!characteristic.write_at(10, b"x"));
        assert_eq!(characteristic.value(), b"SAMond".to_vec());

        characteristic.set_value(&[0x01, 0x02]);
        assert_eq!(characteristic.value(), vec![0x01, 0x02]);
    }

    #[test]
    fn test_subscription_bits() {
        assert_eq!(Subscription::from_bits(0), Subscription::default());
        assert!(Subscription::from_bits(1).notify);
        assert!(Subscription::from_bits(2).indicate);
        assert!(!Subscription::from_bits(2).notify);
    }
}
