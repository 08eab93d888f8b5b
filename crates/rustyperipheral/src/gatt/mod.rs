//! GATT (Generic Attribute Profile) server side
//!
//! The static service definition, the events the Bluetooth stack delivers
//! for it, and the per-connection session that answers them.

pub mod event;
pub mod registry;
pub mod session;
pub mod types;

#[cfg(test)]
mod tests;

pub use event::{GattEvent, GattResponse};
pub use registry::{
    CharacteristicBuilder, CharacteristicDescriptor, DescriptorDescriptor, ServiceBuilder,
    ServiceDescriptor, ServiceRegistry, Subscription,
};
pub use session::{
    AttributeTarget, GattSession, ReadRequest, SessionEvent, SessionState, Transition, WriteRequest,
};
pub use types::*;
