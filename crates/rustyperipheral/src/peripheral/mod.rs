//! Peripheral engine and its seams to the host Bluetooth stack
//!
//! The stack adapter implements [`EventSink`] for outbound requests and feeds
//! every callback it receives into [`PeripheralEngine::handle_event`] or
//! [`PeripheralEngine::handle_advertise_outcome`].

pub mod config;
pub mod engine;
pub mod event;
mod notifications;
pub mod sink;


pub use config::{NotificationPolicy, PeripheralConfig, DEFAULT_PLACEHOLDER};
pub use engine::{AdvertisingState, PeripheralEngine};
pub use event::{EventCallback, PeripheralEvent};
pub use sink::{EventSink, Notification};
