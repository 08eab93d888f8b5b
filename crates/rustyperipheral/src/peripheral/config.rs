//! Peripheral configuration

use crate::gap::AdvertiseSettings;
use crate::gatt::ATT_DEFAULT_MTU;

/// Placeholder answered for reads the registry cannot serve
pub const DEFAULT_PLACEHOLDER: &[u8] = b"NONE";

/// What `notify` does while a notification for the same characteristic is
/// still waiting for its ack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotificationPolicy {
    /// Queue in FIFO order and send once the ack arrives
    #[default]
    Queue,
    /// Drop the new value and log it
    DropWhileInFlight,
}

/// Peripheral engine configuration
#[derive(Debug, Clone)]
pub struct PeripheralConfig {
    /// Payload for reads of unknown characteristics and for descriptor reads
    pub placeholder_value: Vec<u8>,
    pub notification_policy: NotificationPolicy,
    /// Queue bound under [`NotificationPolicy::Queue`]; further requests are dropped
    pub max_pending_notifications: usize,
    /// Only notify once the central has enabled notifications in the CCCD
    pub require_subscription: bool,
    /// ATT MTU assumed until the central negotiates a larger one
    pub default_mtu: u16,
    pub advertise: AdvertiseSettings,
    /// Local name, advertised when `advertise.include_device_name` is set
    pub device_name: Option<String>,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            placeholder_value: DEFAULT_PLACEHOLDER.to_vec(),
            notification_policy: NotificationPolicy::default(),
            max_pending_notifications: 16,
            require_subscription: false,
            default_mtu: ATT_DEFAULT_MTU,
            advertise: AdvertiseSettings::default(),
            device_name: None,
        }
    }
}
