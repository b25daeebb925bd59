//! Outbound command transport.
//!
//! The arbiter never speaks to a wire protocol directly.  It hands each
//! [`OutboundCommand`] to a [`CommandTransport`], which owns channel
//! lifecycle (advertise / unadvertise) and delivery.  Delivery failures are
//! returned to the caller; transports do not retry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use teleop_types::{Channel, Event, EventPayload, OutboundCommand, TeleopError};
use tracing::{debug, info};

use crate::bus::{EventBus, Topic};

/// Every outbound transport must implement this trait.
///
/// # Contract
///
/// * `advertise` – declare a channel before the first `publish` on it.
/// * `publish` – deliver one command.  Publishing on a channel that is not
///   advertised fails with [`TeleopError::ChannelNotAdvertised`].
/// * `unadvertise_all` – release every channel; called once at shutdown.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    async fn advertise(&self, channel: Channel) -> Result<(), TeleopError>;

    async fn publish(&self, command: OutboundCommand) -> Result<(), TeleopError>;

    async fn unadvertise_all(&self) -> Result<(), TeleopError>;
}

/// Transport that publishes commands as events on [`Topic::Commands`].
///
/// Lifecycle changes are announced on [`Topic::SystemAlerts`].
pub struct BusTransport {
    bus: Arc<EventBus>,
    source: String,
    advertised: Mutex<HashSet<Channel>>,
}

impl BusTransport {
    /// `source` tags every event this transport emits, e.g. `"teleop"`.
    pub fn new(bus: Arc<EventBus>, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
            advertised: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_advertised(&self, channel: Channel) -> bool {
        self.lock_advertised().contains(&channel)
    }

    fn lock_advertised(&self) -> std::sync::MutexGuard<'_, HashSet<Channel>> {
        self.advertised.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn alert(&self, message: String) {
        let event = Event::new(
            self.source.clone(),
            EventPayload::SystemAlert {
                component: self.source.clone(),
                message,
            },
        );
        self.bus.publish_to(Topic::SystemAlerts, event);
    }
}

#[async_trait]
impl CommandTransport for BusTransport {
    async fn advertise(&self, channel: Channel) -> Result<(), TeleopError> {
        if self.lock_advertised().insert(channel) {
            info!(?channel, "advertised");
            self.alert(format!("advertised {channel:?}"));
        }
        Ok(())
    }

    async fn publish(&self, command: OutboundCommand) -> Result<(), TeleopError> {
        let channel = command.channel();
        if !self.is_advertised(channel) {
            return Err(TeleopError::ChannelNotAdvertised(channel));
        }
        let delivered = self.bus.publish_to(
            Topic::Commands,
            Event::new(self.source.clone(), EventPayload::Command(command)),
        );
        debug!(?channel, delivered, "command published");
        Ok(())
    }

    async fn unadvertise_all(&self) -> Result<(), TeleopError> {
        let released: Vec<Channel> = self.lock_advertised().drain().collect();
        for channel in released {
            info!(?channel, "unadvertised");
            self.alert(format!("unadvertised {channel:?}"));
        }
        Ok(())
    }
}
