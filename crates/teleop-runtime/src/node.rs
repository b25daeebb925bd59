//! [`TeleopNode`] – the fixed-rate teleop control loop.
//!
//! The node owns one [`InputSampler`] and one [`CommandArbiter`] and runs two
//! activities on a single task:
//!
//! 1. **Sample** – every [`EventPayload::Joy`] event on the joy subscription
//!    is stamped and stored, then folded into the integrated head pose.
//! 2. **Tick** – on a fixed interval (20 Hz by default) the arbiter is
//!    evaluated against the latest frame and every resulting command is
//!    handed to the [`CommandTransport`].
//!
//! Commands are re-sent every tick even when unchanged.  A failed publish is
//! logged and dropped; the next tick sends a fresh command anyway.
//!
//! On shutdown the node drops its joy subscription and unadvertises every
//! outbound channel before returning.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use teleop_kernel::{ArbiterConfig, CommandArbiter, InputSampler, TickOutput};
use teleop_middleware::{CommandTransport, TopicReceiver};
use teleop_types::{EventPayload, JoySample, TeleopError};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default tick rate of the control loop.
pub const DEFAULT_PUBLISH_RATE_HZ: f64 = 20.0;

/// Runtime configuration for a [`TeleopNode`].
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub arbiter: ArbiterConfig,
    pub publish_rate_hz: f64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            arbiter: ArbiterConfig::default(),
            publish_rate_hz: DEFAULT_PUBLISH_RATE_HZ,
        }
    }
}

impl NodeConfig {
    /// Tick period; falls back to the default rate for non-positive values
    /// and for rates whose period does not fit in a [`Duration`].
    pub fn period(&self) -> Duration {
        let default = Duration::from_secs_f64(1.0 / DEFAULT_PUBLISH_RATE_HZ);
        let hz = self.publish_rate_hz;
        if !(hz.is_finite() && hz > 0.0) {
            return default;
        }
        Duration::try_from_secs_f64(1.0 / hz).unwrap_or_else(|e| {
            warn!(publish_rate_hz = hz, error = %e, "publish rate out of range; using default");
            default
        })
    }
}

/// Joystick teleop node.
pub struct TeleopNode {
    sampler: InputSampler,
    arbiter: CommandArbiter,
    transport: Arc<dyn CommandTransport>,
    period: Duration,
}

impl TeleopNode {
    pub fn new(config: NodeConfig, transport: Arc<dyn CommandTransport>) -> Self {
        let period = config.period();
        Self {
            sampler: InputSampler::new(),
            arbiter: CommandArbiter::new(config.arbiter),
            transport,
            period,
        }
    }

    pub fn arbiter(&self) -> &CommandArbiter {
        &self.arbiter
    }

    /// Store a device sample and fold it into the head pose.
    pub fn handle_sample(&self, sample: JoySample) {
        let frame = self.sampler.record_at(sample, Instant::now());
        self.arbiter.on_sample(&frame);
    }

    /// Advertise every channel the arbiter configuration publishes on.
    pub async fn advertise(&self) -> Result<(), TeleopError> {
        for channel in self.arbiter.config().channels() {
            self.transport.advertise(channel).await?;
        }
        Ok(())
    }

    /// Run one tick at `now` and publish its commands.
    pub async fn tick_at(&self, now: Instant) -> TickOutput {
        let frame = self.sampler.latest();
        let output = self.arbiter.tick(frame.as_ref(), now);
        for command in &output.commands {
            if let Err(e) = self.transport.publish(command.clone()).await {
                warn!(channel = ?command.channel(), error = %e, "command publish failed");
            }
        }
        output
    }

    /// Drive the node until `shutdown` is set or the joy channel closes.
    pub async fn run(
        &self,
        mut joy: TopicReceiver,
        shutdown: Arc<AtomicBool>,
    ) -> Result<(), TeleopError> {
        self.advertise().await?;
        info!(period_ms = self.period.as_millis() as u64, "teleop loop started");

        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                result = joy.recv() => {
                    match result {
                        Ok(event) => {
                            if let EventPayload::Joy(sample) = event.payload {
                                self.handle_sample(sample);
                            }
                        }
                        Err(RecvError::Lagged(n)) => {
                            debug!(skipped = n, "joy subscriber lagged; keeping latest");
                        }
                        Err(RecvError::Closed) => {
                            info!("joy channel closed");
                            break;
                        }
                    }
                }
                _ = interval.tick() => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    self.tick_at(Instant::now()).await;
                }
            }
        }

        drop(joy);
        self.transport.unadvertise_all().await?;
        info!("teleop loop stopped");
        Ok(())
    }
}
