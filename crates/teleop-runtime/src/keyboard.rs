//! Keyboard head teleop loop.
//!
//! Terminal handling lives with the binary; this loop only consumes the
//! typed characters and publishes the resulting head commands.

use teleop_kernel::{HeadKey, HeadStepper};
use teleop_middleware::CommandTransport;
use teleop_types::{Channel, OutboundCommand, TeleopError};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Advertise the head channel, publish a command for every key the
/// [`HeadStepper`] accepts, and unadvertise once `keys` is closed.
pub async fn drive_head_from_keys(
    mut keys: mpsc::Receiver<char>,
    mut stepper: HeadStepper,
    transport: &dyn CommandTransport,
) -> Result<(), TeleopError> {
    transport.advertise(Channel::Head).await?;

    while let Some(c) = keys.recv().await {
        let Some(command) = stepper.press(HeadKey::from_char(c)) else {
            continue;
        };
        let pose = stepper.pose();
        debug!(pan = pose.pan, tilt = pose.tilt, "head command");
        if let Err(e) = transport.publish(OutboundCommand::Head(command)).await {
            warn!(error = %e, "head command publish failed");
        }
    }

    transport.unadvertise_all().await
}
