//! `teleop` – joystick teleoperation node.
//!
//! 1. Loads `~/.teleop/config.toml` (or `--config`), falling back to defaults.
//! 2. Starts the rosbridge WebSocket server: joystick frames come in on
//!    `joy`, base/torso/head commands go out to every connected client.
//! 3. Runs the fixed-rate teleop loop until **Ctrl-C**, then unadvertises
//!    every channel and exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use colored::Colorize;
use teleop_cli::config;
use teleop_middleware::{BusTransport, EventBus, RosbridgeServer, Topic};
use teleop_runtime::{TeleopNode, init_tracing};
use teleop_types::TeleopError;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "teleop", about = "Joystick teleop for base, torso and head")]
struct Args {
    /// Parameter file (defaults to ~/.teleop/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Publish nothing at all while the deadman is released.
    #[arg(long)]
    deadman_no_publish: bool,
}

fn main() {
    let args = Args::parse();
    let _guard = init_tracing("teleop");

    if let Err(e) = run(args) {
        error!(error = %e, "teleop failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), TeleopError> {
    let path = args.config.unwrap_or_else(config::config_path);
    let params = config::load_from(&path)?;
    let node_config = params.resolve_node(args.deadman_no_publish);
    let bridge_addr = params.bridge_addr()?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Ctrl-C received, stopping teleop".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| TeleopError::Config(format!("could not set Ctrl-C handler: {e}")))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| TeleopError::Config(format!("tokio runtime: {e}")))?;

    runtime.block_on(async move {
        let bus = Arc::new(EventBus::default());
        let listener = RosbridgeServer::bind(bridge_addr).await?;
        tokio::spawn(RosbridgeServer::new(Arc::clone(&bus)).serve(listener));

        let transport = Arc::new(BusTransport::new(Arc::clone(&bus), "teleop"));
        let node = TeleopNode::new(node_config, transport);
        let joy = bus.subscribe_to(Topic::Joy);
        node.run(joy, shutdown).await
    })?;

    info!("teleop exited cleanly");
    Ok(())
}
