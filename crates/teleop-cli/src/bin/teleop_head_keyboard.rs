//! `teleop-head-keyboard` – point the head with WASD from a terminal.
//!
//! Puts the terminal into raw mode, reads one key at a time and publishes a
//! head command (command-array shape) after every accepted key.  `q`, `Esc`
//! or `Ctrl-C` quit.  The terminal is restored on every exit path.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use teleop_cli::config;
use teleop_kernel::HeadStepper;
use teleop_middleware::{BusTransport, EventBus, RosbridgeServer};
use teleop_runtime::{drive_head_from_keys, init_tracing};
use teleop_types::TeleopError;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "teleop-head-keyboard", about = "Keyboard head pointing")]
struct Args {
    /// Parameter file (defaults to ~/.teleop/config.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Raw-mode terminal; cooked mode is restored on drop.
struct RawTerminal;

impl RawTerminal {
    fn enable() -> Result<Self, TeleopError> {
        terminal::enable_raw_mode()
            .map_err(|e| TeleopError::Device(format!("cannot enter raw mode: {e}")))?;
        Ok(Self)
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn main() {
    let args = Args::parse();
    let _guard = init_tracing("teleop-head-keyboard");

    if let Err(e) = run(args) {
        error!(error = %e, "keyboard teleop failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), TeleopError> {
    let path = args.config.unwrap_or_else(config::config_path);
    let params = config::load_from(&path)?;
    let (pan_step, tilt_step) = params.keyboard_steps();
    let stepper = HeadStepper::new(params.head_limits(), pan_step, tilt_step);
    let bridge_addr = params.keyboard_bridge_addr()?;

    print_keymap();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| TeleopError::Config(format!("tokio runtime: {e}")))?;

    runtime.block_on(async move {
        let bus = Arc::new(EventBus::default());
        let listener = RosbridgeServer::bind(bridge_addr).await?;
        tokio::spawn(RosbridgeServer::new(Arc::clone(&bus)).serve(listener));

        let (tx, rx) = mpsc::channel(32);
        let reader = tokio::task::spawn_blocking(move || read_keys(tx));

        let transport = BusTransport::new(Arc::clone(&bus), "teleop-head-keyboard");
        drive_head_from_keys(rx, stepper, &transport).await?;

        reader
            .await
            .map_err(|e| TeleopError::Device(format!("key reader panicked: {e}")))?
    })?;

    info!("keyboard teleop exited");
    Ok(())
}

/// Forward typed characters to `tx` until a quit key or a read error.
///
/// The raw-mode guard is dropped before returning, so the terminal is back in
/// cooked mode whatever the outcome.
fn read_keys(tx: mpsc::Sender<char>) -> Result<(), TeleopError> {
    let _raw = RawTerminal::enable()?;
    loop {
        let ev = event::read().map_err(|e| TeleopError::Device(format!("read(): {e}")))?;
        let Event::Key(key) = ev else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            KeyCode::Char(c) => {
                if tx.blocking_send(c).is_err() {
                    return Ok(());
                }
            }
            _ => {}
        }
    }
}

fn print_keymap() {
    println!("{}", "Reading from keyboard".bold());
    println!("{}", "---------------------------".dimmed());
    println!("  {}  tilt up", "w".cyan().bold());
    println!("  {}  tilt down", "s".cyan().bold());
    println!("  {}  pan left", "a".cyan().bold());
    println!("  {}  pan right", "d".cyan().bold());
    println!("  {}  quit", "q".cyan().bold());
}
