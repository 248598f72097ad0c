//! # Shock Remote
//!
//! Knob-driven sub-GHz remote for a shock collar receiver.
//!
//! This application reads a strength from the knob UI and transmits it once
//! per confirm as a BinRAW frame on 433.95 MHz.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use shock_remote::config::{Config, LoggingConfig};
use shock_remote::subghz::Transmitter;
use shock_remote::ui::input::spawn_input_source;
use shock_remote::ui::scene::{Action, SceneManager};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// File name prefix for daily log files
const LOG_FILE_PREFIX: &str = "shock-remote.log";

/// Main entry point for Shock Remote
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (`shock-remote [CONFIG_PATH]`)
///    - Set up logging with tracing subscriber
///    - Open the radio device and the knob input source
///
/// 2. **Main Loop**
///    - Apply each knob input to the scene flow
///    - On confirm in the strength screen, transmit on a blocking thread and
///      wait for it before reading further input
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is invalid
/// - The radio device name is unknown
/// - The input device cannot be opened
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
///
/// Expected output:
/// ```text
/// INFO shock_remote: Shock Remote v0.1.0 starting...
/// INFO shock_remote::subghz: Radio: simulated at 433950000 Hz (AM270)
/// [Strength] 10
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args(std::env::args());
    let (config, loaded) = load_config(&config_path)?;

    let _log_guard = init_logging(&config.logging)?;

    info!("Shock Remote v{} starting...", env!("CARGO_PKG_VERSION"));
    if loaded {
        info!("Configuration loaded from {}", config_path);
    } else {
        warn!("{} not found, using built-in defaults", config_path);
    }

    let mut transmitter = Transmitter::from_config(&config)?;
    let mut inputs = spawn_input_source(&config.ui)?;
    let mut scenes = SceneManager::new(config.ui.initial_strength, config.ui.initial_repeat);

    info!("Controls: + / - to turn the knob, enter to confirm, q to go back");
    info!("Press Ctrl+C to exit");
    render(&scenes);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let input = tokio::select! {
            input = inputs.recv() => input,
            _ = &mut shutdown => {
                info!("Received Ctrl+C, shutting down...");
                None
            }
        };

        let Some(input) = input else {
            break;
        };

        match scenes.handle(input) {
            Action::Redraw => {}
            Action::Transmit(strength) => {
                transmitter = tokio::task::spawn_blocking(move || {
                    transmitter.transmit(strength);
                    transmitter
                })
                .await
                .context("Transmit task panicked")?;
            }
            Action::Exit => {
                info!("Exiting");
                break;
            }
        }

        render(&scenes);
    }

    Ok(())
}

/// Config path from the first CLI argument, or the default
fn config_path_from_args<I: IntoIterator<Item = String>>(args: I) -> String {
    args.into_iter()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Load the configuration file, falling back to defaults if it does not exist
///
/// Returns the configuration and whether it came from the file.
fn load_config(path: &str) -> Result<(Config, bool)> {
    if !Path::new(path).exists() {
        return Ok((Config::default(), false));
    }

    let config = Config::load(path).with_context(|| format!("Invalid configuration in {}", path))?;
    Ok((config, true))
}

/// Install the tracing subscriber
///
/// Logs go to stderr, filtered by `RUST_LOG` plus the configured level. When
/// `log_dir` is set they are also written to a daily rolling file; the
/// returned guard must live until exit so buffered lines are flushed.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let level: tracing::Level = config
        .level
        .parse()
        .with_context(|| format!("Invalid log level: {}", config.level))?;

    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    if config.log_dir.is_empty() {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    }

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("Failed to create log directory {}", config.log_dir))?;

    let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();

    Ok(Some(guard))
}

/// Draw the active screen on stdout
fn render(scenes: &SceneManager) {
    let mut stdout = std::io::stdout().lock();
    // A closed stdout only loses the prompt
    let _ = writeln!(stdout, "{}", scenes.render());
    let _ = stdout.flush();
}
