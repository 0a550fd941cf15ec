//! # EnOcean Gateway
//!
//! Receive EnOcean radio telegrams from a USB300/TCM310 module (or a
//! serial-over-TCP bridge) and route them to paired devices.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (path from the first argument, default
//!      `config/default.toml`, built-in defaults if that file is missing)
//!    - Set up logging with tracing subscriber (console, optional daily file)
//!    - Restore learned-in devices from the device store
//!
//! 2. **Main Loop**
//!    - Read chunks from the module and dispatch completed packets
//!    - Disable learn mode after the configured timeout
//!    - Reconnect after the configured interval when the connection drops
//!    - Handle Ctrl+C for graceful shutdown
//!
//! Run the application:
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use enocean_gateway::config::{Config, LoggingConfig};
use enocean_gateway::device::behaviour::LoggingSinkFactory;
use enocean_gateway::device::store::{DeviceStore, FileDeviceStore, MemoryDeviceStore};
use enocean_gateway::dispatcher::Dispatcher;
use enocean_gateway::serial::{open_connection, EnoceanComm, READ_BUFFER_SIZE};
use enocean_gateway::timer::{ClickTimer, TimerHandle, TokioClickTimer};

/// Configuration file used when none is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside `logging.log_dir`
const LOG_FILE_PREFIX: &str = "enocean-gateway.log";

/// Console logging plus an optional daily-rolling file
///
/// The returned guard must be kept alive to flush the file writer.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log filter")?;
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}

fn load_config(path: &str) -> Result<Config> {
    if Path::new(path).exists() {
        Config::load(path).with_context(|| format!("failed to load {}", path))
    } else {
        Ok(Config::default())
    }
}

fn open_store(config: &Config) -> Result<Box<dyn DeviceStore>> {
    Ok(match &config.store.path {
        Some(path) => Box::new(
            FileDeviceStore::open(path).with_context(|| format!("failed to open device store {}", path))?,
        ),
        None => Box::new(MemoryDeviceStore::new()),
    })
}

/// Enable learn mode and schedule its timeout
fn start_learning(
    comm: &mut EnoceanComm,
    timeout: Duration,
    timeout_tx: &mpsc::UnboundedSender<()>,
) -> TimerHandle {
    comm.dispatcher_mut().set_learn_mode(true);
    info!("Press a button on the device to learn in or out ({}s)", timeout.as_secs());
    let tx = timeout_tx.clone();
    TokioClickTimer.schedule(
        timeout,
        Box::new(move || {
            let _ = tx.send(());
        }),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = load_config(&config_path)?;
    let _log_guard = init_logging(&config.logging)?;

    info!("EnOcean gateway v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut dispatcher = Dispatcher::new(
        Box::new(LoggingSinkFactory),
        open_store(&config)?,
        config.learn.min_learn_dbm,
    );
    dispatcher.restore_from_store()?;
    let mut comm = EnoceanComm::new(dispatcher, config.logging.stats_interval_packets);

    let learn_timeout = Duration::from_secs(config.learn.timeout_s);
    let reconnect_interval = Duration::from_millis(config.serial.reconnect_interval_ms);
    let (timeout_tx, mut timeout_rx) = mpsc::unbounded_channel();
    let mut learn_timer = config
        .learn
        .enable_on_startup
        .then(|| start_learning(&mut comm, learn_timeout, &timeout_tx));

    info!("Press Ctrl+C to exit");

    'connection: loop {
        let mut source = match open_connection(&config.serial).await {
            Ok(source) => source,
            Err(e) => {
                warn!("Cannot open {}: {}", config.serial.port, e);
                tokio::select! {
                    _ = tokio::time::sleep(reconnect_interval) => continue 'connection,
                    _ = tokio::signal::ctrl_c() => break 'connection,
                }
            }
        };
        info!("Receiving from {}", source.describe());

        let mut buf = [0u8; READ_BUFFER_SIZE];
        loop {
            tokio::select! {
                result = comm.read_once(source.as_mut(), &mut buf) => {
                    if let Err(e) = result {
                        warn!("Connection lost: {}", e);
                        break;
                    }
                    if let Some(event) = comm.take_learn_event() {
                        info!("Learn action: {:?}", event);
                        if let Some(mut timer) = learn_timer.take() {
                            timer.cancel();
                        }
                    }
                }

                Some(()) = timeout_rx.recv() => {
                    if comm.dispatcher().is_learning() {
                        info!("Learn timeout, no device learned in or out");
                        comm.dispatcher_mut().set_learn_mode(false);
                    }
                    learn_timer = None;
                }

                // Handle Ctrl+C for graceful shutdown
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, shutting down...");
                    break 'connection;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(reconnect_interval) => {}
            _ = tokio::signal::ctrl_c() => break 'connection,
        }
    }

    info!("Channel statistics: {}", comm.stats());
    info!("{} logical devices registered", comm.dispatcher().device_count());
    Ok(())
}
