//! gnssd main entry point
//!
//! A minimal daemon shell around the distribution plane: it binds the
//! control socket, maintains the active device set, and republishes the
//! aggregated snapshot into the broadcast segment on every change.
//! Receiver wire-protocol parsing and the per-device driver state
//! machine are out of scope here; the aggregation hook only reflects
//! the device set.

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gnss_agent::config::{self, DaemonConfig};
use gnss_agent::control::{ControlServer, HotplugHandler};
use gnss_agent::shm::{Publisher, Subscriber, DEFAULT_READ_ATTEMPTS};
use gnss_agent::{FixMode, GpsState, APP_NAME, VERSION};

/// GNSS aggregation daemon shell
#[derive(Parser, Debug)]
#[command(name = "gnssd", version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Control socket path (overrides config file and environment)
    #[arg(short = 'F', long, global = true)]
    control_socket: Option<PathBuf>,

    /// Broadcast segment key literal (overrides config file and environment)
    #[arg(long, global = true)]
    shm_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the daemon in the foreground
    Run,

    /// Dump the currently published snapshot as JSON
    Status,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// The daemon's active device set.
///
/// Control-channel mutations land here; every accepted change reports
/// the new device count to the snapshot task, which re-aggregates and
/// republishes.
struct ActiveDevices {
    devices: Mutex<BTreeSet<PathBuf>>,
    changed: mpsc::UnboundedSender<usize>,
}

impl ActiveDevices {
    fn new(changed: mpsc::UnboundedSender<usize>) -> Self {
        Self {
            devices: Mutex::new(BTreeSet::new()),
            changed,
        }
    }

    fn count(&self) -> usize {
        self.devices.lock().expect("device set poisoned").len()
    }
}

impl HotplugHandler for ActiveDevices {
    fn add_device(&self, path: &Path) -> bool {
        let mut devices = self.devices.lock().expect("device set poisoned");
        if !devices.insert(path.to_path_buf()) {
            warn!("device {:?} is already active", path);
            return false;
        }
        info!("device {:?} added to the active set", path);
        let _ = self.changed.send(devices.len());
        true
    }

    fn remove_device(&self, path: &Path) -> bool {
        let mut devices = self.devices.lock().expect("device set poisoned");
        if !devices.remove(path) {
            warn!("device {:?} is not active", path);
            return false;
        }
        info!("device {:?} removed from the active set", path);
        let _ = self.changed.send(devices.len());
        true
    }
}

/// Aggregation hook of the daemon shell.
///
/// A full daemon would merge per-receiver fixes here; the shell only
/// reflects the device set and the wall clock, which is enough to drive
/// the distribution plane.
fn aggregate(devices_active: usize) -> GpsState {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();

    GpsState {
        time_seconds: now.as_secs() as i64,
        time_nanos: now.subsec_nanos() as i32,
        mode: if devices_active > 0 {
            FixMode::NoFix
        } else {
            FixMode::NotSeen
        },
        devices_active: devices_active as i32,
        ..GpsState::default()
    }
}

/// Run the CLI command
async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Version => {
            println!("{} {}", APP_NAME, VERSION);
            Ok(())
        }
        Commands::Status => status(cli),
        Commands::Run => run_daemon(cli).await,
    }
}

/// Read one snapshot from the broadcast segment and print it.
///
/// A thin local debugging surface; the daemon's own export channels are
/// the real client interface.
fn status(cli: Cli) -> anyhow::Result<()> {
    let key = match &cli.shm_key {
        Some(literal) => config::parse_key(literal)?,
        None => config::broadcast_key()?,
    };

    let subscriber = Subscriber::attach(key)?;
    let snapshot = subscriber.read_snapshot(DEFAULT_READ_ATTEMPTS)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "tick": snapshot.tick,
            "state": snapshot.state,
        }))?
    );
    Ok(())
}

async fn run_daemon(cli: Cli) -> anyhow::Result<()> {
    info!("Starting {} v{}", APP_NAME, VERSION);

    let file_config = match &cli.config {
        Some(path) => DaemonConfig::from_file(path)?,
        None => DaemonConfig::default(),
    };

    let socket_path = cli
        .control_socket
        .or_else(|| file_config.control_socket.clone())
        .unwrap_or_else(config::control_socket_path);

    let key = match &cli.shm_key {
        Some(literal) => config::parse_key(literal)?,
        None => match file_config.parsed_broadcast_key()? {
            Some(key) => key,
            None => config::broadcast_key()?,
        },
    };

    // Segment-attach failure is reported once, here; the daemon then
    // runs without shared-memory export for its lifetime.
    let mut publisher = match Publisher::create(key) {
        Ok(publisher) => Some(publisher),
        Err(e) => {
            error!("shared-memory export disabled: {}", e);
            None
        }
    };

    let (changed_tx, mut changed_rx) = mpsc::unbounded_channel();
    let devices = Arc::new(ActiveDevices::new(changed_tx));

    for device in &file_config.devices {
        devices.add_device(device);
    }

    // Snapshot task: one publish at startup reflecting any devices the
    // config file pre-loaded, then one per device-set change. Publishes
    // are serialized by this single task.
    let initial_count = devices.count();
    let publish_task = tokio::spawn(async move {
        if let Some(publisher) = publisher.as_mut() {
            publisher.publish(&aggregate(initial_count));
        }
        while let Some(count) = changed_rx.recv().await {
            if let Some(publisher) = publisher.as_mut() {
                publisher.publish(&aggregate(count));
            }
        }
        // Publisher drops here, marking the segment for removal.
    });

    let server = Arc::new(ControlServer::new(socket_path, devices.clone()));
    let server_task = {
        let server = server.clone();
        tokio::spawn(async move { server.start().await })
    };

    shutdown_signal().await;
    info!("shutting down");

    server_task.abort();
    let _ = server_task.await;
    server.shutdown();
    drop(server);

    // Closing the change channel lets the snapshot task finish and
    // release the segment.
    drop(devices);
    let _ = publish_task.await;

    Ok(())
}

/// Resolve when the process is asked to terminate (SIGINT or SIGTERM).
///
/// Termination is a cooperative flag at a defined poll point: nothing
/// runs inside the signal handler itself.
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("cannot install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
