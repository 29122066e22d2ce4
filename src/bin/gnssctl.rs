//! gnssctl: hotplug control tool
//!
//! Asks a running daemon instance to add or remove a device, launching
//! the daemon first if none is reachable. Meant to be invoked by udev
//! rules or an operator; all diagnostics go to the log stream (stderr),
//! never standard output, and the exit status is the whole API:
//! 0 on success, 1 on any failure.

use anyhow::bail;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use gnss_agent::config::MAX_DEVICE_PATH;
use gnss_agent::control::ControlClient;
use gnss_agent::export::Registry;
use gnss_agent::VERSION;

/// Control a running gnssd instance
#[derive(Parser, Debug)]
#[command(name = "gnssctl", version = VERSION, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// List the export channels compiled into this build and exit
    #[arg(long)]
    list_exports: bool,

    /// Action to perform: "add" or "remove"
    action: Option<String>,

    /// Device path the action applies to
    argument: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize structured logging with tracing, on stderr
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if cli.list_exports {
        // The one informational surface on stdout. First entry is the
        // build's default channel.
        for method in Registry::builtin().list() {
            println!("{}: {}", method.name, method.description);
        }
        return Ok(());
    }

    // Argument policing happens before any socket I/O.
    let (action, argument) = match (&cli.action, &cli.argument) {
        (Some(action), Some(argument)) => (action.as_str(), argument.as_str()),
        _ => bail!("requires an action and a device argument"),
    };
    if !(3..=7).contains(&action.len()) {
        bail!("invalid action {:?}", action);
    }
    if argument.is_empty() || argument.len() >= MAX_DEVICE_PATH {
        bail!("invalid device path (length {})", argument.len());
    }

    let client = ControlClient::from_env();
    info!("gnssctl {} {}", action, argument);
    client.send_command(action, argument)?;

    Ok(())
}
