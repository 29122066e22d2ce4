//! Daemon-side control server
//!
//! Listens on the control socket and applies hotplug commands to the
//! daemon's device set. One connection per command is the normal
//! pattern (the control tool connects, writes one line, reads the ack
//! and closes), but multiple commands per connection work too.

use super::command::{ControlAction, ControlCommand};
use crate::error::{AgentError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, error, info, warn};

/// Applies hotplug commands to the daemon's device set.
///
/// The return value selects the ack (`OK` / `ERROR`); either way the
/// command was handled, and the control tool treats both as delivery.
pub trait HotplugHandler: Send + Sync {
    /// Add a device to the active set; false if it was already active
    fn add_device(&self, path: &Path) -> bool;
    /// Remove a device from the active set; false if it was not active
    fn remove_device(&self, path: &Path) -> bool;
}

/// Control server owning the listening socket
pub struct ControlServer {
    socket_path: PathBuf,
    handler: Arc<dyn HotplugHandler>,
}

impl ControlServer {
    /// Create a new control server
    pub fn new(socket_path: PathBuf, handler: Arc<dyn HotplugHandler>) -> Self {
        Self {
            socket_path,
            handler,
        }
    }

    /// Bind the control socket and serve until cancelled.
    ///
    /// A stale socket file from a crashed instance is removed before
    /// binding; the parent directory is created if needed.
    pub async fn start(&self) -> Result<()> {
        if self.socket_path.exists() {
            info!("removing stale control socket {:?}", self.socket_path);
            std::fs::remove_file(&self.socket_path)?;
        }
        if let Some(parent) = self.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.socket_path)
            .map_err(|e| AgentError::Control(format!("cannot bind control socket: {}", e)))?;
        info!("control socket listening at {:?}", self.socket_path);

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, handler).await {
                            error!("control connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    error!("control accept failed: {}", e);
                }
            }
        }
    }

    /// Remove the socket file so later instances start clean
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!("cannot remove control socket {:?}: {}", self.socket_path, e);
            }
        }
    }
}

/// Handle a single control connection
async fn handle_connection(stream: UnixStream, handler: Arc<dyn HotplugHandler>) -> Result<()> {
    debug!("new control connection");

    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("control client disconnected");
                return Ok(());
            }
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\r', '\n']);
                if trimmed.is_empty() {
                    continue;
                }

                let accepted = match ControlCommand::from_wire(trimmed) {
                    Some(command) => {
                        debug!("control command: {:?}", command);
                        let path = Path::new(&command.path);
                        match command.action {
                            ControlAction::Add => handler.add_device(path),
                            ControlAction::Remove => handler.remove_device(path),
                        }
                    }
                    None => {
                        warn!("malformed control line: {:?}", trimmed);
                        false
                    }
                };

                let ack: &[u8] = if accepted { b"OK\n" } else { b"ERROR\n" };
                writer.write_all(ack).await?;
                writer.flush().await?;
            }
            Err(e) => {
                error!("control socket read failed: {}", e);
                return Ok(());
            }
        }
    }
}
