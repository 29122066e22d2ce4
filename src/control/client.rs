//! Control-channel client
//!
//! Delivers one administrative command to a running daemon, launching
//! the daemon first if none is reachable. The flow is an explicit state
//! machine: Probe, then (for `add` only) Launch with exactly one
//! re-Probe, then Connected, then Done. The socket I/O here is the only
//! blocking work in the distribution plane; callers wrap their own
//! timeout around [`ControlClient::send_command`].

use super::command::{ControlAction, ControlCommand};
use crate::config;
use crate::error::{AgentError, Result};
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Upper bound on the acknowledgement read.
///
/// The protocol guarantees the daemon never needs to send more than a
/// short ack, so there is no length-prefixing; we read up to this many
/// bytes and discard them. A longer ack is still treated as success.
const ACK_BUDGET: usize = 12;

/// How long to wait for the ack before giving up on it (the command has
/// already been written by then, so this never fails the send)
const ACK_TIMEOUT: Duration = Duration::from_secs(2);

/// Starts a daemon on behalf of the control client.
///
/// Split out as a seam so tests can observe launch attempts without
/// spawning processes; production code uses [`ShellLauncher`].
pub trait Launcher {
    /// Launch a daemon configured to create exactly `socket_path`,
    /// passing `options` through. Returns once the daemon is believed
    /// to be coming up; the socket is re-probed by the caller
    /// afterwards, so returning `Ok` is a hint, not a guarantee.
    fn launch(&mut self, socket_path: &Path, options: &str) -> Result<()>;
}

/// How long a launch waits for the daemon's control socket to appear.
/// The daemon binds it early, so this is normally milliseconds.
const LAUNCH_WAIT: Duration = Duration::from_secs(5);

/// Poll interval while waiting for the launched daemon's socket
const LAUNCH_POLL: Duration = Duration::from_millis(50);

/// Launches `gnssd` through the shell, so that operator-supplied
/// `GNSSD_OPTIONS` split the way they would on a command line.
///
/// The daemon runs in the foreground and does not exit, so the child is
/// spawned detached rather than waited on; launch completion is "the
/// control socket showed up", bounded by [`LAUNCH_WAIT`].
#[derive(Debug, Default)]
pub struct ShellLauncher;

impl Launcher for ShellLauncher {
    fn launch(&mut self, socket_path: &Path, options: &str) -> Result<()> {
        use std::process::Stdio;

        let command_line = format!(
            "gnssd {} -F {} run",
            options,
            socket_path.to_string_lossy()
        );
        info!("launching {}", command_line);
        let mut child = std::process::Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AgentError::Launch(format!("cannot spawn {:?}: {}", command_line, e)))?;

        // Poll for the socket rather than the child: the child only
        // exits early on a startup failure.
        let deadline = Instant::now() + LAUNCH_WAIT;
        loop {
            if socket_path.exists() {
                return Ok(());
            }
            if let Ok(Some(status)) = child.try_wait() {
                if !status.success() {
                    return Err(AgentError::Launch(format!(
                        "{:?} exited with {}",
                        command_line, status
                    )));
                }
            }
            if Instant::now() >= deadline {
                // Leave the verdict to the caller's single re-probe.
                warn!("no control socket at {:?} after launch", socket_path);
                return Ok(());
            }
            std::thread::sleep(LAUNCH_POLL);
        }
    }
}

/// Client side of the control channel
pub struct ControlClient {
    socket_path: PathBuf,
    launch_options: String,
}

impl ControlClient {
    /// Client for an explicit socket path and launch options
    pub fn new(socket_path: PathBuf, launch_options: String) -> Self {
        Self {
            socket_path,
            launch_options,
        }
    }

    /// Client configured from the environment (`GNSSD_SOCKET`,
    /// `GNSSD_OPTIONS`, with the compiled-in fallbacks)
    pub fn from_env() -> Self {
        Self::new(config::control_socket_path(), config::launch_options())
    }

    /// Send one command to the daemon, launching it if necessary.
    ///
    /// An unknown action string is rejected here, before any socket I/O.
    /// For `add`, group read/write permissions on the device are
    /// loosened best-effort first, so the daemon can still open it after
    /// dropping elevated privileges; a chmod failure is logged, not
    /// fatal. Success means the command line was delivered — the daemon
    /// stays silent about whether the device turned out to be a GPS,
    /// because it probes and ignores non-GPS devices itself.
    pub fn send_command(&self, action: &str, argument: &str) -> Result<()> {
        self.send_command_with(action, argument, &mut ShellLauncher)
    }

    /// As [`send_command`](Self::send_command), with an explicit
    /// launcher (the seam used by the launch-fallback tests)
    pub fn send_command_with(
        &self,
        action: &str,
        argument: &str,
        launcher: &mut dyn Launcher,
    ) -> Result<()> {
        // Protocol violations never reach the wire.
        let action = ControlAction::parse(action)?;
        let command = ControlCommand::new(action, argument)?;

        // Probe; on failure, Launch is reachable only for `add`.
        let mut stream = match self.probe() {
            Some(stream) => {
                debug!("reached a running daemon at {:?}", self.socket_path);
                stream
            }
            None if action == ControlAction::Add => {
                launcher.launch(&self.socket_path, &self.launch_options)?;
                // Exactly one re-probe after the launch.
                self.probe().ok_or_else(|| {
                    AgentError::DaemonUnreachable(self.socket_path.display().to_string())
                })?
            }
            None => {
                return Err(AgentError::DaemonUnreachable(
                    self.socket_path.display().to_string(),
                ))
            }
        };

        if action == ControlAction::Add {
            loosen_device_permissions(Path::new(argument));
        }

        stream
            .write_all(command.to_wire().as_bytes())
            .map_err(|e| AgentError::Control(format!("write failed: {}", e)))?;

        // Read and discard the short ack. The command is already
        // delivered; a missing or oversized ack does not fail the send.
        let _ = stream.set_read_timeout(Some(ACK_TIMEOUT));
        let mut ack = [0u8; ACK_BUDGET];
        match stream.read(&mut ack) {
            Ok(n) => debug!("daemon acked with {} bytes", n),
            Err(e) => debug!("no ack from daemon: {}", e),
        }

        Ok(())
    }

    /// Probe state: the socket path must exist on the filesystem and a
    /// connect attempt must succeed.
    fn probe(&self) -> Option<UnixStream> {
        if !self.socket_path.exists() {
            return None;
        }
        match UnixStream::connect(&self.socket_path) {
            Ok(stream) => Some(stream),
            Err(e) => {
                debug!("connect to {:?} failed: {}", self.socket_path, e);
                None
            }
        }
    }
}

/// Force the user and group read/write bits on, so the daemon can use
/// the device after dropping elevated privileges. Best-effort.
fn loosen_device_permissions(device: &Path) {
    use std::os::unix::fs::PermissionsExt;

    match std::fs::metadata(device) {
        Ok(metadata) => {
            let mode = metadata.permissions().mode() | 0o660;
            if let Err(e) = std::fs::set_permissions(device, std::fs::Permissions::from_mode(mode))
            {
                warn!("chmod of {:?} failed: {}", device, e);
            }
        }
        Err(e) => warn!("cannot stat {:?}: {}", device, e),
    }
}
