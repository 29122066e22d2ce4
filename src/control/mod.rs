//! Out-of-band administrative control channel
//!
//! A stream-socket text protocol by which an external tool asks a
//! running daemon to add or remove a device, auto-launching the daemon
//! if none is reachable. The client side lives in [`ControlClient`];
//! the daemon side in [`ControlServer`].

mod client;
mod command;
mod server;

pub use client::{ControlClient, Launcher, ShellLauncher};
pub use command::{ControlAction, ControlCommand};
pub use server::{ControlServer, HotplugHandler};
