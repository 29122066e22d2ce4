//! Configuration management
//!
//! Compiled-in defaults for the control socket, the broadcast segment key
//! and the TCP port, their environment-variable overrides, and the TOML
//! daemon configuration file.

use crate::error::{AgentError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default TCP port of the daemon's socket export, as a service string
pub const DEFAULT_PORT: &str = "2947";

/// Default server for endpoint specs that omit one
pub const DEFAULT_SERVER: &str = "localhost";

/// Default control socket path when running as root
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/gnssd.sock";

/// Control socket path used by unprivileged (test) instances
pub const DEFAULT_TEST_SOCKET_PATH: &str = "/tmp/gnssd.sock";

/// Default System V IPC key of the broadcast segment ("GNSS" in ASCII)
pub const DEFAULT_BROADCAST_KEY: i32 = 0x474e_5353;

/// Environment variable overriding the control socket path
pub const SOCKET_ENV: &str = "GNSSD_SOCKET";

/// Environment variable holding extra options for daemon auto-launch
pub const OPTIONS_ENV: &str = "GNSSD_OPTIONS";

/// Environment variable overriding the broadcast segment key
pub const BROADCAST_KEY_ENV: &str = "GNSSD_SHM_KEY";

/// Maximum accepted length of a device path argument
pub const MAX_DEVICE_PATH: usize = 4096;

/// Resolve the control socket path.
///
/// `GNSSD_SOCKET` wins if set; otherwise unprivileged processes use the
/// test socket in `/tmp` and root uses the system path, so that an
/// operator's test instance and a hotplug-managed system instance never
/// fight over one socket.
pub fn control_socket_path() -> PathBuf {
    if let Ok(path) = std::env::var(SOCKET_ENV) {
        return PathBuf::from(path);
    }
    // SAFETY: geteuid has no failure modes and touches no memory.
    let euid = unsafe { libc::geteuid() };
    if euid == 0 {
        PathBuf::from(DEFAULT_SOCKET_PATH)
    } else {
        PathBuf::from(DEFAULT_TEST_SOCKET_PATH)
    }
}

/// Extra options passed to the daemon when the control tool launches it
/// (`GNSSD_OPTIONS`, empty when unset)
pub fn launch_options() -> String {
    std::env::var(OPTIONS_ENV).unwrap_or_default()
}

/// Resolve the broadcast segment key, honoring `GNSSD_SHM_KEY`
pub fn broadcast_key() -> Result<i32> {
    match std::env::var(BROADCAST_KEY_ENV) {
        Ok(literal) => parse_key(&literal),
        Err(_) => Ok(DEFAULT_BROADCAST_KEY),
    }
}

/// Parse an IPC key literal with standard numeric-literal rules:
/// `0x`/`0X` prefix is hexadecimal, a leading `0` is octal, anything
/// else is decimal. An optional leading `-` is accepted.
pub fn parse_key(literal: &str) -> Result<i32> {
    let s = literal.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };

    let parsed = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else if digits.len() > 1 && digits.starts_with('0') {
        i64::from_str_radix(&digits[1..], 8)
    } else {
        digits.parse::<i64>()
    };

    let value = parsed
        .map_err(|e| AgentError::Config(format!("bad IPC key literal {:?}: {}", literal, e)))?;
    let value = if negative { -value } else { value };

    i32::try_from(value)
        .map_err(|_| AgentError::Config(format!("IPC key {:?} out of range", literal)))
}

/// Daemon configuration file (TOML)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DaemonConfig {
    /// Control socket path; CLI and environment take precedence
    pub control_socket: Option<PathBuf>,

    /// Broadcast segment key literal (same grammar as `GNSSD_SHM_KEY`)
    pub broadcast_key: Option<String>,

    /// Devices to activate at startup
    #[serde(default)]
    pub devices: Vec<PathBuf>,
}

impl DaemonConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading daemon config from {:?}", path);
        let contents = std::fs::read_to_string(path)
            .map_err(|e| AgentError::Config(format!("cannot read {:?}: {}", path, e)))?;
        let config: DaemonConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Broadcast key from the config file, if one is set
    pub fn parsed_broadcast_key(&self) -> Result<Option<i32>> {
        self.broadcast_key
            .as_deref()
            .map(parse_key)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_parse_key_bases() {
        assert_eq!(parse_key("0x474e5353").unwrap(), DEFAULT_BROADCAST_KEY);
        assert_eq!(parse_key("0X10").unwrap(), 16);
        assert_eq!(parse_key("0755").unwrap(), 0o755);
        assert_eq!(parse_key("2947").unwrap(), 2947);
        assert_eq!(parse_key("0").unwrap(), 0);
        assert_eq!(parse_key("-16").unwrap(), -16);
    }

    #[test]
    fn test_parse_key_rejects_garbage() {
        assert!(parse_key("").is_err());
        assert!(parse_key("0xzz").is_err());
        assert!(parse_key("forty-two").is_err());
        assert!(parse_key("0x7fffffffff").is_err());
    }

    #[test]
    #[serial]
    fn test_broadcast_key_env_override() {
        std::env::set_var(BROADCAST_KEY_ENV, "0x1234");
        assert_eq!(broadcast_key().unwrap(), 0x1234);
        std::env::remove_var(BROADCAST_KEY_ENV);
        assert_eq!(broadcast_key().unwrap(), DEFAULT_BROADCAST_KEY);
    }

    #[test]
    #[serial]
    fn test_socket_env_override() {
        std::env::set_var(SOCKET_ENV, "/tmp/other.sock");
        assert_eq!(control_socket_path(), PathBuf::from("/tmp/other.sock"));
        std::env::remove_var(SOCKET_ENV);
        let path = control_socket_path();
        assert!(path == PathBuf::from(DEFAULT_SOCKET_PATH)
            || path == PathBuf::from(DEFAULT_TEST_SOCKET_PATH));
    }

    #[test]
    fn test_daemon_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
control_socket = "/tmp/gnssd-test.sock"
broadcast_key = "0x474e5353"
devices = ["/dev/ttyUSB0", "/dev/ttyACM0"]
"#
        )
        .unwrap();

        let config = DaemonConfig::from_file(file.path()).unwrap();
        assert_eq!(
            config.control_socket.as_deref(),
            Some(Path::new("/tmp/gnssd-test.sock"))
        );
        assert_eq!(
            config.parsed_broadcast_key().unwrap(),
            Some(DEFAULT_BROADCAST_KEY)
        );
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn test_daemon_config_missing_file() {
        assert!(DaemonConfig::from_file(Path::new("/nonexistent/gnssd.toml")).is_err());
    }
}
