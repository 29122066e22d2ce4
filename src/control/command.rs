//! Control command framing
//!
//! The wire format is one newline-and-CR-terminated ASCII line:
//! `+<device-path>\r\n` adds a device, `-<device-path>\r\n` removes one.
//! The daemon-side parser and the client-side formatter both live here;
//! they are the only two places that know this format, and hotplugging
//! breaks mysteriously if they drift apart.

use crate::config::MAX_DEVICE_PATH;
use crate::error::{AgentError, Result};

/// Administrative action on the daemon's device set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    /// Add a device to the active set
    Add,
    /// Remove a device from the active set
    Remove,
}

impl ControlAction {
    /// Parse an operator-supplied action string.
    ///
    /// Anything but `add` or `remove` is rejected here, locally, before
    /// any socket I/O is attempted.
    pub fn parse(action: &str) -> Result<Self> {
        match action {
            "add" => Ok(Self::Add),
            "remove" => Ok(Self::Remove),
            _ => Err(AgentError::UnknownAction(action.to_string())),
        }
    }

    fn prefix(self) -> char {
        match self {
            Self::Add => '+',
            Self::Remove => '-',
        }
    }
}

/// One administrative command: an action and the device path it applies
/// to. The path is the de-duplication key of the daemon's device
/// registry, so it must be passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlCommand {
    /// What to do
    pub action: ControlAction,
    /// Filesystem device path the action applies to
    pub path: String,
}

impl ControlCommand {
    /// Build a command, bounding the path to the platform maximum
    pub fn new(action: ControlAction, path: &str) -> Result<Self> {
        if path.is_empty() || path.len() >= MAX_DEVICE_PATH {
            return Err(AgentError::Validation(format!(
                "invalid device path (length {})",
                path.len()
            )));
        }
        Ok(Self {
            action,
            path: path.to_string(),
        })
    }

    /// Encode as the wire line, terminator included
    pub fn to_wire(&self) -> String {
        format!("{}{}\r\n", self.action.prefix(), self.path)
    }

    /// Decode one received line (terminator already stripped).
    ///
    /// `None` means the line is not a well-formed command; the daemon
    /// answers those with an error reply rather than dropping the
    /// connection.
    pub fn from_wire(line: &str) -> Option<Self> {
        let (action, path) = if let Some(rest) = line.strip_prefix('+') {
            (ControlAction::Add, rest)
        } else if let Some(rest) = line.strip_prefix('-') {
            (ControlAction::Remove, rest)
        } else {
            return None;
        };
        if path.is_empty() || path.len() >= MAX_DEVICE_PATH {
            return None;
        }
        Some(Self {
            action,
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(ControlAction::parse("add").unwrap(), ControlAction::Add);
        assert_eq!(
            ControlAction::parse("remove").unwrap(),
            ControlAction::Remove
        );
        assert!(matches!(
            ControlAction::parse("reload"),
            Err(AgentError::UnknownAction(_))
        ));
        assert!(ControlAction::parse("ADD").is_err());
        assert!(ControlAction::parse("").is_err());
    }

    #[test]
    fn test_wire_framing() {
        let add = ControlCommand::new(ControlAction::Add, "/dev/ttyUSB0").unwrap();
        assert_eq!(add.to_wire(), "+/dev/ttyUSB0\r\n");

        let remove = ControlCommand::new(ControlAction::Remove, "/dev/ttyUSB0").unwrap();
        assert_eq!(remove.to_wire(), "-/dev/ttyUSB0\r\n");
    }

    #[test]
    fn test_wire_parse_round() {
        let cmd = ControlCommand::from_wire("+/dev/gps0").unwrap();
        assert_eq!(cmd.action, ControlAction::Add);
        assert_eq!(cmd.path, "/dev/gps0");

        let cmd = ControlCommand::from_wire("-/dev/gps0").unwrap();
        assert_eq!(cmd.action, ControlAction::Remove);

        assert!(ControlCommand::from_wire("").is_none());
        assert!(ControlCommand::from_wire("+").is_none());
        assert!(ControlCommand::from_wire("?/dev/gps0").is_none());
    }

    #[test]
    fn test_wire_parse_multibyte_prefix() {
        // A multi-byte first character is just another malformed line,
        // not a reason to die.
        assert!(ControlCommand::from_wire("é/dev/gps0").is_none());
        assert!(ControlCommand::from_wire("—/dev/gps0").is_none());
        assert!(ControlCommand::from_wire("é").is_none());
        // Multi-byte characters after a valid prefix are a legal path.
        let cmd = ControlCommand::from_wire("+/dev/gps-été").unwrap();
        assert_eq!(cmd.path, "/dev/gps-été");
    }

    #[test]
    fn test_path_length_bound() {
        let long = "x".repeat(MAX_DEVICE_PATH);
        assert!(ControlCommand::new(ControlAction::Add, &long).is_err());
        assert!(ControlCommand::new(ControlAction::Add, "").is_err());
    }
}
