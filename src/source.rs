//! Endpoint-spec parsing
//!
//! Every client locates a daemon instance (and optionally a single
//! device) through a `SERVER[:PORT[:DEVICE]]` string. All consumers must
//! parse it identically to interoperate, so the grammar lives here and
//! nowhere else.

use crate::config::{DEFAULT_PORT, DEFAULT_SERVER};

/// Parsed connection string: where the daemon is and, optionally, which
/// device to watch.
///
/// Purely a parse result: immutable once produced, re-derived per
/// connection attempt, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    /// Server host, IPv6 brackets already stripped
    pub server: String,
    /// Port or service name
    pub port: String,
    /// Device path filter, if any
    pub device: Option<String>,
}

impl Default for EndpointSpec {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            port: DEFAULT_PORT.to_string(),
            device: None,
        }
    }
}

impl EndpointSpec {
    /// Parse a `SERVER[:PORT[:DEVICE]]` string.
    ///
    /// - `SERVER` may be a `[`-bracketed IPv6 literal; the field
    ///   separator is searched only after the closing bracket.
    /// - Any present-but-empty field keeps its default (`localhost`,
    ///   the compiled-in port, no device), as does an omitted trailing
    ///   field: `"host::"` and `"host"` mean the same thing.
    /// - A string with no colon at all is a bare device path if it
    ///   contains a `/`, otherwise a bare hostname.
    ///
    /// Total and pure: no input fails, identical input yields identical
    /// output.
    pub fn parse(arg: &str) -> Self {
        let mut spec = Self::default();

        // Skip over an IPv6 literal before looking for the field
        // separator, so "[fe80::1]:2947" splits after the bracket.
        let search_from = match (arg.starts_with('['), arg.find(']')) {
            (true, Some(rbrk)) => rbrk,
            _ => 0,
        };

        match arg[search_from..].find(':') {
            Some(offset) => {
                let colon1 = search_from + offset;
                let head = &arg[..colon1];
                if !head.is_empty() {
                    spec.server = head.to_string();
                }

                let rest = &arg[colon1 + 1..];
                let colon2 = rest.find(':');
                let port = match colon2 {
                    Some(idx) => &rest[..idx],
                    None => rest,
                };
                if !port.is_empty() {
                    spec.port = port.to_string();
                }

                if let Some(idx) = colon2 {
                    let device = &rest[idx + 1..];
                    if !device.is_empty() {
                        spec.device = Some(device.to_string());
                    }
                }
            }
            None if arg.contains('/') => {
                // Bare device path, not a hostname.
                spec.device = Some(arg.to_string());
            }
            None => {
                spec.server = arg.to_string();
            }
        }

        // Strip IPv6 brackets even when no colon followed them.
        if spec.server.starts_with('[') {
            spec.server.remove(0);
            if let Some(rbrk) = spec.server.find(']') {
                spec.server.truncate(rbrk);
            }
        }

        spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parsed(arg: &str) -> (String, String, Option<String>) {
        let spec = EndpointSpec::parse(arg);
        (spec.server, spec.port, spec.device)
    }

    #[test]
    fn test_bare_hostname() {
        assert_eq!(
            parsed("localhost"),
            ("localhost".into(), DEFAULT_PORT.into(), None)
        );
    }

    #[test]
    fn test_full_spec() {
        assert_eq!(
            parsed("localhost:2947:/dev/ttyUSB0"),
            (
                "localhost".into(),
                "2947".into(),
                Some("/dev/ttyUSB0".into())
            )
        );
    }

    #[test]
    fn test_ipv6_with_port() {
        assert_eq!(
            parsed("[fe80::1]:2947"),
            ("fe80::1".into(), "2947".into(), None)
        );
    }

    #[test]
    fn test_bare_device_path() {
        assert_eq!(
            parsed("/dev/ttyUSB0"),
            (
                DEFAULT_SERVER.into(),
                DEFAULT_PORT.into(),
                Some("/dev/ttyUSB0".into())
            )
        );
    }

    #[test]
    fn test_trailing_colons_keep_defaults() {
        assert_eq!(parsed("host::"), ("host".into(), DEFAULT_PORT.into(), None));
        assert_eq!(parsed("host:"), ("host".into(), DEFAULT_PORT.into(), None));
    }

    #[test]
    fn test_empty_server_segment() {
        assert_eq!(
            parsed(":1234"),
            (DEFAULT_SERVER.into(), "1234".into(), None)
        );
        assert_eq!(
            parsed("::/dev/gps0"),
            (
                DEFAULT_SERVER.into(),
                DEFAULT_PORT.into(),
                Some("/dev/gps0".into())
            )
        );
    }

    #[test]
    fn test_bracket_only_server_still_stripped() {
        assert_eq!(
            parsed("[fe80::1]"),
            ("fe80::1".into(), DEFAULT_PORT.into(), None)
        );
    }

    #[test]
    fn test_ipv6_with_port_and_device() {
        assert_eq!(
            parsed("[2001:db8::2]:2947:/dev/ttyACM0"),
            (
                "2001:db8::2".into(),
                "2947".into(),
                Some("/dev/ttyACM0".into())
            )
        );
    }

    proptest! {
        /// Parsing is total and pure: it never panics, and repeated
        /// calls agree (idempotent parse over the same input).
        #[test]
        fn test_parse_pure(arg in "\\PC{0,40}") {
            let first = EndpointSpec::parse(&arg);
            let second = EndpointSpec::parse(&arg);
            prop_assert_eq!(first, second);
        }
    }
}
