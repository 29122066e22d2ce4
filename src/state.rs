//! Aggregated daemon state
//!
//! `GpsState` is the fixed-size, plain-data snapshot the daemon publishes
//! through the broadcast segment. Its size must be identical in daemon
//! and client builds; the layout is `repr(C)` so both sides agree on it.

use serde::Serialize;

/// Fix mode reported by the aggregation layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[repr(i32)]
pub enum FixMode {
    /// No receiver has reported anything yet
    #[default]
    NotSeen = 0,
    /// Receivers present, no position fix
    NoFix = 1,
    /// Two-dimensional fix
    Fix2d = 2,
    /// Three-dimensional fix
    Fix3d = 3,
}

/// The daemon's aggregated snapshot.
///
/// Opaque, fixed-size plain data as far as the distribution plane is
/// concerned: the broadcast segment copies it wholesale and never looks
/// inside. Mutated only by the daemon; read-only to every client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[repr(C)]
pub struct GpsState {
    /// Fix timestamp, integer seconds since the Unix epoch
    pub time_seconds: i64,
    /// Fix timestamp, nanosecond fraction
    pub time_nanos: i32,
    /// Fix mode
    pub mode: FixMode,
    /// Fix status (0 = no fix, 1 = plain fix, 2 = differential)
    pub status: i32,
    /// Satellites used in the solution
    pub satellites_used: i32,
    /// Satellites visible
    pub satellites_visible: i32,
    /// Devices currently in the daemon's active set
    pub devices_active: i32,
    /// Latitude in degrees (north positive)
    pub latitude: f64,
    /// Longitude in degrees (east positive)
    pub longitude: f64,
    /// Altitude above the WGS84 ellipsoid, meters
    pub altitude_hae: f64,
    /// Speed over ground, meters per second
    pub speed: f64,
    /// Course over ground, degrees from true north
    pub track: f64,
    /// Vertical speed, meters per second
    pub climb: f64,
    /// Estimated horizontal position error, meters
    pub eph: f64,
    /// Estimated vertical position error, meters
    pub epv: f64,
    /// Horizontal dilution of precision
    pub hdop: f64,
    /// Vertical dilution of precision
    pub vdop: f64,
    /// Position (3D) dilution of precision
    pub pdop: f64,
    /// Time dilution of precision
    pub tdop: f64,
    /// Geometric dilution of precision
    pub gdop: f64,
}

impl GpsState {
    /// True if the snapshot carries a usable position fix
    pub fn has_fix(&self) -> bool {
        matches!(self.mode, FixMode::Fix2d | FixMode::Fix3d)
    }
}

/// One self-consistent copy of the daemon state, tagged with the tick
/// of the publish that produced it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    /// The payload copy
    pub state: GpsState,
    /// Tick stamped on the publish; staleness is detected by comparing
    /// successive ticks against a liveness timeout
    pub tick: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_fix() {
        let state = GpsState::default();
        assert_eq!(state.mode, FixMode::NotSeen);
        assert!(!state.has_fix());
    }

    #[test]
    fn test_fix_modes() {
        let mut state = GpsState {
            mode: FixMode::Fix2d,
            ..GpsState::default()
        };
        assert!(state.has_fix());
        state.mode = FixMode::Fix3d;
        assert!(state.has_fix());
        state.mode = FixMode::NoFix;
        assert!(!state.has_fix());
    }
}
