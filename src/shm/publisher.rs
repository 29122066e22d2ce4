//! Daemon-side snapshot publisher

use super::segment::Segment;
use crate::error::Result;
use crate::state::GpsState;
use std::sync::atomic::{fence, Ordering};
use tracing::info;

/// Publishes snapshots into the broadcast segment.
///
/// Exactly one `Publisher` exists per daemon process, driven
/// synchronously from the daemon's event loop; publishes are therefore
/// strictly serialized. Creation failure is reported once at startup and
/// the daemon runs without shared-memory export for its lifetime —
/// `publish` itself never fails.
pub struct Publisher {
    segment: Segment,
    tick: u32,
}

impl Publisher {
    /// Create (or re-acquire) the broadcast segment for the given key
    pub fn create(key: i32) -> Result<Self> {
        let segment = Segment::create(key)?;
        info!("shared-memory export enabled, key {:#x}", key);
        Ok(Self { segment, tick: 0 })
    }

    /// Publish a new snapshot to all current and future readers.
    ///
    /// Optimistic concurrency, no locks. The trailing marker is stamped
    /// before the payload and the leading marker after it; a reader
    /// samples the fields in segment order (lead, payload, trail), so
    /// the first value it compares is the last one written here. Any
    /// overlap between a read and a publish therefore leaves the reader
    /// with unequal markers and the copy is discarded.
    ///
    /// The fences are real hardware ordering barriers, not just compiler
    /// fences: readers live in other processes, possibly on other cores.
    ///
    /// The tick wraps at `u32::MAX`. At realistic publish rates that is
    /// decades of uptime, and a wrapped tick still changes the marker
    /// pair, so detection is unaffected.
    pub fn publish(&mut self, state: &GpsState) {
        self.tick = self.tick.wrapping_add(1);
        self.segment.store_trail(self.tick);
        fence(Ordering::SeqCst);
        self.segment.write_payload(state);
        fence(Ordering::SeqCst);
        self.segment.store_lead(self.tick);
        fence(Ordering::SeqCst);
    }

    /// Tick of the most recent publish (0 before the first one)
    pub fn tick(&self) -> u32 {
        self.tick
    }
}
