//! Client-side snapshot reader

use super::segment::Segment;
use crate::error::{AgentError, Result};
use crate::state::Snapshot;
use std::sync::atomic::{fence, Ordering};
use std::time::{Duration, Instant};

/// Recommended retry budget for [`Subscriber::read_snapshot`].
///
/// A single concurrent publish can invalidate at most one attempt under
/// normal publish latency, so anything >= 2 suffices; 4 leaves headroom
/// for scheduling hiccups on the daemon side.
pub const DEFAULT_READ_ATTEMPTS: usize = 4;

/// Reads torn-read-free snapshots from the broadcast segment.
///
/// Subscribers are fully independent: they never write the segment,
/// never block the publisher, and never observe each other. Each read
/// attempt copies into its own local buffer, so a `Subscriber` may be
/// shared across threads of a client.
pub struct Subscriber {
    segment: Segment,
}

impl Subscriber {
    /// Attach to the broadcast segment for the given key.
    ///
    /// Returns [`AgentError::NoDaemon`] if the segment does not exist,
    /// meaning no daemon has published yet — "no data yet", not a hard
    /// error. A segment left behind by a dead daemon attaches normally;
    /// its tick just stops advancing, which is the caller's staleness
    /// signal.
    pub fn attach(key: i32) -> Result<Self> {
        Ok(Self {
            segment: Segment::attach_readonly(key)?,
        })
    }

    /// Obtain one consistent snapshot, retrying up to `max_attempts`
    /// times under publisher contention.
    ///
    /// Each attempt samples the leading marker, copies the payload into
    /// a local buffer, then samples the trailing marker, with hardware
    /// barriers between the steps. The copy is accepted only when the
    /// markers agree; a mismatch is a normal contention signal, not an
    /// error. When every attempt is exhausted the caller gets
    /// [`AgentError::Inconsistent`] and decides when to poll again —
    /// possibly-torn data is never returned.
    ///
    /// A freshly created segment that has never been published reads as
    /// tick 0 with an all-default payload.
    pub fn read_snapshot(&self, max_attempts: usize) -> Result<Snapshot> {
        for _ in 0..max_attempts {
            let lead = self.segment.load_lead();
            fence(Ordering::SeqCst);
            let state = self.segment.read_payload();
            fence(Ordering::SeqCst);
            let trail = self.segment.load_trail();
            fence(Ordering::SeqCst);

            if lead == trail {
                return Ok(Snapshot { state, tick: lead });
            }
        }
        Err(AgentError::Inconsistent {
            attempts: max_attempts,
        })
    }

    /// Poll until the published tick advances past `last_tick`, or the
    /// timeout expires.
    ///
    /// Convenience for liveness checks, layered strictly on
    /// [`read_snapshot`](Self::read_snapshot): a daemon that stops
    /// publishing shows up here as [`AgentError::Timeout`].
    pub fn wait_fresh(
        &self,
        last_tick: u32,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Snapshot> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.read_snapshot(DEFAULT_READ_ATTEMPTS) {
                Ok(snapshot) if snapshot.tick != last_tick => return Ok(snapshot),
                Ok(_) | Err(AgentError::Inconsistent { .. }) => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                return Err(AgentError::Timeout(format!(
                    "no publish after tick {} within {:?}",
                    last_tick, timeout
                )));
            }
            std::thread::sleep(poll_interval);
        }
    }
}
