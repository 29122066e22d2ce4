//! System V shared-memory segment wrapper
//!
//! Owns the raw `shmget`/`shmat` lifecycle and the volatile field
//! accessors. All marker-protocol logic lives in the publisher and
//! subscriber; nothing else in the crate may touch the segment bytes.

use crate::error::{AgentError, Result};
use crate::state::GpsState;
use std::ptr;
use tracing::{debug, warn};

/// In-memory layout of the broadcast segment.
///
/// Field order is part of the cross-process ABI: the two tick markers
/// bracket the payload. At any instant either both markers agree (the
/// payload is a complete snapshot stamped with that tick) or a write is
/// in flight.
#[repr(C)]
pub(crate) struct SegmentLayout {
    lead_marker: u32,
    payload: GpsState,
    trail_marker: u32,
}

/// An attached shared-memory segment.
///
/// `owner == true` means this process created the segment and marks it
/// for removal on drop (the daemon); readers attach read-only and only
/// ever detach.
pub(crate) struct Segment {
    shmid: libc::c_int,
    base: *mut SegmentLayout,
    owner: bool,
}

// The raw pointer is only dereferenced through the volatile accessors
// below, and the marker protocol detects every torn payload copy, so
// concurrent use from multiple threads of one process is no worse than
// the intended cross-process concurrency.
unsafe impl Send for Segment {}
unsafe impl Sync for Segment {}

impl Segment {
    /// Create (or re-acquire an orphaned) segment for publishing.
    ///
    /// Uses `IPC_CREAT | 0666` so unprivileged readers can attach. An
    /// orphan left by a crashed daemon of the same build is simply
    /// reused; its markers are overwritten by the first publish.
    pub(crate) fn create(key: libc::key_t) -> Result<Self> {
        let size = std::mem::size_of::<SegmentLayout>();
        // SAFETY: plain syscall; no pointers are passed in.
        let shmid = unsafe { libc::shmget(key, size, libc::IPC_CREAT | 0o666) };
        if shmid == -1 {
            return Err(AgentError::Shm(format!(
                "shmget({:#x}, {}, 0666) failed: {}",
                key,
                size,
                std::io::Error::last_os_error()
            )));
        }
        debug!("shmget({:#x}, {}) succeeded, segment {}", key, size, shmid);
        Self::attach(shmid, 0, true)
    }

    /// Attach an existing segment read-only.
    ///
    /// A missing segment means no daemon has published yet; that maps to
    /// [`AgentError::NoDaemon`] rather than a hard error.
    pub(crate) fn attach_readonly(key: libc::key_t) -> Result<Self> {
        let size = std::mem::size_of::<SegmentLayout>();
        // SAFETY: plain syscall; no pointers are passed in.
        let shmid = unsafe { libc::shmget(key, size, 0) };
        if shmid == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::ENOENT) {
                return Err(AgentError::NoDaemon);
            }
            return Err(AgentError::Shm(format!(
                "shmget({:#x}, {}) failed: {}",
                key, size, err
            )));
        }
        Self::attach(shmid, libc::SHM_RDONLY, false)
    }

    fn attach(shmid: libc::c_int, flags: libc::c_int, owner: bool) -> Result<Self> {
        // SAFETY: shmid came from a successful shmget; the kernel picks
        // the mapping address.
        let base = unsafe { libc::shmat(shmid, ptr::null(), flags) };
        if base as isize == -1 {
            return Err(AgentError::Shm(format!(
                "shmat({}) failed: {}",
                shmid,
                std::io::Error::last_os_error()
            )));
        }
        debug!("shmat() succeeded for segment {}", shmid);
        Ok(Self {
            shmid,
            base: base.cast::<SegmentLayout>(),
            owner,
        })
    }

    pub(crate) fn load_lead(&self) -> u32 {
        // SAFETY: base points at a live mapping of SegmentLayout.
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.base).lead_marker)) }
    }

    pub(crate) fn load_trail(&self) -> u32 {
        // SAFETY: as in load_lead.
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.base).trail_marker)) }
    }

    pub(crate) fn store_lead(&mut self, tick: u32) {
        // SAFETY: writable mapping; only the owning publisher calls this.
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.base).lead_marker), tick) }
    }

    pub(crate) fn store_trail(&mut self, tick: u32) {
        // SAFETY: as in store_lead.
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.base).trail_marker), tick) }
    }

    /// Copy the payload into a private local value. The copy may be torn
    /// by a concurrent publish; the caller validates it with the markers.
    pub(crate) fn read_payload(&self) -> GpsState {
        // SAFETY: GpsState is Copy and repr(C); a torn read yields a
        // byte mixture of valid plain-data values, never UB.
        unsafe { ptr::read_volatile(ptr::addr_of!((*self.base).payload)) }
    }

    pub(crate) fn write_payload(&mut self, state: &GpsState) {
        // SAFETY: writable mapping; only the owning publisher calls this.
        unsafe { ptr::write_volatile(ptr::addr_of_mut!((*self.base).payload), *state) }
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        if self.owner {
            // Mark the segment to go away once the last reader detaches.
            // Letting it linger forever is bad: if the payload ever grows
            // the old-sized segment can no longer be reopened.
            // SAFETY: shmid is the id we created.
            if unsafe { libc::shmctl(self.shmid, libc::IPC_RMID, ptr::null_mut()) } == -1 {
                warn!(
                    "shmctl(IPC_RMID) for segment {} failed: {}",
                    self.shmid,
                    std::io::Error::last_os_error()
                );
            }
        }
        // SAFETY: base is a live attachment from shmat.
        if unsafe { libc::shmdt(self.base.cast()) } == -1 {
            warn!(
                "shmdt for segment {} failed: {}",
                self.shmid,
                std::io::Error::last_os_error()
            );
        }
    }
}
