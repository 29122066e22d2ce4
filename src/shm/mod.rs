//! Lock-free shared-memory broadcast channel
//!
//! The daemon owns one System V shared-memory segment holding a single
//! versioned snapshot of its aggregated state. Exactly one process (the
//! daemon) writes it; any number of unsynchronized reader processes copy
//! it out. Consistency rests on an optimistic marker-pair protocol, not
//! on locks: the publisher never waits for readers and a reader's retry
//! loop is bounded and purely local.
//!
//! - [`Publisher`]: daemon side, stamps and writes snapshots
//! - [`Subscriber`]: client side, torn-read-free snapshot copies

mod publisher;
mod segment;
mod subscriber;

pub use publisher::Publisher;
pub use subscriber::{Subscriber, DEFAULT_READ_ATTEMPTS};
