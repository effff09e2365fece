//! # ipcast
//! Watches the members of a cluster and propagates their healthy external
//! endpoints to the systems which need to know about them.
//!
//! This is a convenience package which includes the sub-crates of ipcast:
//!
//! ### Features
//! - `ipcast-watch` - Member sources, endpoint resolution and the change notifier.
//! - `ipcast-broadcast` - The publisher fan-out along with the DNS and chat publishers.
//!
//! With both features enabled [propagate] ties a notifier session to a
//! publisher.

#[cfg(feature = "ipcast-broadcast")]
pub use ipcast_broadcast as broadcast;
#[cfg(feature = "ipcast-watch")]
pub use ipcast_watch as watch;

#[cfg(all(feature = "ipcast-watch", feature = "ipcast-broadcast"))]
mod propagate;

#[cfg(all(feature = "ipcast-watch", feature = "ipcast-broadcast"))]
pub use propagate::{propagate, PropagationReport};
