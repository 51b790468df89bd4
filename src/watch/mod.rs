//! Watch bookkeeping: identifiers, destination streams and routing.
//!
//! ```text
//! runtime notification thread:
//!   wait_for_watch() -> Dispatcher worker -> WatchRegistry::deliver(id, event)
//!                                                  ↓ try_send (never blocks)
//! caller:
//!   EventStream::recv()
//! ```
//!
//! Every watch is owned by exactly one session. A session watch lives until
//! its session is closed; a one-shot watch is retired the moment its single
//! event is delivered.

mod dispatcher;
mod registry;
mod stream;

pub(crate) use dispatcher::*;
pub(crate) use registry::*;
pub use stream::*;


use std::fmt;

/// Opaque process-wide watch identifier.
///
/// Monotonic and never reused within the process. It is the only value the
/// runtime sees as notification context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl WatchId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Receives every connectivity transition of its session
    Session,
    /// Receives exactly one node event, or a session-fatal event
    OneShot,
}

impl fmt::Display for WatchKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            WatchKind::Session => f.write_str("session"),
            WatchKind::OneShot => f.write_str("watch"),
        }
    }
}

/// Live watches across every session of the process.
///
/// Counts entries that were registered and have been neither delivered (for
/// one-shot watches), forgotten nor closed with their session.
pub fn pending_watches() -> usize {
    REGISTRY.count_pending()
}
