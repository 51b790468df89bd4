//! Session and watch-event client core for ZooKeeper-style coordination services.
//!
//! - [`Session`]: one logical session; node operations, watches and
//!   [`Session::retry_change`]
//! - [`EventStream`]: caller-owned stream of session transitions or of a single
//!   one-shot watch event
//! - [`CoordinationRuntime`]: the boundary to the wire-level runtime, with
//!   [`MemoryEnsemble`] as an in-process implementation
//!
//! Notifications are routed by one background worker per runtime through a
//! process-wide registry; see [`pending_watches`].

mod config;
mod constants;
mod errors;
mod event;
mod node;
mod runtime;
mod session;
mod utils;
mod watch;

pub use config::*;
pub use constants::*;
pub use errors::*;
pub use event::*;
pub use node::*;
pub use runtime::memory::MemoryEnsemble;
pub use runtime::ClientId;
pub use runtime::CoordinationRuntime;
pub use runtime::NativeHandle;
pub use runtime::RawNotification;
pub use session::*;
pub use watch::pending_watches;
pub use watch::EventStream;
pub use watch::WatchId;
pub use watch::WatchKind;


//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
