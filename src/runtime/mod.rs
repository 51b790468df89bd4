//! Boundary to the coordination-service runtime.
//!
//! The runtime owns the wire protocol, connection management and server
//! selection. The client core drives it through [`CoordinationRuntime`]:
//! synchronous per-operation calls that return a status, plus one blocking
//! notification primitive drained by the dispatcher worker.
//!
//! [`memory::MemoryEnsemble`] is an in-process implementation with the
//! service's observable semantics.

pub mod memory;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::errors::ErrorCode;
use crate::event::EventType;
use crate::event::SessionState;
use crate::node::Acl;
use crate::node::CreateFlags;
use crate::node::Stat;
use crate::watch::WatchId;

/// Opaque handle to one native connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Session resumption token: server-side session id plus its password
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId {
    pub session_id: i64,
    pub passwd: [u8; 16],
}

impl fmt::Display for ClientId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{:#x}", self.session_id)
    }
}

/// Notification pushed by the runtime, tagged with the context it was armed with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNotification {
    pub context: WatchId,
    pub event_type: EventType,
    pub path: String,
    pub state: SessionState,
}

#[cfg_attr(test, automock)]
pub trait CoordinationRuntime: Send + Sync + 'static {
    /// Starts connecting; transitions are reported to `context`.
    ///
    /// Fails only when no native handle can be produced at all.
    fn connect(
        &self,
        servers: &str,
        recv_timeout: Duration,
        client_id: Option<ClientId>,
        context: WatchId,
    ) -> std::io::Result<NativeHandle>;

    fn close(
        &self,
        handle: NativeHandle,
    ) -> Result<(), ErrorCode>;

    fn client_id(
        &self,
        handle: NativeHandle,
    ) -> Result<ClientId, ErrorCode>;

    fn get(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Bytes, Stat), ErrorCode>;

    fn children(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<(Vec<String>, Stat), ErrorCode>;

    /// A missing node is reported as `ErrorCode::NoNode`; an armed watch stays
    /// installed and fires on creation.
    fn exists(
        &self,
        handle: NativeHandle,
        path: &str,
        watch: Option<WatchId>,
    ) -> Result<Stat, ErrorCode>;

    /// Returns the path actually created
    fn create(
        &self,
        handle: NativeHandle,
        path: &str,
        value: &[u8],
        flags: CreateFlags,
        acl: &[Acl],
    ) -> Result<String, ErrorCode>;

    fn set(
        &self,
        handle: NativeHandle,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Stat, ErrorCode>;

    fn delete(
        &self,
        handle: NativeHandle,
        path: &str,
        version: i32,
    ) -> Result<(), ErrorCode>;

    fn add_auth(
        &self,
        handle: NativeHandle,
        scheme: &str,
        cert: &[u8],
    ) -> Result<(), ErrorCode>;

    fn get_acl(
        &self,
        handle: NativeHandle,
        path: &str,
    ) -> Result<(Vec<Acl>, Stat), ErrorCode>;

    fn set_acl(
        &self,
        handle: NativeHandle,
        path: &str,
        acl: &[Acl],
        version: i32,
    ) -> Result<(), ErrorCode>;

    /// Blocks until the next notification; `None` once the runtime is shut down.
    ///
    /// After the last connection is closed the runtime returns a notification
    /// whose context is no registered watch, so an idle caller can stop.
    fn wait_for_watch(&self) -> Option<RawNotification>;
}
