//! Notification values delivered on session and watch streams.
//!
//! There are two sources of events: the session stream returned by
//! [`Session::dial`](crate::Session::dial), and the one-shot streams returned by
//! the `*_and_watch` operations.
//!
//! The session stream receives every connectivity transition
//! ([`SessionState::Connecting`], [`SessionState::Connected`],
//! [`SessionState::ExpiredSession`], ...). Long running applications must keep
//! draining it: its buffer is bounded and a stalled consumer is fatal.
//!
//! One-shot streams receive the single node event they were installed for.
//! Transient session states are never forwarded to them, but session-fatal
//! states (expiry, auth failure) are, so an event received on a watch stream
//! must be checked with [`Event::is_ok`] before treating the watch as fired:
//!
//! ```ignore
//! let event = watch.recv().await;
//! if !event.is_ok() {
//!     return Err(event.into());
//! }
//! ```
//!
//! A closed stream yields [`Event::closed`] (type `Closed`, state `Closed`).

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Created,
    Deleted,
    Changed,
    /// Children of the watched node changed
    Child,
    /// Connectivity transition, path is empty
    Session,
    NotWatching,
    /// Synthetic terminal value of a closed stream
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Connecting,
    Associating,
    Connected,
    AuthFailed,
    ExpiredSession,
    /// Synthetic terminal value of a closed stream
    Closed,
}

impl EventType {
    pub fn code(&self) -> i32 {
        match self {
            EventType::Created => 1,
            EventType::Deleted => 2,
            EventType::Changed => 3,
            EventType::Child => 4,
            EventType::Session => -1,
            EventType::NotWatching => -2,
            EventType::Closed => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(EventType::Created),
            2 => Some(EventType::Deleted),
            3 => Some(EventType::Changed),
            4 => Some(EventType::Child),
            -1 => Some(EventType::Session),
            -2 => Some(EventType::NotWatching),
            0 => Some(EventType::Closed),
            _ => None,
        }
    }
}

impl SessionState {
    pub fn code(&self) -> i32 {
        match self {
            SessionState::ExpiredSession => -112,
            SessionState::AuthFailed => -113,
            SessionState::Connecting => 1,
            SessionState::Associating => 2,
            SessionState::Connected => 3,
            SessionState::Closed => 0,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -112 => Some(SessionState::ExpiredSession),
            -113 => Some(SessionState::AuthFailed),
            1 => Some(SessionState::Connecting),
            2 => Some(SessionState::Associating),
            3 => Some(SessionState::Connected),
            0 => Some(SessionState::Closed),
            _ => None,
        }
    }

    /// States after which nothing tied to the session can be trusted
    pub fn is_fatal(&self) -> bool {
        matches!(self, SessionState::ExpiredSession | SessionState::AuthFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub event_type: EventType,
    pub path: String,
    pub state: SessionState,
}

impl Event {
    pub fn new(
        event_type: EventType,
        path: impl Into<String>,
        state: SessionState,
    ) -> Self {
        Self {
            event_type,
            path: path.into(),
            state,
        }
    }

    /// Connectivity transition as seen on the session stream
    pub fn session(state: SessionState) -> Self {
        Self::new(EventType::Session, String::new(), state)
    }

    /// Terminal value observed once a stream is closed
    pub fn closed() -> Self {
        Self::new(EventType::Closed, String::new(), SessionState::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.event_type == EventType::Closed && self.state == SessionState::Closed
    }

    /// True when the event reports the service as usable
    pub fn is_ok(&self) -> bool {
        self.state == SessionState::Connected
    }
}

/// Formats as the state's message, followed by `"; <type>: <path>"` for node
/// events and `NotWatching`.
///
/// `Session` and `Closed` events print the state alone, even when they carry
/// a path.
impl fmt::Display for Event {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.state {
            SessionState::ExpiredSession => f.write_str("ZooKeeper session expired")?,
            SessionState::AuthFailed => f.write_str("ZooKeeper authentication failed")?,
            SessionState::Connecting => f.write_str("ZooKeeper connecting")?,
            SessionState::Associating => f.write_str("ZooKeeper still associating")?,
            SessionState::Connected => f.write_str("ZooKeeper connected")?,
            SessionState::Closed => f.write_str("ZooKeeper connection closed")?,
        }
        let what = match self.event_type {
            EventType::Session | EventType::Closed => return Ok(()),
            EventType::Created => "path created",
            EventType::Deleted => "path deleted",
            EventType::Changed => "path changed",
            EventType::Child => "path children changed",
            EventType::NotWatching => "not watching",
        };
        write!(f, "; {what}: {}", self.path)
    }
}

impl std::error::Error for Event {}
