//! Coordination Client Error Hierarchy
//!
//! Service status codes are surfaced as [`ErrorCode`] wrapped in [`Error::Api`].
//! [`ErrorKind`] groups them by how a caller is expected to react:
//! connectivity problems, ordinary status outcomes, session-fatal conditions
//! and contract violations.

use config::ConfigError;

use crate::watch::WatchId;
use crate::watch::WatchKind;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Status returned by the coordination service (or synthesized by the client)
    #[error(transparent)]
    Api(#[from] ErrorCode),

    /// The runtime failed before producing a native handle
    #[error("System error: {0}")]
    System(#[from] std::io::Error),

    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bounded RetryChange gave up under contention
    #[error("RetryChange on {path} gave up after {attempts} attempts")]
    RetryExhausted { path: String, attempts: usize },
}

/// Status codes of the coordination service.
///
/// Numeric values match the service's wire constants so runtimes backed by a
/// native library can convert with [`ErrorCode::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
pub enum ErrorCode {
    #[error("system error")]
    SystemError,
    #[error("run time inconsistency")]
    RuntimeInconsistency,
    #[error("data inconsistency")]
    DataInconsistency,
    #[error("connection loss")]
    ConnectionLoss,
    #[error("marshalling error")]
    MarshallingError,
    #[error("unimplemented")]
    Unimplemented,
    #[error("operation timeout")]
    OperationTimeout,
    #[error("bad arguments")]
    BadArguments,
    #[error("invalid zhandle state")]
    InvalidState,
    #[error("api error")]
    ApiError,
    #[error("no node")]
    NoNode,
    #[error("not authenticated")]
    NoAuth,
    #[error("bad version")]
    BadVersion,
    #[error("no children for ephemerals")]
    NoChildrenForEphemerals,
    #[error("node exists")]
    NodeExists,
    #[error("not empty")]
    NotEmpty,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid callback")]
    InvalidCallback,
    #[error("invalid acl")]
    InvalidAcl,
    #[error("authentication failed")]
    AuthFailed,
    #[error("zookeeper is closing")]
    Closing,
    #[error("(not error) no server responses to process")]
    Nothing,
    #[error("session moved to another server, so operation is ignored")]
    SessionMoved,
}

impl ErrorCode {
    /// Numeric status as defined by the service
    pub fn code(&self) -> i32 {
        match self {
            ErrorCode::SystemError => -1,
            ErrorCode::RuntimeInconsistency => -2,
            ErrorCode::DataInconsistency => -3,
            ErrorCode::ConnectionLoss => -4,
            ErrorCode::MarshallingError => -5,
            ErrorCode::Unimplemented => -6,
            ErrorCode::OperationTimeout => -7,
            ErrorCode::BadArguments => -8,
            ErrorCode::InvalidState => -9,
            ErrorCode::ApiError => -100,
            ErrorCode::NoNode => -101,
            ErrorCode::NoAuth => -102,
            ErrorCode::BadVersion => -103,
            ErrorCode::NoChildrenForEphemerals => -108,
            ErrorCode::NodeExists => -110,
            ErrorCode::NotEmpty => -111,
            ErrorCode::SessionExpired => -112,
            ErrorCode::InvalidCallback => -113,
            ErrorCode::InvalidAcl => -114,
            ErrorCode::AuthFailed => -115,
            ErrorCode::Closing => -116,
            ErrorCode::Nothing => -117,
            ErrorCode::SessionMoved => -118,
        }
    }

    /// Maps a numeric status back to a code.
    ///
    /// Returns `None` for `0` (success) and for values the service never produces.
    pub fn from_code(code: i32) -> Option<Self> {
        let code = match code {
            -1 => ErrorCode::SystemError,
            -2 => ErrorCode::RuntimeInconsistency,
            -3 => ErrorCode::DataInconsistency,
            -4 => ErrorCode::ConnectionLoss,
            -5 => ErrorCode::MarshallingError,
            -6 => ErrorCode::Unimplemented,
            -7 => ErrorCode::OperationTimeout,
            -8 => ErrorCode::BadArguments,
            -9 => ErrorCode::InvalidState,
            -100 => ErrorCode::ApiError,
            -101 => ErrorCode::NoNode,
            -102 => ErrorCode::NoAuth,
            -103 => ErrorCode::BadVersion,
            -108 => ErrorCode::NoChildrenForEphemerals,
            -110 => ErrorCode::NodeExists,
            -111 => ErrorCode::NotEmpty,
            -112 => ErrorCode::SessionExpired,
            -113 => ErrorCode::InvalidCallback,
            -114 => ErrorCode::InvalidAcl,
            -115 => ErrorCode::AuthFailed,
            -116 => ErrorCode::Closing,
            -117 => ErrorCode::Nothing,
            -118 => ErrorCode::SessionMoved,
            _ => return None,
        };
        Some(code)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::ConnectionLoss | ErrorCode::OperationTimeout => ErrorKind::Connectivity,
            ErrorCode::SessionExpired | ErrorCode::AuthFailed => ErrorKind::SessionFatal,
            ErrorCode::Closing => ErrorKind::Contract,
            _ => ErrorKind::Status,
        }
    }
}

/// How a failure should be handled by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Cluster unreachable or slow; the session stream reports the transition
    Connectivity,
    /// Ordinary outcome of a specific call (no node, bad version, ...)
    Status,
    /// Every guarantee tied to the session is void; rebuild state
    SessionFatal,
    /// Caller misuse such as closing a session twice
    Contract,
    /// Runtime could not be driven at all
    System,
    /// Invalid configuration
    Config,
}

impl Error {
    /// Service status carried by this error, if any
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Error::Api(code) => Some(*code),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Api(code) => code.kind(),
            Error::System(_) => ErrorKind::System,
            Error::Config(_) => ErrorKind::Config,
            Error::RetryExhausted { .. } => ErrorKind::Status,
        }
    }

    pub fn is_no_node(&self) -> bool {
        self.code() == Some(ErrorCode::NoNode)
    }
}

impl PartialEq<ErrorCode> for Error {
    fn eq(
        &self,
        other: &ErrorCode,
    ) -> bool {
        self.code() == Some(*other)
    }
}

/// Outcomes of a delivery attempt the dispatcher cannot silently absorb
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// Consumer did not drain its stream; delivering would block or drop
    #[error("{kind} event channel buffer is full (watch {watch_id})")]
    BufferFull { watch_id: WatchId, kind: WatchKind },

    /// Closed-state events are synthesized by streams, never delivered
    #[error("attempted to deliver a closed-state event to watch {watch_id}")]
    ClosedStateEvent { watch_id: WatchId },
}
