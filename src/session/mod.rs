//! One logical session with the coordination ensemble.
//!
//! A [`Session`] owns the native handle, a session watch that receives every
//! connectivity transition, and the one-shot watches created through it.
//!
//! ```ignore
//! let ensemble: Arc<dyn CoordinationRuntime> = Arc::new(MemoryEnsemble::new());
//! let (session, mut events) = Session::dial(ensemble, "localhost:2181", Duration::from_secs(5))?;
//! assert!(events.recv().await.is_ok());
//!
//! let (data, stat, mut watch) = session.get_and_watch("/config")?;
//! let event = watch.recv().await;
//! if !event.is_ok() {
//!     return Err(event.into());
//! }
//! ```

mod builder;
mod ops;
mod retry_change;

pub use builder::*;


use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::debug;
use tracing::warn;

use crate::config::RetryChangePolicy;
use crate::errors::ErrorCode;
use crate::runtime::ClientId;
use crate::runtime::CoordinationRuntime;
use crate::runtime::NativeHandle;
use crate::watch::EventStream;
use crate::watch::OwnerId;
use crate::watch::WatchId;
use crate::watch::WatchKind;
use crate::watch::DISPATCHER;
use crate::watch::REGISTRY;
use crate::Error;
use crate::Result;

pub struct Session {
    runtime: Arc<dyn CoordinationRuntime>,
    owner: OwnerId,
    session_watch: WatchId,
    /// Present until the first successful `close`
    handle: RwLock<Option<NativeHandle>>,
    retry_policy: RetryChangePolicy,
}

impl std::fmt::Debug for Session {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("session_watch", &self.session_watch)
            .field("handle", &*self.handle.read())
            .finish()
    }
}

impl Session {
    /// Opens a new session; the returned stream reports its connectivity.
    ///
    /// Connection establishment is asynchronous: an `Ok` only means a native
    /// handle exists. Wait for a connected event before relying on the session.
    pub fn dial(
        runtime: Arc<dyn CoordinationRuntime>,
        servers: &str,
        recv_timeout: Duration,
    ) -> Result<(Session, EventStream)> {
        Self::open(runtime, servers, recv_timeout, None, RetryChangePolicy::default())
    }

    /// Reattaches to the server-side session identified by `client_id`.
    pub fn redial(
        runtime: Arc<dyn CoordinationRuntime>,
        servers: &str,
        recv_timeout: Duration,
        client_id: ClientId,
    ) -> Result<(Session, EventStream)> {
        Self::open(
            runtime,
            servers,
            recv_timeout,
            Some(client_id),
            RetryChangePolicy::default(),
        )
    }

    pub(crate) fn open(
        runtime: Arc<dyn CoordinationRuntime>,
        servers: &str,
        recv_timeout: Duration,
        client_id: Option<ClientId>,
        retry_policy: RetryChangePolicy,
    ) -> Result<(Session, EventStream)> {
        let owner = REGISTRY.new_owner();
        let (session_watch, stream) = REGISTRY.register(owner, WatchKind::Session);

        let handle = match runtime.connect(servers, recv_timeout, client_id, session_watch) {
            Ok(handle) => handle,
            Err(e) => {
                debug!(servers, %e, "connect failed");
                REGISTRY.close_all(owner);
                return Err(Error::System(e));
            }
        };

        // notifications queue in the runtime until the worker pulls them
        if let Err(e) = DISPATCHER.acquire(&runtime) {
            if let Err(code) = runtime.close(handle) {
                debug!(%code, "close after failed dispatcher start");
            }
            REGISTRY.close_all(owner);
            return Err(Error::System(e));
        }
        debug!(
            servers,
            session_watch = %session_watch,
            handle = handle.as_raw(),
            resumed = client_id.is_some(),
            "session dialed"
        );

        let session = Session {
            runtime,
            owner,
            session_watch,
            handle: RwLock::new(Some(handle)),
            retry_policy,
        };
        Ok((session, stream))
    }

    /// Closes the session and every watch it owns.
    ///
    /// Only the first call does anything; later calls fail with
    /// [`ErrorCode::Closing`] without blocking.
    pub fn close(&self) -> Result<()> {
        let mut slot = self.handle.write();
        let Some(handle) = slot.take() else {
            return Err(ErrorCode::Closing.into());
        };

        // the runtime's last notification must find the worker idle
        DISPATCHER.release(&self.runtime);
        let status = self.runtime.close(handle);
        let closed = REGISTRY.close_all(self.owner);
        debug!(handle = handle.as_raw(), watches = closed, "session closed");

        status.map_err(Error::from)
    }

    /// Resumption token usable with [`Session::redial`]
    pub fn client_id(&self) -> Result<ClientId> {
        self.with_handle(|handle| self.runtime.client_id(handle))
    }

    /// Identifier of the watch feeding the session stream
    pub fn session_watch_id(&self) -> WatchId {
        self.session_watch
    }

    pub fn is_closed(&self) -> bool {
        self.handle.read().is_none()
    }

    /// Live watches owned by this session, the session watch included
    pub fn pending_watches(&self) -> usize {
        REGISTRY.owned_by(self.owner)
    }

    pub fn retry_policy(&self) -> RetryChangePolicy {
        self.retry_policy
    }

    /// Runs `op` with the native handle held shared, so `close` cannot
    /// interleave with an in-flight call.
    fn with_handle<T>(
        &self,
        op: impl FnOnce(NativeHandle) -> std::result::Result<T, ErrorCode>,
    ) -> Result<T> {
        let slot = self.handle.read();
        let handle = (*slot).ok_or(ErrorCode::Closing)?;
        op(handle).map_err(Error::from)
    }

    /// Like [`with_handle`](Self::with_handle), arming a one-shot watch first.
    ///
    /// The watch is forgotten when `op` fails.
    fn with_watch<T>(
        &self,
        op: impl FnOnce(NativeHandle, WatchId) -> std::result::Result<T, ErrorCode>,
    ) -> Result<(T, EventStream)> {
        let slot = self.handle.read();
        let handle = (*slot).ok_or(ErrorCode::Closing)?;
        let (id, stream) = REGISTRY.register(self.owner, WatchKind::OneShot);
        match op(handle, id) {
            Ok(value) => Ok((value, stream)),
            Err(code) => {
                REGISTRY.forget(id);
                Err(code.into())
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.handle.read().is_none() {
            return;
        }
        if let Err(e) = self.close() {
            warn!(session_watch = %self.session_watch, %e, "failed to close session on drop");
        }
    }
}
