use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Weak;
use std::thread;
use std::thread::JoinHandle;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::debug;
use tracing::error;
use tracing::trace;
use tracing::warn;

use super::Delivery;
use super::WatchRegistry;
use super::REGISTRY;
use crate::errors::DispatchError;
use crate::event::Event;
use crate::runtime::CoordinationRuntime;
use crate::runtime::RawNotification;

lazy_static! {
    pub(crate) static ref DISPATCHER: Dispatcher = Dispatcher::new();
}

/// Routes one raw notification through `registry`.
pub(crate) fn route(
    registry: &WatchRegistry,
    notification: RawNotification,
) -> Result<Delivery, DispatchError> {
    let RawNotification {
        context,
        event_type,
        path,
        state,
    } = notification;
    registry.deliver(context, Event::new(event_type, path, state))
}

struct Worker {
    generation: u64,
    /// Open sessions on this runtime
    sessions: usize,
    /// Pins the runtime's allocation so its address cannot be reused as a key
    /// while the entry exists
    runtime: Weak<dyn CoordinationRuntime>,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct DispatcherInner {
    next_generation: u64,
    /// Keyed by the runtime's address
    workers: HashMap<usize, Worker>,
}

/// Background workers draining runtime notifications into the registry.
///
/// A worker is started when the first session is opened on a runtime. It
/// holds only a weak reference between notifications, and stops once the
/// runtime's notification stream ends or, after a notification, when no
/// session is open on the runtime anymore.
pub(crate) struct Dispatcher {
    inner: Mutex<DispatcherInner>,
}

fn runtime_key(runtime: &Arc<dyn CoordinationRuntime>) -> usize {
    Arc::as_ptr(runtime) as *const () as usize
}

impl Dispatcher {
    fn new() -> Self {
        Self {
            inner: Mutex::new(DispatcherInner::default()),
        }
    }

    /// Records a new session on `runtime`, starting its worker if needed.
    pub(crate) fn acquire(
        &self,
        runtime: &Arc<dyn CoordinationRuntime>,
    ) -> std::io::Result<()> {
        let key = runtime_key(runtime);
        let mut inner = self.inner.lock();

        let mut sessions = 1;
        if let Some(worker) = inner.workers.get_mut(&key) {
            if !worker.handle.is_finished() {
                worker.sessions += 1;
                return Ok(());
            }
            trace!(runtime = key, generation = worker.generation, "replacing finished worker");
            sessions += worker.sessions;
            inner.workers.remove(&key);
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;
        let weak = Arc::downgrade(runtime);
        let handle = spawn_worker(weak.clone(), key, generation)?;
        inner.workers.insert(
            key,
            Worker {
                generation,
                sessions,
                runtime: weak,
                handle,
            },
        );
        Ok(())
    }

    /// Records a closed session on `runtime`.
    ///
    /// The worker notices it is idle on the next notification it receives.
    pub(crate) fn release(
        &self,
        runtime: &Arc<dyn CoordinationRuntime>,
    ) {
        let mut inner = self.inner.lock();
        if let Some(worker) = inner.workers.get_mut(&runtime_key(runtime)) {
            worker.sessions = worker.sessions.saturating_sub(1);
        }
    }

    /// Removes the worker entry when no session is open; true if removed.
    fn retire_if_idle(
        &self,
        key: usize,
        generation: u64,
    ) -> bool {
        let mut inner = self.inner.lock();
        match inner.workers.get(&key) {
            Some(worker) if worker.generation == generation && worker.sessions == 0 => {
                inner.workers.remove(&key);
                true
            }
            _ => false,
        }
    }

    fn retire(
        &self,
        key: usize,
        generation: u64,
    ) {
        let mut inner = self.inner.lock();
        if inner.workers.get(&key).is_some_and(|w| w.generation == generation) {
            inner.workers.remove(&key);
        }
    }

    #[cfg(test)]
    pub(crate) fn sessions(
        &self,
        runtime: &Arc<dyn CoordinationRuntime>,
    ) -> usize {
        self.inner
            .lock()
            .workers
            .get(&runtime_key(runtime))
            .map_or(0, |w| w.sessions)
    }

    #[cfg(test)]
    pub(crate) fn is_running(
        &self,
        runtime: &Arc<dyn CoordinationRuntime>,
    ) -> bool {
        self.inner
            .lock()
            .workers
            .get(&runtime_key(runtime))
            .is_some_and(|w| w.runtime.strong_count() > 0 && !w.handle.is_finished())
    }

    #[cfg(test)]
    pub(crate) fn workers(&self) -> usize {
        self.inner.lock().workers.len()
    }
}

fn spawn_worker(
    runtime: Weak<dyn CoordinationRuntime>,
    key: usize,
    generation: u64,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("zk-watch-dispatcher".into())
        .spawn(move || {
            debug!(runtime = key, generation, "watch dispatcher started");
            loop {
                let Some(strong) = runtime.upgrade() else {
                    debug!(runtime = key, "runtime dropped; watch dispatcher stopped");
                    break;
                };
                let next = strong.wait_for_watch();
                drop(strong);

                let Some(notification) = next else {
                    debug!(runtime = key, "notification stream ended; watch dispatcher stopped");
                    break;
                };
                trace!(?notification, "notification received");
                match route(&REGISTRY, notification) {
                    Ok(_) => {}
                    Err(e @ DispatchError::ClosedStateEvent { .. }) => {
                        warn!(%e, "refusing delivery");
                    }
                    Err(e @ DispatchError::BufferFull { .. }) => {
                        error!(%e, "event consumer fell behind; aborting");
                        std::process::abort();
                    }
                }

                if DISPATCHER.retire_if_idle(key, generation) {
                    debug!(runtime = key, "no open session; watch dispatcher stopped");
                    return;
                }
            }
            DISPATCHER.retire(key, generation);
        })
}
