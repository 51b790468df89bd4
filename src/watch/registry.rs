use std::collections::HashMap;
use std::collections::HashSet;

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::trace;

use super::EventStream;
use super::WatchId;
use super::WatchKind;
use crate::constants::ONE_SHOT_WATCH_BUFFER;
use crate::constants::SESSION_WATCH_BUFFER;
use crate::errors::DispatchError;
use crate::event::Event;
use crate::event::EventType;

lazy_static! {
    /// Process-wide registry shared by every session and dispatcher worker
    pub(crate) static ref REGISTRY: WatchRegistry = WatchRegistry::new();
}

/// Key grouping the watches of one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct OwnerId(u64);

/// Result of a successful routing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Event accepted by the destination stream
    Delivered,
    /// Event accepted and the one-shot watch retired
    Retired,
    /// Unknown id, filtered transient state or consumer gone
    Dropped,
}

struct WatchEntry {
    owner: OwnerId,
    kind: WatchKind,
    sender: mpsc::Sender<Event>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    next_owner: u64,
    entries: HashMap<WatchId, WatchEntry>,
    by_owner: HashMap<OwnerId, HashSet<WatchId>>,
}

impl RegistryInner {
    fn remove(
        &mut self,
        id: WatchId,
    ) -> Option<WatchEntry> {
        let entry = self.entries.remove(&id)?;
        if let Some(ids) = self.by_owner.get_mut(&entry.owner) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_owner.remove(&entry.owner);
            }
        }
        Some(entry)
    }
}

/// Table from watch id to destination stream and owning session.
///
/// All mutations and every dispatch lookup serialize on one lock. The lock is
/// held across `try_send` only, which never blocks.
pub(crate) struct WatchRegistry {
    inner: Mutex<RegistryInner>,
}

impl WatchRegistry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Allocates the key a new session files its watches under
    pub(crate) fn new_owner(&self) -> OwnerId {
        let mut inner = self.inner.lock();
        inner.next_owner += 1;
        OwnerId(inner.next_owner)
    }

    pub(crate) fn register(
        &self,
        owner: OwnerId,
        kind: WatchKind,
    ) -> (WatchId, EventStream) {
        let capacity = match kind {
            WatchKind::Session => SESSION_WATCH_BUFFER,
            WatchKind::OneShot => ONE_SHOT_WATCH_BUFFER,
        };
        let (sender, receiver) = mpsc::channel(capacity);

        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = WatchId(inner.next_id);
        inner.entries.insert(id, WatchEntry { owner, kind, sender });
        inner.by_owner.entry(owner).or_default().insert(id);
        drop(inner);

        trace!(watch_id = %id, %kind, "watch registered");
        (id, EventStream::new(id, receiver))
    }

    /// Removes `id` without delivering anything; its stream closes.
    pub(crate) fn forget(
        &self,
        id: WatchId,
    ) {
        if self.inner.lock().remove(id).is_some() {
            trace!(watch_id = %id, "watch forgotten");
        }
    }

    /// Removes every watch filed under `owner`, closing their streams.
    ///
    /// Returns how many entries were removed.
    pub(crate) fn close_all(
        &self,
        owner: OwnerId,
    ) -> usize {
        let mut inner = self.inner.lock();
        let Some(ids) = inner.by_owner.remove(&owner) else {
            return 0;
        };
        for id in &ids {
            inner.entries.remove(id);
        }
        trace!(?owner, closed = ids.len(), "session watches closed");
        ids.len()
    }

    pub(crate) fn count_pending(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub(crate) fn owned_by(
        &self,
        owner: OwnerId,
    ) -> usize {
        self.inner.lock().by_owner.get(&owner).map_or(0, HashSet::len)
    }

    /// Routes one event to the stream registered under `id`.
    pub(crate) fn deliver(
        &self,
        id: WatchId,
        event: Event,
    ) -> Result<Delivery, DispatchError> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.entries.get(&id) else {
            trace!(watch_id = %id, ?event, "no watch registered; dropping");
            return Ok(Delivery::Dropped);
        };

        if event.is_closed() {
            return Err(DispatchError::ClosedStateEvent { watch_id: id });
        }

        let kind = entry.kind;
        if kind == WatchKind::OneShot
            && event.event_type == EventType::Session
            && !event.state.is_fatal()
        {
            trace!(watch_id = %id, state = ?event.state, "transient state not forwarded to watch");
            return Ok(Delivery::Dropped);
        }

        match entry.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                return Err(DispatchError::BufferFull { watch_id: id, kind });
            }
            Err(TrySendError::Closed(_)) => {
                trace!(watch_id = %id, "stream receiver dropped");
                if kind == WatchKind::OneShot {
                    inner.remove(id);
                }
                return Ok(Delivery::Dropped);
            }
        }

        if kind == WatchKind::OneShot {
            inner.remove(id);
            trace!(watch_id = %id, "one-shot watch retired");
            return Ok(Delivery::Retired);
        }
        Ok(Delivery::Delivered)
    }
}
