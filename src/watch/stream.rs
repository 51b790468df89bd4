use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_stream::wrappers::ReceiverStream;

use super::WatchId;
use crate::event::Event;

/// Caller-owned receiving end of a watch.
///
/// Every receive path yields [`Event::closed`] once the watch has been retired
/// or its session closed and no buffered event remains.
#[derive(Debug)]
pub struct EventStream {
    id: WatchId,
    receiver: mpsc::Receiver<Event>,
}

impl EventStream {
    pub(crate) fn new(
        id: WatchId,
        receiver: mpsc::Receiver<Event>,
    ) -> Self {
        Self { id, receiver }
    }

    pub fn watch_id(&self) -> WatchId {
        self.id
    }

    /// Waits for the next event.
    pub async fn recv(&mut self) -> Event {
        self.receiver.recv().await.unwrap_or_else(Event::closed)
    }

    /// Blocking variant of [`recv`](Self::recv) for synchronous callers.
    ///
    /// # Panics
    ///
    /// Panics when called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Event {
        self.receiver.blocking_recv().unwrap_or_else(Event::closed)
    }

    /// Returns `None` while the stream is open and nothing is buffered.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Event::closed()),
        }
    }

    /// True once no further event can be received.
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed() && self.receiver.is_empty()
    }

    /// Converts into a [`Stream`](tokio_stream::Stream) that ends at closure.
    ///
    /// The closed sentinel is not yielded; the stream simply terminates.
    pub fn into_stream(self) -> ReceiverStream<Event> {
        ReceiverStream::new(self.receiver)
    }
}
