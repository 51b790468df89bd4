use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use zkwatch::CoordinationRuntime;
use zkwatch::Event;
use zkwatch::EventStream;
use zkwatch::MemoryEnsemble;
use zkwatch::Session;
use zkwatch::SessionState;

/// Upper bound for any single event to arrive
pub const EVENT_WAIT: Duration = Duration::from_secs(5);

/// How long a stream must stay silent to count as "no event"
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub struct TestContext {
    pub ensemble: Arc<MemoryEnsemble>,
    pub runtime: Arc<dyn CoordinationRuntime>,
}

impl TestContext {
    pub fn new() -> Self {
        crate::enable_logger();
        let ensemble = Arc::new(MemoryEnsemble::new());
        let runtime: Arc<dyn CoordinationRuntime> = ensemble.clone();
        Self { ensemble, runtime }
    }

    /// Dials the ensemble and waits for the session to report connected
    pub async fn connect(&self) -> (Session, EventStream) {
        let (session, mut events) = Session::dial(self.runtime.clone(), &self.ensemble.servers(), EVENT_WAIT)
            .expect("dial in-memory ensemble");
        let event = next_event(&mut events).await;
        assert_eq!(event, Event::session(SessionState::Connected));
        (session, events)
    }
}

pub async fn next_event(stream: &mut EventStream) -> Event {
    time::timeout(EVENT_WAIT, stream.recv())
        .await
        .expect("no event within deadline")
}

pub async fn assert_quiet(stream: &mut EventStream) {
    if let Ok(event) = time::timeout(QUIET_PERIOD, stream.recv()).await {
        panic!("unexpected event: {event}");
    }
}
