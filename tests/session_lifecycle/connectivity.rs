use std::io;

use serial_test::serial;
use zkwatch::pending_watches;
use zkwatch::Error;
use zkwatch::ErrorKind;
use zkwatch::Event;
use zkwatch::EventType;
use zkwatch::Session;
use zkwatch::SessionBuilder;
use zkwatch::SessionState;

use crate::common::assert_quiet;
use crate::common::next_event;
use crate::common::TestContext;
use crate::common::EVENT_WAIT;

#[tokio::test]
#[serial]
async fn test_dial_without_port_is_rejected() {
    let ctx = TestContext::new();
    let before = pending_watches();

    let err = Session::dial(ctx.runtime.clone(), "localhost", EVENT_WAIT).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::System);
    assert!(matches!(err, Error::System(ref e) if e.kind() == io::ErrorKind::InvalidInput));
    assert_eq!(pending_watches(), before);
}

#[tokio::test]
#[serial]
async fn test_stop_and_start_are_reported_on_session_stream() {
    let ctx = TestContext::new();
    let (session, mut events) = ctx.connect().await;
    let (_, mut watch) = session.exists_and_watch("/later").unwrap();

    ctx.ensemble.stop();
    assert_eq!(next_event(&mut events).await, Event::session(SessionState::Connecting));
    let err = session.get("/").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connectivity);

    ctx.ensemble.start();
    assert_eq!(next_event(&mut events).await, Event::session(SessionState::Connected));

    // transient transitions do not consume one-shot watches
    assert_quiet(&mut watch).await;
    session
        .create("/later", b"", zkwatch::CreateFlags::PERSISTENT, &zkwatch::world_acl(zkwatch::PERM_ALL))
        .unwrap();
    let event = next_event(&mut watch).await;
    assert_eq!(event, Event::new(EventType::Created, "/later", SessionState::Connected));
}

#[tokio::test]
#[serial]
async fn test_dial_while_stopped_connects_on_start() {
    let ctx = TestContext::new();
    ctx.ensemble.stop();

    let (session, mut events) = SessionBuilder::new(ctx.runtime.clone())
        .servers(ctx.ensemble.servers())
        .dial()
        .unwrap();
    assert_eq!(session.get("/").unwrap_err().kind(), ErrorKind::Connectivity);
    assert_eq!(events.try_recv(), None);

    ctx.ensemble.start();
    assert!(next_event(&mut events).await.is_ok());
    assert!(session.exists("/zookeeper").unwrap().is_some());
}

#[tokio::test]
#[serial]
async fn test_unknown_auth_scheme_fails_session() {
    let ctx = TestContext::new();
    let (session, mut events) = ctx.connect().await;
    let (_, mut watch) = session.exists_and_watch("/anything").unwrap();
    let before = pending_watches();

    let err = session.add_auth("kerberos", b"ticket").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SessionFatal);

    assert_eq!(next_event(&mut events).await, Event::session(SessionState::AuthFailed));
    let event = next_event(&mut watch).await;
    assert_eq!(event.state, SessionState::AuthFailed);
    assert!(!event.is_ok());
    assert_eq!(pending_watches(), before - 1);
}
