use serial_test::serial;
use zkwatch::pending_watches;
use zkwatch::world_acl;
use zkwatch::ClientId;
use zkwatch::CreateFlags;
use zkwatch::ErrorCode;
use zkwatch::Event;
use zkwatch::EventType;
use zkwatch::Session;
use zkwatch::SessionState;
use zkwatch::PERM_ALL;

use crate::common::next_event;
use crate::common::TestContext;
use crate::common::EVENT_WAIT;

#[tokio::test]
#[serial]
async fn test_redial_shares_server_side_session() {
    let ctx = TestContext::new();
    let (first, _events) = ctx.connect().await;
    let client_id = first.client_id().unwrap();
    first
        .create("/owned", b"", CreateFlags::EPHEMERAL, &world_acl(PERM_ALL))
        .unwrap();

    let (second, mut second_events) =
        Session::redial(ctx.runtime.clone(), &ctx.ensemble.servers(), EVENT_WAIT, client_id).unwrap();
    assert_eq!(next_event(&mut second_events).await, Event::session(SessionState::Connected));
    assert_eq!(second.client_id().unwrap(), client_id);
    assert_eq!(
        second.exists("/owned").unwrap().unwrap().ephemeral_owner(),
        client_id.session_id
    );
}

#[tokio::test]
#[serial]
async fn test_rejected_token_reports_expiry() {
    let ctx = TestContext::new();
    let (session, mut events) = Session::redial(
        ctx.runtime.clone(),
        &ctx.ensemble.servers(),
        EVENT_WAIT,
        ClientId {
            session_id: 42,
            passwd: [0; 16],
        },
    )
    .unwrap();

    assert_eq!(next_event(&mut events).await, Event::session(SessionState::ExpiredSession));
    assert!(session.get("/").unwrap_err() == ErrorCode::SessionExpired);
}

#[tokio::test]
#[serial]
async fn test_expiry_reaches_session_and_every_watch() {
    let ctx = TestContext::new();
    let (session, mut events) = ctx.connect().await;
    let (observer, _observer_events) = ctx.connect().await;
    session
        .create("/eph", b"", CreateFlags::EPHEMERAL, &world_acl(PERM_ALL))
        .unwrap();
    let (_, _, mut data_watch) = session.get_and_watch("/eph").unwrap();
    let (_, _, mut child_watch) = session.children_and_watch("/").unwrap();
    let (_, mut observer_watch) = observer.exists_and_watch("/eph").unwrap();
    let before = pending_watches();

    ctx.ensemble.expire(session.client_id().unwrap());

    assert_eq!(next_event(&mut events).await, Event::session(SessionState::ExpiredSession));
    for watch in [&mut data_watch, &mut child_watch] {
        assert_eq!(next_event(watch).await, Event::session(SessionState::ExpiredSession));
        assert!(next_event(watch).await.is_closed());
    }

    // other sessions see the ephemeral go away
    assert_eq!(
        next_event(&mut observer_watch).await,
        Event::new(EventType::Deleted, "/eph", SessionState::Connected)
    );
    assert_eq!(pending_watches(), before - 3);
    let err = session
        .create("/x", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap_err();
    assert!(err == ErrorCode::SessionExpired);
}
