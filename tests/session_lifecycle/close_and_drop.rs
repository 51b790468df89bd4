use serial_test::serial;
use zkwatch::pending_watches;
use zkwatch::world_acl;
use zkwatch::CreateFlags;
use zkwatch::ErrorCode;
use zkwatch::ErrorKind;
use zkwatch::PERM_ALL;

use crate::common::next_event;
use crate::common::TestContext;

#[tokio::test]
#[serial]
async fn test_double_close_reports_already_closing() {
    let ctx = TestContext::new();
    let (session, mut events) = ctx.connect().await;

    session.close().unwrap();
    let err = session.close().unwrap_err();
    assert!(err == ErrorCode::Closing);
    assert_eq!(err.kind(), ErrorKind::Contract);

    // the session stream ends with the closed sentinel, then keeps returning it
    assert!(next_event(&mut events).await.is_closed());
    assert!(next_event(&mut events).await.is_closed());
    assert!(events.is_closed());
}

#[tokio::test]
#[serial]
async fn test_close_retires_only_own_watches() {
    let ctx = TestContext::new();
    let before = pending_watches();
    let (a, _a_events) = ctx.connect().await;
    let (b, _b_events) = ctx.connect().await;

    let (_, mut a_watch) = a.exists_and_watch("/x").unwrap();
    let (_, _, _a_children) = a.children_and_watch("/").unwrap();
    let (_, mut b_watch) = b.exists_and_watch("/x").unwrap();
    assert_eq!(pending_watches(), before + 5);
    assert_eq!(a.pending_watches(), 3);

    a.close().unwrap();
    assert_eq!(pending_watches(), before + 2);
    assert!(next_event(&mut a_watch).await.is_closed());
    assert!(!b_watch.is_closed());

    b.close().unwrap();
    assert_eq!(pending_watches(), before);
    assert!(next_event(&mut b_watch).await.is_closed());
}

#[tokio::test]
#[serial]
async fn test_drop_releases_session_and_ephemerals() {
    let ctx = TestContext::new();
    let before = pending_watches();
    let (observer, _events) = ctx.connect().await;
    {
        let (owner, _owner_events) = ctx.connect().await;
        owner
            .create("/lock", b"", CreateFlags::EPHEMERAL, &world_acl(PERM_ALL))
            .unwrap();
        assert!(observer.exists("/lock").unwrap().is_some());
    }

    assert_eq!(pending_watches(), before + 1);
    assert_eq!(observer.exists("/lock").unwrap(), None);
}
