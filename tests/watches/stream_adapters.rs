use serial_test::serial;
use tokio_stream::StreamExt;
use zkwatch::world_acl;
use zkwatch::CreateFlags;
use zkwatch::EventType;
use zkwatch::ANY_VERSION;
use zkwatch::PERM_ALL;

use crate::common::TestContext;
use crate::common::EVENT_WAIT;

#[tokio::test]
#[serial]
async fn test_into_stream_ends_after_one_shot_event() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    session
        .create("/s", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();

    let (_, _, watch) = session.get_and_watch("/s").unwrap();
    session.delete("/s", ANY_VERSION).unwrap();

    let events: Vec<_> = tokio::time::timeout(EVENT_WAIT, watch.into_stream().collect())
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Deleted);
}

#[test]
#[serial]
fn test_blocking_recv_from_synchronous_caller() {
    let ctx = TestContext::new();
    let (session, mut events) =
        zkwatch::Session::dial(ctx.runtime.clone(), &ctx.ensemble.servers(), EVENT_WAIT).unwrap();
    assert!(events.blocking_recv().is_ok());

    let (_, mut watch) = session.exists_and_watch("/sync").unwrap();
    session
        .create("/sync", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();
    assert_eq!(watch.blocking_recv().event_type, EventType::Created);
    assert!(watch.blocking_recv().is_closed());
    assert_eq!(watch.try_recv().map(|e| e.is_closed()), Some(true));
}
