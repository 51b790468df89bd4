use serial_test::serial;
use zkwatch::pending_watches;
use zkwatch::world_acl;
use zkwatch::CreateFlags;
use zkwatch::Event;
use zkwatch::EventType;
use zkwatch::SessionState;
use zkwatch::ANY_VERSION;
use zkwatch::PERM_ALL;

use crate::common::assert_quiet;
use crate::common::next_event;
use crate::common::TestContext;

#[tokio::test]
#[serial]
async fn test_get_and_watch_fires_once_on_change() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    session
        .create("/test", b"one", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();

    let (data, stat, mut watch) = session.get_and_watch("/test").unwrap();
    assert_eq!(&data[..], b"one");
    assert_eq!(stat.version(), 0);
    let before = pending_watches();

    session.set("/test", b"two", ANY_VERSION).unwrap();
    let event = next_event(&mut watch).await;
    assert_eq!(event, Event::new(EventType::Changed, "/test", SessionState::Connected));
    assert_eq!(event.to_string(), "ZooKeeper connected; path changed: /test");
    assert_eq!(pending_watches(), before - 1);

    // one-shot: a second change is not delivered, the stream is closed
    session.set("/test", b"three", ANY_VERSION).unwrap();
    assert!(next_event(&mut watch).await.is_closed());
    assert!(watch.is_closed());
}

#[tokio::test]
#[serial]
async fn test_exists_watch_on_missing_node_fires_on_create() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;

    let (stat, mut watch) = session.exists_and_watch("/soon").unwrap();
    assert!(stat.is_none());

    session
        .create("/soon", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();
    assert_eq!(
        next_event(&mut watch).await,
        Event::new(EventType::Created, "/soon", SessionState::Connected)
    );
}

#[tokio::test]
#[serial]
async fn test_child_watch_fires_on_child_create_and_delete() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let acl = world_acl(PERM_ALL);
    session.create("/dir", b"", CreateFlags::PERSISTENT, &acl).unwrap();

    let (children, _, mut watch) = session.children_and_watch("/dir").unwrap();
    assert!(children.is_empty());
    session.create("/dir/a", b"", CreateFlags::PERSISTENT, &acl).unwrap();
    assert_eq!(
        next_event(&mut watch).await,
        Event::new(EventType::Child, "/dir", SessionState::Connected)
    );

    let (_, _, mut watch) = session.children_and_watch("/dir").unwrap();
    // data changes of a child do not touch the parent's child watch
    session.set("/dir/a", b"x", ANY_VERSION).unwrap();
    assert_quiet(&mut watch).await;
    session.delete("/dir/a", ANY_VERSION).unwrap();
    assert_eq!(next_event(&mut watch).await.event_type, EventType::Child);
}

#[tokio::test]
#[serial]
async fn test_delete_fires_data_and_child_watches_of_node() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let (other, _other_events) = ctx.connect().await;
    session
        .create("/gone", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();

    let (_, _, mut data_watch) = session.get_and_watch("/gone").unwrap();
    let (_, _, mut child_watch) = other.children_and_watch("/gone").unwrap();
    let before = pending_watches();

    session.delete("/gone", ANY_VERSION).unwrap();
    let deleted = Event::new(EventType::Deleted, "/gone", SessionState::Connected);
    assert_eq!(next_event(&mut data_watch).await, deleted);
    assert_eq!(next_event(&mut child_watch).await, deleted);
    assert_eq!(pending_watches(), before - 2);
}

#[tokio::test]
#[serial]
async fn test_watch_on_missing_node_is_forgotten() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let before = pending_watches();

    assert!(session.get_and_watch("/absent").unwrap_err().is_no_node());
    assert!(session.children_and_watch("/absent").unwrap_err().is_no_node());
    assert_eq!(pending_watches(), before);
}
