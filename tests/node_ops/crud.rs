use serial_test::serial;
use zkwatch::world_acl;
use zkwatch::CreateFlags;
use zkwatch::ErrorCode;
use zkwatch::ErrorKind;
use zkwatch::ANY_VERSION;
use zkwatch::PERM_ALL;

use crate::common::TestContext;

#[tokio::test]
#[serial]
async fn test_fresh_tree_lists_system_node() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;

    let (children, stat) = session.children("/").unwrap();
    assert_eq!(children, vec!["zookeeper".to_string()]);
    assert_eq!(stat.num_children(), 1);
}

#[tokio::test]
#[serial]
async fn test_get_and_exists_on_missing_node() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;

    assert!(session.get("/missing").unwrap_err().is_no_node());
    assert_eq!(session.exists("/missing").unwrap(), None);
}

#[tokio::test]
#[serial]
async fn test_create_set_delete_with_versions() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let acl = world_acl(PERM_ALL);

    assert_eq!(session.create("/app", b"v0", CreateFlags::PERSISTENT, &acl).unwrap(), "/app");
    assert!(session.create("/app", b"", CreateFlags::PERSISTENT, &acl).unwrap_err() == ErrorCode::NodeExists);
    assert!(session.create("/nope/child", b"", CreateFlags::PERSISTENT, &acl).unwrap_err() == ErrorCode::NoNode);

    let stat = session.set("/app", b"v1", 0).unwrap();
    assert_eq!(stat.version(), 1);
    assert_eq!(stat.data_length(), 2);
    assert!(session.set("/app", b"v2", 0).unwrap_err() == ErrorCode::BadVersion);
    assert_eq!(session.set("/app", b"v2", ANY_VERSION).unwrap().version(), 2);

    session.create("/app/child", b"", CreateFlags::PERSISTENT, &acl).unwrap();
    let err = session.delete("/app", ANY_VERSION).unwrap_err();
    assert!(err == ErrorCode::NotEmpty);
    assert_eq!(err.kind(), ErrorKind::Status);

    session.delete("/app/child", 0).unwrap();
    session.delete("/app", 2).unwrap();
    assert_eq!(session.exists("/app").unwrap(), None);
}

#[tokio::test]
#[serial]
async fn test_sequential_names_follow_parent_cversion() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let acl = world_acl(PERM_ALL);
    session.create("/queue", b"", CreateFlags::PERSISTENT, &acl).unwrap();

    let first = session.create("/queue/item-", b"", CreateFlags::SEQUENCE, &acl).unwrap();
    let second = session
        .create("/queue/item-", b"", CreateFlags::SEQUENCE | CreateFlags::EPHEMERAL, &acl)
        .unwrap();
    assert_eq!(first, "/queue/item-0000000000");
    assert_eq!(second, "/queue/item-0000000001");

    let (mut children, stat) = session.children("/queue").unwrap();
    children.sort();
    assert_eq!(children, vec!["item-0000000000", "item-0000000001"]);
    assert_eq!(stat.cversion(), 2);
}

#[tokio::test]
#[serial]
async fn test_ephemeral_nodes_cannot_have_children() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let acl = world_acl(PERM_ALL);

    session.create("/eph", b"", CreateFlags::EPHEMERAL, &acl).unwrap();
    let stat = session.exists("/eph").unwrap().unwrap();
    assert!(stat.is_ephemeral());
    assert_eq!(stat.ephemeral_owner(), session.client_id().unwrap().session_id);

    let err = session.create("/eph/child", b"", CreateFlags::PERSISTENT, &acl).unwrap_err();
    assert!(err == ErrorCode::NoChildrenForEphemerals);
}

#[tokio::test]
#[serial]
async fn test_invalid_paths_are_bad_arguments() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    let acl = world_acl(PERM_ALL);

    for path in ["relative", "/trailing/", "/a//b", "/a/./b", "/a/../b", ""] {
        let err = session.create(path, b"", CreateFlags::PERSISTENT, &acl).unwrap_err();
        assert!(err == ErrorCode::BadArguments, "{path}: {err}");
    }
    assert!(session.delete("/zookeeper", ANY_VERSION).unwrap_err() == ErrorCode::BadArguments);
}
