use serial_test::serial;
use zkwatch::auth_acl;
use zkwatch::digest_acl;
use zkwatch::world_acl;
use zkwatch::CreateFlags;
use zkwatch::ErrorCode;
use zkwatch::ANY_VERSION;
use zkwatch::PERM_ALL;
use zkwatch::PERM_READ;

use crate::common::TestContext;

#[tokio::test]
#[serial]
async fn test_digest_acl_restricts_other_sessions() {
    let ctx = TestContext::new();
    let (owner, _owner_events) = ctx.connect().await;
    let (stranger, _stranger_events) = ctx.connect().await;

    owner.add_auth("digest", b"joe:secret").unwrap();
    owner
        .create("/private", b"data", CreateFlags::PERSISTENT, &digest_acl(PERM_ALL, "joe", "secret"))
        .unwrap();
    assert_eq!(&owner.get("/private").unwrap().0[..], b"data");

    assert!(stranger.get("/private").unwrap_err() == ErrorCode::NoAuth);
    // exists is not subject to ACLs
    assert!(stranger.exists("/private").unwrap().is_some());

    stranger.add_auth("digest", b"joe:secret").unwrap();
    assert_eq!(&stranger.get("/private").unwrap().0[..], b"data");
}

#[tokio::test]
#[serial]
async fn test_auth_acl_requires_credentials() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;

    let err = session
        .create("/mine", b"", CreateFlags::PERSISTENT, &auth_acl(PERM_ALL))
        .unwrap_err();
    assert!(err == ErrorCode::InvalidAcl);

    session.add_auth("digest", b"ann:pw").unwrap();
    session
        .create("/mine", b"", CreateFlags::PERSISTENT, &auth_acl(PERM_ALL))
        .unwrap();
    let (acl, _) = session.get_acl("/mine").unwrap();
    assert_eq!(acl, digest_acl(PERM_ALL, "ann", "pw"));
}

#[tokio::test]
#[serial]
async fn test_set_acl_checks_aversion() {
    let ctx = TestContext::new();
    let (session, _events) = ctx.connect().await;
    session
        .create("/shared", b"", CreateFlags::PERSISTENT, &world_acl(PERM_ALL))
        .unwrap();

    let err = session.set_acl("/shared", &world_acl(PERM_READ), 1).unwrap_err();
    assert!(err == ErrorCode::BadVersion);
    session.set_acl("/shared", &world_acl(PERM_READ), 0).unwrap();
    // ADMIN was dropped along with WRITE
    let err = session.set_acl("/shared", &world_acl(PERM_ALL), ANY_VERSION).unwrap_err();
    assert!(err == ErrorCode::NoAuth);

    let (acl, stat) = session.get_acl("/shared").unwrap();
    assert_eq!(acl, world_acl(PERM_READ));
    assert_eq!(stat.aversion(), 1);
    assert!(session.set("/shared", b"x", ANY_VERSION).unwrap_err() == ErrorCode::NoAuth);
}
