use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

/// One access control entry: permission bits granted to `scheme:id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Acl {
    pub perms: u32,
    pub scheme: String,
    pub id: String,
}

impl Acl {
    pub fn new(
        perms: u32,
        scheme: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            perms,
            scheme: scheme.into(),
            id: id.into(),
        }
    }

    pub fn allows(
        &self,
        perm: u32,
    ) -> bool {
        self.perms & perm != 0
    }
}

/// Grants `perms` to everyone
pub fn world_acl(perms: u32) -> Vec<Acl> {
    vec![Acl::new(perms, "world", "anyone")]
}

/// Grants `perms` to whatever identities the creating session has authenticated as
pub fn auth_acl(perms: u32) -> Vec<Acl> {
    vec![Acl::new(perms, "auth", "")]
}

/// Grants `perms` to the digest identity `user:password`
pub fn digest_acl(
    perms: u32,
    user: &str,
    password: &str,
) -> Vec<Acl> {
    vec![Acl::new(perms, "digest", digest_id(user, password))]
}

/// `user:base64(sha1("user:password"))`, the form stored in digest entries
pub fn digest_id(
    user: &str,
    password: &str,
) -> String {
    let hash = Sha1::digest(format!("{user}:{password}").as_bytes());
    format!("{user}:{}", STANDARD.encode(hash))
}
