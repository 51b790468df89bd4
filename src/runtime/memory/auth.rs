use crate::errors::ErrorCode;
use crate::node::digest_id;
use crate::node::Acl;

/// Identity a connection has proven, e.g. `("digest", "user:hash")`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(super) struct AuthId {
    pub(super) scheme: String,
    pub(super) id: String,
}

/// Resolves `add_auth` credentials into an identity.
///
/// `None` means the scheme is unknown or the credentials are malformed.
pub(super) fn authenticate(
    scheme: &str,
    cert: &[u8],
) -> Option<AuthId> {
    match scheme {
        "digest" => {
            let cert = std::str::from_utf8(cert).ok()?;
            let (user, password) = cert.split_once(':')?;
            Some(AuthId {
                scheme: "digest".to_string(),
                id: digest_id(user, password),
            })
        }
        _ => None,
    }
}

/// True when `acl` grants `perm` to anyone or to one of `ids`
pub(super) fn check_acl(
    acl: &[Acl],
    perm: u32,
    ids: &[AuthId],
) -> bool {
    acl.iter().filter(|entry| entry.allows(perm)).any(|entry| {
        (entry.scheme == "world" && entry.id == "anyone")
            || ids.iter().any(|auth| auth.scheme == entry.scheme && auth.id == entry.id)
    })
}

/// Validates an ACL supplied by a client and expands `auth` entries into the
/// connection's identities.
pub(super) fn fixup_acl(
    acl: &[Acl],
    ids: &[AuthId],
) -> Result<Vec<Acl>, ErrorCode> {
    if acl.is_empty() {
        return Err(ErrorCode::InvalidAcl);
    }
    let mut fixed = Vec::with_capacity(acl.len());
    for entry in acl {
        match entry.scheme.as_str() {
            "world" if entry.id == "anyone" => fixed.push(entry.clone()),
            "auth" => {
                if ids.is_empty() {
                    return Err(ErrorCode::InvalidAcl);
                }
                fixed.extend(
                    ids.iter()
                        .map(|auth| Acl::new(entry.perms, auth.scheme.clone(), auth.id.clone())),
                );
            }
            "digest" if entry.id.contains(':') => fixed.push(entry.clone()),
            _ => return Err(ErrorCode::InvalidAcl),
        }
    }
    Ok(fixed)
}
