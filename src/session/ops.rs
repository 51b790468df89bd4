use bytes::Bytes;

use super::Session;
use crate::errors::ErrorCode;
use crate::node::Acl;
use crate::node::CreateFlags;
use crate::node::Stat;
use crate::watch::EventStream;
use crate::Result;

/// Node operations. Each call blocks for one round-trip to the ensemble.
impl Session {
    /// Data and stat of `path`
    pub fn get(
        &self,
        path: &str,
    ) -> Result<(Bytes, Stat)> {
        self.with_handle(|h| self.runtime.get(h, path, None))
    }

    /// Like [`get`](Self::get), also arming a one-shot watch.
    ///
    /// The watch fires on the next change or deletion of `path`.
    pub fn get_and_watch(
        &self,
        path: &str,
    ) -> Result<(Bytes, Stat, EventStream)> {
        let ((data, stat), stream) = self.with_watch(|h, id| self.runtime.get(h, path, Some(id)))?;
        Ok((data, stat, stream))
    }

    /// Sorted child names of `path`
    pub fn children(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, Stat)> {
        self.with_handle(|h| self.runtime.children(h, path, None))
    }

    /// The watch fires when a child is created or deleted, or `path` itself is deleted.
    pub fn children_and_watch(
        &self,
        path: &str,
    ) -> Result<(Vec<String>, Stat, EventStream)> {
        let ((children, stat), stream) =
            self.with_watch(|h, id| self.runtime.children(h, path, Some(id)))?;
        Ok((children, stat, stream))
    }

    /// `Ok(None)` when the node does not exist
    pub fn exists(
        &self,
        path: &str,
    ) -> Result<Option<Stat>> {
        self.with_handle(|h| absent_as_none(self.runtime.exists(h, path, None)))
    }

    /// Watch for creation, change or deletion of `path`.
    ///
    /// A missing node is not an error: the stat is `None` and the watch stays
    /// armed until the node is created.
    pub fn exists_and_watch(
        &self,
        path: &str,
    ) -> Result<(Option<Stat>, EventStream)> {
        self.with_watch(|h, id| absent_as_none(self.runtime.exists(h, path, Some(id))))
    }

    /// Returns the created path, which differs from `path` for sequential nodes.
    pub fn create(
        &self,
        path: &str,
        value: &[u8],
        flags: CreateFlags,
        acl: &[Acl],
    ) -> Result<String> {
        self.with_handle(|h| self.runtime.create(h, path, value, flags, acl))
    }

    /// Version-checked write; pass [`ANY_VERSION`](crate::ANY_VERSION) to skip the check.
    pub fn set(
        &self,
        path: &str,
        value: &[u8],
        version: i32,
    ) -> Result<Stat> {
        self.with_handle(|h| self.runtime.set(h, path, value, version))
    }

    pub fn delete(
        &self,
        path: &str,
        version: i32,
    ) -> Result<()> {
        self.with_handle(|h| self.runtime.delete(h, path, version))
    }

    pub fn get_acl(
        &self,
        path: &str,
    ) -> Result<(Vec<Acl>, Stat)> {
        self.with_handle(|h| self.runtime.get_acl(h, path))
    }

    pub fn set_acl(
        &self,
        path: &str,
        acl: &[Acl],
        version: i32,
    ) -> Result<()> {
        self.with_handle(|h| self.runtime.set_acl(h, path, acl, version))
    }

    /// Adds credentials to the session, e.g. `("digest", b"user:password")`.
    pub fn add_auth(
        &self,
        scheme: &str,
        cert: &[u8],
    ) -> Result<()> {
        self.with_handle(|h| self.runtime.add_auth(h, scheme, cert))
    }
}

fn absent_as_none(
    result: std::result::Result<Stat, ErrorCode>
) -> std::result::Result<Option<Stat>, ErrorCode> {
    match result {
        Ok(stat) => Ok(Some(stat)),
        Err(ErrorCode::NoNode) => Ok(None),
        Err(code) => Err(code),
    }
}
