use serde::Deserialize;
use serde::Serialize;

/// Immutable snapshot of a node's metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stat {
    /// zxid of the change that created the node
    pub czxid: i64,
    /// zxid of the last data change
    pub mzxid: i64,
    /// Creation time in milliseconds since the epoch
    pub ctime: i64,
    /// Last data modification time in milliseconds since the epoch
    pub mtime: i64,
    /// Number of data changes
    pub version: i32,
    /// Number of child list changes
    pub cversion: i32,
    /// Number of ACL changes
    pub aversion: i32,
    /// Session owning an ephemeral node, zero otherwise
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
    /// zxid of the last child list change
    pub pzxid: i64,
}

impl Stat {
    pub fn czxid(&self) -> i64 {
        self.czxid
    }

    pub fn mzxid(&self) -> i64 {
        self.mzxid
    }

    pub fn ctime(&self) -> i64 {
        self.ctime
    }

    pub fn mtime(&self) -> i64 {
        self.mtime
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn cversion(&self) -> i32 {
        self.cversion
    }

    pub fn aversion(&self) -> i32 {
        self.aversion
    }

    pub fn ephemeral_owner(&self) -> i64 {
        self.ephemeral_owner
    }

    pub fn data_length(&self) -> i32 {
        self.data_length
    }

    pub fn num_children(&self) -> i32 {
        self.num_children
    }

    pub fn pzxid(&self) -> i64 {
        self.pzxid
    }

    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner != 0
    }
}
