// -
// Watch streams

/// Buffered events on a session stream before the consumer is considered stalled
pub(crate) const SESSION_WATCH_BUFFER: usize = 32;

/// One-shot streams hold the single watch event or one session-fatal event
pub(crate) const ONE_SHOT_WATCH_BUFFER: usize = 1;

// -
// Permission bits for ACL entries

pub const PERM_READ: u32 = 1 << 0;
pub const PERM_WRITE: u32 = 1 << 1;
pub const PERM_CREATE: u32 = 1 << 2;
pub const PERM_DELETE: u32 = 1 << 3;
pub const PERM_ADMIN: u32 = 1 << 4;
pub const PERM_ALL: u32 = 0x1f;

/// Version argument accepted by `set`, `delete` and `set_acl` to skip the check
pub const ANY_VERSION: i32 = -1;

// -
// Session defaults

pub(crate) const DEFAULT_SERVERS: &str = "localhost:2181";
pub(crate) const DEFAULT_RECV_TIMEOUT_MS: u64 = 5_000;

/// Root of the service's reserved subtree
pub const SYSTEM_ROOT: &str = "/zookeeper";
