//! Node metadata and access control values exchanged with the runtime.

mod acl;
mod stat;

pub use acl::*;
pub use stat::*;


use std::ops::BitOr;

/// Flags accepted by `create`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CreateFlags(u32);

impl CreateFlags {
    pub const PERSISTENT: CreateFlags = CreateFlags(0);
    /// Node is removed when the creating session ends
    pub const EPHEMERAL: CreateFlags = CreateFlags(1);
    /// Service appends a monotonically increasing ten digit counter to the name
    pub const SEQUENCE: CreateFlags = CreateFlags(2);

    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn contains(
        &self,
        other: CreateFlags,
    ) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_ephemeral(&self) -> bool {
        self.contains(Self::EPHEMERAL)
    }

    pub fn is_sequence(&self) -> bool {
        self.contains(Self::SEQUENCE)
    }
}

impl BitOr for CreateFlags {
    type Output = CreateFlags;

    fn bitor(
        self,
        rhs: Self,
    ) -> Self::Output {
        CreateFlags(self.0 | rhs.0)
    }
}
