//! Centralized index & identifier newtypes.
//!
//! Every clock and identity the pipeline touches is wrapped in a small,
//! `Copy`-where-possible newtype instead of passed around as a bare
//! `usize`/`String`. This keeps the logical-cycle axis, the physical-cycle
//! axis, and node identity from being accidentally mixed up across the
//! rewriter/compiler/scheduler boundary, the same discipline the streaming
//! utilities apply to block/row/register indices.

use std::fmt;
use std::sync::Arc;

/// Opaque node identifier. Cheap to clone (backed by `Arc<str>`); never
/// parsed back into a number downstream of the rewriter.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(Arc<str>);

impl NodeId {
    /// Build a `NodeId` from any string-like value.
    #[inline]
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    /// Borrow the id as a plain string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format a Partial node id for original node `parent` at chunk `k`.
    #[inline]
    pub fn partial(parent: &NodeId, k: usize) -> Self {
        Self::new(format!("P_{}_{}", parent.as_str(), k))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Logical cycle — the clock on which MECs and deadlines are expressed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lc(pub u64);

impl Lc {
    /// Access the underlying counter.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// `self + 1`.
    #[inline]
    pub fn next(self) -> Self {
        Lc(self.0 + 1)
    }
}

impl fmt::Display for Lc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physical cycle — the clock on which PE/NFU operations are issued and
/// retired. Never reset across a scheduler run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pc(pub u64);

impl Pc {
    /// Access the underlying counter.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// `self + n`.
    #[inline]
    pub fn plus(self, n: u64) -> Self {
        Pc(self.0 + n)
    }
}

impl fmt::Display for Pc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Minimum Execution Cycle — earliest logical cycle at which a node's
/// result is visible to its children. Always ≥ 1 once compiled.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mec(pub u32);

impl Mec {
    /// Access the underlying value.
    #[inline]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Interpret this MEC as an `Lc` deadline for comparison against
    /// `current_lc`.
    #[inline]
    pub fn as_lc(self) -> Lc {
        Lc(self.0 as u64)
    }
}

impl fmt::Display for Mec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_id_format() {
        let parent = NodeId::new("42");
        assert_eq!(NodeId::partial(&parent, 0).as_str(), "P_42_0");
        assert_eq!(NodeId::partial(&parent, 3).as_str(), "P_42_3");
    }

    #[test]
    fn lc_pc_ordering_is_numeric() {
        assert!(Lc(1) < Lc(2));
        assert!(Pc(5).plus(2) == Pc(7));
        assert_eq!(Lc(3).next(), Lc(4));
    }

    #[test]
    fn mec_as_lc_roundtrips_value() {
        assert_eq!(Mec(7).as_lc(), Lc(7));
    }
}
