//! Stable AST node identities.
//!
//! The parser assigns every wrappable AST node a [`NodeId`]. The semantic
//! layer keys its wrap-once tables on these ids instead of on node addresses.

use std::fmt;

/// Identity of one AST node, unique within a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out sequential [`NodeId`]s.
///
/// Parsers (and test fixtures) use one allocator per model so that ids never
/// collide across schemas.
#[derive(Debug, Default, Clone)]
pub struct NodeIdAllocator {
    next: u32,
}

impl NodeIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next unused id.
    pub fn alloc(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
