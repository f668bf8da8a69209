//! Stable ID newtypes for model entities.
//!
//! Element and DataFlow handles are distinct wrappers over `u32` so that an
//! `ElementId` cannot be used where a `DataFlowId` is expected. Both are
//! allocated by the owning [`ProgramGraph`](crate::graph::ProgramGraph); there
//! is no process-wide counter.

use std::fmt;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

/// Handle of an element in the program arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ElementId(pub u32);

/// Handle of a DataFlow scope. Maps to a petgraph `NodeIndex<u32>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataFlowId(pub u32);

impl ElementId {
    /// Position of the element in the arena.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

// Display implementations -- just print the inner value.

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DataFlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Bridge between DataFlowId and petgraph's NodeIndex<u32>.

impl From<NodeIndex<u32>> for DataFlowId {
    fn from(idx: NodeIndex<u32>) -> Self {
        DataFlowId(idx.index() as u32)
    }
}

impl From<DataFlowId> for NodeIndex<u32> {
    fn from(id: DataFlowId) -> Self {
        NodeIndex::new(id.0 as usize)
    }
}

/// Hands out element ids for one graph build.
///
/// Ids are dense arena positions, so the allocator only ever moves forward.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> ElementId {
        let id = ElementId(self.next);
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u32 {
        self.next
    }
}
