//! The traversal context: the path of elements currently being visited.
//!
//! Passes push an element before handling it and pop it afterwards. Queries
//! look from the innermost element outward.

use modelgen_core::{Capability, DataFlowId, ElementId, ProgramGraph};

#[derive(Debug, Clone, Default)]
pub struct WalkContext {
    stack: Vec<ElementId>,
}

impl WalkContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: ElementId) {
        self.stack.push(id);
    }

    pub fn pop(&mut self) -> Option<ElementId> {
        self.stack.pop()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// The element being visited.
    pub fn current(&self) -> Option<ElementId> {
        self.stack.last().copied()
    }

    /// The element that pushed the current one.
    pub fn enclosing(&self) -> Option<ElementId> {
        self.stack.iter().rev().nth(1).copied()
    }

    /// Outermost first.
    pub fn path(&self) -> &[ElementId] {
        &self.stack
    }

    /// Stack position of the innermost element satisfying `cap`.
    pub fn index_of(&self, graph: &ProgramGraph, cap: Capability) -> Option<usize> {
        self.stack
            .iter()
            .rposition(|id| graph.satisfies(*id, cap))
    }

    /// Stack position of `id`, if it is on the path.
    pub fn position(&self, id: ElementId) -> Option<usize> {
        self.stack.iter().rposition(|el| *el == id)
    }

    /// The innermost element satisfying `cap`.
    pub fn find(&self, graph: &ProgramGraph, cap: Capability) -> Option<ElementId> {
        self.index_of(graph, cap).map(|index| self.stack[index])
    }

    pub fn is_in(&self, graph: &ProgramGraph, cap: Capability) -> bool {
        self.index_of(graph, cap).is_some()
    }

    /// DataFlow of the innermost element owning one.
    pub fn dataflow(&self, graph: &ProgramGraph) -> Option<DataFlowId> {
        self.stack
            .iter()
            .rev()
            .find_map(|id| graph.dataflow_of(*id))
    }

    /// Like [`dataflow`](Self::dataflow) but skipping the current element.
    pub fn enclosing_dataflow(&self, graph: &ProgramGraph) -> Option<DataFlowId> {
        self.stack
            .iter()
            .rev()
            .skip(1)
            .find_map(|id| graph.dataflow_of(*id))
    }
}
