//! DataFlow: the scope-resolution graph.
//!
//! One [`DataFlow`] is attached to each scope-owning element. DataFlows are
//! nodes of a petgraph `StableGraph` linked by two kinds of edges:
//!
//! - [`FlowLink::Parent`] (child -> parent): the lexical enclosure. Every flow
//!   has at most one, set once.
//! - [`FlowLink::Source`] (destination -> source): "also resolves through",
//!   used for inheritance. A single edge serves both directions, so sources
//!   and destinations are always symmetric. Sources may form cycles.
//!
//! # Resolution order
//!
//! [`DataFlowGraph::resolve`] checks the flow's own slots, then its sources
//! depth-first in declaration order (first hit wins, no backtracking), then
//! repeats the whole procedure on the parent.

use std::collections::HashSet;

use indexmap::IndexMap;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::{DataFlowId, ElementId};

/// How a name came to be declared in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotCategory {
    Argument,
    Environment,
    Local,
    Imported,
}

/// A declared name within a DataFlow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlowSlot {
    pub name: String,
    /// Bound value. `None` for names whose value is supplied by the runtime.
    pub value: Option<ElementId>,
    /// Operations that contributed to this binding.
    pub origins: Vec<ElementId>,
    pub category: SlotCategory,
}

/// A scope attached to one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFlow {
    element: ElementId,
    slots: Vec<DataFlowSlot>,
}

impl DataFlow {
    /// The element this scope belongs to.
    pub fn element(&self) -> ElementId {
        self.element
    }

    pub fn slots(&self) -> &[DataFlowSlot] {
        &self.slots
    }
}

/// Edge between two DataFlows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowLink {
    Parent,
    /// `rank` orders sources by the time they were added.
    Source { rank: u32 },
}

/// Result of a successful lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved<'a> {
    /// The flow declaring the slot.
    pub flow: DataFlowId,
    /// The element owning that flow.
    pub scope: ElementId,
    pub slot: &'a DataFlowSlot,
}

/// All DataFlows of one program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataFlowGraph {
    graph: StableGraph<DataFlow, FlowLink, Directed, u32>,
    next_rank: u32,
}

impl DataFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty flow for `element`.
    pub fn create(&mut self, element: ElementId) -> DataFlowId {
        self.graph
            .add_node(DataFlow {
                element,
                slots: Vec::new(),
            })
            .into()
    }

    pub fn flow(&self, id: DataFlowId) -> Option<&DataFlow> {
        self.graph.node_weight(id.into())
    }

    pub fn get(&self, id: DataFlowId) -> Result<&DataFlow, CoreError> {
        self.flow(id).ok_or(CoreError::DataFlowNotFound { id })
    }

    /// The element owning the flow.
    pub fn element(&self, id: DataFlowId) -> Option<ElementId> {
        self.flow(id).map(DataFlow::element)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    pub fn declare_argument(
        &mut self,
        id: DataFlowId,
        name: &str,
        value: Option<ElementId>,
        origin: Option<ElementId>,
    ) -> Result<(), CoreError> {
        self.declare(id, name, value, origin, SlotCategory::Argument)
    }

    pub fn declare_environment(
        &mut self,
        id: DataFlowId,
        name: &str,
        value: Option<ElementId>,
        origin: Option<ElementId>,
    ) -> Result<(), CoreError> {
        self.declare(id, name, value, origin, SlotCategory::Environment)
    }

    pub fn declare_variable(
        &mut self,
        id: DataFlowId,
        name: &str,
        value: Option<ElementId>,
        origin: Option<ElementId>,
    ) -> Result<(), CoreError> {
        self.declare(id, name, value, origin, SlotCategory::Local)
    }

    pub fn declare_imported(
        &mut self,
        id: DataFlowId,
        name: &str,
        value: Option<ElementId>,
        origin: Option<ElementId>,
    ) -> Result<(), CoreError> {
        self.declare(id, name, value, origin, SlotCategory::Imported)
    }

    /// Removes any slot named `name` and appends a fresh one.
    pub fn declare(
        &mut self,
        id: DataFlowId,
        name: &str,
        value: Option<ElementId>,
        origin: Option<ElementId>,
        category: SlotCategory,
    ) -> Result<(), CoreError> {
        let flow = self
            .graph
            .node_weight_mut(id.into())
            .ok_or(CoreError::DataFlowNotFound { id })?;
        flow.slots.retain(|slot| slot.name != name);
        flow.slots.push(DataFlowSlot {
            name: name.to_string(),
            value,
            origins: origin.into_iter().collect(),
            category,
        });
        Ok(())
    }

    /// Records another operation contributing to a local slot. Returns
    /// `false` when the flow has no such slot.
    pub fn add_origin(&mut self, id: DataFlowId, name: &str, origin: ElementId) -> bool {
        let Some(flow) = self.graph.node_weight_mut(id.into()) else {
            return false;
        };
        match flow.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => {
                if !slot.origins.contains(&origin) {
                    slot.origins.push(origin);
                }
                true
            }
            None => false,
        }
    }

    /// Slots declared directly in `id`, in declaration order.
    pub fn slots(&self, id: DataFlowId) -> &[DataFlowSlot] {
        self.flow(id).map(DataFlow::slots).unwrap_or(&[])
    }

    /// Local lookup only.
    pub fn slot(&self, id: DataFlowId, name: &str) -> Option<&DataFlowSlot> {
        self.slots(id).iter().find(|slot| slot.name == name)
    }

    /// Whether `id` itself declares `name`. Never consults sources or parent;
    /// see [`resolve`](Self::resolve) for scoped lookup.
    pub fn has_slot(&self, id: DataFlowId, name: &str) -> bool {
        self.slot(id, name).is_some()
    }

    // -----------------------------------------------------------------------
    // Parent backbone
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: DataFlowId) -> Option<DataFlowId> {
        self.graph
            .edges_directed(id.into(), Direction::Outgoing)
            .find(|edge| matches!(edge.weight(), FlowLink::Parent))
            .map(|edge| edge.target().into())
    }

    /// Sets the lexical parent. Setting the same parent again is a no-op;
    /// any other reparenting is an error.
    pub fn set_parent(&mut self, id: DataFlowId, parent: DataFlowId) -> Result<(), CoreError> {
        self.get(id)?;
        self.get(parent)?;
        if let Some(current) = self.parent(id) {
            if current == parent {
                return Ok(());
            }
            return Err(CoreError::DataFlowReparented {
                flow: id,
                current,
                requested: parent,
            });
        }
        if self.ancestors(parent).any(|ancestor| ancestor == id) {
            return Err(CoreError::DataFlowCycle { flow: id });
        }
        self.graph.add_edge(id.into(), parent.into(), FlowLink::Parent);
        Ok(())
    }

    /// `id` followed by its parent chain.
    pub fn ancestors(&self, id: DataFlowId) -> impl Iterator<Item = DataFlowId> + '_ {
        std::iter::successors(Some(id), move |flow| self.parent(*flow))
    }

    /// The outermost flow above `id`.
    pub fn root(&self, id: DataFlowId) -> DataFlowId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Flows whose parent is `id`, oldest first.
    pub fn children(&self, id: DataFlowId) -> Vec<DataFlowId> {
        let mut children: Vec<DataFlowId> = self
            .graph
            .edges_directed(id.into(), Direction::Incoming)
            .filter(|edge| matches!(edge.weight(), FlowLink::Parent))
            .map(|edge| edge.source().into())
            .collect();
        children.sort();
        children
    }

    // -----------------------------------------------------------------------
    // Sources axis
    // -----------------------------------------------------------------------

    /// Registers `source` as a scope `id` also resolves through. Adding an
    /// existing source is a no-op.
    pub fn add_source(&mut self, id: DataFlowId, source: DataFlowId) -> Result<(), CoreError> {
        self.get(id)?;
        self.get(source)?;
        if id == source {
            return Err(CoreError::SelfSource { flow: id });
        }
        if self.sources(id).contains(&source) {
            return Ok(());
        }
        let rank = self.next_rank;
        self.next_rank += 1;
        self.graph
            .add_edge(id.into(), source.into(), FlowLink::Source { rank });
        Ok(())
    }

    /// Sources of `id` in the order they were added.
    pub fn sources(&self, id: DataFlowId) -> Vec<DataFlowId> {
        self.ranked(id, Direction::Outgoing)
    }

    /// Flows that registered `id` as a source, in the order they did so.
    pub fn destinations(&self, id: DataFlowId) -> Vec<DataFlowId> {
        self.ranked(id, Direction::Incoming)
    }

    fn ranked(&self, id: DataFlowId, direction: Direction) -> Vec<DataFlowId> {
        let mut linked: Vec<(u32, DataFlowId)> = self
            .graph
            .edges_directed(id.into(), direction)
            .filter_map(|edge| match edge.weight() {
                FlowLink::Source { rank } => {
                    let other = match direction {
                        Direction::Outgoing => edge.target(),
                        Direction::Incoming => edge.source(),
                    };
                    Some((*rank, other.into()))
                }
                FlowLink::Parent => None,
            })
            .collect();
        linked.sort_by_key(|(rank, _)| *rank);
        linked.into_iter().map(|(_, flow)| flow).collect()
    }

    /// Every flow reachable from `id` along the sources axis, depth-first,
    /// each once, excluding `id` itself.
    pub fn source_closure(&self, id: DataFlowId) -> Vec<DataFlowId> {
        let mut visited = HashSet::from([id]);
        let mut order = Vec::new();
        self.walk_sources(id, &mut visited, &mut order);
        order
    }

    fn walk_sources(
        &self,
        id: DataFlowId,
        visited: &mut HashSet<DataFlowId>,
        order: &mut Vec<DataFlowId>,
    ) {
        for source in self.sources(id) {
            if visited.insert(source) {
                order.push(source);
                self.walk_sources(source, visited, order);
            }
        }
    }

    /// Slots reachable through the sources axis only. The first flow to
    /// declare a name wins. Slots of `id` itself are never included.
    pub fn sources_slots(&self, id: DataFlowId) -> IndexMap<&str, Resolved<'_>> {
        let mut slots = IndexMap::new();
        for source in self.source_closure(id) {
            self.collect_slots(source, &mut slots);
        }
        slots
    }

    fn collect_slots<'a>(&'a self, id: DataFlowId, into: &mut IndexMap<&'a str, Resolved<'a>>) {
        let Some(flow) = self.flow(id) else {
            return;
        };
        for slot in &flow.slots {
            into.entry(slot.name.as_str()).or_insert(Resolved {
                flow: id,
                scope: flow.element,
                slot,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    pub fn resolve_locally(&self, id: DataFlowId, name: &str) -> Option<Resolved<'_>> {
        let flow = self.flow(id)?;
        flow.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| Resolved {
                flow: id,
                scope: flow.element,
                slot,
            })
    }

    /// Depth-first search of the sources axis. Each source is checked
    /// directly, then its own sources; the first hit stops the search.
    pub fn resolve_in_sources(&self, id: DataFlowId, name: &str) -> Option<Resolved<'_>> {
        let mut visited = HashSet::from([id]);
        self.search_sources(id, name, &mut visited)
    }

    fn search_sources(
        &self,
        id: DataFlowId,
        name: &str,
        visited: &mut HashSet<DataFlowId>,
    ) -> Option<Resolved<'_>> {
        for source in self.sources(id) {
            if !visited.insert(source) {
                continue;
            }
            if let Some(hit) = self.resolve_locally(source, name) {
                return Some(hit);
            }
            if let Some(hit) = self.search_sources(source, name, visited) {
                return Some(hit);
            }
        }
        None
    }

    /// Local slots, then sources, then the parent's full resolution.
    /// `None` means the name is not declared anywhere in scope.
    pub fn resolve(&self, id: DataFlowId, name: &str) -> Option<Resolved<'_>> {
        self.ancestors(id).find_map(|flow| {
            self.resolve_locally(flow, name)
                .or_else(|| self.resolve_in_sources(flow, name))
        })
    }

    /// Every name visible from `id`, with the binding `resolve` would pick.
    pub fn available_slots(&self, id: DataFlowId) -> IndexMap<&str, Resolved<'_>> {
        let mut slots = IndexMap::new();
        for flow in self.ancestors(id) {
            self.collect_slots(flow, &mut slots);
            for source in self.source_closure(flow) {
                self.collect_slots(source, &mut slots);
            }
        }
        slots
    }

    // -----------------------------------------------------------------------
    // Copying
    // -----------------------------------------------------------------------

    /// Clones `id` for `element`: same slots, same parent, same sources.
    pub fn clone_flow(&mut self, id: DataFlowId, element: ElementId) -> Result<DataFlowId, CoreError> {
        let slots = self.get(id)?.slots.clone();
        let parent = self.parent(id);
        let sources = self.sources(id);

        let copy: DataFlowId = self.graph.add_node(DataFlow { element, slots }).into();
        if let Some(parent) = parent {
            self.graph
                .add_edge(copy.into(), parent.into(), FlowLink::Parent);
        }
        for source in sources {
            self.add_source(copy, source)?;
        }
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> (DataFlowGraph, DataFlowId, DataFlowId, DataFlowId) {
        let mut flows = DataFlowGraph::new();
        let a = flows.create(ElementId(0));
        let b = flows.create(ElementId(1));
        let c = flows.create(ElementId(2));
        flows.set_parent(b, a).unwrap();
        flows.set_parent(c, b).unwrap();
        (flows, a, b, c)
    }

    #[test]
    fn redeclaration_is_destructive() {
        let mut flows = DataFlowGraph::new();
        let f = flows.create(ElementId(0));
        flows.declare_argument(f, "x", None, None).unwrap();
        flows.declare_variable(f, "y", None, None).unwrap();
        flows
            .declare_variable(f, "x", Some(ElementId(9)), Some(ElementId(4)))
            .unwrap();

        let names: Vec<&str> = flows.slots(f).iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["y", "x"]);
        let x = flows.slot(f, "x").unwrap();
        assert_eq!(x.category, SlotCategory::Local);
        assert_eq!(x.value, Some(ElementId(9)));
        assert_eq!(x.origins, vec![ElementId(4)]);
    }

    #[test]
    fn shadowing_through_parent_chain() {
        let (mut flows, a, b, c) = chain();
        flows.declare_variable(a, "x", Some(ElementId(10)), None).unwrap();

        let hit = flows.resolve(c, "x").unwrap();
        assert_eq!(hit.flow, a);
        assert_eq!(hit.scope, ElementId(0));

        flows.declare_variable(b, "x", Some(ElementId(11)), None).unwrap();
        assert_eq!(flows.resolve(b, "x").unwrap().flow, b);
        assert_eq!(flows.resolve(c, "x").unwrap().flow, b);
        assert_eq!(flows.resolve(a, "x").unwrap().flow, a);
    }

    #[test]
    fn unresolved_is_none() {
        let (flows, _, _, c) = chain();
        assert!(flows.resolve(c, "missing").is_none());
    }

    #[test]
    fn sources_beat_parent() {
        let (mut flows, _a, b, c) = chain();
        let borrowed = flows.create(ElementId(3));
        flows.declare_variable(b, "x", Some(ElementId(20)), None).unwrap();
        flows
            .declare_variable(borrowed, "x", Some(ElementId(21)), None)
            .unwrap();
        flows.add_source(c, borrowed).unwrap();

        let hit = flows.resolve(c, "x").unwrap();
        assert_eq!(hit.flow, borrowed);
        assert_eq!(hit.slot.value, Some(ElementId(21)));
    }

    #[test]
    fn first_source_wins_even_at_depth() {
        let mut flows = DataFlowGraph::new();
        let d = flows.create(ElementId(0));
        let s1 = flows.create(ElementId(1));
        let s1_inner = flows.create(ElementId(2));
        let s2 = flows.create(ElementId(3));
        flows.add_source(d, s1).unwrap();
        flows.add_source(d, s2).unwrap();
        flows.add_source(s1, s1_inner).unwrap();
        flows.declare_variable(s1_inner, "m", None, None).unwrap();
        flows.declare_variable(s2, "m", None, None).unwrap();

        assert_eq!(flows.resolve(d, "m").unwrap().flow, s1_inner);
    }

    #[test]
    fn sources_are_symmetric_and_deduplicated() {
        let mut flows = DataFlowGraph::new();
        let a = flows.create(ElementId(0));
        let b = flows.create(ElementId(1));
        flows.add_source(a, b).unwrap();
        flows.add_source(a, b).unwrap();

        assert_eq!(flows.sources(a), vec![b]);
        assert_eq!(flows.destinations(b), vec![a]);
        assert!(flows.destinations(a).is_empty());
    }

    #[test]
    fn self_source_rejected() {
        let mut flows = DataFlowGraph::new();
        let a = flows.create(ElementId(0));
        match flows.add_source(a, a) {
            Err(CoreError::SelfSource { flow }) => assert_eq!(flow, a),
            other => panic!("Expected SelfSource, got {:?}", other),
        }
    }

    #[test]
    fn mutual_sources_terminate() {
        let mut flows = DataFlowGraph::new();
        let a = flows.create(ElementId(0));
        let b = flows.create(ElementId(1));
        flows.declare_variable(a, "only_a", None, None).unwrap();
        flows.declare_variable(b, "only_b", None, None).unwrap();
        flows.declare_variable(b, "shared", None, None).unwrap();
        flows.add_source(a, b).unwrap();
        flows.add_source(b, a).unwrap();

        assert!(flows.resolve(a, "nowhere").is_none());
        assert_eq!(flows.resolve(a, "only_b").unwrap().flow, b);

        let slots = flows.sources_slots(a);
        let names: Vec<&str> = slots.keys().copied().collect();
        assert_eq!(names, vec!["only_b", "shared"]);

        let back = flows.sources_slots(b);
        assert_eq!(back.keys().copied().collect::<Vec<_>>(), vec!["only_a"]);
    }

    #[test]
    fn set_parent_is_one_shot() {
        let (mut flows, a, b, c) = chain();
        flows.set_parent(c, b).unwrap();
        match flows.set_parent(c, a) {
            Err(CoreError::DataFlowReparented {
                flow,
                current,
                requested,
            }) => {
                assert_eq!(flow, c);
                assert_eq!(current, b);
                assert_eq!(requested, a);
            }
            other => panic!("Expected DataFlowReparented, got {:?}", other),
        }
    }

    #[test]
    fn parent_cycles_rejected() {
        let (mut flows, a, _b, c) = chain();
        match flows.set_parent(a, c) {
            Err(CoreError::DataFlowCycle { flow }) => assert_eq!(flow, a),
            other => panic!("Expected DataFlowCycle, got {:?}", other),
        }
    }

    #[test]
    fn root_and_children() {
        let (flows, a, b, c) = chain();
        assert_eq!(flows.root(c), a);
        assert_eq!(flows.root(a), a);
        assert_eq!(flows.children(a), vec![b]);
        assert_eq!(flows.ancestors(c).collect::<Vec<_>>(), vec![c, b, a]);
    }

    #[test]
    fn available_slots_prefer_inner_bindings() {
        let (mut flows, a, b, c) = chain();
        flows.declare_variable(a, "x", Some(ElementId(1)), None).unwrap();
        flows.declare_variable(a, "y", None, None).unwrap();
        flows.declare_variable(b, "x", Some(ElementId(2)), None).unwrap();

        let visible = flows.available_slots(c);
        assert_eq!(visible["x"].flow, b);
        assert_eq!(visible["y"].flow, a);
        assert_eq!(visible.len(), 2);
    }

    #[test]
    fn clone_flow_keeps_links_but_not_identity() {
        let (mut flows, a, b, _c) = chain();
        let extra = flows.create(ElementId(7));
        flows.add_source(b, extra).unwrap();
        flows.declare_variable(b, "v", None, None).unwrap();

        let copy = flows.clone_flow(b, ElementId(8)).unwrap();
        assert_eq!(flows.parent(copy), Some(a));
        assert_eq!(flows.sources(copy), vec![extra]);
        assert_eq!(flows.element(copy), Some(ElementId(8)));

        flows.declare_variable(copy, "w", None, None).unwrap();
        assert!(!flows.has_slot(b, "w"));
        assert!(flows.has_slot(copy, "v"));
    }

    #[test]
    fn origins_accumulate() {
        let mut flows = DataFlowGraph::new();
        let f = flows.create(ElementId(0));
        flows
            .declare_variable(f, "v", None, Some(ElementId(1)))
            .unwrap();
        assert!(flows.add_origin(f, "v", ElementId(2)));
        assert!(flows.add_origin(f, "v", ElementId(2)));
        assert!(!flows.add_origin(f, "nope", ElementId(2)));
        assert_eq!(flows.slot(f, "v").unwrap().origins, vec![ElementId(1), ElementId(2)]);
    }
}
