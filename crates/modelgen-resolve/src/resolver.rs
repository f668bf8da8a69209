//! The Resolver pass: builds every DataFlow in one top-down walk.
//!
//! Each scope-owning element gets a DataFlow whose parent is the DataFlow of
//! its nearest scope-owning ancestor. Declaration rules per kind:
//!
//! - program: the builtin names, as environment slots
//! - module: its slots, as locals
//! - class: `super` and `self` environment slots, then its slots
//! - method: `super` and `self`, then its parameters as arguments
//! - closure, function: parameters as arguments, then slots
//! - block: its slots
//! - allocation: the allocated slot, as a local of the enclosing scope
//!
//! Assignments record themselves as origins of the slot they write, and
//! mark the innermost closure when that slot belongs to an outer scope.

use std::collections::HashSet;

use modelgen_core::element::MUTATES;
use modelgen_core::{Capability, DataFlowId, ElementId, NodeKind, OpKind, ProgramGraph, SlotCategory};
use tracing::{debug, trace};

use crate::context::WalkContext;
use crate::error::ResolveError;
use crate::ResolverOptions;

/// Name of the environment slot bound to the current instance or class.
pub const SELF: &str = "self";
/// Name of the environment slot bound to the parent class view.
pub const SUPER: &str = "super";

pub struct Resolver {
    options: ResolverOptions,
    context: WalkContext,
    visited: HashSet<ElementId>,
}

impl Resolver {
    pub fn new(options: ResolverOptions) -> Self {
        Resolver {
            options,
            context: WalkContext::new(),
            visited: HashSet::new(),
        }
    }

    /// Walks the whole program. Running it again on the same graph is
    /// idempotent.
    pub fn walk(&mut self, graph: &mut ProgramGraph) -> Result<(), ResolveError> {
        self.visited.clear();
        let root = graph.root();
        debug!(elements = graph.element_count(), "resolving program scopes");
        self.visit(graph, root)?;
        debug!(dataflows = graph.flows().len(), "program scopes resolved");
        Ok(())
    }

    fn visit(&mut self, graph: &mut ProgramGraph, id: ElementId) -> Result<(), ResolveError> {
        // Shared slot values are reachable from several contexts; the first
        // one to reach them wins.
        if !self.visited.insert(id) {
            return Ok(());
        }
        self.context.push(id);
        let result = self.visit_inner(graph, id);
        self.context.pop();
        result
    }

    fn visit_inner(&mut self, graph: &mut ProgramGraph, id: ElementId) -> Result<(), ResolveError> {
        self.declare(graph, id)?;
        for child in graph.children(id) {
            self.visit(graph, child)?;
        }
        Ok(())
    }

    fn declare(&mut self, graph: &mut ProgramGraph, id: ElementId) -> Result<(), ResolveError> {
        let kind = graph.kind(id)?;
        trace!(element = %id, kind = %kind, "declaring");
        match kind {
            NodeKind::Program => {
                let flow = self.open_scope(graph, id)?;
                for name in &self.options.builtins {
                    graph.flows_mut().declare_environment(flow, name, None, None)?;
                }
            }
            NodeKind::Module => {
                let flow = self.open_scope(graph, id)?;
                declare_slots(graph, id, flow)?;
            }
            NodeKind::Class | NodeKind::Interface => {
                let flow = self.open_scope(graph, id)?;
                declare_self_and_super(graph, flow)?;
                declare_slots(graph, id, flow)?;
            }
            kind if kind.is_method() => {
                let flow = self.open_scope(graph, id)?;
                declare_self_and_super(graph, flow)?;
                declare_parameters(graph, id, flow)?;
                declare_slots(graph, id, flow)?;
            }
            NodeKind::Closure | NodeKind::Function => {
                let flow = self.open_scope(graph, id)?;
                declare_parameters(graph, id, flow)?;
                declare_slots(graph, id, flow)?;
            }
            NodeKind::Block => {
                let flow = self.open_scope(graph, id)?;
                declare_slots(graph, id, flow)?;
            }
            NodeKind::Operation(OpKind::Allocation) => self.declare_allocation(graph, id)?,
            NodeKind::Operation(OpKind::Assignment) => self.note_assignment(graph, id)?,
            _ => {}
        }
        Ok(())
    }

    /// Gives `id` a DataFlow parented to the enclosing scope.
    fn open_scope(&self, graph: &mut ProgramGraph, id: ElementId) -> Result<DataFlowId, ResolveError> {
        let flow = graph.ensure_dataflow(id)?;
        if let Some(parent) = self.context.enclosing_dataflow(graph) {
            graph.flows_mut().set_parent(flow, parent)?;
        }
        Ok(flow)
    }

    fn declare_allocation(&self, graph: &mut ProgramGraph, op: ElementId) -> Result<(), ResolveError> {
        let view = graph.op(op)?;
        let (Some(slot), default) = (view.slot_to_allocate(), view.default_value()) else {
            return Ok(());
        };
        let Some(name) = graph.name(slot).map(str::to_string) else {
            return Ok(());
        };
        let Some(flow) = self.context.dataflow(graph) else {
            return Ok(());
        };
        graph.flows_mut().declare_variable(flow, &name, default, Some(op))?;
        Ok(())
    }

    fn note_assignment(&self, graph: &mut ProgramGraph, op: ElementId) -> Result<(), ResolveError> {
        let Some(target) = graph.op(op)?.target() else {
            return Ok(());
        };
        if graph.kind(target)? != NodeKind::Reference {
            return Ok(());
        }
        let Some(name) = graph.name(target).map(str::to_string) else {
            return Ok(());
        };
        let Some(flow) = self.context.dataflow(graph) else {
            return Ok(());
        };
        let Some((slot_flow, scope, category)) = graph
            .flows()
            .resolve(flow, &name)
            .map(|hit| (hit.flow, hit.scope, hit.slot.category))
        else {
            return Ok(());
        };

        if category == SlotCategory::Local {
            graph.flows_mut().add_origin(slot_flow, &name, op);
        }
        if category == SlotCategory::Environment {
            return Ok(());
        }
        let closure = self.context.index_of(graph, Capability::Closure);
        let owner = self.context.position(scope);
        if let (Some(closure), Some(owner)) = (closure, owner) {
            if owner < closure {
                let closure_id = self.context.path()[closure];
                trace!(closure = %closure_id, name = %name, "closure mutates outer slot");
                graph.get_mut(closure_id)?.note_name(MUTATES, &name);
            }
        }
        Ok(())
    }
}

fn declare_self_and_super(graph: &mut ProgramGraph, flow: DataFlowId) -> Result<(), ResolveError> {
    graph.flows_mut().declare_environment(flow, SUPER, None, None)?;
    graph.flows_mut().declare_environment(flow, SELF, None, None)?;
    Ok(())
}

fn declare_parameters(graph: &mut ProgramGraph, callable: ElementId, flow: DataFlowId) -> Result<(), ResolveError> {
    let parameters: Vec<(String, ElementId)> = graph
        .parameters(callable)
        .iter()
        .filter_map(|p| graph.name(*p).map(|name| (name.to_string(), *p)))
        .collect();
    for (name, param) in parameters {
        graph.flows_mut().declare_argument(flow, &name, Some(param), Some(callable))?;
    }
    Ok(())
}

fn declare_slots(graph: &mut ProgramGraph, context: ElementId, flow: DataFlowId) -> Result<(), ResolveError> {
    let slots: Vec<(String, ElementId)> = graph
        .slots(context)?
        .iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    for (name, value) in slots {
        graph.flows_mut().declare_variable(flow, &name, Some(value), Some(context))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_core::element::NumberValue;
    use modelgen_core::{DefaultFactory, Factory};

    // -----------------------------------------------------------------------
    // Graph builders
    // -----------------------------------------------------------------------

    /// `class MyClass { init(a, b, c) { var value; value = a + b; return c(value) } }`
    /// Returns (graph, class, constructor, return operation).
    fn my_class() -> (ProgramGraph, ElementId, ElementId, ElementId) {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let module = f.create_module(&mut graph, "main");
        graph.add_module(module).unwrap();
        let class = f.create_class(&mut graph, "MyClass", Vec::new()).unwrap();
        graph.set_slot(module, "MyClass", class, true).unwrap();

        let params: Vec<ElementId> = ["a", "b", "c"]
            .iter()
            .map(|n| f.create_parameter(&mut graph, n, None).unwrap())
            .collect();
        let init = f.create_constructor(&mut graph, params).unwrap();
        graph.set_slot(class, "init", init, true).unwrap();

        let slot = f.create_parameter(&mut graph, "value", None).unwrap();
        let alloc = f.allocate(&mut graph, slot, None).unwrap();
        graph.add_operation(init, alloc).unwrap();

        let plus = f.create_operator(&mut graph, "+", 10);
        let a = f.create_reference(&mut graph, "a");
        let b = f.create_reference(&mut graph, "b");
        let sum = f.compute(&mut graph, plus, a, Some(b)).unwrap();
        let target = f.create_reference(&mut graph, "value");
        let assign = f.assign(&mut graph, target, sum).unwrap();
        graph.add_operation(init, assign).unwrap();

        let c = f.create_reference(&mut graph, "c");
        let arg = f.create_reference(&mut graph, "value");
        let call = f.invoke(&mut graph, c, vec![arg]).unwrap();
        let ret = f.returns(&mut graph, Some(call)).unwrap();
        graph.add_operation(init, ret).unwrap();

        (graph, class, init, ret)
    }

    fn category_count(graph: &ProgramGraph, flow: DataFlowId, category: SlotCategory) -> usize {
        graph
            .flows()
            .slots(flow)
            .iter()
            .filter(|s| s.category == category)
            .count()
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn constructor_scope_has_arguments_and_local() {
        let (mut graph, class, init, ret) = my_class();
        Resolver::new(ResolverOptions::default()).walk(&mut graph).unwrap();

        let flow = graph.dataflow_of(init).unwrap();
        let arguments: Vec<&str> = graph
            .flows()
            .slots(flow)
            .iter()
            .filter(|s| s.category == SlotCategory::Argument)
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(arguments, vec!["a", "b", "c"]);
        assert_eq!(category_count(&graph, flow, SlotCategory::Local), 1);
        assert_eq!(graph.flows().parent(flow), graph.dataflow_of(class));

        // Resolving from the return statement's scope finds the local.
        let mut context = WalkContext::new();
        for id in graph.ancestors(ret).collect::<Vec<_>>().into_iter().rev() {
            context.push(id);
        }
        context.push(ret);
        let scope = context.dataflow(&graph).unwrap();
        let hit = graph.flows().resolve(scope, "value").unwrap();
        assert_eq!(hit.slot.category, SlotCategory::Local);
        assert_eq!(hit.scope, init);
        // Allocation and assignment both contributed.
        assert_eq!(hit.slot.origins.len(), 2);
    }

    #[test]
    fn program_declares_builtins_and_modules_declare_slots() {
        let (mut graph, class, _, _) = my_class();
        Resolver::new(ResolverOptions::default()).walk(&mut graph).unwrap();

        let program_flow = graph.dataflow_of(graph.root()).unwrap();
        assert_eq!(category_count(&graph, program_flow, SlotCategory::Environment), 4);

        let module = graph.module("main").unwrap();
        let module_flow = graph.dataflow_of(module).unwrap();
        assert_eq!(graph.flows().parent(module_flow), Some(program_flow));
        let hit = graph.flows().resolve_locally(module_flow, "MyClass").unwrap();
        assert_eq!(hit.slot.value, Some(class));

        let class_flow = graph.dataflow_of(class).unwrap();
        assert!(graph.flows().has_slot(class_flow, SELF));
        assert!(graph.flows().has_slot(class_flow, SUPER));
        assert!(graph.flows().resolve(class_flow, "True").is_some());
    }

    #[test]
    fn walking_twice_is_idempotent() {
        let (mut graph, _, init, _) = my_class();
        Resolver::new(ResolverOptions::default()).walk(&mut graph).unwrap();
        let flows = graph.flows().len();
        let slots = graph.flows().slots(graph.dataflow_of(init).unwrap()).len();

        Resolver::new(ResolverOptions::default()).walk(&mut graph).unwrap();
        assert_eq!(graph.flows().len(), flows);
        assert_eq!(graph.flows().slots(graph.dataflow_of(init).unwrap()).len(), slots);
    }

    #[test]
    fn closure_assigning_outer_local_is_marked() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let module = f.create_module(&mut graph, "m");
        graph.add_module(module).unwrap();
        let func = f.create_function(&mut graph, "counter", Vec::new()).unwrap();
        graph.set_slot(module, "counter", func, true).unwrap();

        let count = f.create_parameter(&mut graph, "count", None).unwrap();
        let zero = f.create_number(&mut graph, NumberValue::Int(0));
        let alloc = f.allocate(&mut graph, count, Some(zero)).unwrap();
        graph.add_operation(func, alloc).unwrap();

        let closure = f.create_closure(&mut graph, Vec::new()).unwrap();
        let target = f.create_reference(&mut graph, "count");
        let one = f.create_number(&mut graph, NumberValue::Int(1));
        let assign = f.assign(&mut graph, target, one).unwrap();
        graph.add_operation(closure, assign).unwrap();
        let ret = f.returns(&mut graph, Some(closure)).unwrap();
        graph.add_operation(func, ret).unwrap();

        Resolver::new(ResolverOptions::default()).walk(&mut graph).unwrap();

        let marked = graph.get(closure).unwrap().annotation(MUTATES).unwrap();
        assert_eq!(marked.names(), &["count"]);
        assert!(!graph.get(func).unwrap().has_annotation(MUTATES));

        let closure_flow = graph.dataflow_of(closure).unwrap();
        assert_eq!(graph.flows().parent(closure_flow), graph.dataflow_of(func));
    }

    #[test]
    fn custom_builtins() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let options = ResolverOptions {
            builtins: vec!["console".into()],
        };
        Resolver::new(options).walk(&mut graph).unwrap();
        let flow = graph.dataflow_of(graph.root()).unwrap();
        assert!(graph.flows().has_slot(flow, "console"));
        assert!(!graph.flows().has_slot(flow, "True"));
    }
}
