//! The Factory: the sanctioned way to create model elements.
//!
//! Every creation method is a provided method that stores the element in the
//! graph's arena and links its children through the validating builder
//! methods on [`ProgramGraph`]. A deployment customizes elements by
//! implementing [`Factory::prepare`], which may annotate each element before
//! it is stored. Kind, payload and ownership stay out of its reach.

use crate::capability::{Capability, NodeKind};
use crate::element::{
    Annotation, ArgumentData, BlockData, CallableData, ClassData, ModuleData, NodeData, NumberValue,
    OperationData, SlotData,
};
use crate::error::CoreError;
use crate::graph::ProgramGraph;
use crate::id::ElementId;
use crate::ops::{OpArg, OpKind};

/// Creates model elements inside a [`ProgramGraph`].
pub trait Factory {
    /// Identifies the factory; recorded on the program.
    fn name(&self) -> &str {
        "default"
    }

    /// Called on every element before it is stored, with the element's kind
    /// and its annotation list.
    fn prepare(&self, _kind: NodeKind, _annotations: &mut Vec<Annotation>) {}

    // -----------------------------------------------------------------------
    // Contexts
    // -----------------------------------------------------------------------

    /// Creates a new program graph whose root is the program element.
    fn create_program(&self, name: Option<&str>) -> ProgramGraph {
        ProgramGraph::new(self, name)
    }

    /// Creates a module named by its absolute dotted name. The module is not
    /// added to the program; see [`ProgramGraph::add_module`].
    fn create_module(&self, graph: &mut ProgramGraph, name: &str) -> ElementId {
        graph.insert_element(self, NodeKind::Module, Some(name), NodeData::Module(ModuleData::default()))
    }

    fn create_class(&self, graph: &mut ProgramGraph, name: &str, parents: Vec<ElementId>) -> Result<ElementId, CoreError> {
        let class = graph.insert_element(self, NodeKind::Class, Some(name), NodeData::Class(ClassData::default()));
        for parent in parents {
            graph.add_parent_class(class, parent)?;
        }
        Ok(class)
    }

    fn create_interface(&self, graph: &mut ProgramGraph, name: &str, parents: Vec<ElementId>) -> Result<ElementId, CoreError> {
        let interface = graph.insert_element(self, NodeKind::Interface, Some(name), NodeData::Class(ClassData::default()));
        for parent in parents {
            graph.add_parent_class(interface, parent)?;
        }
        Ok(interface)
    }

    /// Creates any member of the closure family.
    fn create_callable(
        &self,
        graph: &mut ProgramGraph,
        kind: NodeKind,
        name: Option<&str>,
        parameters: Vec<ElementId>,
    ) -> Result<ElementId, CoreError> {
        if !kind.is_callable() {
            return Err(CoreError::UnexpectedKind {
                kind,
                expected: Capability::Closure,
            });
        }
        let callable = graph.insert_element(self, kind, name, NodeData::Callable(CallableData::default()));
        for param in parameters {
            graph.add_parameter(callable, param)?;
        }
        Ok(callable)
    }

    fn create_closure(&self, graph: &mut ProgramGraph, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Closure, None, parameters)
    }

    fn create_function(&self, graph: &mut ProgramGraph, name: &str, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Function, Some(name), parameters)
    }

    fn create_method(&self, graph: &mut ProgramGraph, name: &str, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Method, Some(name), parameters)
    }

    fn create_instance_method(&self, graph: &mut ProgramGraph, name: &str, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::InstanceMethod, Some(name), parameters)
    }

    fn create_class_method(&self, graph: &mut ProgramGraph, name: &str, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::ClassMethod, Some(name), parameters)
    }

    fn create_constructor(&self, graph: &mut ProgramGraph, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Constructor, Some("init"), parameters)
    }

    fn create_destructor(&self, graph: &mut ProgramGraph) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Destructor, Some("cleanup"), Vec::new())
    }

    fn create_accessor(&self, graph: &mut ProgramGraph, name: &str) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Accessor, Some(name), Vec::new())
    }

    fn create_mutator(&self, graph: &mut ProgramGraph, name: &str, parameters: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_callable(graph, NodeKind::Mutator, Some(name), parameters)
    }

    fn create_block(&self, graph: &mut ProgramGraph, operations: Vec<ElementId>) -> Result<ElementId, CoreError> {
        let block = graph.insert_element(self, NodeKind::Block, None, NodeData::Block(BlockData::default()));
        for op in operations {
            graph.add_operation(block, op)?;
        }
        Ok(block)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Creates an operation and adds `args` position by position.
    fn create_operation(&self, graph: &mut ProgramGraph, kind: OpKind, args: Vec<OpArg>) -> Result<ElementId, CoreError> {
        let op = graph.insert_element(self, NodeKind::Operation(kind), None, NodeData::Operation(OperationData::default()));
        for arg in args {
            graph.add_op_argument(op, arg)?;
        }
        Ok(op)
    }

    fn allocate(&self, graph: &mut ProgramGraph, slot: ElementId, default: Option<ElementId>) -> Result<ElementId, CoreError> {
        let mut args = vec![OpArg::Node(slot)];
        if default.is_some() {
            args.push(default.into());
        }
        self.create_operation(graph, OpKind::Allocation, args)
    }

    fn assign(&self, graph: &mut ProgramGraph, target: ElementId, value: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Assignment, vec![target.into(), value.into()])
    }

    fn resolve(&self, graph: &mut ProgramGraph, reference: ElementId, context: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Resolution, vec![reference.into(), context.into()])
    }

    fn compute(
        &self,
        graph: &mut ProgramGraph,
        operator: ElementId,
        left: ElementId,
        right: Option<ElementId>,
    ) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Computation, vec![operator.into(), left.into(), right.into()])
    }

    fn invoke(&self, graph: &mut ProgramGraph, target: ElementId, arguments: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Invocation, vec![target.into(), arguments.into()])
    }

    fn instanciate(&self, graph: &mut ProgramGraph, target: ElementId, arguments: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Instanciation, vec![target.into(), arguments.into()])
    }

    fn select(&self, graph: &mut ProgramGraph, rules: Vec<ElementId>) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Selection, vec![rules.into()])
    }

    fn match_process(&self, graph: &mut ProgramGraph, predicate: ElementId, process: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::MatchProcess, vec![predicate.into(), process.into()])
    }

    fn match_expression(&self, graph: &mut ProgramGraph, predicate: ElementId, expression: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::MatchExpression, vec![predicate.into(), expression.into()])
    }

    fn iterate(&self, graph: &mut ProgramGraph, iterator: ElementId, closure: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Iteration, vec![iterator.into(), closure.into()])
    }

    fn repeat(&self, graph: &mut ProgramGraph, condition: ElementId, process: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Repetition, vec![condition.into(), process.into()])
    }

    fn access(&self, graph: &mut ProgramGraph, target: ElementId, index: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Access, vec![target.into(), index.into()])
    }

    fn evaluate(&self, graph: &mut ProgramGraph, evaluable: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Evaluation, vec![evaluable.into()])
    }

    fn returns(&self, graph: &mut ProgramGraph, value: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Termination, vec![value.into()])
    }

    fn except(&self, graph: &mut ProgramGraph, value: ElementId) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Except, vec![value.into()])
    }

    fn embed(&self, graph: &mut ProgramGraph, language: &str, code: &str) -> Result<ElementId, CoreError> {
        self.create_operation(graph, OpKind::Embed, vec![language.into(), code.into()])
    }

    fn import_module(&self, graph: &mut ProgramGraph, module: &str, alias: Option<&str>) -> Result<ElementId, CoreError> {
        let mut args = vec![OpArg::from(module)];
        if let Some(alias) = alias {
            args.push(alias.into());
        }
        self.create_operation(graph, OpKind::ImportModule, args)
    }

    fn import_modules(&self, graph: &mut ProgramGraph, modules: &[&str]) -> Result<ElementId, CoreError> {
        let names = modules.iter().map(|m| m.to_string()).collect();
        self.create_operation(graph, OpKind::ImportModules, vec![OpArg::Texts(names)])
    }

    fn import_symbol(
        &self,
        graph: &mut ProgramGraph,
        symbol: &str,
        origin: Option<&str>,
        alias: Option<&str>,
    ) -> Result<ElementId, CoreError> {
        let text = |t: Option<&str>| t.map_or(OpArg::None, OpArg::from);
        self.create_operation(graph, OpKind::ImportSymbol, vec![symbol.into(), text(origin), text(alias)])
    }

    fn import_symbols(&self, graph: &mut ProgramGraph, symbols: &[&str], origin: Option<&str>) -> Result<ElementId, CoreError> {
        let names = symbols.iter().map(|s| s.to_string()).collect();
        let origin = origin.map_or(OpArg::None, OpArg::from);
        self.create_operation(graph, OpKind::ImportSymbols, vec![OpArg::Texts(names), origin])
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    fn create_number(&self, graph: &mut ProgramGraph, value: NumberValue) -> ElementId {
        graph.insert_element(self, NodeKind::Number, None, NodeData::Number(value))
    }

    fn create_string(&self, graph: &mut ProgramGraph, value: &str) -> ElementId {
        graph.insert_element(self, NodeKind::String, None, NodeData::String(value.to_string()))
    }

    fn create_list(&self, graph: &mut ProgramGraph, values: Vec<ElementId>) -> Result<ElementId, CoreError> {
        let list = graph.insert_element(self, NodeKind::List, None, NodeData::List(Vec::new()));
        for value in values {
            graph.add_list_value(list, value)?;
        }
        Ok(list)
    }

    fn create_dict(&self, graph: &mut ProgramGraph, items: Vec<(ElementId, ElementId)>) -> Result<ElementId, CoreError> {
        let dict = graph.insert_element(self, NodeKind::Dict, None, NodeData::Dict(Vec::new()));
        for (key, value) in items {
            graph.set_dict_item(dict, key, value)?;
        }
        Ok(dict)
    }

    fn create_reference(&self, graph: &mut ProgramGraph, name: &str) -> ElementId {
        graph.insert_element(self, NodeKind::Reference, Some(name), NodeData::Reference)
    }

    fn create_operator(&self, graph: &mut ProgramGraph, symbol: &str, priority: u32) -> ElementId {
        graph.insert_element(self, NodeKind::Operator, Some(symbol), NodeData::Operator { priority })
    }

    /// An invocation argument. A name makes it a by-name argument.
    fn create_argument(&self, graph: &mut ProgramGraph, value: ElementId, name: Option<&str>) -> Result<ElementId, CoreError> {
        let data = NodeData::Argument(ArgumentData {
            value: Some(value),
            ..ArgumentData::default()
        });
        let argument = graph.insert_element(self, NodeKind::Argument, name, data);
        graph.adopt(argument, value)?;
        Ok(argument)
    }

    /// Creates a parameter or attribute of the given slot kind.
    fn create_slot(
        &self,
        graph: &mut ProgramGraph,
        kind: NodeKind,
        name: &str,
        type_description: Option<&str>,
        default: Option<ElementId>,
    ) -> Result<ElementId, CoreError> {
        if !kind.is_slot() || kind == NodeKind::Argument {
            return Err(CoreError::UnexpectedKind {
                kind,
                expected: Capability::Slot,
            });
        }
        let data = NodeData::Slot(SlotData {
            type_description: type_description.map(str::to_string),
            ..SlotData::default()
        });
        let slot = graph.insert_element(self, kind, Some(name), data);
        if let Some(value) = default {
            graph.set_default_value(slot, value)?;
        }
        Ok(slot)
    }

    fn create_parameter(&self, graph: &mut ProgramGraph, name: &str, default: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_slot(graph, NodeKind::Parameter, name, None, default)
    }

    fn create_attribute(&self, graph: &mut ProgramGraph, name: &str, default: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_slot(graph, NodeKind::Attribute, name, None, default)
    }

    fn create_class_attribute(&self, graph: &mut ProgramGraph, name: &str, default: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_slot(graph, NodeKind::ClassAttribute, name, None, default)
    }

    fn create_module_attribute(&self, graph: &mut ProgramGraph, name: &str, default: Option<ElementId>) -> Result<ElementId, CoreError> {
        self.create_slot(graph, NodeKind::ModuleAttribute, name, None, default)
    }
}

/// The stock factory: no customization.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFactory;

impl Factory for DefaultFactory {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::DOCUMENTATION;

    struct Tagging;

    impl Factory for Tagging {
        fn name(&self) -> &str {
            "tagging"
        }

        fn prepare(&self, kind: NodeKind, annotations: &mut Vec<Annotation>) {
            if kind == NodeKind::Module {
                annotations.push(Annotation::text(DOCUMENTATION, "generated"));
            }
        }
    }

    #[test]
    fn program_records_factory() {
        let graph = DefaultFactory.create_program(None);
        assert_eq!(graph.factory_name(), "default");
        assert_eq!(graph.kind(graph.root()).unwrap(), NodeKind::Program);
    }

    #[test]
    fn custom_factory_prepares_every_element() {
        let f = Tagging;
        let mut graph = f.create_program(Some("app"));
        let module = f.create_module(&mut graph, "app.main");
        assert_eq!(graph.factory_name(), "tagging");
        assert_eq!(graph.get(module).unwrap().documentation(), Some("generated"));

        let r = f.create_reference(&mut graph, "x");
        assert_eq!(graph.get(r).unwrap().documentation(), None);
        assert_eq!(graph.kind(r).unwrap(), NodeKind::Reference);
    }

    #[test]
    fn callable_parameters_are_owned() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let a = f.create_parameter(&mut graph, "a", None).unwrap();
        let b = f.create_parameter(&mut graph, "b", None).unwrap();
        let func = f.create_function(&mut graph, "add", vec![a, b]).unwrap();

        assert_eq!(graph.parameters(func), &[a, b]);
        assert_eq!(graph.parent(a), Some(func));
    }

    #[test]
    fn non_slot_parameter_rejected() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let r = f.create_reference(&mut graph, "a");
        match f.create_function(&mut graph, "g", vec![r]) {
            Err(CoreError::CapabilityMismatch { expected, .. }) => {
                assert_eq!(expected, Capability::Slot)
            }
            other => panic!("Expected CapabilityMismatch, got {:?}", other),
        }
    }

    #[test]
    fn create_callable_rejects_other_kinds() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        match f.create_callable(&mut graph, NodeKind::Block, None, Vec::new()) {
            Err(CoreError::UnexpectedKind { kind, expected }) => {
                assert_eq!(kind, NodeKind::Block);
                assert_eq!(expected, Capability::Closure);
            }
            other => panic!("Expected UnexpectedKind, got {:?}", other),
        }
        assert_eq!(graph.element_count(), 1);

        match f.create_slot(&mut graph, NodeKind::Argument, "a", None, None) {
            Err(CoreError::UnexpectedKind { expected, .. }) => assert_eq!(expected, Capability::Slot),
            other => panic!("Expected UnexpectedKind, got {:?}", other),
        }
    }

    #[test]
    fn import_symbol_arguments() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let op = f
            .import_symbol(&mut graph, "Widget", Some("ui.widgets"), None)
            .unwrap();
        let view = graph.op(op).unwrap();
        assert_eq!(view.imported_name(), Some("Widget"));
        assert_eq!(view.origin(), Some("ui.widgets"));
        assert_eq!(view.alias(), None);
    }
}
