//! ProgramGraph: the arena holding every element and DataFlow of a program.
//!
//! [`ProgramGraph`] is the single container for a program model. Elements
//! live in a dense arena addressed by [`ElementId`]; DataFlows live in a
//! [`DataFlowGraph`] beside it. Elements are created through a
//! [`Factory`](crate::factory::Factory) and linked through the builder
//! methods here, which enforce the structural invariants:
//!
//! - every element has at most one owner, and ownership is never silently
//!   transferred;
//! - slot values are assignable;
//! - operation arguments respect their kind's signature.

use std::mem;

use serde::{Deserialize, Serialize};

use crate::capability::{Capability, NodeKind};
use crate::dataflow::DataFlowGraph;
use crate::element::{Element, NodeData, ProgramData, SlotList};
use crate::error::CoreError;
use crate::factory::Factory;
use crate::id::{DataFlowId, ElementId, IdAllocator};
use crate::ops::{ArgShape, ArgSpec, OpArg, OpKind, OpView};

/// A name found by absolute lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsoluteBinding {
    /// The context holding the slot (the program for whole modules).
    pub scope: ElementId,
    pub value: ElementId,
}

/// The program model container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgramGraph {
    elements: Vec<Element>,
    flows: DataFlowGraph,
    ids: IdAllocator,
    root: ElementId,
}

impl ProgramGraph {
    /// Creates a graph holding only the program element.
    pub(crate) fn new<F: Factory + ?Sized>(factory: &F, name: Option<&str>) -> Self {
        let mut graph = ProgramGraph {
            elements: Vec::new(),
            flows: DataFlowGraph::new(),
            ids: IdAllocator::new(),
            root: ElementId(0),
        };
        let data = NodeData::Program(ProgramData {
            slots: SlotList::default(),
            modules: Vec::new(),
            factory: factory.name().to_string(),
        });
        graph.root = graph.insert_element(factory, NodeKind::Program, name, data);
        graph
    }

    /// Allocates an id and stores a new, unowned element.
    pub(crate) fn insert_element<F: Factory + ?Sized>(
        &mut self,
        factory: &F,
        kind: NodeKind,
        name: Option<&str>,
        data: NodeData,
    ) -> ElementId {
        let id = self.ids.next_id();
        let mut element = Element {
            id,
            kind,
            name: name.map(str::to_string),
            annotations: Vec::new(),
            abstract_type: None,
            data,
            parent: None,
            dataflow: None,
        };
        factory.prepare(element.kind, &mut element.annotations);
        self.elements.push(element);
        id
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    /// The program element.
    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.index())
    }

    pub fn get(&self, id: ElementId) -> Result<&Element, CoreError> {
        self.element(id).ok_or(CoreError::ElementNotFound { id })
    }

    pub fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, CoreError> {
        self.elements
            .get_mut(id.index())
            .ok_or(CoreError::ElementNotFound { id })
    }

    pub fn kind(&self, id: ElementId) -> Result<NodeKind, CoreError> {
        Ok(self.get(id)?.kind)
    }

    /// Whether `id` exists and satisfies `cap`.
    pub fn satisfies(&self, id: ElementId, cap: Capability) -> bool {
        self.element(id).is_some_and(|el| el.kind.satisfies(cap))
    }

    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.element(id).and_then(Element::name)
    }

    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn flows(&self) -> &DataFlowGraph {
        &self.flows
    }

    pub fn flows_mut(&mut self) -> &mut DataFlowGraph {
        &mut self.flows
    }

    /// Name of the factory that built this program.
    pub fn factory_name(&self) -> &str {
        match self.element(self.root).map(|el| &el.data) {
            Some(NodeData::Program(data)) => &data.factory,
            _ => "",
        }
    }

    fn expect(&self, id: ElementId, cap: Capability) -> Result<&Element, CoreError> {
        let element = self.get(id)?;
        if element.kind.satisfies(cap) {
            Ok(element)
        } else {
            Err(CoreError::CapabilityMismatch {
                id,
                expected: cap,
                found: element.kind,
            })
        }
    }

    fn expect_mut(&mut self, id: ElementId, cap: Capability) -> Result<&mut Element, CoreError> {
        self.expect(id, cap)?;
        self.get_mut(id)
    }

    // -----------------------------------------------------------------------
    // Ownership
    // -----------------------------------------------------------------------

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::parent)
    }

    /// Makes `parent` the owner of `child`. Re-adopting by the same owner is
    /// a no-op; adoption by a different owner fails.
    pub fn adopt(&mut self, parent: ElementId, child: ElementId) -> Result<(), CoreError> {
        self.get(parent)?;
        let element = self.get_mut(child)?;
        match element.parent {
            Some(owner) if owner != parent => Err(CoreError::OwnershipConflict {
                element: child,
                owner,
                claimant: parent,
            }),
            _ => {
                element.parent = Some(parent);
                Ok(())
            }
        }
    }

    /// Adopts every element of `children`, or none of them: all current
    /// owners are checked before any link changes.
    pub fn adopt_all(&mut self, parent: ElementId, children: &[ElementId]) -> Result<(), CoreError> {
        self.get(parent)?;
        for child in children {
            match self.get(*child)?.parent {
                Some(owner) if owner != parent => {
                    return Err(CoreError::OwnershipConflict {
                        element: *child,
                        owner,
                        claimant: parent,
                    })
                }
                _ => {}
            }
        }
        for child in children {
            self.get_mut(*child)?.parent = Some(parent);
        }
        Ok(())
    }

    /// Clears the owner link of `id`. Containers listing the element keep
    /// their entry.
    pub fn detach(&mut self, id: ElementId) -> Result<(), CoreError> {
        self.get_mut(id)?.parent = None;
        Ok(())
    }

    /// Owner chain of `id`, innermost first, excluding `id`.
    pub fn ancestors(&self, id: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        std::iter::successors(self.parent(id), move |el| self.parent(*el))
    }

    // -----------------------------------------------------------------------
    // DataFlow attachment
    // -----------------------------------------------------------------------

    pub fn dataflow_of(&self, id: ElementId) -> Option<DataFlowId> {
        self.element(id).and_then(Element::dataflow)
    }

    /// Attaches `flow` as the DataFlow owned by `id`.
    pub fn attach_dataflow(&mut self, id: ElementId, flow: DataFlowId) -> Result<(), CoreError> {
        self.flows.get(flow)?;
        let element = self.get_mut(id)?;
        match element.dataflow {
            Some(existing) if existing != flow => Err(CoreError::DataFlowAlreadyAttached { id }),
            _ => {
                element.dataflow = Some(flow);
                Ok(())
            }
        }
    }

    /// Creates and attaches a DataFlow for `id` unless it already owns one.
    pub fn ensure_dataflow(&mut self, id: ElementId) -> Result<DataFlowId, CoreError> {
        if let Some(flow) = self.get(id)?.dataflow {
            return Ok(flow);
        }
        let flow = self.flows.create(id);
        self.get_mut(id)?.dataflow = Some(flow);
        Ok(flow)
    }

    // -----------------------------------------------------------------------
    // Slots
    // -----------------------------------------------------------------------

    /// Binds `name` to `value` in `context`. When `assign_parent` is set the
    /// context adopts the value.
    pub fn set_slot(
        &mut self,
        context: ElementId,
        name: &str,
        value: ElementId,
        assign_parent: bool,
    ) -> Result<(), CoreError> {
        self.expect(context, Capability::Context)?;
        let found = self.kind(value)?;
        if !found.satisfies(Capability::Assignable) {
            return Err(CoreError::NotAssignable {
                name: name.to_string(),
                value,
                found,
            });
        }
        if assign_parent {
            self.adopt(context, value)?;
        }
        if let Some(slots) = self.get_mut(context)?.data.slots_mut() {
            slots.bind(name, value);
        }
        Ok(())
    }

    /// The slot list of a context.
    pub fn slots(&self, context: ElementId) -> Result<&SlotList, CoreError> {
        let element = self.expect(context, Capability::Context)?;
        element
            .data
            .slots()
            .ok_or(CoreError::CapabilityMismatch {
                id: context,
                expected: Capability::Context,
                found: element.kind,
            })
    }

    pub fn slot(&self, context: ElementId, name: &str) -> Option<ElementId> {
        self.slots(context).ok().and_then(|slots| slots.get(name))
    }

    pub fn get_slot(&self, context: ElementId, name: &str) -> Result<ElementId, CoreError> {
        self.slots(context)?
            .get(name)
            .ok_or_else(|| CoreError::SlotNotFound {
                context,
                name: name.to_string(),
            })
    }

    /// Local lookup only; scoped lookup goes through the DataFlow.
    pub fn has_slot(&self, context: ElementId, name: &str) -> bool {
        self.slot(context, name).is_some()
    }

    pub fn slot_names(&self, context: ElementId) -> Vec<&str> {
        self.slots(context)
            .map(|slots| slots.names().collect())
            .unwrap_or_default()
    }

    /// Unbinds `name`, detaching the value if `context` owned it.
    pub fn remove_slot(&mut self, context: ElementId, name: &str) -> Result<Option<ElementId>, CoreError> {
        let removed = self
            .expect_mut(context, Capability::Context)?
            .data
            .slots_mut()
            .and_then(|slots| slots.remove(name));
        if let Some(value) = removed {
            if self.parent(value) == Some(context) {
                self.detach(value)?;
            }
        }
        Ok(removed)
    }

    // -----------------------------------------------------------------------
    // Program and modules
    // -----------------------------------------------------------------------

    /// Adds a module to the program. A module whose absolute name is already
    /// taken is merged into the existing one, whose id is returned.
    pub fn add_module(&mut self, module: ElementId) -> Result<ElementId, CoreError> {
        let name = self
            .expect(module, Capability::Module)?
            .name
            .clone()
            .unwrap_or_default();
        if self.modules().contains(&module) {
            return Err(CoreError::ModuleAddedTwice { name });
        }
        if let Some(existing) = self.module(&name) {
            self.merge_module(existing, module)?;
            return Ok(existing);
        }
        let root = self.root;
        self.adopt(root, module)?;
        if let NodeData::Program(data) = &mut self.get_mut(root)?.data {
            data.modules.push(module);
        }
        Ok(module)
    }

    pub fn modules(&self) -> &[ElementId] {
        match self.element(self.root).map(|el| &el.data) {
            Some(NodeData::Program(data)) => &data.modules,
            _ => &[],
        }
    }

    /// The module registered under the absolute name `name`.
    pub fn module(&self, name: &str) -> Option<ElementId> {
        self.modules()
            .iter()
            .copied()
            .find(|m| self.name(*m) == Some(name))
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules().iter().filter_map(|m| self.name(*m)).collect()
    }

    /// Moves imports, annotations and slots of `from` into `into`. `into`
    /// stays a placeholder only if both were placeholders.
    pub fn merge_module(&mut self, into: ElementId, from: ElementId) -> Result<(), CoreError> {
        self.expect(into, Capability::Module)?;
        let source = self.expect_mut(from, Capability::Module)?;
        let annotations = mem::take(&mut source.annotations);
        let (imports, slots, imported) = match &mut source.data {
            NodeData::Module(data) => (
                mem::take(&mut data.imports),
                mem::take(&mut data.slots),
                data.imported,
            ),
            _ => (Vec::new(), SlotList::default(), true),
        };

        for op in imports {
            if self.parent(op) == Some(from) {
                self.detach(op)?;
            }
            self.add_import(into, op)?;
        }
        for (name, value) in slots.iter() {
            let owned = self.parent(value) == Some(from);
            if owned {
                self.detach(value)?;
            }
            self.set_slot(into, name, value, owned)?;
        }
        let target = self.get_mut(into)?;
        target.annotations.extend(annotations);
        if let NodeData::Module(data) = &mut target.data {
            data.imported = data.imported && imported;
        }
        Ok(())
    }

    /// Appends an import operation to a module.
    pub fn add_import(&mut self, module: ElementId, op: ElementId) -> Result<(), CoreError> {
        self.expect(module, Capability::Module)?;
        self.expect(op, Capability::ImportOperation)?;
        self.adopt(module, op)?;
        if let NodeData::Module(data) = &mut self.get_mut(module)?.data {
            data.imports.push(op);
        }
        Ok(())
    }

    pub fn imports(&self, module: ElementId) -> &[ElementId] {
        match self.element(module).map(|el| &el.data) {
            Some(NodeData::Module(data)) => &data.imports,
            _ => &[],
        }
    }

    pub fn is_imported(&self, module: ElementId) -> bool {
        matches!(
            self.element(module).map(|el| &el.data),
            Some(NodeData::Module(data)) if data.imported
        )
    }

    pub fn set_imported(&mut self, module: ElementId, imported: bool) -> Result<(), CoreError> {
        if let NodeData::Module(data) = &mut self.expect_mut(module, Capability::Module)?.data {
            data.imported = imported;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Processes, callables, classes
    // -----------------------------------------------------------------------

    /// Appends an operation to a callable or block.
    pub fn add_operation(&mut self, process: ElementId, op: ElementId) -> Result<(), CoreError> {
        let element = self.expect(process, Capability::Process)?;
        if let NodeData::Callable(data) = &element.data {
            if data.is_abstract {
                return Err(CoreError::AbstractProcess { id: process });
            }
        }
        self.expect(op, Capability::Operation)?;
        self.adopt(process, op)?;
        if let Some(operations) = self.get_mut(process)?.data.operations_mut() {
            operations.push(op);
        }
        Ok(())
    }

    pub fn operations(&self, process: ElementId) -> &[ElementId] {
        self.element(process)
            .and_then(|el| el.data.operations())
            .unwrap_or(&[])
    }

    /// Appends a parameter to a callable.
    pub fn add_parameter(&mut self, callable: ElementId, param: ElementId) -> Result<(), CoreError> {
        self.expect(callable, Capability::Closure)?;
        self.expect(param, Capability::Slot)?;
        self.adopt(callable, param)?;
        if let NodeData::Callable(data) = &mut self.get_mut(callable)?.data {
            data.parameters.push(param);
        }
        Ok(())
    }

    pub fn parameters(&self, callable: ElementId) -> &[ElementId] {
        match self.element(callable).map(|el| &el.data) {
            Some(NodeData::Callable(data)) => &data.parameters,
            _ => &[],
        }
    }

    /// Marks a callable or class abstract.
    pub fn set_abstract(&mut self, id: ElementId, is_abstract: bool) -> Result<(), CoreError> {
        match &mut self.get_mut(id)?.data {
            NodeData::Callable(data) => data.is_abstract = is_abstract,
            NodeData::Class(data) => data.is_abstract = is_abstract,
            _ => {
                let found = self.kind(id)?;
                return Err(CoreError::CapabilityMismatch {
                    id,
                    expected: Capability::Closure,
                    found,
                });
            }
        }
        Ok(())
    }

    pub fn is_abstract(&self, id: ElementId) -> bool {
        match self.element(id).map(|el| &el.data) {
            Some(NodeData::Callable(data)) => data.is_abstract,
            Some(NodeData::Class(data)) => data.is_abstract,
            _ => false,
        }
    }

    pub fn set_return_type(&mut self, callable: ElementId, description: &str) -> Result<(), CoreError> {
        if let NodeData::Callable(data) = &mut self.expect_mut(callable, Capability::Closure)?.data {
            data.return_type = Some(description.to_string());
        }
        Ok(())
    }

    /// Appends a parent class reference. Only references and resolutions can
    /// name a parent class.
    pub fn add_parent_class(&mut self, class: ElementId, reference: ElementId) -> Result<(), CoreError> {
        self.expect(class, Capability::Class)?;
        let found = self.kind(reference)?;
        if !matches!(found, NodeKind::Reference | NodeKind::Operation(OpKind::Resolution)) {
            return Err(CoreError::ParentClassReference { class, found });
        }
        self.adopt(class, reference)?;
        if let NodeData::Class(data) = &mut self.get_mut(class)?.data {
            data.parents.push(reference);
        }
        Ok(())
    }

    pub fn parent_class_refs(&self, class: ElementId) -> &[ElementId] {
        match self.element(class).map(|el| &el.data) {
            Some(NodeData::Class(data)) => &data.parents,
            _ => &[],
        }
    }

    /// Name a parent class reference points at, as written. Resolutions
    /// are flattened into a dotted path.
    pub fn reference_path(&self, reference: ElementId) -> Option<String> {
        let element = self.element(reference)?;
        match element.kind {
            NodeKind::Operation(OpKind::Resolution) => {
                let view = self.op(reference).ok()?;
                let name = self.name(view.reference()?)?;
                match view.context().and_then(|ctx| self.reference_path(ctx)) {
                    Some(prefix) => Some(format!("{prefix}.{name}")),
                    None => Some(name.to_string()),
                }
            }
            _ => element.name.clone(),
        }
    }

    // -----------------------------------------------------------------------
    // Values
    // -----------------------------------------------------------------------

    pub fn add_list_value(&mut self, list: ElementId, value: ElementId) -> Result<(), CoreError> {
        self.expect(list, Capability::List)?;
        self.adopt(list, value)?;
        if let NodeData::List(values) = &mut self.get_mut(list)?.data {
            values.push(value);
        }
        Ok(())
    }

    pub fn set_dict_item(&mut self, dict: ElementId, key: ElementId, value: ElementId) -> Result<(), CoreError> {
        self.expect(dict, Capability::Dict)?;
        self.adopt_all(dict, &[key, value])?;
        if let NodeData::Dict(items) = &mut self.get_mut(dict)?.data {
            items.push((key, value));
        }
        Ok(())
    }

    /// Sets the default value of a parameter or attribute.
    pub fn set_default_value(&mut self, slot: ElementId, value: ElementId) -> Result<(), CoreError> {
        self.expect(slot, Capability::Slot)?;
        self.adopt(slot, value)?;
        if let NodeData::Slot(data) = &mut self.get_mut(slot)?.data {
            data.default_value = Some(value);
        }
        Ok(())
    }

    pub fn default_value(&self, slot: ElementId) -> Option<ElementId> {
        match self.element(slot).map(|el| &el.data) {
            Some(NodeData::Slot(data)) => data.default_value,
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Operation arguments
    // -----------------------------------------------------------------------

    fn op_kind(&self, op: ElementId) -> Result<OpKind, CoreError> {
        let kind = self.expect(op, Capability::Operation)?.kind;
        kind.op_kind().ok_or(CoreError::CapabilityMismatch {
            id: op,
            expected: Capability::Operation,
            found: kind,
        })
    }

    fn op_args_mut(&mut self, op: ElementId) -> Result<&mut Vec<OpArg>, CoreError> {
        let element = self.get_mut(op)?;
        let found = element.kind;
        match &mut element.data {
            NodeData::Operation(data) => Ok(&mut data.args),
            _ => Err(CoreError::CapabilityMismatch {
                id: op,
                expected: Capability::Operation,
                found,
            }),
        }
    }

    /// Named-accessor view over an operation's arguments.
    pub fn op(&self, op: ElementId) -> Result<OpView<'_>, CoreError> {
        let kind = self.op_kind(op)?;
        match &self.get(op)?.data {
            NodeData::Operation(data) => Ok(OpView::new(op, kind, &data.args)),
            _ => Ok(OpView::new(op, kind, &[])),
        }
    }

    pub fn op_arguments(&self, op: ElementId) -> &[OpArg] {
        match self.element(op).map(|el| &el.data) {
            Some(NodeData::Operation(data)) => &data.args,
            _ => &[],
        }
    }

    pub fn op_argument(&self, op: ElementId, index: usize) -> Option<&OpArg> {
        self.op_arguments(op).get(index)
    }

    /// Appends an argument at the next position.
    pub fn add_op_argument(&mut self, op: ElementId, arg: OpArg) -> Result<(), CoreError> {
        let kind = self.op_kind(op)?;
        let position = self.op_arguments(op).len();
        let spec = kind
            .signature()
            .get(position)
            .ok_or(CoreError::ArityExceeded {
                op,
                kind,
                arity: kind.arity(),
            })?;
        self.check_argument(op, position, spec, &arg)?;
        self.adopt_all(op, &arg.element_ids())?;
        self.op_args_mut(op)?.push(arg);
        Ok(())
    }

    /// Replaces the argument at `position`, padding skipped positions with
    /// [`OpArg::None`]. Only optional positions may be skipped. The replaced
    /// elements are detached.
    pub fn set_op_argument(&mut self, op: ElementId, position: usize, arg: OpArg) -> Result<(), CoreError> {
        let kind = self.op_kind(op)?;
        let spec = kind
            .signature()
            .get(position)
            .ok_or(CoreError::ArityExceeded {
                op,
                kind,
                arity: kind.arity(),
            })?;
        self.check_argument(op, position, spec, &arg)?;
        let filled = self.op_arguments(op).len();
        if let Some((skipped, required)) = kind
            .signature()
            .iter()
            .enumerate()
            .take(position)
            .skip(filled)
            .find(|(_, spec)| !spec.optional)
        {
            return Err(CoreError::MissingArgument {
                op,
                position: skipped,
                name: required.name.to_string(),
            });
        }
        self.adopt_all(op, &arg.element_ids())?;
        let args = self.op_args_mut(op)?;
        if args.len() <= position {
            args.resize(position + 1, OpArg::None);
        }
        let replaced = mem::replace(&mut args[position], arg);
        for old in replaced.element_ids() {
            if self.parent(old) == Some(op) && !self.op_arguments(op)[position].element_ids().contains(&old) {
                self.detach(old)?;
            }
        }
        Ok(())
    }

    /// Appends a rule to a selection.
    pub fn add_rule(&mut self, selection: ElementId, rule: ElementId) -> Result<(), CoreError> {
        self.append_to_list_argument(selection, OpKind::Selection, 0, rule)
    }

    /// Appends an operation group to a chain. The target must be set first.
    pub fn add_group(&mut self, chain: ElementId, group: ElementId) -> Result<(), CoreError> {
        self.append_to_list_argument(chain, OpKind::Chain, 1, group)
    }

    fn append_to_list_argument(
        &mut self,
        op: ElementId,
        expected: OpKind,
        position: usize,
        item: ElementId,
    ) -> Result<(), CoreError> {
        self.expect(op, Capability::Op(expected))?;
        let spec = expected.signature()[position];
        if let ArgShape::Nodes(cap) = spec.shape {
            let found = self.kind(item)?;
            if !found.satisfies(cap) {
                return Err(CoreError::ArgumentCapability {
                    op,
                    position,
                    expected: cap,
                    found,
                });
            }
        }
        let len = self.op_arguments(op).len();
        if len < position {
            let name = expected.signature()[len].name;
            return Err(CoreError::MissingArgument {
                op,
                position: len,
                name: name.to_string(),
            });
        }
        self.adopt(op, item)?;
        let args = self.op_args_mut(op)?;
        match args.get_mut(position) {
            Some(OpArg::Nodes(items)) => items.push(item),
            Some(slot) => *slot = OpArg::Nodes(vec![item]),
            None => args.push(OpArg::Nodes(vec![item])),
        }
        Ok(())
    }

    fn check_argument(&self, op: ElementId, position: usize, spec: &ArgSpec, arg: &OpArg) -> Result<(), CoreError> {
        let shape_error = || CoreError::ArgumentShape {
            op,
            position,
            expected: describe_shape(spec.shape),
        };
        match (spec.shape, arg) {
            (_, OpArg::None) => {
                if spec.optional {
                    Ok(())
                } else {
                    Err(CoreError::MissingArgument {
                        op,
                        position,
                        name: spec.name.to_string(),
                    })
                }
            }
            (ArgShape::Node(cap), OpArg::Node(id)) => self.check_capability(op, position, cap, *id),
            (ArgShape::Nodes(cap), OpArg::Nodes(ids)) => ids
                .iter()
                .try_for_each(|id| self.check_capability(op, position, cap, *id)),
            (ArgShape::Text, OpArg::Text(_)) | (ArgShape::Texts, OpArg::Texts(_)) => Ok(()),
            _ => Err(shape_error()),
        }
    }

    fn check_capability(&self, op: ElementId, position: usize, cap: Capability, id: ElementId) -> Result<(), CoreError> {
        let found = self.kind(id)?;
        if found.satisfies(cap) {
            Ok(())
        } else {
            Err(CoreError::ArgumentCapability {
                op,
                position,
                expected: cap,
                found,
            })
        }
    }

    // -----------------------------------------------------------------------
    // Traversal and naming
    // -----------------------------------------------------------------------

    /// Children of `id` in the order passes visit them: modules of the
    /// program, slot values of contexts, then operations of processes,
    /// then the nodes held by operations and values.
    pub fn children(&self, id: ElementId) -> Vec<ElementId> {
        let Some(element) = self.element(id) else {
            return Vec::new();
        };
        let mut children = Vec::new();
        if let NodeData::Program(data) = &element.data {
            children.extend(data.modules.iter().copied());
        }
        if let Some(slots) = element.data.slots() {
            children.extend(slots.values());
        }
        match &element.data {
            NodeData::Callable(data) => children.extend(data.operations.iter().copied()),
            NodeData::Block(data) => children.extend(data.operations.iter().copied()),
            NodeData::Operation(data) => children.extend(data.args.iter().flat_map(OpArg::element_ids)),
            NodeData::List(values) => children.extend(values.iter().copied()),
            NodeData::Dict(items) => children.extend(items.iter().flat_map(|(k, v)| [*k, *v])),
            NodeData::Slot(data) => children.extend(data.default_value),
            NodeData::Argument(data) => children.extend(data.value),
            _ => {}
        }
        children
    }

    /// Dotted name of `id`. Modules are named absolutely; other elements
    /// extend their owner's absolute name. The program has none.
    pub fn absolute_name(&self, id: ElementId) -> Option<String> {
        let element = self.element(id)?;
        match element.kind {
            NodeKind::Program => None,
            NodeKind::Module => element.name.clone(),
            _ => {
                let name = element.name.as_deref()?;
                match element.parent.and_then(|p| self.absolute_name(p)) {
                    Some(prefix) => Some(format!("{prefix}.{name}")),
                    None => Some(name.to_string()),
                }
            }
        }
    }

    /// Looks up a dotted name: a module, or a module followed by slot names
    /// of nested contexts. The longest module prefix wins.
    pub fn resolve_absolute(&self, name: &str) -> Option<AbsoluteBinding> {
        if let Some(module) = self.module(name) {
            return Some(AbsoluteBinding {
                scope: self.root,
                value: module,
            });
        }
        name.rmatch_indices('.').find_map(|(dot, _)| {
            let module = self.module(&name[..dot])?;
            self.lookup_path(module, &name[dot + 1..])
        })
    }

    fn lookup_path(&self, context: ElementId, path: &str) -> Option<AbsoluteBinding> {
        let mut scope = context;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            let value = self.slot(scope, segment)?;
            if segments.peek().is_none() {
                return Some(AbsoluteBinding { scope, value });
            }
            scope = value;
        }
        None
    }

    // -----------------------------------------------------------------------
    // Copying
    // -----------------------------------------------------------------------

    /// Deep-copies `id`. Operations, parameters, list items and defaults are
    /// copied recursively; slot containers are cloned with their values
    /// shared; the DataFlow, if any, is cloned and attached to the copy.
    /// The copy has no owner.
    pub fn copy(&mut self, id: ElementId) -> Result<ElementId, CoreError> {
        let source = self.get(id)?.clone();
        let mut data = source.data;
        match &mut data {
            NodeData::Callable(callable) => {
                callable.parameters = self.copy_all(&callable.parameters)?;
                callable.operations = self.copy_all(&callable.operations)?;
            }
            NodeData::Block(block) => block.operations = self.copy_all(&block.operations)?,
            NodeData::Class(class) => class.parents = self.copy_all(&class.parents)?,
            NodeData::Operation(op) => {
                for arg in op.args.iter_mut() {
                    match arg {
                        OpArg::Node(node) => *node = self.copy(*node)?,
                        OpArg::Nodes(nodes) => *nodes = self.copy_all(nodes)?,
                        _ => {}
                    }
                }
            }
            NodeData::List(values) => *values = self.copy_all(values)?,
            NodeData::Dict(items) => {
                for (key, value) in items.iter_mut() {
                    *key = self.copy(*key)?;
                    *value = self.copy(*value)?;
                }
            }
            NodeData::Slot(slot) => {
                if let Some(value) = slot.default_value {
                    slot.default_value = Some(self.copy(value)?);
                }
            }
            NodeData::Argument(arg) => {
                if let Some(value) = arg.value {
                    arg.value = Some(self.copy(value)?);
                }
            }
            _ => {}
        }

        let owned = data.owned_children();
        let copy_id = self.ids.next_id();
        self.elements.push(Element {
            id: copy_id,
            kind: source.kind,
            name: source.name,
            annotations: source.annotations,
            abstract_type: source.abstract_type,
            data,
            parent: None,
            dataflow: None,
        });
        for child in owned {
            self.adopt(copy_id, child)?;
        }
        if let Some(flow) = source.dataflow {
            let cloned = self.flows.clone_flow(flow, copy_id)?;
            self.get_mut(copy_id)?.dataflow = Some(cloned);
        }

        Ok(copy_id)
    }

    fn copy_all(&mut self, ids: &[ElementId]) -> Result<Vec<ElementId>, CoreError> {
        ids.iter().map(|id| self.copy(*id)).collect()
    }

    // -----------------------------------------------------------------------
    // Consistency (tests only)
    // -----------------------------------------------------------------------

    /// Asserts that arena positions match ids and that every exclusively
    /// owned child points back at its owner.
    #[cfg(test)]
    fn assert_consistency(&self) {
        for (index, element) in self.elements.iter().enumerate() {
            assert_eq!(
                element.id.index(),
                index,
                "Element {:?} stored at arena position {}",
                element.id,
                index
            );
            for child in element.data.owned_children() {
                assert_eq!(
                    self.parent(child),
                    Some(element.id),
                    "Element {:?} lists {:?} but does not own it",
                    element.id,
                    child
                );
            }
        }
    }
}

fn describe_shape(shape: ArgShape) -> String {
    match shape {
        ArgShape::Node(cap) => format!("a {cap}"),
        ArgShape::Nodes(cap) => format!("a list of {cap}"),
        ArgShape::Text => "a name".to_string(),
        ArgShape::Texts => "a list of names".to_string(),
    }
}
