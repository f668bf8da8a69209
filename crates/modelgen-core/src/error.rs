//! Core error types for modelgen-core.
//!
//! Uses `thiserror` for structured, matchable error variants. Construction
//! errors are raised at the offending mutation; resolution-consistency errors
//! signal a defect in a pass or a custom node kind.

use thiserror::Error;

use crate::capability::{Capability, NodeKind};
use crate::id::{DataFlowId, ElementId};
use crate::ops::OpKind;

/// Core errors produced by the modelgen-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An element handle does not belong to this graph.
    #[error("element not found: ElementId({id})", id = id.0)]
    ElementNotFound { id: ElementId },

    /// A DataFlow handle does not belong to this graph.
    #[error("dataflow not found: DataFlowId({id})", id = id.0)]
    DataFlowNotFound { id: DataFlowId },

    /// An element was used in a role its kind does not satisfy.
    #[error("element {id} is a {found}, expected {expected}")]
    CapabilityMismatch {
        id: ElementId,
        expected: Capability,
        found: NodeKind,
    },

    /// A factory method was asked for a kind outside its family.
    #[error("cannot create a {kind} here, expected a kind of {expected}")]
    UnexpectedKind { kind: NodeKind, expected: Capability },

    /// A slot value must be assignable.
    #[error("cannot bind '{name}' to element {value}: a {found} is not assignable")]
    NotAssignable {
        name: String,
        value: ElementId,
        found: NodeKind,
    },

    /// An element already owned by one parent was claimed by another.
    #[error("element {element} is owned by {owner}, cannot be adopted by {claimant}")]
    OwnershipConflict {
        element: ElementId,
        owner: ElementId,
        claimant: ElementId,
    },

    /// No slot with that name in the context.
    #[error("no slot '{name}' in element {context}")]
    SlotNotFound { context: ElementId, name: String },

    /// The same module element was added to the program twice.
    #[error("module '{name}' added twice")]
    ModuleAddedTwice { name: String },

    /// Operations cannot be added to an abstract callable.
    #[error("cannot add operations to abstract element {id}")]
    AbstractProcess { id: ElementId },

    /// Parent classes are named through references or resolutions.
    #[error("parent class of {class} must be a reference or resolution, got a {found}")]
    ParentClassReference { class: ElementId, found: NodeKind },

    /// More arguments than the operation kind declares.
    #[error("{kind} operation {op} takes at most {arity} argument(s)")]
    ArityExceeded {
        op: ElementId,
        kind: OpKind,
        arity: usize,
    },

    /// An argument does not satisfy its position's capability.
    #[error("argument {position} of operation {op} must be {expected}, got a {found}")]
    ArgumentCapability {
        op: ElementId,
        position: usize,
        expected: Capability,
        found: NodeKind,
    },

    /// An argument has the wrong shape (node, node list, text, text list).
    #[error("argument {position} of operation {op} has the wrong shape, expected {expected}")]
    ArgumentShape {
        op: ElementId,
        position: usize,
        expected: String,
    },

    /// A required argument position was left empty.
    #[error("argument {position} ('{name}') of operation {op} is required")]
    MissingArgument {
        op: ElementId,
        position: usize,
        name: String,
    },

    /// An element already owns a different DataFlow.
    #[error("element {id} already owns a dataflow")]
    DataFlowAlreadyAttached { id: ElementId },

    /// An operation needing a resolved scope ran before the resolver.
    #[error("element {id} has no dataflow")]
    NoDataFlow { id: ElementId },

    /// A DataFlow's parent was set twice to different flows.
    #[error("dataflow {flow} already has parent {current}, cannot reparent to {requested}")]
    DataFlowReparented {
        flow: DataFlowId,
        current: DataFlowId,
        requested: DataFlowId,
    },

    /// Setting the parent would make a flow its own ancestor.
    #[error("dataflow {flow} would become its own ancestor")]
    DataFlowCycle { flow: DataFlowId },

    /// A DataFlow cannot be its own source.
    #[error("dataflow {flow} cannot be its own source")]
    SelfSource { flow: DataFlowId },
}
