//! Operation kinds, their static argument signatures, and positional
//! argument values.
//!
//! Each [`OpKind`] declares a fixed arity and, per position, the shape and
//! capability the argument must satisfy. [`ProgramGraph`] validates every
//! argument against this table when it is added, so an operation never holds
//! more arguments than its kind declares.
//!
//! [`ProgramGraph`]: crate::graph::ProgramGraph

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::capability::Capability;
use crate::id::ElementId;

/// The concrete kind of an operation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    Allocation,
    Assignment,
    Resolution,
    Computation,
    Invocation,
    Instanciation,
    Selection,
    MatchProcess,
    MatchExpression,
    Iteration,
    Enumeration,
    Repetition,
    Access,
    Slice,
    Evaluation,
    Termination,
    Breaking,
    Continue,
    Except,
    Interception,
    Chain,
    Embed,
    Nop,
    ImportModule,
    ImportModules,
    ImportSymbol,
    ImportSymbols,
}

// ---------------------------------------------------------------------------
// Signatures
// ---------------------------------------------------------------------------

/// What a single argument position holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// One element satisfying the capability.
    Node(Capability),
    /// An ordered list of elements, each satisfying the capability.
    Nodes(Capability),
    /// A plain name or source text.
    Text,
    /// An ordered list of names.
    Texts,
}

/// Declaration of one argument position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    pub name: &'static str,
    pub shape: ArgShape,
    /// Optional positions may hold [`OpArg::None`].
    pub optional: bool,
}

const fn req(name: &'static str, shape: ArgShape) -> ArgSpec {
    ArgSpec {
        name,
        shape,
        optional: false,
    }
}

const fn opt(name: &'static str, shape: ArgShape) -> ArgSpec {
    ArgSpec {
        name,
        shape,
        optional: true,
    }
}

const EVALUABLE: ArgShape = ArgShape::Node(Capability::Evaluable);
const PROCESS: ArgShape = ArgShape::Node(Capability::Process);

const ALLOCATION: &[ArgSpec] = &[
    req("slot", ArgShape::Node(Capability::Slot)),
    opt("default", EVALUABLE),
];
const ASSIGNMENT: &[ArgSpec] = &[req("target", EVALUABLE), req("value", EVALUABLE)];
const RESOLUTION: &[ArgSpec] = &[
    req("reference", ArgShape::Node(Capability::Reference)),
    opt("context", EVALUABLE),
];
const COMPUTATION: &[ArgSpec] = &[
    req("operator", ArgShape::Node(Capability::Operator)),
    req("left", EVALUABLE),
    opt("right", EVALUABLE),
];
const INVOCATION: &[ArgSpec] = &[
    req("target", EVALUABLE),
    opt("arguments", ArgShape::Nodes(Capability::Evaluable)),
];
const SELECTION: &[ArgSpec] = &[req("rules", ArgShape::Nodes(Capability::MatchOperation))];
const MATCH_PROCESS: &[ArgSpec] = &[req("predicate", EVALUABLE), req("process", PROCESS)];
const MATCH_EXPRESSION: &[ArgSpec] = &[req("predicate", EVALUABLE), req("expression", EVALUABLE)];
const ITERATION: &[ArgSpec] = &[req("iterator", EVALUABLE), req("closure", EVALUABLE)];
const ENUMERATION: &[ArgSpec] = &[
    req("start", EVALUABLE),
    req("end", EVALUABLE),
    opt("step", EVALUABLE),
];
const REPETITION: &[ArgSpec] = &[req("condition", EVALUABLE), req("process", PROCESS)];
const ACCESS: &[ArgSpec] = &[req("target", EVALUABLE), req("index", EVALUABLE)];
const SLICE: &[ArgSpec] = &[
    req("target", EVALUABLE),
    opt("start", EVALUABLE),
    opt("end", EVALUABLE),
];
const EVALUATION: &[ArgSpec] = &[req("evaluable", EVALUABLE)];
const TERMINATION: &[ArgSpec] = &[opt("value", EVALUABLE)];
const EXCEPT: &[ArgSpec] = &[req("value", EVALUABLE)];
const INTERCEPTION: &[ArgSpec] = &[
    req("try", PROCESS),
    opt("catch", PROCESS),
    opt("finally", PROCESS),
];
const CHAIN: &[ArgSpec] = &[
    req("target", EVALUABLE),
    opt("groups", ArgShape::Nodes(Capability::Operation)),
];
const EMBED: &[ArgSpec] = &[req("language", ArgShape::Text), req("code", ArgShape::Text)];
const IMPORT_MODULE: &[ArgSpec] = &[req("module", ArgShape::Text), opt("alias", ArgShape::Text)];
const IMPORT_MODULES: &[ArgSpec] = &[req("modules", ArgShape::Texts)];
const IMPORT_SYMBOL: &[ArgSpec] = &[
    req("symbol", ArgShape::Text),
    opt("origin", ArgShape::Text),
    opt("alias", ArgShape::Text),
];
const IMPORT_SYMBOLS: &[ArgSpec] = &[req("symbols", ArgShape::Texts), opt("origin", ArgShape::Text)];
const NONE: &[ArgSpec] = &[];

impl OpKind {
    /// Static argument signature of this kind.
    pub fn signature(self) -> &'static [ArgSpec] {
        match self {
            OpKind::Allocation => ALLOCATION,
            OpKind::Assignment => ASSIGNMENT,
            OpKind::Resolution => RESOLUTION,
            OpKind::Computation => COMPUTATION,
            OpKind::Invocation | OpKind::Instanciation => INVOCATION,
            OpKind::Selection => SELECTION,
            OpKind::MatchProcess => MATCH_PROCESS,
            OpKind::MatchExpression => MATCH_EXPRESSION,
            OpKind::Iteration => ITERATION,
            OpKind::Enumeration => ENUMERATION,
            OpKind::Repetition => REPETITION,
            OpKind::Access => ACCESS,
            OpKind::Slice => SLICE,
            OpKind::Evaluation => EVALUATION,
            OpKind::Termination => TERMINATION,
            OpKind::Except => EXCEPT,
            OpKind::Interception => INTERCEPTION,
            OpKind::Chain => CHAIN,
            OpKind::Embed => EMBED,
            OpKind::ImportModule => IMPORT_MODULE,
            OpKind::ImportModules => IMPORT_MODULES,
            OpKind::ImportSymbol => IMPORT_SYMBOL,
            OpKind::ImportSymbols => IMPORT_SYMBOLS,
            OpKind::Breaking | OpKind::Continue | OpKind::Nop => NONE,
        }
    }

    /// Maximum number of arguments.
    pub fn arity(self) -> usize {
        self.signature().len()
    }

    pub fn is_match(self) -> bool {
        matches!(self, OpKind::MatchProcess | OpKind::MatchExpression)
    }

    pub fn is_interruption(self) -> bool {
        matches!(
            self,
            OpKind::Termination | OpKind::Breaking | OpKind::Continue | OpKind::Except
        )
    }

    pub fn is_import(self) -> bool {
        matches!(
            self,
            OpKind::ImportModule
                | OpKind::ImportModules
                | OpKind::ImportSymbol
                | OpKind::ImportSymbols
        )
    }

    /// Kinds that yield a value and may appear in expression position.
    pub fn is_evaluable(self) -> bool {
        matches!(
            self,
            OpKind::Assignment
                | OpKind::Resolution
                | OpKind::Computation
                | OpKind::Invocation
                | OpKind::Instanciation
                | OpKind::MatchExpression
                | OpKind::Iteration
                | OpKind::Enumeration
                | OpKind::Access
                | OpKind::Slice
                | OpKind::Chain
                | OpKind::Embed
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            OpKind::Allocation => "allocation",
            OpKind::Assignment => "assignment",
            OpKind::Resolution => "resolution",
            OpKind::Computation => "computation",
            OpKind::Invocation => "invocation",
            OpKind::Instanciation => "instanciation",
            OpKind::Selection => "selection",
            OpKind::MatchProcess => "match process",
            OpKind::MatchExpression => "match expression",
            OpKind::Iteration => "iteration",
            OpKind::Enumeration => "enumeration",
            OpKind::Repetition => "repetition",
            OpKind::Access => "access",
            OpKind::Slice => "slice",
            OpKind::Evaluation => "evaluation",
            OpKind::Termination => "termination",
            OpKind::Breaking => "breaking",
            OpKind::Continue => "continue",
            OpKind::Except => "except",
            OpKind::Interception => "interception",
            OpKind::Chain => "chain",
            OpKind::Embed => "embed",
            OpKind::Nop => "nop",
            OpKind::ImportModule => "import module",
            OpKind::ImportModules => "import modules",
            OpKind::ImportSymbol => "import symbol",
            OpKind::ImportSymbols => "import symbols",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Argument values
// ---------------------------------------------------------------------------

/// A positional operation argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpArg {
    /// Explicitly absent optional argument.
    None,
    Node(ElementId),
    Nodes(Vec<ElementId>),
    Text(String),
    Texts(Vec<String>),
}

impl OpArg {
    pub fn node(&self) -> Option<ElementId> {
        match self {
            OpArg::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn nodes(&self) -> &[ElementId] {
        match self {
            OpArg::Nodes(ids) => ids,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            OpArg::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn texts(&self) -> &[String] {
        match self {
            OpArg::Texts(texts) => texts,
            _ => &[],
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, OpArg::None)
    }

    /// Every element referenced by this argument, in order.
    pub fn element_ids(&self) -> SmallVec<[ElementId; 4]> {
        match self {
            OpArg::Node(id) => SmallVec::from_elem(*id, 1),
            OpArg::Nodes(ids) => ids.iter().copied().collect(),
            _ => SmallVec::new(),
        }
    }
}

impl From<ElementId> for OpArg {
    fn from(id: ElementId) -> Self {
        OpArg::Node(id)
    }
}

impl From<Option<ElementId>> for OpArg {
    fn from(id: Option<ElementId>) -> Self {
        id.map_or(OpArg::None, OpArg::Node)
    }
}

impl From<Vec<ElementId>> for OpArg {
    fn from(ids: Vec<ElementId>) -> Self {
        OpArg::Nodes(ids)
    }
}

impl From<&str> for OpArg {
    fn from(text: &str) -> Self {
        OpArg::Text(text.to_string())
    }
}

impl From<String> for OpArg {
    fn from(text: String) -> Self {
        OpArg::Text(text)
    }
}

// ---------------------------------------------------------------------------
// Named accessors
// ---------------------------------------------------------------------------

/// Read-only view of an operation's arguments with named accessors.
///
/// Accessors are fixed-index sugar; they do not check that the name makes
/// sense for the kind (`target()` on a computation returns its operator).
#[derive(Debug, Clone, Copy)]
pub struct OpView<'g> {
    pub id: ElementId,
    pub kind: OpKind,
    args: &'g [OpArg],
}

impl<'g> OpView<'g> {
    pub(crate) fn new(id: ElementId, kind: OpKind, args: &'g [OpArg]) -> Self {
        OpView { id, kind, args }
    }

    pub fn args(&self) -> &'g [OpArg] {
        self.args
    }

    pub fn arg(&self, index: usize) -> Option<&'g OpArg> {
        self.args.get(index)
    }

    pub fn node(&self, index: usize) -> Option<ElementId> {
        self.arg(index).and_then(OpArg::node)
    }

    pub fn nodes(&self, index: usize) -> &'g [ElementId] {
        self.arg(index).map(OpArg::nodes).unwrap_or(&[])
    }

    pub fn text(&self, index: usize) -> Option<&'g str> {
        self.arg(index).and_then(OpArg::text)
    }

    pub fn texts(&self, index: usize) -> &'g [String] {
        self.arg(index).map(OpArg::texts).unwrap_or(&[])
    }

    // Allocation
    pub fn slot_to_allocate(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn default_value(&self) -> Option<ElementId> {
        self.node(1)
    }

    // Assignment, invocation, access, slice, chain
    pub fn target(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn assigned_value(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn arguments(&self) -> &'g [ElementId] {
        self.nodes(1)
    }
    pub fn index(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn slice_start(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn slice_end(&self) -> Option<ElementId> {
        self.node(2)
    }
    pub fn groups(&self) -> &'g [ElementId] {
        self.nodes(1)
    }

    // Resolution
    pub fn reference(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn context(&self) -> Option<ElementId> {
        self.node(1)
    }

    // Computation
    pub fn operator(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn left_operand(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn right_operand(&self) -> Option<ElementId> {
        self.node(2)
    }

    // Selection and its rules
    pub fn rules(&self) -> &'g [ElementId] {
        self.nodes(0)
    }
    pub fn predicate(&self) -> Option<ElementId> {
        self.node(0)
    }
    /// Process of a match rule or a repetition.
    pub fn process(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn expression(&self) -> Option<ElementId> {
        self.node(1)
    }

    // Iteration, enumeration, repetition
    pub fn iterator(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn closure(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn start(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn end(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn step(&self) -> Option<ElementId> {
        self.node(2)
    }
    pub fn condition(&self) -> Option<ElementId> {
        self.node(0)
    }

    // Evaluation, termination, except
    pub fn evaluable(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn returned_value(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn exception(&self) -> Option<ElementId> {
        self.node(0)
    }

    // Interception
    pub fn try_process(&self) -> Option<ElementId> {
        self.node(0)
    }
    pub fn catch_process(&self) -> Option<ElementId> {
        self.node(1)
    }
    pub fn finally_process(&self) -> Option<ElementId> {
        self.node(2)
    }

    // Embed
    pub fn language(&self) -> Option<&'g str> {
        self.text(0)
    }
    pub fn code(&self) -> Option<&'g str> {
        self.text(1)
    }

    // Imports
    pub fn imported_name(&self) -> Option<&'g str> {
        self.text(0)
    }
    pub fn imported_names(&self) -> &'g [String] {
        self.texts(0)
    }
    pub fn origin(&self) -> Option<&'g str> {
        match self.kind {
            OpKind::ImportSymbol | OpKind::ImportSymbols => self.text(1),
            _ => None,
        }
    }
    pub fn alias(&self) -> Option<&'g str> {
        match self.kind {
            OpKind::ImportModule => self.text(1),
            OpKind::ImportSymbol => self.text(2),
            _ => None,
        }
    }
}
