//! Node kinds and the capability markers they satisfy.
//!
//! Every element carries exactly one concrete [`NodeKind`]. Capabilities are
//! the abstract roles used for filtering and dispatch ("is this a method?",
//! "can this be bound in a slot?"). Satisfaction is a fixed table over the
//! kind discriminant; there is no runtime type lattice.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ops::OpKind;

/// The concrete variant of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    // Contexts
    Program,
    Module,
    Class,
    Interface,
    // Closure family, least to most specific
    Closure,
    Function,
    Method,
    Constructor,
    Destructor,
    ClassMethod,
    InstanceMethod,
    Accessor,
    Mutator,
    Block,
    // Operations
    Operation(OpKind),
    // Values
    Number,
    String,
    List,
    Dict,
    Reference,
    Operator,
    Argument,
    Parameter,
    Attribute,
    ClassAttribute,
    ModuleAttribute,
}

/// An abstract role an element kind may satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Program,
    Module,
    Class,
    Interface,
    /// Owns an ordered slot list.
    Context,
    /// Owns an ordered operation list.
    Process,
    Block,
    Closure,
    Function,
    Method,
    Constructor,
    Destructor,
    ClassMethod,
    InstanceMethod,
    /// Accessor or mutator.
    AttributeMethod,
    Accessor,
    Mutator,
    Operation,
    /// A single concrete operation kind.
    Op(OpKind),
    /// A selection rule (match process or match expression).
    MatchOperation,
    /// Termination, breaking, continue or except.
    Interruption,
    /// One of the four import operations.
    ImportOperation,
    Value,
    Literal,
    Number,
    String,
    List,
    Dict,
    Reference,
    Operator,
    Slot,
    Argument,
    Parameter,
    /// Any attribute, including class and module attributes.
    Attribute,
    ClassAttribute,
    ModuleAttribute,
    /// Produces a value when rendered as an expression.
    Evaluable,
    /// May be bound as a slot value.
    Assignable,
    /// May be the target of a name.
    Referencable,
}

impl NodeKind {
    /// Returns `true` when this kind satisfies `cap`.
    pub fn satisfies(self, cap: Capability) -> bool {
        use NodeKind as K;
        match cap {
            Capability::Program => self == K::Program,
            Capability::Module => self == K::Module,
            Capability::Class => matches!(self, K::Class | K::Interface),
            Capability::Interface => self == K::Interface,
            Capability::Context => self.is_context(),
            Capability::Process => self.is_callable() || self == K::Block,
            Capability::Block => self == K::Block,
            Capability::Closure => self.is_callable(),
            Capability::Function => self.is_callable() && self != K::Closure,
            Capability::Method => self.is_method(),
            Capability::Constructor => self == K::Constructor,
            Capability::Destructor => self == K::Destructor,
            Capability::ClassMethod => self == K::ClassMethod,
            Capability::InstanceMethod => self == K::InstanceMethod,
            Capability::AttributeMethod => matches!(self, K::Accessor | K::Mutator),
            Capability::Accessor => self == K::Accessor,
            Capability::Mutator => self == K::Mutator,
            Capability::Operation => matches!(self, K::Operation(_)),
            Capability::Op(kind) => self == K::Operation(kind),
            Capability::MatchOperation => self.op_kind().is_some_and(OpKind::is_match),
            Capability::Interruption => self.op_kind().is_some_and(OpKind::is_interruption),
            Capability::ImportOperation => self.op_kind().is_some_and(OpKind::is_import),
            Capability::Value => self.is_value(),
            Capability::Literal => matches!(self, K::Number | K::String),
            Capability::Number => self == K::Number,
            Capability::String => self == K::String,
            Capability::List => self == K::List,
            Capability::Dict => self == K::Dict,
            Capability::Reference => self == K::Reference || self == K::Operator || self.is_slot(),
            Capability::Operator => self == K::Operator,
            Capability::Slot => self.is_slot(),
            Capability::Argument => self == K::Argument,
            Capability::Parameter => self == K::Parameter,
            Capability::Attribute => {
                matches!(self, K::Attribute | K::ClassAttribute | K::ModuleAttribute)
            }
            Capability::ClassAttribute => self == K::ClassAttribute,
            Capability::ModuleAttribute => self == K::ModuleAttribute,
            Capability::Evaluable => {
                self.is_value()
                    || self.is_callable()
                    || self.op_kind().is_some_and(OpKind::is_evaluable)
            }
            Capability::Assignable => {
                self.is_value()
                    || self.is_callable()
                    || matches!(self, K::Module | K::Class | K::Interface | K::Block)
            }
            Capability::Referencable => {
                self.is_callable()
                    || self.is_slot()
                    || matches!(
                        self,
                        K::Module
                            | K::Class
                            | K::Interface
                            | K::Reference
                            | K::Operation(OpKind::Resolution)
                    )
            }
        }
    }

    /// Closure and everything more specific.
    pub fn is_callable(self) -> bool {
        matches!(self, NodeKind::Closure | NodeKind::Function) || self.is_method()
    }

    /// Method and everything more specific.
    pub fn is_method(self) -> bool {
        matches!(
            self,
            NodeKind::Method
                | NodeKind::Constructor
                | NodeKind::Destructor
                | NodeKind::ClassMethod
                | NodeKind::InstanceMethod
                | NodeKind::Accessor
                | NodeKind::Mutator
        )
    }

    /// Kinds that own a slot list.
    pub fn is_context(self) -> bool {
        self.is_callable()
            || matches!(
                self,
                NodeKind::Program
                    | NodeKind::Module
                    | NodeKind::Class
                    | NodeKind::Interface
                    | NodeKind::Block
            )
    }

    pub fn is_slot(self) -> bool {
        matches!(
            self,
            NodeKind::Argument
                | NodeKind::Parameter
                | NodeKind::Attribute
                | NodeKind::ClassAttribute
                | NodeKind::ModuleAttribute
        )
    }

    pub fn is_value(self) -> bool {
        matches!(
            self,
            NodeKind::Number
                | NodeKind::String
                | NodeKind::List
                | NodeKind::Dict
                | NodeKind::Reference
                | NodeKind::Operator
        ) || self.is_slot()
    }

    /// The operation kind, if this is an operation.
    pub fn op_kind(self) -> Option<OpKind> {
        match self {
            NodeKind::Operation(kind) => Some(kind),
            _ => None,
        }
    }

    /// Human-readable name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Interface => "interface",
            NodeKind::Closure => "closure",
            NodeKind::Function => "function",
            NodeKind::Method => "method",
            NodeKind::Constructor => "constructor",
            NodeKind::Destructor => "destructor",
            NodeKind::ClassMethod => "class method",
            NodeKind::InstanceMethod => "instance method",
            NodeKind::Accessor => "accessor",
            NodeKind::Mutator => "mutator",
            NodeKind::Block => "block",
            NodeKind::Operation(kind) => kind.name(),
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::List => "list",
            NodeKind::Dict => "dict",
            NodeKind::Reference => "reference",
            NodeKind::Operator => "operator",
            NodeKind::Argument => "argument",
            NodeKind::Parameter => "parameter",
            NodeKind::Attribute => "attribute",
            NodeKind::ClassAttribute => "class attribute",
            NodeKind::ModuleAttribute => "module attribute",
        }
    }
}

impl Capability {
    /// Human-readable name used in diagnostics and handler tables.
    pub fn name(self) -> &'static str {
        match self {
            Capability::Program => "program",
            Capability::Module => "module",
            Capability::Class => "class",
            Capability::Interface => "interface",
            Capability::Context => "context",
            Capability::Process => "process",
            Capability::Block => "block",
            Capability::Closure => "closure",
            Capability::Function => "function",
            Capability::Method => "method",
            Capability::Constructor => "constructor",
            Capability::Destructor => "destructor",
            Capability::ClassMethod => "class method",
            Capability::InstanceMethod => "instance method",
            Capability::AttributeMethod => "attribute method",
            Capability::Accessor => "accessor",
            Capability::Mutator => "mutator",
            Capability::Operation => "operation",
            Capability::Op(kind) => kind.name(),
            Capability::MatchOperation => "match operation",
            Capability::Interruption => "interruption",
            Capability::ImportOperation => "import operation",
            Capability::Value => "value",
            Capability::Literal => "literal",
            Capability::Number => "number",
            Capability::String => "string",
            Capability::List => "list",
            Capability::Dict => "dict",
            Capability::Reference => "reference",
            Capability::Operator => "operator",
            Capability::Slot => "slot",
            Capability::Argument => "argument",
            Capability::Parameter => "parameter",
            Capability::Attribute => "attribute",
            Capability::ClassAttribute => "class attribute",
            Capability::ModuleAttribute => "module attribute",
            Capability::Evaluable => "evaluable",
            Capability::Assignable => "assignable",
            Capability::Referencable => "referencable",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_family_is_nested() {
        let kind = NodeKind::ClassMethod;
        assert!(kind.satisfies(Capability::ClassMethod));
        assert!(kind.satisfies(Capability::Method));
        assert!(kind.satisfies(Capability::Function));
        assert!(kind.satisfies(Capability::Closure));
        assert!(kind.satisfies(Capability::Process));
        assert!(!kind.satisfies(Capability::InstanceMethod));

        assert!(NodeKind::Function.satisfies(Capability::Function));
        assert!(!NodeKind::Function.satisfies(Capability::Method));
        assert!(!NodeKind::Closure.satisfies(Capability::Function));
    }

    #[test]
    fn attribute_family() {
        assert!(NodeKind::ClassAttribute.satisfies(Capability::Attribute));
        assert!(NodeKind::ClassAttribute.satisfies(Capability::Slot));
        assert!(NodeKind::ClassAttribute.satisfies(Capability::Reference));
        assert!(!NodeKind::Attribute.satisfies(Capability::ClassAttribute));
    }

    #[test]
    fn operation_families() {
        let matcher = NodeKind::Operation(OpKind::MatchProcess);
        assert!(matcher.satisfies(Capability::MatchOperation));
        assert!(matcher.satisfies(Capability::Operation));
        assert!(!matcher.satisfies(Capability::Op(OpKind::MatchExpression)));

        let import = NodeKind::Operation(OpKind::ImportSymbol);
        assert!(import.satisfies(Capability::ImportOperation));
        assert!(NodeKind::Operation(OpKind::Breaking).satisfies(Capability::Interruption));
    }

    #[test]
    fn assignable_excludes_program_and_operations() {
        assert!(NodeKind::Number.satisfies(Capability::Assignable));
        assert!(NodeKind::Class.satisfies(Capability::Assignable));
        assert!(NodeKind::Method.satisfies(Capability::Assignable));
        assert!(!NodeKind::Program.satisfies(Capability::Assignable));
        assert!(!NodeKind::Operation(OpKind::Assignment).satisfies(Capability::Assignable));
    }

    #[test]
    fn contexts_and_processes() {
        assert!(NodeKind::Block.satisfies(Capability::Context));
        assert!(NodeKind::Block.satisfies(Capability::Process));
        assert!(NodeKind::Module.satisfies(Capability::Context));
        assert!(!NodeKind::Module.satisfies(Capability::Process));
        assert!(!NodeKind::Reference.satisfies(Capability::Context));
    }
}
