//! Capability dispatch.
//!
//! A backend registers handlers per [`Capability`]. An element is rendered
//! by the first capability in [`DISPATCH_ORDER`] that it satisfies and the
//! backend handles, so a backend can handle `Method` once and still
//! specialize `ClassMethod` or `Constructor` when it needs to.

use modelgen_core::{Capability, ElementId, OpKind};

use crate::error::WriteError;
use crate::writer::Writer;

/// A rendering function. It receives the writer with the element already
/// pushed onto the render context.
pub type Handler<B> = fn(&mut Writer<'_, B>, ElementId) -> Result<String, WriteError>;

/// A target-language backend: a table from capabilities to handlers.
pub trait Backend: Sized {
    fn handler(&self, capability: Capability) -> Option<Handler<Self>>;
}

/// Capabilities in dispatch order, most specific first.
pub const DISPATCH_ORDER: &[Capability] = &[
    Capability::Program,
    Capability::Module,
    Capability::Interface,
    Capability::Class,
    Capability::Destructor,
    Capability::Constructor,
    Capability::ClassMethod,
    Capability::InstanceMethod,
    Capability::Accessor,
    Capability::Mutator,
    Capability::AttributeMethod,
    Capability::Method,
    Capability::Function,
    Capability::Closure,
    Capability::Block,
    Capability::ModuleAttribute,
    Capability::ClassAttribute,
    Capability::Attribute,
    Capability::Parameter,
    Capability::Argument,
    Capability::Operator,
    Capability::Reference,
    Capability::Number,
    Capability::String,
    Capability::List,
    Capability::Dict,
    Capability::Op(OpKind::Allocation),
    Capability::Op(OpKind::Assignment),
    Capability::Op(OpKind::Resolution),
    Capability::Op(OpKind::Computation),
    Capability::Op(OpKind::Invocation),
    Capability::Op(OpKind::Instanciation),
    Capability::Op(OpKind::Selection),
    Capability::Op(OpKind::MatchProcess),
    Capability::Op(OpKind::MatchExpression),
    Capability::Op(OpKind::Iteration),
    Capability::Op(OpKind::Enumeration),
    Capability::Op(OpKind::Repetition),
    Capability::Op(OpKind::Access),
    Capability::Op(OpKind::Slice),
    Capability::Op(OpKind::Evaluation),
    Capability::Op(OpKind::Termination),
    Capability::Op(OpKind::Breaking),
    Capability::Op(OpKind::Continue),
    Capability::Op(OpKind::Except),
    Capability::Op(OpKind::Interception),
    Capability::Op(OpKind::Chain),
    Capability::Op(OpKind::Embed),
    Capability::Op(OpKind::Nop),
    Capability::Op(OpKind::ImportModule),
    Capability::Op(OpKind::ImportModules),
    Capability::Op(OpKind::ImportSymbol),
    Capability::Op(OpKind::ImportSymbols),
    Capability::MatchOperation,
    Capability::Interruption,
    Capability::ImportOperation,
    Capability::Operation,
    Capability::Slot,
    Capability::Literal,
    Capability::Value,
    Capability::Process,
    Capability::Context,
];

#[cfg(test)]
mod tests {
    use super::*;
    use modelgen_core::NodeKind;
    use std::collections::HashSet;

    #[test]
    fn order_has_no_duplicates() {
        let unique: HashSet<_> = DISPATCH_ORDER.iter().collect();
        assert_eq!(unique.len(), DISPATCH_ORDER.len());
    }

    #[test]
    fn specific_capabilities_precede_their_families() {
        let position = |cap: Capability| DISPATCH_ORDER.iter().position(|c| *c == cap).unwrap();
        assert!(position(Capability::ClassMethod) < position(Capability::Method));
        assert!(position(Capability::Constructor) < position(Capability::Method));
        assert!(position(Capability::Method) < position(Capability::Function));
        assert!(position(Capability::Function) < position(Capability::Closure));
        assert!(position(Capability::ClassAttribute) < position(Capability::Attribute));
        assert!(position(Capability::Op(OpKind::Breaking)) < position(Capability::Interruption));
        assert!(position(Capability::Operation) < position(Capability::Value));
    }

    #[test]
    fn every_kind_has_a_capability_in_the_order() {
        let kinds = [
            NodeKind::Program,
            NodeKind::Module,
            NodeKind::Class,
            NodeKind::Interface,
            NodeKind::Closure,
            NodeKind::Function,
            NodeKind::Method,
            NodeKind::Constructor,
            NodeKind::Destructor,
            NodeKind::ClassMethod,
            NodeKind::InstanceMethod,
            NodeKind::Accessor,
            NodeKind::Mutator,
            NodeKind::Block,
            NodeKind::Operation(OpKind::Chain),
            NodeKind::Number,
            NodeKind::String,
            NodeKind::List,
            NodeKind::Dict,
            NodeKind::Reference,
            NodeKind::Operator,
            NodeKind::Argument,
            NodeKind::Parameter,
            NodeKind::Attribute,
            NodeKind::ClassAttribute,
            NodeKind::ModuleAttribute,
        ];
        for kind in kinds {
            assert!(
                DISPATCH_ORDER.iter().any(|cap| kind.satisfies(*cap)),
                "{kind} is not dispatchable"
            );
        }
    }
}
