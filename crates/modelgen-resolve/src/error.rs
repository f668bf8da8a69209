//! Error types for the scope construction passes.

use modelgen_core::{CoreError, ElementId};

/// Errors raised while building or binding DataFlows.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// A graph invariant was violated while wiring scopes.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The binder ran on an element the resolver never gave a DataFlow.
    #[error("element {id} has no dataflow; run the resolver first")]
    NotResolved { id: ElementId },

    /// An import operation lacks the name it imports.
    #[error("import operation {op} does not name what it imports")]
    MalformedImport { op: ElementId },
}
