//! Render error types covering every failure mode of a writer run.

use modelgen_core::{CoreError, ElementId, NodeKind};

/// Errors that abort a rendering run.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// Graph lookup failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The backend has no handler for any capability of the element.
    #[error("no handler for element {id} ({kind})")]
    NoHandler { id: ElementId, kind: NodeKind },

    /// A reference was rendered outside every resolved scope.
    #[error("no dataflow in rendering context of element {id:?}")]
    NoDataFlow { id: Option<ElementId> },

    /// `super` used outside a method or class-level member.
    #[error("'super' referenced outside a method")]
    SuperOutsideMethod,

    /// The backend supports at most one constructor per class.
    #[error("class {class} declares {count} constructors, only one is supported")]
    MultipleConstructors { class: ElementId, count: usize },

    /// The backend supports at most one destructor per class.
    #[error("class {class} declares {count} destructors, only one is supported")]
    MultipleDestructors { class: ElementId, count: usize },

    /// The backend only supports single inheritance.
    #[error("class {class} has {count} parent classes, only single inheritance is supported")]
    MultipleInheritance { class: ElementId, count: usize },

    /// A name resolved to a scope kind no rendering rule covers.
    #[error("unsupported scope for '{name}': element {scope} is a {kind}")]
    UnsupportedScope {
        name: String,
        scope: ElementId,
        kind: NodeKind,
    },

    /// Malformed multi-file output.
    #[error("cannot split output: {reason}")]
    Split { reason: String },
}
