//! Scope construction passes for modelgen program models.
//!
//! Two passes run after the model is fully built:
//!
//! - [`resolver`] -- walks the element tree once, giving every scope-owning
//!   element a DataFlow wired to its lexical parent and declaring the names
//!   each scope introduces
//! - [`binding`] -- resolves import operations into imported slots and links
//!   each class's DataFlow to its parent classes' DataFlows
//!
//! [`resolve_program`] runs both in order.

pub mod binding;
pub mod context;
pub mod error;
pub mod resolver;

use modelgen_core::{Factory, ProgramGraph};
use serde::{Deserialize, Serialize};

pub use binding::Binder;
pub use context::WalkContext;
pub use error::ResolveError;
pub use resolver::Resolver;

/// Options controlling scope construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverOptions {
    /// Names declared as environment slots of the program scope.
    pub builtins: Vec<String>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            builtins: ["Undefined", "True", "False", "Null"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
        }
    }
}

/// Runs the resolver and then the binder over `graph`. Placeholder modules
/// for missing imports are created with `factory`.
pub fn resolve_program<F: Factory + ?Sized>(
    graph: &mut ProgramGraph,
    factory: &F,
    options: &ResolverOptions,
) -> Result<(), ResolveError> {
    Resolver::new(options.clone()).walk(graph)?;
    Binder::new(factory).bind(graph)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_from_json() {
        let options: ResolverOptions = serde_json::from_str(r#"{"builtins":["print","len"]}"#).unwrap();
        assert_eq!(options.builtins, vec!["print", "len"]);
        assert_eq!(ResolverOptions::default().builtins.len(), 4);
    }
}
