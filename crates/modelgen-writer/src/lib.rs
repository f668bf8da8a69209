//! Rendering framework for modelgen program models.
//!
//! Backends turn a resolved [`ProgramGraph`](modelgen_core::ProgramGraph)
//! into target-language text. This crate provides what every backend shares:
//!
//! - [`dispatch`] -- the most-specific-first capability order and the
//!   [`Backend`] handler table
//! - [`writer`] -- the [`Writer`] with its `write()` entry point, scoped
//!   render context and context queries
//! - [`reference`] -- the decision table for rendering a symbol reference
//! - [`format`] -- nested-fragment indentation
//! - [`model`] -- [`ModelWriter`], a neutral pseudo-code backend
//! - [`splitter`] -- splitting a rendered text into per-file chunks

pub mod dispatch;
pub mod error;
pub mod format;
pub mod model;
pub mod reference;
pub mod splitter;
pub mod writer;

use serde::{Deserialize, Serialize};

pub use dispatch::{Backend, Handler, DISPATCH_ORDER};
pub use error::WriteError;
pub use format::{format, Fragment};
pub use model::{write_model, ModelWriter};
pub use reference::{ImportedBinding, MemberAccess, ReferenceForm};
pub use writer::{ContextGuard, Writer};

/// Options controlling rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterOptions {
    /// One level of indentation.
    pub indent: String,
    /// Skip placeholder modules created for unresolved imports.
    pub skip_imported_modules: bool,
    /// Emit documentation annotations.
    pub documentation: bool,
}

impl Default for WriterOptions {
    fn default() -> Self {
        WriterOptions {
            indent: "\t".to_string(),
            skip_imported_modules: true,
            documentation: true,
        }
    }
}
