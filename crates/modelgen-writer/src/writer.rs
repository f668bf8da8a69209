//! The [`Writer`]: dispatch entry point, render context and the queries
//! handlers use to inspect where they are.
//!
//! Every call to [`Writer::write`] pushes the element onto the render context
//! for the duration of its handler. The push is owned by a [`ContextGuard`],
//! so the context unwinds on every exit path, errors included.

use std::ops::{Deref, DerefMut};

use modelgen_core::element::SHADOW;
use modelgen_core::{Capability, DataFlowId, ElementId, ProgramGraph, Resolved};
use modelgen_resolve::WalkContext;
use tracing::{debug, trace};

use crate::dispatch::{Backend, DISPATCH_ORDER};
use crate::error::WriteError;
use crate::WriterOptions;

/// Renders a resolved program graph through a [`Backend`].
pub struct Writer<'g, B> {
    graph: &'g ProgramGraph,
    backend: B,
    options: WriterOptions,
    context: WalkContext,
    counter: usize,
}

/// Keeps an element on the render context until dropped.
pub struct ContextGuard<'w, 'g, B> {
    writer: &'w mut Writer<'g, B>,
}

impl<'g, B> Deref for ContextGuard<'_, 'g, B> {
    type Target = Writer<'g, B>;

    fn deref(&self) -> &Self::Target {
        self.writer
    }
}

impl<B> DerefMut for ContextGuard<'_, '_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.writer
    }
}

impl<B> Drop for ContextGuard<'_, '_, B> {
    fn drop(&mut self) {
        self.writer.context.pop();
    }
}

impl<'g, B: Backend> Writer<'g, B> {
    pub fn new(graph: &'g ProgramGraph, backend: B, options: WriterOptions) -> Self {
        Writer {
            graph,
            backend,
            options,
            context: WalkContext::new(),
            counter: 0,
        }
    }

    pub fn graph(&self) -> &'g ProgramGraph {
        self.graph
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Renders the whole program.
    pub fn run(&mut self) -> Result<String, WriteError> {
        debug!(
            modules = self.graph.modules().len(),
            elements = self.graph.element_count(),
            "rendering program"
        );
        self.write(self.graph.root())
    }

    /// Renders one element with the handler of its most specific handled
    /// capability. Shadow elements render as the empty string.
    pub fn write(&mut self, id: ElementId) -> Result<String, WriteError> {
        let element = self.graph.get(id)?;
        if element.has_annotation(SHADOW) {
            trace!(element = %id, "skipping shadow element");
            return Ok(String::new());
        }
        let kind = element.kind;
        let Some((capability, handler)) = DISPATCH_ORDER
            .iter()
            .filter(|cap| kind.satisfies(**cap))
            .find_map(|cap| self.backend.handler(*cap).map(|handler| (*cap, handler)))
        else {
            return Err(WriteError::NoHandler { id, kind });
        };
        trace!(element = %id, kind = %kind, capability = %capability, "writing");
        let mut scope = self.enter(id);
        handler(&mut *scope, id)
    }

    /// Renders each element, dropping empty results.
    pub fn write_all(&mut self, ids: &[ElementId]) -> Result<Vec<String>, WriteError> {
        let mut written = Vec::with_capacity(ids.len());
        for id in ids {
            let text = self.write(*id)?;
            if !text.is_empty() {
                written.push(text);
            }
        }
        Ok(written)
    }

    /// Renders `id` only if it is present, as with optional operation
    /// arguments.
    pub fn write_opt(&mut self, id: Option<ElementId>) -> Result<Option<String>, WriteError> {
        id.map(|id| self.write(id)).transpose()
    }

    /// Pushes `id` onto the render context. It is popped when the guard is
    /// dropped.
    pub fn enter(&mut self, id: ElementId) -> ContextGuard<'_, 'g, B> {
        self.context.push(id);
        ContextGuard { writer: self }
    }

    /// Runs `f` with `id` pushed onto the render context.
    pub fn within<T>(
        &mut self,
        id: ElementId,
        f: impl FnOnce(&mut Writer<'g, B>) -> Result<T, WriteError>,
    ) -> Result<T, WriteError> {
        let mut scope = self.enter(id);
        f(&mut *scope)
    }

    /// Modules the program handler renders.
    pub fn modules_to_write(&self) -> Vec<ElementId> {
        self.graph
            .modules()
            .iter()
            .copied()
            .filter(|m| !(self.options.skip_imported_modules && self.graph.is_imported(*m)))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Context queries
    // -----------------------------------------------------------------------

    pub fn context(&self) -> &WalkContext {
        &self.context
    }

    pub fn depth(&self) -> usize {
        self.context.depth()
    }

    pub fn current(&self) -> Option<ElementId> {
        self.context.current()
    }

    pub fn is_in(&self, cap: Capability) -> bool {
        self.context.is_in(self.graph, cap)
    }

    pub fn find(&self, cap: Capability) -> Option<ElementId> {
        self.context.find(self.graph, cap)
    }

    pub fn current_module(&self) -> Option<ElementId> {
        self.find(Capability::Module)
    }

    pub fn current_class(&self) -> Option<ElementId> {
        self.find(Capability::Class)
    }

    /// The innermost callable other than an anonymous closure.
    pub fn current_function(&self) -> Option<ElementId> {
        self.find(Capability::Function)
    }

    pub fn current_method(&self) -> Option<ElementId> {
        self.find(Capability::Method)
    }

    /// The innermost callable of any kind.
    pub fn current_closure(&self) -> Option<ElementId> {
        self.find(Capability::Closure)
    }

    pub fn current_dataflow(&self) -> Option<DataFlowId> {
        self.context.dataflow(self.graph)
    }

    /// Inside a class method, at any closure depth.
    pub fn in_class_method(&self) -> bool {
        self.current_method()
            .is_some_and(|m| self.graph.satisfies(m, Capability::ClassMethod))
    }

    /// Inside a method that receives an instance.
    pub fn in_instance_method(&self) -> bool {
        self.current_method()
            .is_some_and(|m| !self.graph.satisfies(m, Capability::ClassMethod))
    }

    /// Resolves `name` from the innermost scope of the render context.
    pub fn resolve(&self, name: &str) -> Option<Resolved<'g>> {
        let graph = self.graph;
        self.current_dataflow()
            .and_then(|flow| graph.flows().resolve(flow, name))
    }

    /// A fresh identifier starting with `prefix` that no scope of the
    /// current context resolves.
    pub fn unique(&mut self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}{}", self.counter);
            self.counter += 1;
            if self.resolve(&candidate).is_none() {
                return candidate;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Parent classes as bound by the binder, in declaration order.
    pub fn class_parents(&self, class: ElementId) -> Vec<ElementId> {
        let flows = self.graph.flows();
        self.graph
            .dataflow_of(class)
            .map(|flow| {
                flows
                    .sources(flow)
                    .into_iter()
                    .filter_map(|source| flows.element(source))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every class reachable through parent links, nearest first.
    pub fn class_ancestors(&self, class: ElementId) -> Vec<ElementId> {
        let flows = self.graph.flows();
        self.graph
            .dataflow_of(class)
            .map(|flow| {
                flows
                    .source_closure(flow)
                    .into_iter()
                    .filter_map(|source| flows.element(source))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The class constructor, for backends that allow only one.
    pub fn single_constructor(&self, class: ElementId) -> Result<Option<ElementId>, WriteError> {
        match self.graph.constructors(class).as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(WriteError::MultipleConstructors {
                class,
                count: many.len(),
            }),
        }
    }

    /// The class destructor, for backends that allow only one.
    pub fn single_destructor(&self, class: ElementId) -> Result<Option<ElementId>, WriteError> {
        match self.graph.destructors(class).as_slice() {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(WriteError::MultipleDestructors {
                class,
                count: many.len(),
            }),
        }
    }

    /// The declared parent reference, for backends with single inheritance.
    pub fn single_parent(&self, class: ElementId) -> Result<Option<ElementId>, WriteError> {
        match self.graph.parent_class_refs(class) {
            [] => Ok(None),
            [one] => Ok(Some(*one)),
            many => Err(WriteError::MultipleInheritance {
                class,
                count: many.len(),
            }),
        }
    }
}
