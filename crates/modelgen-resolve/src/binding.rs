//! The Binder pass: imports and class inheritance.
//!
//! Runs after the [`Resolver`](crate::resolver::Resolver). For every module
//! it turns import operations into IMPORTED slots of the module's DataFlow;
//! for every class it resolves the parent class references and registers
//! each parent's DataFlow as a source of the class's DataFlow.
//!
//! Imports naming a module the program does not contain create an
//! `imported` placeholder module so the name still resolves to something
//! with an absolute path. Unresolvable parents and symbols are reported and
//! left unbound.

use std::collections::HashSet;

use modelgen_core::{Capability, DataFlowId, ElementId, Factory, OpKind, ProgramGraph};
use tracing::{debug, warn};

use crate::error::ResolveError;

/// Wildcard symbol importing every slot of a module.
pub const WILDCARD: &str = "*";

pub struct Binder<'f, F: Factory + ?Sized> {
    factory: &'f F,
}

impl<'f, F: Factory + ?Sized> Binder<'f, F> {
    pub fn new(factory: &'f F) -> Self {
        Binder { factory }
    }

    pub fn bind(&self, graph: &mut ProgramGraph) -> Result<(), ResolveError> {
        let root = graph.root();
        if graph.dataflow_of(root).is_none() {
            return Err(ResolveError::NotResolved { id: root });
        }
        for module in graph.modules().to_vec() {
            self.bind_imports(graph, module)?;
        }
        for class in collect_classes(graph) {
            self.bind_parents(graph, class)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Imports
    // -----------------------------------------------------------------------

    fn bind_imports(&self, graph: &mut ProgramGraph, module: ElementId) -> Result<(), ResolveError> {
        let flow = graph
            .dataflow_of(module)
            .ok_or(ResolveError::NotResolved { id: module })?;
        for op in graph.imports(module).to_vec() {
            let view = graph.op(op)?;
            let kind = view.kind;
            let names: Vec<String> = match kind {
                OpKind::ImportModule | OpKind::ImportSymbol => view
                    .imported_name()
                    .map(|name| vec![name.to_string()])
                    .unwrap_or_default(),
                _ => view.imported_names().to_vec(),
            };
            let origin = view.origin().map(str::to_string);
            let alias = view.alias().map(str::to_string);
            if names.is_empty() {
                return Err(ResolveError::MalformedImport { op });
            }

            for name in &names {
                match kind {
                    OpKind::ImportModule | OpKind::ImportModules => {
                        self.import_module(graph, flow, op, name, alias.as_deref())?
                    }
                    _ => self.import_symbol(graph, flow, op, name, origin.as_deref(), alias.as_deref())?,
                }
            }
        }
        Ok(())
    }

    fn import_module(
        &self,
        graph: &mut ProgramGraph,
        flow: DataFlowId,
        op: ElementId,
        name: &str,
        alias: Option<&str>,
    ) -> Result<(), ResolveError> {
        let module = self.ensure_module(graph, name)?;
        let bound = alias.unwrap_or(name);
        debug!(module = name, as_name = bound, "importing module");
        graph
            .flows_mut()
            .declare_imported(flow, bound, Some(module), Some(op))?;
        Ok(())
    }

    fn import_symbol(
        &self,
        graph: &mut ProgramGraph,
        flow: DataFlowId,
        op: ElementId,
        symbol: &str,
        origin: Option<&str>,
        alias: Option<&str>,
    ) -> Result<(), ResolveError> {
        let Some(origin) = origin else {
            // Fully qualified symbol.
            let value = graph.resolve_absolute(symbol).map(|b| b.value);
            if value.is_none() {
                warn!(symbol, "imported symbol not found");
            }
            let local = symbol.rsplit('.').next().unwrap_or(symbol);
            graph
                .flows_mut()
                .declare_imported(flow, alias.unwrap_or(local), value, Some(op))?;
            return Ok(());
        };

        let source = self.ensure_module(graph, origin)?;
        if symbol == WILDCARD {
            let slots: Vec<(String, ElementId)> = graph
                .slots(source)?
                .iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect();
            for (name, value) in slots {
                graph
                    .flows_mut()
                    .declare_imported(flow, &name, Some(value), Some(op))?;
            }
            return Ok(());
        }

        let value = graph.slot(source, symbol);
        if value.is_none() && !graph.is_imported(source) {
            warn!(module = origin, symbol, "symbol not found in imported module");
        }
        graph
            .flows_mut()
            .declare_imported(flow, alias.unwrap_or(symbol), value, Some(op))?;
        Ok(())
    }

    /// The module named `name`, creating a placeholder if the program has
    /// none.
    fn ensure_module(&self, graph: &mut ProgramGraph, name: &str) -> Result<ElementId, ResolveError> {
        if let Some(module) = graph.module(name) {
            return Ok(module);
        }
        warn!(module = name, "imported module not found, creating placeholder");
        let module = self.factory.create_module(graph, name);
        graph.set_imported(module, true)?;
        let module = graph.add_module(module)?;

        let root = graph.root();
        let program_flow = graph
            .dataflow_of(root)
            .ok_or(ResolveError::NotResolved { id: root })?;
        let flow = graph.ensure_dataflow(module)?;
        graph.flows_mut().set_parent(flow, program_flow)?;
        Ok(module)
    }

    // -----------------------------------------------------------------------
    // Inheritance
    // -----------------------------------------------------------------------

    fn bind_parents(&self, graph: &mut ProgramGraph, class: ElementId) -> Result<(), ResolveError> {
        let class_flow = graph
            .dataflow_of(class)
            .ok_or(ResolveError::NotResolved { id: class })?;
        // Parent names are looked up from where the class is declared.
        let scope = graph.flows().parent(class_flow).unwrap_or(class_flow);

        for reference in graph.parent_class_refs(class).to_vec() {
            let Some(path) = graph.reference_path(reference) else {
                continue;
            };
            let parent = resolve_path(graph, scope, &path)
                .filter(|value| graph.satisfies(*value, Capability::Class));
            match parent.and_then(|p| graph.dataflow_of(p)) {
                Some(parent_flow) => {
                    debug!(class = %class, parent = %path, "linking parent class scope");
                    graph.flows_mut().add_source(class_flow, parent_flow)?;
                }
                None => warn!(class = %class, parent = %path, "parent class not resolved"),
            }
        }
        Ok(())
    }
}

/// Resolves a possibly dotted name: the first segment through the DataFlow,
/// the rest through nested slots. Falls back to absolute lookup.
fn resolve_path(graph: &ProgramGraph, flow: DataFlowId, path: &str) -> Option<ElementId> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let Some(mut value) = graph.flows().resolve(flow, first).and_then(|hit| hit.slot.value) else {
        return graph.resolve_absolute(path).map(|b| b.value);
    };
    for segment in segments {
        value = graph.slot(value, segment)?;
    }
    Some(value)
}

/// Every class reachable from the program, in walk order.
fn collect_classes(graph: &ProgramGraph) -> Vec<ElementId> {
    let mut classes = Vec::new();
    let mut visited = HashSet::new();
    let mut pending = vec![graph.root()];
    while let Some(id) = pending.pop() {
        if !visited.insert(id) {
            continue;
        }
        if graph.satisfies(id, Capability::Class) {
            classes.push(id);
        }
        let mut children = graph.children(id);
        children.reverse();
        pending.extend(children);
    }
    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Resolver;
    use crate::ResolverOptions;
    use modelgen_core::{DefaultFactory, SlotCategory};

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    fn module(graph: &mut ProgramGraph, name: &str) -> ElementId {
        let m = DefaultFactory.create_module(graph, name);
        graph.add_module(m).unwrap()
    }

    fn class(graph: &mut ProgramGraph, module: ElementId, name: &str, parents: &[&str]) -> ElementId {
        let f = DefaultFactory;
        let refs = parents.iter().map(|p| f.create_reference(graph, p)).collect();
        let class = f.create_class(graph, name, refs).unwrap();
        graph.set_slot(module, name, class, true).unwrap();
        class
    }

    fn resolve(graph: &mut ProgramGraph) {
        Resolver::new(ResolverOptions::default()).walk(graph).unwrap();
        Binder::new(&DefaultFactory).bind(graph).unwrap();
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[test]
    fn subclass_inherits_class_methods() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let m = module(&mut graph, "shapes");
        let a = class(&mut graph, m, "A", &[]);
        let make = f.create_class_method(&mut graph, "make", Vec::new()).unwrap();
        graph.set_slot(a, "make", make, true).unwrap();
        let b = class(&mut graph, m, "B", &["A"]);
        resolve(&mut graph);

        let b_flow = graph.dataflow_of(b).unwrap();
        assert_eq!(graph.flows().sources(b_flow), vec![graph.dataflow_of(a).unwrap()]);
        assert_eq!(graph.inherited_class_methods(b).unwrap().get("make"), Some(&make));

        // Inherited members resolve through the source before the module.
        let hit = graph.flows().resolve(b_flow, "make").unwrap();
        assert_eq!(hit.scope, a);
    }

    #[test]
    fn redeclared_class_method_is_not_inherited() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let m = module(&mut graph, "shapes");
        let a = class(&mut graph, m, "A", &[]);
        let make_a = f.create_class_method(&mut graph, "make", Vec::new()).unwrap();
        graph.set_slot(a, "make", make_a, true).unwrap();
        let b = class(&mut graph, m, "B", &["A"]);
        let make_b = f.create_class_method(&mut graph, "make", Vec::new()).unwrap();
        graph.set_slot(b, "make", make_b, true).unwrap();
        resolve(&mut graph);

        assert!(graph.inherited_class_methods(b).unwrap().is_empty());
    }

    #[test]
    fn unresolved_parent_is_not_fatal() {
        let mut graph = DefaultFactory.create_program(None);
        let m = module(&mut graph, "app");
        let widget = class(&mut graph, m, "Widget", &["Missing"]);
        resolve(&mut graph);
        assert!(graph.flows().sources(graph.dataflow_of(widget).unwrap()).is_empty());
    }

    #[test]
    fn module_import_with_alias() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let util = module(&mut graph, "lib.util");
        let app = module(&mut graph, "app");
        let op = f.import_module(&mut graph, "lib.util", Some("u")).unwrap();
        graph.add_import(app, op).unwrap();
        resolve(&mut graph);

        let flow = graph.dataflow_of(app).unwrap();
        let slot = graph.flows().slot(flow, "u").unwrap();
        assert_eq!(slot.category, SlotCategory::Imported);
        assert_eq!(slot.value, Some(util));
        assert_eq!(slot.origins, vec![op]);
    }

    #[test]
    fn symbol_and_wildcard_imports() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let ui = module(&mut graph, "ui");
        let button = class(&mut graph, ui, "Button", &[]);
        let label = class(&mut graph, ui, "Label", &[]);
        let app = module(&mut graph, "app");
        let one = f.import_symbol(&mut graph, "Button", Some("ui"), Some("Btn")).unwrap();
        let all = f.import_symbol(&mut graph, WILDCARD, Some("ui"), None).unwrap();
        graph.add_import(app, one).unwrap();
        graph.add_import(app, all).unwrap();
        resolve(&mut graph);

        let flow = graph.dataflow_of(app).unwrap();
        assert_eq!(graph.flows().slot(flow, "Btn").unwrap().value, Some(button));
        assert_eq!(graph.flows().slot(flow, "Label").unwrap().value, Some(label));
        assert_eq!(graph.flows().slot(flow, "Button").unwrap().origins, vec![all]);
    }

    #[test]
    fn missing_module_gets_placeholder() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let app = module(&mut graph, "app");
        let op = f.import_symbols(&mut graph, &["path", "sep"], Some("os")).unwrap();
        graph.add_import(app, op).unwrap();
        resolve(&mut graph);

        let os = graph.module("os").unwrap();
        assert!(graph.is_imported(os));
        let os_flow = graph.dataflow_of(os).unwrap();
        assert_eq!(graph.flows().parent(os_flow), graph.dataflow_of(graph.root()));

        let flow = graph.dataflow_of(app).unwrap();
        let path = graph.flows().slot(flow, "path").unwrap();
        assert_eq!(path.category, SlotCategory::Imported);
        assert_eq!(path.value, None);
        assert!(graph.flows().has_slot(flow, "sep"));
    }

    #[test]
    fn parent_through_imported_module() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let base = module(&mut graph, "base");
        let model = class(&mut graph, base, "Model", &[]);
        let app = module(&mut graph, "app");
        let op = f.import_module(&mut graph, "base", None).unwrap();
        graph.add_import(app, op).unwrap();
        let user = class(&mut graph, app, "User", &["base.Model"]);
        resolve(&mut graph);

        let user_flow = graph.dataflow_of(user).unwrap();
        assert_eq!(graph.flows().sources(user_flow), vec![graph.dataflow_of(model).unwrap()]);
    }

    #[test]
    fn binding_requires_resolver() {
        let mut graph = DefaultFactory.create_program(None);
        match Binder::new(&DefaultFactory).bind(&mut graph) {
            Err(ResolveError::NotResolved { id }) => assert_eq!(id, graph.root()),
            other => panic!("Expected NotResolved, got {:?}", other),
        }
    }
}
