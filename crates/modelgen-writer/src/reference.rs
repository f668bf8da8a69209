//! How a symbol reference should be rendered.
//!
//! A reference names a slot somewhere in the scope chain. Target languages
//! spell the same binding differently depending on where it was found and
//! where it is used: a class attribute read from an instance method needs a
//! class qualifier, a module slot read from another module needs the module
//! path, an imported name uses the alias its import chose. [`ReferenceForm`]
//! captures that decision so backends only have to spell it.

use modelgen_core::{
    Capability, ElementId, NodeKind, OpKind, ProgramGraph, Resolved, SlotCategory,
};
use modelgen_resolve::binding::WILDCARD;
use modelgen_resolve::resolver::{SELF, SUPER};

use crate::dispatch::Backend;
use crate::error::WriteError;
use crate::writer::Writer;

/// How a class member is reached from the current context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberAccess {
    /// Through the instance.
    Instance,
    /// Through the class of the instance.
    Class,
    /// Through the receiver of a class-level method.
    Receiver,
}

/// The name bound by an import, and where it comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedBinding {
    /// Name bound in the importing scope.
    pub local_name: String,
    pub module: Option<String>,
    /// `None` when the whole module is imported.
    pub symbol: Option<String>,
    pub alias: Option<String>,
}

impl ImportedBinding {
    /// Dotted name of the imported entity.
    pub fn qualified_name(&self) -> String {
        match (&self.module, &self.symbol) {
            (Some(module), Some(symbol)) => format!("{module}.{symbol}"),
            (Some(module), None) => module.clone(),
            (None, _) => self.local_name.clone(),
        }
    }
}

/// Rendering decision for one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferenceForm {
    /// The current instance or class.
    SelfReference,
    /// `super` at class level: the first parent class, if bound.
    SuperClass { parent: Option<ElementId> },
    /// `super` inside a method receiving an instance.
    SuperInstance { method: ElementId },
    /// A slot of the current class or one of its ancestors.
    Member {
        access: MemberAccess,
        name: String,
        owner: ElementId,
    },
    /// A slot of the current function or an enclosing closure or block.
    Local { name: String },
    /// A slot of the current module.
    ModuleLocal { name: String },
    /// A slot of another module.
    Module { path: String, name: String },
    Imported(ImportedBinding),
    /// A slot of a class outside the current class hierarchy.
    ClassQualified { path: String, name: String },
    /// No scope declares the name; rendered as written.
    Unresolved { name: String },
}

impl<'g, B: Backend> Writer<'g, B> {
    /// Decides how `name`, as referenced from the current render context,
    /// should be rendered.
    pub fn reference_form(&self, name: &str) -> Result<ReferenceForm, WriteError> {
        if name == SELF {
            return Ok(ReferenceForm::SelfReference);
        }
        if name == SUPER {
            return self.super_form();
        }
        if self.current_dataflow().is_none() {
            return Err(WriteError::NoDataFlow {
                id: self.current(),
            });
        }
        let Some(hit) = self.resolve(name) else {
            return Ok(ReferenceForm::Unresolved {
                name: name.to_string(),
            });
        };
        if hit.slot.category == SlotCategory::Imported {
            return Ok(ReferenceForm::Imported(imported_binding(self.graph(), &hit)));
        }
        self.scoped_form(name, &hit)
    }

    fn super_form(&self) -> Result<ReferenceForm, WriteError> {
        let class_level = self.in_class_method()
            || (self.current_method().is_none() && self.is_in(Capability::ClassAttribute));
        if class_level {
            let class = self
                .current_class()
                .ok_or(WriteError::SuperOutsideMethod)?;
            return Ok(ReferenceForm::SuperClass {
                parent: self.class_parents(class).first().copied(),
            });
        }
        match self.current_method() {
            Some(method) => Ok(ReferenceForm::SuperInstance { method }),
            None => Err(WriteError::SuperOutsideMethod),
        }
    }

    fn scoped_form(&self, name: &str, hit: &Resolved<'g>) -> Result<ReferenceForm, WriteError> {
        let graph = self.graph();
        let scope = hit.scope;
        let scope_kind = graph.kind(scope)?;
        let name = name.to_string();

        if let Some(class) = self.current_class() {
            if scope == class || self.class_ancestors(class).contains(&scope) {
                let access = self.member_access(hit.slot.value);
                return Ok(ReferenceForm::Member {
                    access,
                    name,
                    owner: scope,
                });
            }
        }
        if Some(scope) == self.current_function() {
            return Ok(ReferenceForm::Local { name });
        }
        match scope_kind {
            NodeKind::Module if Some(scope) == self.current_module() => {
                Ok(ReferenceForm::ModuleLocal { name })
            }
            NodeKind::Module => Ok(ReferenceForm::Module {
                path: graph.absolute_name(scope).unwrap_or_default(),
                name,
            }),
            NodeKind::Class | NodeKind::Interface => Ok(ReferenceForm::ClassQualified {
                path: graph.absolute_name(scope).unwrap_or_default(),
                name,
            }),
            NodeKind::Program | NodeKind::Block => Ok(ReferenceForm::Local { name }),
            kind if kind.is_callable() => Ok(ReferenceForm::Local { name }),
            kind => Err(WriteError::UnsupportedScope { name, scope, kind }),
        }
    }

    fn member_access(&self, value: Option<ElementId>) -> MemberAccess {
        let kind = value.and_then(|v| self.graph().kind(v).ok());
        let in_class_method = self.in_class_method();
        let in_instance_method = self.in_instance_method();
        match kind {
            Some(NodeKind::InstanceMethod) if in_class_method => MemberAccess::Receiver,
            Some(NodeKind::InstanceMethod) => MemberAccess::Instance,
            Some(NodeKind::ClassMethod) if in_instance_method => MemberAccess::Class,
            Some(NodeKind::ClassMethod) => MemberAccess::Receiver,
            Some(NodeKind::ClassAttribute) if in_class_method => MemberAccess::Receiver,
            Some(NodeKind::ClassAttribute) => MemberAccess::Class,
            _ if in_class_method => MemberAccess::Receiver,
            _ => MemberAccess::Instance,
        }
    }
}

/// Reads the import operation that declared an imported slot.
fn imported_binding(graph: &ProgramGraph, hit: &Resolved<'_>) -> ImportedBinding {
    let local_name = hit.slot.name.clone();
    let mut binding = ImportedBinding {
        local_name: local_name.clone(),
        module: None,
        symbol: Some(local_name.clone()),
        alias: None,
    };
    let Some(view) = hit.slot.origins.first().and_then(|op| graph.op(*op).ok()) else {
        return binding;
    };
    let imported = view.imported_name().map(str::to_string);
    binding.alias = view.alias().map(str::to_string);
    match view.kind {
        OpKind::ImportModule => {
            binding.module = imported;
            binding.symbol = None;
        }
        OpKind::ImportModules => {
            binding.module = Some(local_name);
            binding.symbol = None;
        }
        OpKind::ImportSymbol => match (view.origin(), imported) {
            (Some(origin), Some(symbol)) if symbol == WILDCARD => {
                binding.module = Some(origin.to_string());
                binding.symbol = Some(local_name);
            }
            (Some(origin), symbol) => {
                binding.module = Some(origin.to_string());
                binding.symbol = symbol;
            }
            (None, Some(symbol)) => match symbol.rsplit_once('.') {
                Some((module, name)) => {
                    binding.module = Some(module.to_string());
                    binding.symbol = Some(name.to_string());
                }
                None => binding.symbol = Some(symbol),
            },
            (None, None) => {}
        },
        OpKind::ImportSymbols => {
            binding.module = view.origin().map(str::to_string);
        }
        _ => {}
    }
    binding
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Handler;
    use crate::WriterOptions;
    use modelgen_core::{DefaultFactory, Factory};
    use modelgen_resolve::{resolve_program, ResolverOptions};

    struct Nothing;

    impl Backend for Nothing {
        fn handler(&self, _: Capability) -> Option<Handler<Self>> {
            None
        }
    }

    /// Fixture:
    ///
    /// ```text
    /// module shapes { class Base { shared count; instance describe() } }
    /// module main {
    ///   import shapes.Base as Root
    ///   shared limit
    ///   class Circle : Root {
    ///     shared unit; property radius
    ///     instance area() { }
    ///     class make() { }
    ///   }
    ///   class Other { shared tag; class Inner { instance peek() { } } }
    ///   function helper(x) { }
    /// }
    /// ```
    struct Fixture {
        graph: ProgramGraph,
        main: ElementId,
        circle: ElementId,
        base: ElementId,
        area: ElementId,
        make: ElementId,
        other: ElementId,
        peek: ElementId,
        helper: ElementId,
    }

    fn fixture() -> Fixture {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);

        let shapes = f.create_module(&mut graph, "shapes");
        graph.add_module(shapes).unwrap();
        let base = f.create_class(&mut graph, "Base", Vec::new()).unwrap();
        graph.set_slot(shapes, "Base", base, true).unwrap();
        let count = f.create_class_attribute(&mut graph, "count", None).unwrap();
        graph.set_slot(base, "count", count, true).unwrap();
        let describe = f.create_instance_method(&mut graph, "describe", Vec::new()).unwrap();
        graph.set_slot(base, "describe", describe, true).unwrap();

        let main = f.create_module(&mut graph, "main");
        graph.add_module(main).unwrap();
        let import = f.import_symbol(&mut graph, "Base", Some("shapes"), Some("Root")).unwrap();
        graph.add_import(main, import).unwrap();
        let limit = f.create_module_attribute(&mut graph, "limit", None).unwrap();
        graph.set_slot(main, "limit", limit, true).unwrap();

        let root = f.create_reference(&mut graph, "Root");
        let circle = f.create_class(&mut graph, "Circle", vec![root]).unwrap();
        graph.set_slot(main, "Circle", circle, true).unwrap();
        let unit = f.create_class_attribute(&mut graph, "unit", None).unwrap();
        graph.set_slot(circle, "unit", unit, true).unwrap();
        let radius = f.create_attribute(&mut graph, "radius", None).unwrap();
        graph.set_slot(circle, "radius", radius, true).unwrap();
        let area = f.create_instance_method(&mut graph, "area", Vec::new()).unwrap();
        graph.set_slot(circle, "area", area, true).unwrap();
        let make = f.create_class_method(&mut graph, "make", Vec::new()).unwrap();
        graph.set_slot(circle, "make", make, true).unwrap();

        let other = f.create_class(&mut graph, "Other", Vec::new()).unwrap();
        graph.set_slot(main, "Other", other, true).unwrap();
        let tag = f.create_class_attribute(&mut graph, "tag", None).unwrap();
        graph.set_slot(other, "tag", tag, true).unwrap();
        let inner = f.create_class(&mut graph, "Inner", Vec::new()).unwrap();
        graph.set_slot(other, "Inner", inner, true).unwrap();
        let peek = f.create_instance_method(&mut graph, "peek", Vec::new()).unwrap();
        graph.set_slot(inner, "peek", peek, true).unwrap();

        let x = f.create_parameter(&mut graph, "x", None).unwrap();
        let helper = f.create_function(&mut graph, "helper", vec![x]).unwrap();
        graph.set_slot(main, "helper", helper, true).unwrap();

        resolve_program(&mut graph, &f, &ResolverOptions::default()).unwrap();
        Fixture {
            graph,
            main,
            circle,
            base,
            area,
            make,
            other,
            peek,
            helper,
        }
    }

    /// Decides `name` with `path` pushed onto the context (program first).
    fn form(graph: &ProgramGraph, path: &[ElementId], name: &str) -> Result<ReferenceForm, WriteError> {
        let mut writer = Writer::new(graph, Nothing, WriterOptions::default());
        let mut path = path.to_vec();
        path.insert(0, graph.root());
        enter_all(&mut writer, &path, name)
    }

    fn enter_all(
        writer: &mut Writer<'_, Nothing>,
        path: &[ElementId],
        name: &str,
    ) -> Result<ReferenceForm, WriteError> {
        match path.split_first() {
            Some((first, rest)) => writer.within(*first, |w| enter_all(w, rest, name)),
            None => writer.reference_form(name),
        }
    }

    fn member(access: MemberAccess, name: &str, owner: ElementId) -> ReferenceForm {
        ReferenceForm::Member {
            access,
            name: name.to_string(),
            owner,
        }
    }

    // -----------------------------------------------------------------------
    // Class members
    // -----------------------------------------------------------------------

    #[test]
    fn members_from_instance_method() {
        let fx = fixture();
        let path = [fx.main, fx.circle, fx.area];
        assert_eq!(
            form(&fx.graph, &path, "radius").unwrap(),
            member(MemberAccess::Instance, "radius", fx.circle)
        );
        assert_eq!(
            form(&fx.graph, &path, "unit").unwrap(),
            member(MemberAccess::Class, "unit", fx.circle)
        );
        assert_eq!(
            form(&fx.graph, &path, "make").unwrap(),
            member(MemberAccess::Class, "make", fx.circle)
        );
        assert_eq!(
            form(&fx.graph, &path, "area").unwrap(),
            member(MemberAccess::Instance, "area", fx.circle)
        );
    }

    #[test]
    fn members_from_class_method() {
        let fx = fixture();
        let path = [fx.main, fx.circle, fx.make];
        assert_eq!(
            form(&fx.graph, &path, "unit").unwrap(),
            member(MemberAccess::Receiver, "unit", fx.circle)
        );
        assert_eq!(
            form(&fx.graph, &path, "area").unwrap(),
            member(MemberAccess::Receiver, "area", fx.circle)
        );
        assert_eq!(
            form(&fx.graph, &path, "make").unwrap(),
            member(MemberAccess::Receiver, "make", fx.circle)
        );
    }

    #[test]
    fn inherited_members_name_their_owner() {
        let fx = fixture();
        let path = [fx.main, fx.circle, fx.area];
        assert_eq!(
            form(&fx.graph, &path, "count").unwrap(),
            member(MemberAccess::Class, "count", fx.base)
        );
        assert_eq!(
            form(&fx.graph, &path, "describe").unwrap(),
            member(MemberAccess::Instance, "describe", fx.base)
        );
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    #[test]
    fn function_arguments_are_local() {
        let fx = fixture();
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.helper], "x").unwrap(),
            ReferenceForm::Local {
                name: "x".to_string()
            }
        );
    }

    #[test]
    fn module_slots_local_and_foreign() {
        let fx = fixture();
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.helper], "limit").unwrap(),
            ReferenceForm::ModuleLocal {
                name: "limit".to_string()
            }
        );
        // helper rendered while another module is the innermost module
        let shapes = fx.graph.module("shapes").unwrap();
        assert_eq!(
            form(&fx.graph, &[shapes, fx.helper], "limit").unwrap(),
            ReferenceForm::Module {
                path: "main".to_string(),
                name: "limit".to_string()
            }
        );
    }

    #[test]
    fn enclosing_class_slots_are_qualified() {
        let fx = fixture();
        let inner = fx.graph.slot(fx.other, "Inner").unwrap();
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.other, inner, fx.peek], "tag").unwrap(),
            ReferenceForm::ClassQualified {
                path: "main.Other".to_string(),
                name: "tag".to_string()
            }
        );
    }

    #[test]
    fn imported_symbol_uses_alias() {
        let fx = fixture();
        match form(&fx.graph, &[fx.main, fx.helper], "Root").unwrap() {
            ReferenceForm::Imported(binding) => {
                assert_eq!(binding.local_name, "Root");
                assert_eq!(binding.alias.as_deref(), Some("Root"));
                assert_eq!(binding.qualified_name(), "shapes.Base");
            }
            other => panic!("Expected Imported, got {:?}", other),
        }
    }

    #[test]
    fn builtins_and_unknown_names() {
        let fx = fixture();
        assert_eq!(
            form(&fx.graph, &[fx.main], "True").unwrap(),
            ReferenceForm::Local {
                name: "True".to_string()
            }
        );
        assert_eq!(
            form(&fx.graph, &[fx.main], "nowhere").unwrap(),
            ReferenceForm::Unresolved {
                name: "nowhere".to_string()
            }
        );
    }

    #[test]
    fn unsupported_scope_is_an_error() {
        let mut fx = fixture();
        let f = DefaultFactory;
        let target = f.create_reference(&mut fx.graph, "odd");
        let op = f.evaluate(&mut fx.graph, target).unwrap();
        let flow = fx.graph.ensure_dataflow(op).unwrap();
        fx.graph.flows_mut().declare_variable(flow, "odd", None, None).unwrap();
        match form(&fx.graph, &[fx.main, op], "odd") {
            Err(WriteError::UnsupportedScope { kind, .. }) => {
                assert_eq!(kind, NodeKind::Operation(OpKind::Evaluation))
            }
            other => panic!("Expected UnsupportedScope, got {:?}", other),
        }
    }

    #[test]
    fn missing_dataflow_is_an_error() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let function = f.create_function(&mut graph, "loose", Vec::new()).unwrap();
        assert!(matches!(
            form(&graph, &[function], "x"),
            Err(WriteError::NoDataFlow { .. })
        ));
    }

    // -----------------------------------------------------------------------
    // super
    // -----------------------------------------------------------------------

    #[test]
    fn super_in_instance_method() {
        let fx = fixture();
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.circle, fx.area], SUPER).unwrap(),
            ReferenceForm::SuperInstance { method: fx.area }
        );
    }

    #[test]
    fn super_in_class_method_names_first_parent() {
        let fx = fixture();
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.circle, fx.make], SUPER).unwrap(),
            ReferenceForm::SuperClass {
                parent: Some(fx.base)
            }
        );
    }

    #[test]
    fn super_outside_method_is_an_error() {
        let fx = fixture();
        assert!(matches!(
            form(&fx.graph, &[fx.main, fx.helper], SUPER),
            Err(WriteError::SuperOutsideMethod)
        ));
        assert_eq!(
            form(&fx.graph, &[fx.main, fx.helper], SELF).unwrap(),
            ReferenceForm::SelfReference
        );
    }
}
