//! Typed views over class slots, and inherited member lookup.
//!
//! A class stores a single ordered slot list. Attributes, methods,
//! constructors and the rest are filters over that list by capability, so
//! the views can never disagree with the slots.

use indexmap::IndexMap;

use crate::capability::Capability;
use crate::error::CoreError;
use crate::graph::ProgramGraph;
use crate::id::ElementId;

impl ProgramGraph {
    /// Slot values of `context` satisfying `cap`, minus those satisfying
    /// `without`, in slot order.
    pub fn slot_values_satisfying(
        &self,
        context: ElementId,
        cap: Capability,
        without: Option<Capability>,
    ) -> Vec<ElementId> {
        let Ok(slots) = self.slots(context) else {
            return Vec::new();
        };
        slots
            .values()
            .filter(|value| self.satisfies(*value, cap))
            .filter(|value| without.map_or(true, |w| !self.satisfies(*value, w)))
            .collect()
    }

    /// Instance attributes (class attributes excluded).
    pub fn attributes(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Attribute, Some(Capability::ClassAttribute))
    }

    pub fn class_attributes(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::ClassAttribute, None)
    }

    pub fn constructors(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Constructor, None)
    }

    pub fn destructors(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Destructor, None)
    }

    /// Every method, including constructors and accessors.
    pub fn methods(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Method, None)
    }

    pub fn instance_methods(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::InstanceMethod, None)
    }

    pub fn class_methods(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::ClassMethod, None)
    }

    pub fn accessors(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Accessor, None)
    }

    pub fn mutators(&self, class: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(class, Capability::Mutator, None)
    }

    /// Classes declared in a module.
    pub fn classes(&self, module: ElementId) -> Vec<ElementId> {
        self.slot_values_satisfying(module, Capability::Class, None)
    }

    // -----------------------------------------------------------------------
    // Inheritance
    // -----------------------------------------------------------------------

    /// Slots reachable through the class's DataFlow sources and not
    /// declared on the class itself, with their bound values.
    pub fn inherited_slots(&self, class: ElementId) -> Result<Vec<(String, Option<ElementId>)>, CoreError> {
        let flow = self.dataflow_of(class).ok_or(CoreError::NoDataFlow { id: class })?;
        Ok(self
            .flows()
            .sources_slots(flow)
            .into_iter()
            .filter(|(name, _)| !self.has_slot(class, name))
            .map(|(name, resolved)| (name.to_string(), resolved.slot.value))
            .collect())
    }

    /// Class methods inherited through the sources axis and not redeclared
    /// on `class`.
    pub fn inherited_class_methods(&self, class: ElementId) -> Result<IndexMap<String, ElementId>, CoreError> {
        self.inherited_like(class, Capability::ClassMethod)
    }

    /// Class attributes inherited through the sources axis and not
    /// redeclared on `class`.
    pub fn inherited_class_attributes(&self, class: ElementId) -> Result<IndexMap<String, ElementId>, CoreError> {
        self.inherited_like(class, Capability::ClassAttribute)
    }

    fn inherited_like(&self, class: ElementId, cap: Capability) -> Result<IndexMap<String, ElementId>, CoreError> {
        Ok(self
            .inherited_slots(class)?
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .filter(|(_, value)| self.satisfies(*value, cap))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{DefaultFactory, Factory};

    /// Class `name` with one class method `make` (when `with_make`) and a
    /// DataFlow holding its slots as locals.
    fn class_with_flow(graph: &mut ProgramGraph, name: &str, with_make: bool) -> ElementId {
        let f = DefaultFactory;
        let class = f.create_class(graph, name, Vec::new()).unwrap();
        if with_make {
            let make = f.create_class_method(graph, "make", Vec::new()).unwrap();
            graph.set_slot(class, "make", make, true).unwrap();
        }
        let flow = graph.ensure_dataflow(class).unwrap();
        let slots: Vec<(String, ElementId)> = graph
            .slots(class)
            .unwrap()
            .iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        for (slot, value) in slots {
            graph
                .flows_mut()
                .declare_variable(flow, &slot, Some(value), Some(class))
                .unwrap();
        }
        class
    }

    fn inherit(graph: &mut ProgramGraph, child: ElementId, parent: ElementId) {
        let child_flow = graph.dataflow_of(child).unwrap();
        let parent_flow = graph.dataflow_of(parent).unwrap();
        graph.flows_mut().add_source(child_flow, parent_flow).unwrap();
    }

    #[test]
    fn views_filter_single_slot_list() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let class = f.create_class(&mut graph, "Shape", Vec::new()).unwrap();
        let area = f.create_attribute(&mut graph, "area", None).unwrap();
        let count = f.create_class_attribute(&mut graph, "count", None).unwrap();
        let init = f.create_constructor(&mut graph, Vec::new()).unwrap();
        let draw = f.create_instance_method(&mut graph, "draw", Vec::new()).unwrap();
        let make = f.create_class_method(&mut graph, "make", Vec::new()).unwrap();
        for (name, value) in [("area", area), ("count", count), ("init", init), ("draw", draw), ("make", make)] {
            graph.set_slot(class, name, value, true).unwrap();
        }

        assert_eq!(graph.attributes(class), vec![area]);
        assert_eq!(graph.class_attributes(class), vec![count]);
        assert_eq!(graph.constructors(class), vec![init]);
        assert_eq!(graph.instance_methods(class), vec![draw]);
        assert_eq!(graph.class_methods(class), vec![make]);
        assert_eq!(graph.methods(class), vec![init, draw, make]);
        assert!(graph.destructors(class).is_empty());
    }

    #[test]
    fn inherited_class_method_visible_until_redeclared() {
        let mut graph = DefaultFactory.create_program(None);
        let a = class_with_flow(&mut graph, "A", true);
        let b = class_with_flow(&mut graph, "B", false);
        inherit(&mut graph, b, a);

        let a_make = graph.get_slot(a, "make").unwrap();
        let inherited = graph.inherited_class_methods(b).unwrap();
        assert_eq!(inherited.get("make"), Some(&a_make));

        let c = class_with_flow(&mut graph, "C", true);
        inherit(&mut graph, c, a);
        assert!(graph.inherited_class_methods(c).unwrap().is_empty());
    }

    #[test]
    fn inherited_lookup_requires_dataflow() {
        let f = DefaultFactory;
        let mut graph = f.create_program(None);
        let class = f.create_class(&mut graph, "Bare", Vec::new()).unwrap();
        match graph.inherited_class_methods(class) {
            Err(CoreError::NoDataFlow { id }) => assert_eq!(id, class),
            other => panic!("Expected NoDataFlow, got {:?}", other),
        }
    }
}
