//! Elements: the nodes of the program model.
//!
//! An [`Element`] is a kind discriminant, an optional name, annotations, and
//! a [`NodeData`] payload carrying the fields its kind needs. Links between
//! elements are [`ElementId`] handles into the owning graph's arena.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::capability::NodeKind;
use crate::id::{DataFlowId, ElementId};
use crate::ops::OpArg;

/// Annotation name for documentation strings.
pub const DOCUMENTATION: &str = "documentation";
/// Annotation name for free-form comments.
pub const COMMENT: &str = "comment";
/// Elements annotated `shadow` are skipped by writers.
pub const SHADOW: &str = "shadow";
/// Names of outer-scope slots a closure assigns to.
pub const MUTATES: &str = "mutates";

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

/// A named annotation attached to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub content: AnnotationContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationContent {
    Flag,
    Text(String),
    Names(Vec<String>),
}

impl Annotation {
    pub fn flag(name: &str) -> Self {
        Annotation {
            name: name.to_string(),
            content: AnnotationContent::Flag,
        }
    }

    pub fn text(name: &str, text: &str) -> Self {
        Annotation {
            name: name.to_string(),
            content: AnnotationContent::Text(text.to_string()),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            AnnotationContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn names(&self) -> &[String] {
        match &self.content {
            AnnotationContent::Names(names) => names,
            _ => &[],
        }
    }
}

// ---------------------------------------------------------------------------
// Slot list
// ---------------------------------------------------------------------------

/// Ordered name to value bindings of a context.
///
/// Rebinding a name removes the old entry and appends the new one, so the
/// order is last-touched order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotList {
    entries: IndexMap<String, ElementId>,
}

impl SlotList {
    /// Binds `name`, returning the value it replaced.
    pub fn bind(&mut self, name: &str, value: ElementId) -> Option<ElementId> {
        let previous = self.entries.shift_remove(name);
        self.entries.insert(name.to_string(), value);
        previous
    }

    pub fn get(&self, name: &str) -> Option<ElementId> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ElementId> {
        self.entries.shift_remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.entries.values().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ElementId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramData {
    pub slots: SlotList,
    pub modules: Vec<ElementId>,
    /// Name of the factory that built this program.
    pub factory: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleData {
    pub slots: SlotList,
    pub imports: Vec<ElementId>,
    /// Placeholder created for an import that names a module not in the program.
    pub imported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassData {
    pub slots: SlotList,
    /// References (or resolutions) naming the parent classes.
    pub parents: Vec<ElementId>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallableData {
    pub slots: SlotList,
    pub parameters: Vec<ElementId>,
    pub operations: Vec<ElementId>,
    pub return_type: Option<String>,
    pub is_abstract: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockData {
    pub slots: SlotList,
    pub operations: Vec<ElementId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationData {
    pub args: Vec<OpArg>,
}

/// Parameters and attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotData {
    pub type_description: Option<String>,
    pub default_value: Option<ElementId>,
    pub optional: bool,
    /// Collects the remaining positional arguments.
    pub rest: bool,
}

/// An argument passed at an invocation site. Its element name, when set,
/// makes it a by-name argument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArgumentData {
    pub value: Option<ElementId>,
    pub as_list: bool,
    pub as_map: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NumberValue {
    Int(i64),
    Float(f64),
}

/// Kind-specific fields of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    Program(ProgramData),
    Module(ModuleData),
    Class(ClassData),
    Callable(CallableData),
    Block(BlockData),
    Operation(OperationData),
    Number(NumberValue),
    String(String),
    List(Vec<ElementId>),
    Dict(Vec<(ElementId, ElementId)>),
    /// The referenced name is the element's name.
    Reference,
    Operator { priority: u32 },
    Slot(SlotData),
    Argument(ArgumentData),
}

impl NodeData {
    pub fn slots(&self) -> Option<&SlotList> {
        match self {
            NodeData::Program(data) => Some(&data.slots),
            NodeData::Module(data) => Some(&data.slots),
            NodeData::Class(data) => Some(&data.slots),
            NodeData::Callable(data) => Some(&data.slots),
            NodeData::Block(data) => Some(&data.slots),
            _ => None,
        }
    }

    pub fn slots_mut(&mut self) -> Option<&mut SlotList> {
        match self {
            NodeData::Program(data) => Some(&mut data.slots),
            NodeData::Module(data) => Some(&mut data.slots),
            NodeData::Class(data) => Some(&mut data.slots),
            NodeData::Callable(data) => Some(&mut data.slots),
            NodeData::Block(data) => Some(&mut data.slots),
            _ => None,
        }
    }

    pub fn operations(&self) -> Option<&[ElementId]> {
        match self {
            NodeData::Callable(data) => Some(&data.operations),
            NodeData::Block(data) => Some(&data.operations),
            _ => None,
        }
    }

    pub(crate) fn operations_mut(&mut self) -> Option<&mut Vec<ElementId>> {
        match self {
            NodeData::Callable(data) => Some(&mut data.operations),
            NodeData::Block(data) => Some(&mut data.operations),
            _ => None,
        }
    }

    /// Elements exclusively owned through this payload (everything except
    /// slot values and module membership, which are tracked by the context).
    pub(crate) fn owned_children(&self) -> Vec<ElementId> {
        match self {
            NodeData::Callable(data) => data
                .parameters
                .iter()
                .chain(data.operations.iter())
                .copied()
                .collect(),
            NodeData::Block(data) => data.operations.clone(),
            NodeData::Class(data) => data.parents.clone(),
            NodeData::Operation(data) => data.args.iter().flat_map(OpArg::element_ids).collect(),
            NodeData::List(values) => values.clone(),
            NodeData::Dict(items) => items.iter().flat_map(|(k, v)| [*k, *v]).collect(),
            NodeData::Slot(data) => data.default_value.into_iter().collect(),
            NodeData::Argument(data) => data.value.into_iter().collect(),
            _ => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// A node of the program model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    pub kind: NodeKind,
    pub name: Option<String>,
    pub annotations: Vec<Annotation>,
    /// Cached abstract type, filled by an optional type-inference pass.
    pub abstract_type: Option<String>,
    pub data: NodeData,
    pub(crate) parent: Option<ElementId>,
    pub(crate) dataflow: Option<DataFlowId>,
}

impl Element {
    /// The exclusive owner of this element.
    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// The DataFlow owned by this element, once the resolver has run.
    pub fn dataflow(&self) -> Option<DataFlowId> {
        self.dataflow
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Replaces the content of the first annotation named like `annotation`,
    /// or appends it.
    pub fn set_annotation(&mut self, annotation: Annotation) {
        match self.annotations.iter_mut().find(|a| a.name == annotation.name) {
            Some(existing) => existing.content = annotation.content,
            None => self.annotations.push(annotation),
        }
    }

    pub fn add_annotation(&mut self, annotation: Annotation) {
        self.annotations.push(annotation);
    }

    pub fn remove_annotation(&mut self, name: &str) -> Option<Annotation> {
        let index = self.annotations.iter().position(|a| a.name == name)?;
        Some(self.annotations.remove(index))
    }

    pub fn documentation(&self) -> Option<&str> {
        self.annotation(DOCUMENTATION).and_then(Annotation::as_text)
    }

    pub fn set_documentation(&mut self, text: &str) {
        self.set_annotation(Annotation::text(DOCUMENTATION, text));
    }

    /// Adds `name` to the list held by the annotation `annotation`, creating
    /// it if needed. Names are kept unique.
    pub fn note_name(&mut self, annotation: &str, name: &str) {
        match self.annotations.iter_mut().find(|a| a.name == annotation) {
            Some(existing) => match &mut existing.content {
                AnnotationContent::Names(names) => {
                    if !names.iter().any(|n| n == name) {
                        names.push(name.to_string());
                    }
                }
                content => *content = AnnotationContent::Names(vec![name.to_string()]),
            },
            None => self.annotations.push(Annotation {
                name: annotation.to_string(),
                content: AnnotationContent::Names(vec![name.to_string()]),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(name: &str) -> Element {
        Element {
            id: ElementId(0),
            kind: NodeKind::Reference,
            name: Some(name.into()),
            annotations: Vec::new(),
            abstract_type: None,
            data: NodeData::Reference,
            parent: None,
            dataflow: None,
        }
    }

    #[test]
    fn slot_list_rebind_moves_to_end() {
        let mut slots = SlotList::default();
        slots.bind("a", ElementId(1));
        slots.bind("b", ElementId(2));
        let previous = slots.bind("a", ElementId(3));

        assert_eq!(previous, Some(ElementId(1)));
        assert_eq!(slots.names().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(slots.get("a"), Some(ElementId(3)));
        assert_eq!(slots.len(), 2);
    }

    #[test]
    fn set_annotation_replaces_add_appends() {
        let mut el = reference("x");
        el.set_documentation("first");
        el.set_documentation("second");
        assert_eq!(el.documentation(), Some("second"));
        assert_eq!(el.annotations.len(), 1);

        el.add_annotation(Annotation::text(COMMENT, "a"));
        el.add_annotation(Annotation::text(COMMENT, "b"));
        assert_eq!(el.annotations.len(), 3);
        assert!(el.remove_annotation(COMMENT).is_some());
        assert_eq!(el.annotations.len(), 2);
    }

    #[test]
    fn note_name_keeps_names_unique() {
        let mut el = reference("x");
        el.note_name(MUTATES, "count");
        el.note_name(MUTATES, "total");
        el.note_name(MUTATES, "count");
        assert_eq!(el.annotation(MUTATES).unwrap().names(), &["count", "total"]);
    }

    #[test]
    fn annotations_serialize_by_content_kind() {
        let mut el = reference("counter");
        el.set_documentation("Counts.");
        el.note_name(MUTATES, "total");
        el.note_name(MUTATES, "count");
        el.note_name(MUTATES, "total");
        el.add_annotation(Annotation::flag(SHADOW));
        insta::assert_json_snapshot!(el.annotations, @r#"
        [
          {
            "name": "documentation",
            "content": {
              "Text": "Counts."
            }
          },
          {
            "name": "mutates",
            "content": {
              "Names": [
                "total",
                "count"
              ]
            }
          },
          {
            "name": "shadow",
            "content": "Flag"
          }
        ]
        "#);
    }
}
