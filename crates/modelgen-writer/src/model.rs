//! A neutral pseudo-code backend.
//!
//! `ModelWriter` renders every element kind in a small, language-agnostic
//! notation: declarations are introduced by `@keyword` lines and closed by
//! `@end`, statements read like a scripting language. It is useful for
//! inspecting a model and doubles as the reference for writing a backend.

use modelgen_core::{Capability, ElementId, NodeData, NodeKind, NumberValue, OpKind, ProgramGraph};

use crate::dispatch::{Backend, Handler};
use crate::error::WriteError;
use crate::format::{format, Fragment};
use crate::reference::{MemberAccess, ReferenceForm};
use crate::writer::Writer;
use crate::WriterOptions;

/// The pseudo-code backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelWriter;

type W<'g> = Writer<'g, ModelWriter>;
type Output = Result<String, WriteError>;

impl Backend for ModelWriter {
    fn handler(&self, capability: Capability) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match capability {
            Capability::Program => on_program,
            Capability::Module => on_module,
            Capability::Class => on_class,
            Capability::Constructor => on_constructor,
            Capability::Destructor => on_destructor,
            Capability::ClassMethod => on_class_method,
            Capability::Method => on_method,
            Capability::Function => on_function,
            Capability::Closure => on_closure,
            Capability::Block => on_block,
            Capability::Attribute => on_attribute,
            Capability::Parameter => on_parameter,
            Capability::Argument => on_argument,
            Capability::Operator => on_operator,
            Capability::Reference => on_reference,
            Capability::Number => on_number,
            Capability::String => on_string,
            Capability::List => on_list,
            Capability::Dict => on_dict,
            Capability::Operation => on_operation,
            _ => return None,
        };
        Some(handler)
    }
}

/// Renders `graph` with default options.
pub fn write_model(graph: &ProgramGraph) -> Output {
    Writer::new(graph, ModelWriter, WriterOptions::default()).run()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn name_of(w: &W<'_>, id: ElementId) -> String {
    w.graph().name(id).unwrap_or_default().to_string()
}

fn render(w: &W<'_>, fragments: &[Fragment]) -> String {
    format(fragments, &w.options().indent)
}

fn doc(w: &W<'_>, id: ElementId) -> Vec<Fragment> {
    if !w.options().documentation {
        return Vec::new();
    }
    w.graph()
        .get(id)
        .ok()
        .and_then(|element| element.documentation())
        .map(|text| text.lines().map(|line| Fragment::line(format!("@doc {line}"))).collect())
        .unwrap_or_default()
}

/// Renders the operations of a process, one statement per fragment.
fn statements(w: &mut W<'_>, process: ElementId) -> Result<Vec<Fragment>, WriteError> {
    let ops = w.graph().operations(process).to_vec();
    let written = w.write_all(&ops)?;
    if written.is_empty() {
        return Ok(vec![Fragment::line("pass")]);
    }
    Ok(written.into_iter().map(Fragment::Line).collect())
}

/// Renders the named slots of a context. Values that declare themselves
/// render as-is, plain values are prefixed with the slot name.
fn members(w: &mut W<'_>, context: ElementId) -> Result<Vec<Fragment>, WriteError> {
    let graph = w.graph();
    let mut fragments = Vec::new();
    for (name, value) in graph.slots(context)?.iter() {
        let text = w.write(value)?;
        if text.is_empty() {
            continue;
        }
        let declares = graph.satisfies(value, Capability::Slot)
            || graph.satisfies(value, Capability::Closure)
            || graph.satisfies(value, Capability::Class);
        if declares {
            fragments.push(Fragment::Line(text));
        } else {
            fragments.push(Fragment::line(format!("{name} = {text}")));
        }
    }
    Ok(fragments)
}

/// Renders a node that may be absent, as the empty string.
fn required(w: &mut W<'_>, node: Option<ElementId>) -> Output {
    Ok(w.write_opt(node)?.unwrap_or_default())
}

fn comma_list(w: &mut W<'_>, ids: &[ElementId]) -> Output {
    Ok(w.write_all(ids)?.join(", "))
}

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

fn on_program(w: &mut W<'_>, _: ElementId) -> Output {
    let modules = w.modules_to_write();
    Ok(w.write_all(&modules)?.join("\n\n"))
}

fn on_module(w: &mut W<'_>, id: ElementId) -> Output {
    let imports = w.graph().imports(id).to_vec();
    let mut body = doc(w, id);
    body.extend(w.write_all(&imports)?.into_iter().map(Fragment::Line));
    body.extend(members(w, id)?);
    Ok(render(
        w,
        &[
            Fragment::line(format!("@module {}", name_of(w, id))),
            Fragment::block(body),
            Fragment::line("@end"),
        ],
    ))
}

fn on_class(w: &mut W<'_>, id: ElementId) -> Output {
    let graph = w.graph();
    let keyword = if graph.kind(id)? == NodeKind::Interface {
        "interface"
    } else {
        "class"
    };
    let mut header = format!("@{keyword} {}", name_of(w, id));
    if graph.is_abstract(id) {
        header = format!("@abstract {}", &header[1..]);
    }
    let parents: Vec<String> = graph
        .parent_class_refs(id)
        .iter()
        .filter_map(|r| graph.reference_path(*r))
        .collect();
    if !parents.is_empty() {
        header.push_str(&format!(" : {}", parents.join(", ")));
    }
    let mut body = doc(w, id);
    body.extend(members(w, id)?);
    Ok(render(
        w,
        &[Fragment::line(header), Fragment::block(body), Fragment::line("@end")],
    ))
}

// ---------------------------------------------------------------------------
// Callables
// ---------------------------------------------------------------------------

/// `@keyword name (params) -> type`, then the body and `@end`. Abstract
/// callables have no body.
fn callable(w: &mut W<'_>, id: ElementId, keyword: &str, named: bool) -> Output {
    let graph = w.graph();
    let params = graph.parameters(id).to_vec();
    let mut header = format!("@{keyword}");
    if named {
        header.push(' ');
        header.push_str(&name_of(w, id));
    }
    header.push_str(&format!(" ({})", comma_list(w, &params)?));
    if let Ok(element) = graph.get(id) {
        if let NodeData::Callable(data) = &element.data {
            if let Some(ty) = &data.return_type {
                header.push_str(&format!(" -> {ty}"));
            }
        }
    }
    if graph.is_abstract(id) {
        return Ok(format!("@abstract {}", &header[1..]));
    }
    let mut body = doc(w, id);
    body.extend(statements(w, id)?);
    Ok(render(
        w,
        &[Fragment::line(header), Fragment::block(body), Fragment::line("@end")],
    ))
}

fn on_constructor(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "constructor", false)
}

fn on_destructor(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "destructor", false)
}

fn on_class_method(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "operation", true)
}

fn on_method(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "method", true)
}

fn on_function(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "function", true)
}

fn on_closure(w: &mut W<'_>, id: ElementId) -> Output {
    callable(w, id, "closure", false)
}

fn on_block(w: &mut W<'_>, id: ElementId) -> Output {
    let body = statements(w, id)?;
    Ok(render(w, &body))
}

// ---------------------------------------------------------------------------
// Slots and values
// ---------------------------------------------------------------------------

/// `name : type = default`.
fn slot_declaration(w: &mut W<'_>, id: ElementId) -> Output {
    let graph = w.graph();
    let mut text = name_of(w, id);
    if let NodeData::Slot(data) = &graph.get(id)?.data {
        if data.rest {
            text = format!("...{text}");
        }
        if let Some(ty) = &data.type_description {
            text.push_str(&format!(" : {ty}"));
        }
        if let Some(value) = w.write_opt(data.default_value)? {
            text.push_str(&format!(" = {value}"));
        }
    }
    Ok(text)
}

fn on_attribute(w: &mut W<'_>, id: ElementId) -> Output {
    let keyword = match w.graph().kind(id)? {
        NodeKind::Attribute => "property",
        _ => "shared",
    };
    Ok(format!("@{keyword} {}", slot_declaration(w, id)?))
}

fn on_parameter(w: &mut W<'_>, id: ElementId) -> Output {
    slot_declaration(w, id)
}

fn on_argument(w: &mut W<'_>, id: ElementId) -> Output {
    let graph = w.graph();
    let NodeData::Argument(data) = &graph.get(id)?.data else {
        return Ok(String::new());
    };
    let value = w.write_opt(data.value)?.unwrap_or_default();
    let prefix = if data.as_map {
        "**"
    } else if data.as_list {
        "*"
    } else {
        ""
    };
    Ok(match graph.name(id) {
        Some(name) => format!("{name}={prefix}{value}"),
        None => format!("{prefix}{value}"),
    })
}

fn on_operator(w: &mut W<'_>, id: ElementId) -> Output {
    Ok(name_of(w, id))
}

fn on_reference(w: &mut W<'_>, id: ElementId) -> Output {
    let name = name_of(w, id);
    let form = w.reference_form(&name)?;
    let graph = w.graph();
    Ok(match form {
        ReferenceForm::SelfReference => "self".to_string(),
        ReferenceForm::SuperClass { parent } => parent
            .and_then(|p| graph.absolute_name(p))
            .unwrap_or_else(|| "super".to_string()),
        ReferenceForm::SuperInstance { .. } => "super".to_string(),
        ReferenceForm::Member { access, name, .. } => match access {
            MemberAccess::Instance | MemberAccess::Receiver => format!("self.{name}"),
            MemberAccess::Class => format!("self.class.{name}"),
        },
        ReferenceForm::Local { name }
        | ReferenceForm::ModuleLocal { name }
        | ReferenceForm::Unresolved { name } => name,
        ReferenceForm::Module { path, name } | ReferenceForm::ClassQualified { path, name } => {
            format!("{path}.{name}")
        }
        ReferenceForm::Imported(binding) => binding.local_name,
    })
}

fn on_number(w: &mut W<'_>, id: ElementId) -> Output {
    match &w.graph().get(id)?.data {
        NodeData::Number(NumberValue::Int(value)) => Ok(value.to_string()),
        NodeData::Number(NumberValue::Float(value)) => Ok(format!("{value:?}")),
        _ => Ok(String::new()),
    }
}

fn on_string(w: &mut W<'_>, id: ElementId) -> Output {
    match &w.graph().get(id)?.data {
        NodeData::String(value) => Ok(format!("{value:?}")),
        _ => Ok(String::new()),
    }
}

fn on_list(w: &mut W<'_>, id: ElementId) -> Output {
    let graph = w.graph();
    let values: &[ElementId] = match &graph.get(id)?.data {
        NodeData::List(values) => values.as_slice(),
        _ => &[],
    };
    Ok(format!("[{}]", comma_list(w, values)?))
}

fn on_dict(w: &mut W<'_>, id: ElementId) -> Output {
    let graph = w.graph();
    let items: &[(ElementId, ElementId)] = match &graph.get(id)?.data {
        NodeData::Dict(items) => items.as_slice(),
        _ => &[],
    };
    let mut written = Vec::with_capacity(items.len());
    for (key, value) in items {
        written.push(format!("{}: {}", w.write(*key)?, w.write(*value)?));
    }
    Ok(format!("{{{}}}", written.join(", ")))
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

fn on_operation(w: &mut W<'_>, id: ElementId) -> Output {
    let view = w.graph().op(id)?;
    match view.kind {
        OpKind::Allocation => {
            let name = view.slot_to_allocate().map(|slot| name_of(w, slot)).unwrap_or_default();
            match w.write_opt(view.default_value())? {
                Some(value) => Ok(format!("var {name} = {value}")),
                None => Ok(format!("var {name}")),
            }
        }
        OpKind::Assignment => Ok(format!(
            "{} = {}",
            required(w, view.target())?,
            required(w, view.assigned_value())?
        )),
        OpKind::Resolution => match view.context() {
            Some(context) => {
                let reference = view.reference().map(|r| name_of(w, r)).unwrap_or_default();
                Ok(format!("{}.{reference}", w.write(context)?))
            }
            None => required(w, view.reference()),
        },
        OpKind::Computation => computation(w, id),
        OpKind::Invocation => Ok(format!(
            "{}({})",
            required(w, view.target())?,
            comma_list(w, view.arguments())?
        )),
        OpKind::Instanciation => Ok(format!(
            "new {}({})",
            required(w, view.target())?,
            comma_list(w, view.arguments())?
        )),
        OpKind::Selection => selection(w, view.rules()),
        OpKind::MatchProcess | OpKind::MatchExpression => {
            let fragments = rule(w, id, "if")?;
            let mut all = fragments;
            all.push(Fragment::line("end"));
            Ok(render(w, &all))
        }
        OpKind::Iteration => iteration(w, view.iterator(), view.closure()),
        OpKind::Enumeration => {
            let mut text = format!("{}..{}", required(w, view.start())?, required(w, view.end())?);
            if let Some(step) = w.write_opt(view.step())? {
                text.push_str(&format!(" by {step}"));
            }
            Ok(text)
        }
        OpKind::Repetition => {
            let condition = required(w, view.condition())?;
            let body = process_body(w, view.process())?;
            Ok(render(
                w,
                &[
                    Fragment::line(format!("while {condition}")),
                    Fragment::block(body),
                    Fragment::line("end"),
                ],
            ))
        }
        OpKind::Access => Ok(format!(
            "{}[{}]",
            required(w, view.target())?,
            required(w, view.index())?
        )),
        OpKind::Slice => Ok(format!(
            "{}[{}:{}]",
            required(w, view.target())?,
            required(w, view.slice_start())?,
            required(w, view.slice_end())?
        )),
        OpKind::Evaluation => required(w, view.evaluable()),
        OpKind::Termination => match w.write_opt(view.returned_value())? {
            Some(value) => Ok(format!("return {value}")),
            None => Ok("return".to_string()),
        },
        OpKind::Breaking => Ok("break".to_string()),
        OpKind::Continue => Ok("continue".to_string()),
        OpKind::Except => Ok(format!("raise {}", required(w, view.exception())?)),
        OpKind::Interception => {
            let mut fragments = vec![Fragment::line("try")];
            fragments.push(Fragment::block(process_body(w, view.try_process())?));
            if view.catch_process().is_some() {
                fragments.push(Fragment::line("catch"));
                fragments.push(Fragment::block(process_body(w, view.catch_process())?));
            }
            if view.finally_process().is_some() {
                fragments.push(Fragment::line("finally"));
                fragments.push(Fragment::block(process_body(w, view.finally_process())?));
            }
            fragments.push(Fragment::line("end"));
            Ok(render(w, &fragments))
        }
        OpKind::Chain => {
            let target = required(w, view.target())?;
            let groups = w.write_all(view.groups())?;
            Ok(render(
                w,
                &[
                    Fragment::line(format!("with {target}")),
                    Fragment::block(groups.into_iter().map(Fragment::Line).collect()),
                    Fragment::line("end"),
                ],
            ))
        }
        OpKind::Embed => Ok(render(
            w,
            &[
                Fragment::line(format!("@embed {}", view.language().unwrap_or_default())),
                Fragment::block(vec![Fragment::line(view.code().unwrap_or_default())]),
                Fragment::line("@end"),
            ],
        )),
        OpKind::Nop => Ok("pass".to_string()),
        OpKind::ImportModule => {
            let module = view.imported_name().unwrap_or_default();
            Ok(match view.alias() {
                Some(alias) => format!("import {module} as {alias}"),
                None => format!("import {module}"),
            })
        }
        OpKind::ImportModules => Ok(format!("import {}", view.imported_names().join(", "))),
        OpKind::ImportSymbol => {
            let symbol = view.imported_name().unwrap_or_default();
            let mut text = match view.origin() {
                Some(origin) => format!("from {origin} import {symbol}"),
                None => format!("import {symbol}"),
            };
            if let Some(alias) = view.alias() {
                text.push_str(&format!(" as {alias}"));
            }
            Ok(text)
        }
        OpKind::ImportSymbols => {
            let symbols = view.imported_names().join(", ");
            Ok(match view.origin() {
                Some(origin) => format!("from {origin} import {symbols}"),
                None => format!("import {symbols}"),
            })
        }
    }
}

/// Binary or unary computation. Operands that are computations binding
/// less tightly are parenthesized.
fn computation(w: &mut W<'_>, id: ElementId) -> Output {
    let view = w.graph().op(id)?;
    let priority = view.operator().map_or(0, |op| operator_priority(w, op));
    let symbol = view.operator().map(|op| name_of(w, op)).unwrap_or_default();
    let left = operand(w, view.left_operand(), priority)?;
    match view.right_operand() {
        Some(right) => {
            let right = operand(w, Some(right), priority)?;
            Ok(format!("{left} {symbol} {right}"))
        }
        None => Ok(format!("{symbol}{left}")),
    }
}

fn operand(w: &mut W<'_>, node: Option<ElementId>, priority: u32) -> Output {
    let Some(node) = node else {
        return Ok(String::new());
    };
    let text = w.write(node)?;
    let nested = w
        .graph()
        .op(node)
        .ok()
        .filter(|inner| inner.kind == OpKind::Computation)
        .and_then(|inner| inner.operator())
        .map(|op| operator_priority(w, op));
    Ok(match nested {
        Some(inner) if inner < priority => format!("({text})"),
        _ => text,
    })
}

fn operator_priority(w: &W<'_>, operator: ElementId) -> u32 {
    match w.graph().get(operator).map(|element| &element.data) {
        Ok(NodeData::Operator { priority }) => *priority,
        _ => 0,
    }
}

/// The body of a process argument: a block's statements, or the process
/// rendered as a single statement.
fn process_body(w: &mut W<'_>, process: Option<ElementId>) -> Result<Vec<Fragment>, WriteError> {
    match process {
        Some(process) => {
            let text = w.write(process)?;
            if text.is_empty() {
                Ok(vec![Fragment::line("pass")])
            } else {
                Ok(vec![Fragment::Line(text)])
            }
        }
        None => Ok(vec![Fragment::line("pass")]),
    }
}

/// `keyword predicate` followed by the indented body of a match rule.
fn rule(w: &mut W<'_>, id: ElementId, keyword: &str) -> Result<Vec<Fragment>, WriteError> {
    let view = w.graph().op(id)?;
    let predicate = w.write_opt(view.predicate())?.unwrap_or_default();
    let body = match view.kind {
        OpKind::MatchExpression => {
            vec![Fragment::Line(w.write_opt(view.expression())?.unwrap_or_default())]
        }
        _ => process_body(w, view.process())?,
    };
    Ok(vec![
        Fragment::line(format!("{keyword} {predicate}")),
        Fragment::block(body),
    ])
}

fn selection(w: &mut W<'_>, rules: &[ElementId]) -> Output {
    let mut fragments = Vec::new();
    for (index, rule_id) in rules.iter().enumerate() {
        let keyword = if index == 0 { "if" } else { "else if" };
        fragments.extend(w.within(*rule_id, |w| rule(w, *rule_id, keyword))?);
    }
    fragments.push(Fragment::line("end"));
    Ok(render(w, &fragments))
}

/// `for params in iterator`, with the closure's statements as the body.
fn iteration(w: &mut W<'_>, iterator: Option<ElementId>, closure: Option<ElementId>) -> Output {
    let iterator = w.write_opt(iterator)?.unwrap_or_default();
    let Some(closure) = closure else {
        return Ok(format!("for _ in {iterator}"));
    };
    let graph = w.graph();
    let names: Vec<&str> = graph
        .parameters(closure)
        .iter()
        .filter_map(|p| graph.name(*p))
        .collect();
    let body = w.within(closure, |w| statements(w, closure))?;
    Ok(render(
        w,
        &[
            Fragment::line(format!("for {} in {iterator}", names.join(", "))),
            Fragment::block(body),
            Fragment::line("end"),
        ],
    ))
}
