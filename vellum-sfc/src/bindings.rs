//! Binding resolution: turns the parsed element tree into the normalized
//! render tree the generator walks. Directive sets are decided here once,
//! so the generator only pattern-matches finished shapes.

use indexmap::IndexMap;

use crate::error::{SfcError, SfcResult};
use crate::expr::{js_key, parse_for, string_lit};
use crate::template_ast::{
    Directive, DirectiveForm, DirectiveKind, ElementNode, InterpolationNode, Node, TextNode,
};

/// Value of one entry in an element's attribute map.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Static attribute; `None` is a value-less attribute (`disabled`).
    Literal(Option<String>),
    /// Raw bound expression.
    Expr(String),
}

impl AttrValue {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, AttrValue::Expr(_))
    }
}

/// Attributes in source order: runs of literal/individual entries
/// separated by spread expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrSegment {
    Entries(IndexMap<String, AttrValue>),
    Spread(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub expression: String,
    pub modifiers: Vec<String>,
    pub offset: usize,
}

/// A directive the runtime applies itself: `v-show` or a custom one.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeDirective {
    pub name: String,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
    /// `None` for a directive written without a value.
    pub expression: Option<String>,
    pub offset: usize,
}

impl RuntimeDirective {
    /// The attribute as written: `v-name:arg.mod`.
    pub fn raw_name(&self) -> String {
        let mut raw = format!("v-{}", self.name);
        if let Some(arg) = &self.arg {
            raw.push(':');
            raw.push_str(arg);
        }
        for m in &self.modifiers {
            raw.push('.');
            raw.push_str(m);
        }
        raw
    }
}

/// What a `v-model` is attached to; decides which DOM property and event
/// it syncs through.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTarget {
    /// `<input>` of a text-like type, or `<textarea>`.
    Text,
    /// `<input type="checkbox">`; the value pushed into an array model.
    Checkbox(Option<AttrValue>),
    /// `<input type="radio">` and its value.
    Radio(Option<AttrValue>),
    Select,
    /// A child component; synced through its `value` prop and `input` event.
    Component,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelBinding {
    pub expression: String,
    pub target: ModelTarget,
    pub modifiers: Vec<String>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementProps {
    pub key: Option<AttrValue>,
    pub ref_: Option<AttrValue>,
    pub static_class: Option<String>,
    pub class: Option<String>,
    pub static_style: Option<String>,
    pub style: Option<String>,
    pub attrs: Vec<AttrSegment>,
    pub on: IndexMap<String, Vec<Handler>>,
    pub slot: Option<String>,
    pub directives: Vec<RuntimeDirective>,
    /// `textContent` / `innerHTML` to their raw expression.
    pub dom_props: IndexMap<String, String>,
    pub model: Option<ModelBinding>,
}

impl ElementProps {
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
            && self.ref_.is_none()
            && self.static_class.is_none()
            && self.class.is_none()
            && self.static_style.is_none()
            && self.style.is_none()
            && self.attrs.is_empty()
            && self.on.is_empty()
            && self.slot.is_none()
            && self.directives.is_empty()
            && self.dom_props.is_empty()
            && self.model.is_none()
    }

    pub fn is_static(&self) -> bool {
        !self.key.as_ref().is_some_and(AttrValue::is_dynamic)
            && !self.ref_.as_ref().is_some_and(AttrValue::is_dynamic)
            && self.class.is_none()
            && self.style.is_none()
            && self.on.is_empty()
            && self.directives.is_empty()
            && self.dom_props.is_empty()
            && self.model.is_none()
            && self.attrs.iter().all(|seg| match seg {
                AttrSegment::Entries(map) => map.values().all(|v| !v.is_dynamic()),
                AttrSegment::Spread(_) => false,
            })
    }
}

/// How a `<slot>`'s bindings surface in the generated call.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotBindings {
    None,
    /// Individual bindings only, in declaration order.
    IndividualOnly(IndexMap<String, String>),
    /// One or more spreads; the last one wins.
    SpreadOnly(String),
    /// Individual bindings sorted by key, plus the winning spread.
    Mixed(IndexMap<String, String>, String),
}

impl SlotBindings {
    /// Third argument of the slot call.
    pub fn static_extra_props(&self) -> Option<&IndexMap<String, String>> {
        match self {
            SlotBindings::Mixed(props, _) => Some(props),
            _ => None,
        }
    }

    /// Fourth argument of the slot call, as generated code.
    pub fn dynamic_binding_expr(&self) -> Option<String> {
        match self {
            SlotBindings::None => None,
            SlotBindings::IndividualOnly(props) => Some(object_literal(props)),
            SlotBindings::SpreadOnly(expr) | SlotBindings::Mixed(_, expr) => Some(expr.clone()),
        }
    }
}

/// `{key:expr,...}` with keys in map order.
pub fn object_literal(props: &IndexMap<String, String>) -> String {
    let entries: Vec<String> = props
        .iter()
        .map(|(k, v)| format!("{}:{}", js_key(k), v))
        .collect();
    format!("{{{}}}", entries.join(","))
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotName {
    Static(String),
    Dynamic(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotInvocation {
    pub name: SlotName,
    pub fallback: Option<Vec<RenderNode>>,
    pub bindings: SlotBindings,
    /// Directives the slot call has no position for.
    pub extra: Vec<Directive>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderElement {
    pub tag: String,
    pub props: ElementProps,
    pub children: Vec<RenderNode>,
    /// Directives left for the generator to accept or reject.
    pub extra: Vec<Directive>,
    /// No bindings, interpolation or slot anywhere in this subtree.
    pub hoistable: bool,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// `None` for the closing `v-else`.
    pub condition: Option<String>,
    pub node: RenderNode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListRender {
    pub source: String,
    pub alias: String,
    pub iterators: Vec<String>,
    pub body: Box<RenderNode>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderNode {
    Element(RenderElement),
    Text(TextNode),
    Interpolation(InterpolationNode),
    Slot(SlotInvocation),
    Conditional(Vec<Branch>),
    List(ListRender),
    /// Children of a nested `<template>`, spliced in place.
    Fragment(Vec<RenderNode>, usize),
}

impl RenderNode {
    pub fn offset(&self) -> usize {
        match self {
            RenderNode::Element(e) => e.offset,
            RenderNode::Text(t) => t.offset,
            RenderNode::Interpolation(i) => i.offset,
            RenderNode::Slot(s) => s.offset,
            RenderNode::Conditional(branches) => branches.first().map_or(0, |b| b.node.offset()),
            RenderNode::List(l) => l.offset,
            RenderNode::Fragment(_, offset) => *offset,
        }
    }

    /// Whether this child can expand to a runtime-determined number of nodes.
    pub fn is_variable_length(&self) -> bool {
        match self {
            RenderNode::Slot(_) | RenderNode::List(_) | RenderNode::Fragment(..) => true,
            RenderNode::Conditional(branches) => branches.iter().any(|b| b.node.is_variable_length()),
            _ => false,
        }
    }

    fn is_hoistable(&self) -> bool {
        match self {
            RenderNode::Text(_) => true,
            RenderNode::Element(e) => e.hoistable,
            _ => false,
        }
    }
}

/// Resolve the children of the synthetic template root.
pub fn resolve_template(root: &ElementNode) -> SfcResult<Vec<RenderNode>> {
    resolve_children(&root.children)
}

fn is_structural(d: &Directive) -> bool {
    matches!(
        d.kind,
        DirectiveKind::If | DirectiveKind::ElseIf | DirectiveKind::Else | DirectiveKind::For
    )
}

fn is_whitespace_text(node: &Node) -> bool {
    matches!(node, Node::Text(t) if t.text.trim().is_empty())
}

fn resolve_children(children: &[Node]) -> SfcResult<Vec<RenderNode>> {
    let mut out = Vec::with_capacity(children.len());
    let mut chain: Option<Vec<Branch>> = None;

    for node in children {
        if let Node::Element(el) = node {
            let else_if = el.directive(&DirectiveKind::ElseIf);
            let else_ = el.directive(&DirectiveKind::Else);
            if let Some(d) = else_if.or(else_) {
                let open = chain
                    .as_mut()
                    .filter(|branches| branches.last().is_some_and(|b| b.condition.is_some()));
                let Some(branches) = open else {
                    return Err(SfcError::syntax(
                        d.offset,
                        "v-else/v-else-if has no adjacent v-if element",
                    ));
                };
                let condition = else_if.map(|d| d.expression.clone());
                let closes = condition.is_none();
                branches.push(Branch {
                    condition,
                    node: resolve_plain(el)?,
                });
                if closes {
                    if let Some(done) = chain.take() {
                        out.push(RenderNode::Conditional(done));
                    }
                }
                continue;
            }
        }
        if chain.is_some() && is_whitespace_text(node) {
            continue;
        }
        if let Some(done) = chain.take() {
            out.push(RenderNode::Conditional(done));
        }

        match node {
            Node::Element(el) => {
                let starts_chain = el.directive(&DirectiveKind::For).is_none();
                match el.directive(&DirectiveKind::If) {
                    Some(d) if starts_chain => {
                        chain = Some(vec![Branch {
                            condition: Some(d.expression.clone()),
                            node: resolve_plain(el)?,
                        }]);
                    }
                    _ => out.push(resolve_element(el)?),
                }
            }
            Node::Text(t) => out.push(RenderNode::Text(t.clone())),
            Node::Interpolation(i) => out.push(RenderNode::Interpolation(i.clone())),
        }
    }
    if let Some(done) = chain.take() {
        out.push(RenderNode::Conditional(done));
    }
    Ok(out)
}

fn resolve_element(el: &ElementNode) -> SfcResult<RenderNode> {
    let Some(for_d) = el.directive(&DirectiveKind::For) else {
        return resolve_plain(el);
    };
    let parsed = parse_for(&for_d.expression)
        .ok_or_else(|| SfcError::syntax(for_d.offset, format!("invalid v-for expression `{}`", for_d.expression)))?;
    let inner = resolve_plain(el)?;
    // v-for binds tighter than v-if on the same element
    let body = match el.directive(&DirectiveKind::If) {
        Some(d) => RenderNode::Conditional(vec![Branch {
            condition: Some(d.expression.clone()),
            node: inner,
        }]),
        None => inner,
    };
    Ok(RenderNode::List(ListRender {
        source: parsed.source,
        alias: parsed.alias,
        iterators: parsed.iterators,
        body: Box::new(body),
        offset: el.offset,
    }))
}

/// Resolve an element ignoring its structural directives.
fn resolve_plain(el: &ElementNode) -> SfcResult<RenderNode> {
    if el.tag == "template" {
        return Ok(RenderNode::Fragment(resolve_children(&el.children)?, el.offset));
    }
    if el.is_slot() {
        return Ok(RenderNode::Slot(resolve_slot(el)?));
    }
    let props = resolve_element_props(el)?;
    let children = resolve_children(&el.children)?;
    let extra: Vec<Directive> = el
        .directives
        .iter()
        .filter(|d| !is_structural(d) && !is_consumed(d, el))
        .cloned()
        .collect();
    let hoistable = extra.is_empty() && props.is_static() && children.iter().all(RenderNode::is_hoistable);
    Ok(RenderNode::Element(RenderElement {
        tag: el.tag.clone(),
        props,
        children,
        extra,
        hoistable,
        offset: el.offset,
    }))
}

/// `v-*` names with no element-level meaning here.
const UNSUPPORTED_DIRECTIVES: &[&str] = &["slot", "pre", "once"];

/// Directives that resolve_element_props turns into props.
fn is_consumed(d: &Directive, el: &ElementNode) -> bool {
    match (&d.kind, d.form) {
        (DirectiveKind::Bind, DirectiveForm::Spread) => true,
        (DirectiveKind::Bind, DirectiveForm::Individual) => d.modifiers.iter().all(|m| m == "camel"),
        (DirectiveKind::On, DirectiveForm::Individual) => true,
        (DirectiveKind::Other(name), _) if name == "model" => model_target(el).is_some(),
        (DirectiveKind::Other(name), _) => !UNSUPPORTED_DIRECTIVES.contains(&name.as_str()),
        _ => false,
    }
}

fn is_component_tag(tag: &str) -> bool {
    tag.contains('-') || tag.starts_with(|c: char| c.is_ascii_uppercase())
}

fn model_target(el: &ElementNode) -> Option<ModelTarget> {
    let value = || {
        el.directives
            .iter()
            .find(|d| d.kind == DirectiveKind::Bind && d.key.as_deref() == Some("value"))
            .map(|d| AttrValue::Expr(d.expression.clone()))
            .or_else(|| el.static_attrs.get("value").map(|a| AttrValue::Literal(a.value.clone())))
    };
    match el.tag.as_str() {
        "input" => Some(match el.static_attr("type") {
            Some("checkbox") => ModelTarget::Checkbox(value()),
            Some("radio") => ModelTarget::Radio(value()),
            _ => ModelTarget::Text,
        }),
        "textarea" => Some(ModelTarget::Text),
        "select" => Some(ModelTarget::Select),
        tag if is_component_tag(tag) => Some(ModelTarget::Component),
        _ => None,
    }
}

fn needs_expression(d: &Directive, raw: &str) -> SfcResult<String> {
    if d.expression.is_empty() {
        return Err(SfcError::syntax(d.offset, format!("`{raw}` needs an expression")));
    }
    Ok(d.expression.clone())
}

fn camelize(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn bind_key(d: &Directive) -> String {
    let key = d.key.clone().unwrap_or_default();
    if d.modifiers.iter().any(|m| m == "camel") {
        camelize(&key)
    } else {
        key
    }
}

enum Entry {
    Attr(String, AttrValue),
    Spread(String),
}

/// Normalize a generic element's attribute and directive set.
pub fn resolve_element_props(el: &ElementNode) -> SfcResult<ElementProps> {
    let mut props = ElementProps {
        slot: el.slot_name.clone(),
        ..ElementProps::default()
    };

    let mut ordered: Vec<(usize, Entry)> = Vec::new();
    for (name, attr) in &el.static_attrs {
        match name.as_str() {
            "class" => props.static_class = attr.value.clone().map(|v| collapse_class(&v)),
            "style" => props.static_style = attr.value.clone(),
            "key" => props.key = Some(AttrValue::Literal(attr.value.clone())),
            "ref" => props.ref_ = Some(AttrValue::Literal(attr.value.clone())),
            _ => ordered.push((attr.offset, Entry::Attr(name.clone(), AttrValue::Literal(attr.value.clone())))),
        }
    }

    // class and style keep a static and a bound part side by side
    let mut seen: Vec<String> = el
        .static_attrs
        .keys()
        .filter(|k| !matches!(k.as_str(), "class" | "style"))
        .cloned()
        .collect();
    for d in &el.directives {
        if !is_consumed(d, el) {
            continue;
        }
        match (&d.kind, d.form) {
            (DirectiveKind::Other(name), _) => match name.as_str() {
                "text" => {
                    let expr = needs_expression(d, "v-text")?;
                    props.dom_props.insert("textContent".to_string(), expr);
                }
                "html" => {
                    let expr = needs_expression(d, "v-html")?;
                    props.dom_props.insert("innerHTML".to_string(), expr);
                }
                "model" => {
                    let expression = needs_expression(d, "v-model")?;
                    if let Some(target) = model_target(el) {
                        props.model = Some(ModelBinding {
                            expression,
                            target,
                            modifiers: d.modifiers.clone(),
                            offset: d.offset,
                        });
                    }
                }
                // v-cloak only matters before the runtime mounts
                "cloak" => {}
                _ => props.directives.push(RuntimeDirective {
                    name: name.clone(),
                    arg: d.key.clone(),
                    modifiers: d.modifiers.clone(),
                    expression: (!d.expression.is_empty()).then(|| d.expression.clone()),
                    offset: d.offset,
                }),
            },
            (DirectiveKind::Bind, DirectiveForm::Individual) => {
                let key = bind_key(d);
                if seen.contains(&key) {
                    return Err(SfcError::DuplicateKey { offset: d.offset, key });
                }
                seen.push(key.clone());
                match key.as_str() {
                    "class" => props.class = Some(d.expression.clone()),
                    "style" => props.style = Some(d.expression.clone()),
                    "key" => props.key = Some(AttrValue::Expr(d.expression.clone())),
                    "ref" => props.ref_ = Some(AttrValue::Expr(d.expression.clone())),
                    _ => ordered.push((d.offset, Entry::Attr(key, AttrValue::Expr(d.expression.clone())))),
                }
            }
            (DirectiveKind::Bind, DirectiveForm::Spread) => {
                ordered.push((d.offset, Entry::Spread(d.expression.clone())));
            }
            (DirectiveKind::On, _) => {
                let event = d.key.clone().unwrap_or_default();
                props.on.entry(event).or_default().push(Handler {
                    expression: d.expression.clone(),
                    modifiers: d.modifiers.clone(),
                    offset: d.offset,
                });
            }
            _ => {}
        }
    }

    ordered.sort_by_key(|(offset, _)| *offset);
    for (_, entry) in ordered {
        match entry {
            Entry::Attr(key, value) => match props.attrs.last_mut() {
                Some(AttrSegment::Entries(map)) => {
                    map.insert(key, value);
                }
                _ => {
                    let mut map = IndexMap::new();
                    map.insert(key, value);
                    props.attrs.push(AttrSegment::Entries(map));
                }
            },
            Entry::Spread(expr) => props.attrs.push(AttrSegment::Spread(expr)),
        }
    }
    Ok(props)
}

fn collapse_class(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decide the name, fallback and binding positions of a `<slot>`.
pub fn resolve_slot(el: &ElementNode) -> SfcResult<SlotInvocation> {
    let mut name = SlotName::Static(el.static_attr("name").unwrap_or("default").to_string());
    let mut individual: Vec<(usize, String, String)> = Vec::new();
    let mut spread: Option<String> = None;
    let mut extra = Vec::new();

    for (key, attr) in &el.static_attrs {
        if key == "name" {
            continue;
        }
        let literal = attr.value.as_deref().map_or_else(|| "true".to_string(), string_lit);
        individual.push((attr.offset, key.clone(), literal));
    }

    for d in &el.directives {
        match (&d.kind, d.form) {
            (DirectiveKind::Bind, DirectiveForm::Individual) if d.modifiers.iter().all(|m| m == "camel") => {
                let key = bind_key(d);
                if key == "name" {
                    name = SlotName::Dynamic(d.expression.clone());
                    continue;
                }
                individual.push((d.offset, key, d.expression.clone()));
            }
            (DirectiveKind::Bind, DirectiveForm::Spread) => {
                spread = Some(d.expression.clone());
            }
            _ if is_structural(d) => {}
            _ => extra.push(d.clone()),
        }
    }

    individual.sort_by_key(|(offset, _, _)| *offset);
    let mut declared: IndexMap<String, String> = IndexMap::new();
    for (offset, key, expr) in individual {
        if declared.contains_key(&key) {
            return Err(SfcError::DuplicateKey { offset, key });
        }
        declared.insert(key, expr);
    }

    let bindings = match (declared.is_empty(), spread) {
        (true, None) => SlotBindings::None,
        (false, None) => SlotBindings::IndividualOnly(declared),
        (true, Some(expr)) => SlotBindings::SpreadOnly(expr),
        (false, Some(expr)) => {
            declared.sort_keys();
            SlotBindings::Mixed(declared, expr)
        }
    };

    let fallback = if el.children.is_empty() {
        None
    } else {
        Some(resolve_children(&el.children)?)
    };

    Ok(SlotInvocation {
        name,
        fallback,
        bindings,
        extra,
        offset: el.offset,
    })
}
