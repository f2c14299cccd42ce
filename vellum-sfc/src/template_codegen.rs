use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::bindings::{
    AttrSegment, AttrValue, Branch, ElementProps, Handler, ListRender, ModelBinding, ModelTarget,
    RenderElement, RenderNode, RuntimeDirective, SlotBindings, SlotInvocation, SlotName,
    resolve_template,
};
use crate::error::{SfcError, SfcResult};
use crate::expr::{
    binding_names, is_function_expression, is_simple_path, js_key, prefix_identifiers, string_lit,
};
use crate::options::CompileOptions;
use crate::sourcemap::Mapping;
use crate::template_ast::{Directive, DirectiveKind, ElementNode};

/// Generated render expression plus what the module wrapper needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CodegenOutput {
    pub code: String,
    /// Runtime helpers referenced, without the `_vm.` prefix.
    pub helpers: BTreeSet<&'static str>,
    pub static_render_fns: Vec<String>,
    /// Generated offsets are relative to `code`; original offsets to the
    /// template text.
    pub mappings: Vec<Mapping>,
}

/// Generate the render expression for a parsed template root.
pub fn generate(root: &ElementNode, options: &CompileOptions) -> SfcResult<CodegenOutput> {
    let nodes = resolve_template(root)?;
    let mut emitter = Emitter::new(options);
    match nodes.as_slice() {
        [] => emitter.push_helper("_e", "()"),
        [only] => emitter.node(only)?,
        [_, second, ..] => {
            return Err(SfcError::syntax(
                second.offset(),
                "template must have exactly one root node",
            ));
        }
    }
    log::debug!(
        "codegen: {} bytes, {} static trees",
        emitter.out.len(),
        emitter.statics.len()
    );
    Ok(CodegenOutput {
        code: emitter.out,
        helpers: emitter.helpers,
        static_render_fns: emitter.statics,
        mappings: emitter.mappings,
    })
}

const PRELUDE: &str = "var _vm = this;\n  var _h = _vm.$createElement;\n  var _c = _vm._self._c || _h;\n";

/// Module-local `_mp`: merges attribute segments left to right.
const MERGE_HELPER: &str = "var _mp = function () {\n  var out = {};\n  for (var i = 0; i < arguments.length; i++) {\n    var seg = arguments[i];\n    if (seg) for (var k in seg) out[k] = seg[k];\n  }\n  return out;\n};\n";

/// Wrap a render expression into an ES module exporting `render` and
/// `staticRenderFns`. Returned mappings are shifted to module offsets.
pub fn generate_module(output: &CodegenOutput) -> (String, Vec<Mapping>) {
    let merge = if output.helpers.contains("_mp") { MERGE_HELPER } else { "" };
    let head = format!("{merge}var render = function () {{\n  {PRELUDE}  return ");
    let mut code = head.clone();
    code.push_str(&output.code);
    code.push_str(";\n};\n");

    let fns: Vec<String> = output
        .static_render_fns
        .iter()
        .map(|body| format!("function () {{\n  {PRELUDE}  return {body};\n}}"))
        .collect();
    code.push_str(&format!("var staticRenderFns = [{}];\n", fns.join(", ")));
    code.push_str("render._withStripped = true;\n");
    code.push_str("export { render, staticRenderFns };\n");

    let mappings = output
        .mappings
        .iter()
        .map(|m| m.shifted(head.len(), 0))
        .collect();
    (code, mappings)
}

struct Emitter<'o> {
    out: String,
    helpers: BTreeSet<&'static str>,
    mappings: Vec<Mapping>,
    statics: Vec<String>,
    /// Names bound by enclosing `v-for`s.
    scope: Vec<String>,
    options: &'o CompileOptions,
}

impl<'o> Emitter<'o> {
    fn new(options: &'o CompileOptions) -> Self {
        Emitter {
            out: String::new(),
            helpers: BTreeSet::new(),
            mappings: Vec::new(),
            statics: Vec::new(),
            scope: Vec::new(),
            options,
        }
    }

    fn mark(&mut self, original: usize) {
        if self.options.source_map {
            self.mappings.push(Mapping {
                generated: self.out.len(),
                original,
            });
        }
    }

    /// An expression resolved against the instance and the loop scope.
    fn js(&self, expr: &str) -> String {
        prefix_identifiers(expr.trim(), &self.scope)
    }

    fn js_event(&self, expr: &str) -> String {
        let mut locals = self.scope.clone();
        locals.push("$event".to_string());
        prefix_identifiers(expr.trim(), &locals)
    }

    fn push_helper(&mut self, name: &'static str, rest: &str) {
        self.helpers.insert(name);
        if name != "_c" && name != "_mp" {
            self.out.push_str("_vm.");
        }
        self.out.push_str(name);
        self.out.push_str(rest);
    }

    fn node(&mut self, node: &RenderNode) -> SfcResult<()> {
        self.mark(node.offset());
        match node {
            RenderNode::Text(t) => {
                self.push_helper("_v", "(");
                self.out.push_str(&string_lit(&t.text));
                self.out.push(')');
            }
            RenderNode::Interpolation(i) => {
                self.helpers.insert("_s");
                self.push_helper("_v", "(_vm._s(");
                let expr = self.js(&i.expression);
                self.out.push_str(&expr);
                self.out.push_str("))");
            }
            RenderNode::Element(el) => self.element(el)?,
            RenderNode::Slot(slot) => self.slot(slot)?,
            RenderNode::Conditional(branches) => self.conditional(branches)?,
            RenderNode::List(list) => self.render_list(list)?,
            RenderNode::Fragment(children, _) => self.list(children)?,
        }
        Ok(())
    }

    /// `[a,b,...]`
    fn list(&mut self, nodes: &[RenderNode]) -> SfcResult<()> {
        self.out.push('[');
        for (i, n) in nodes.iter().enumerate() {
            if i > 0 {
                self.out.push(',');
            }
            self.node(n)?;
        }
        self.out.push(']');
        Ok(())
    }

    fn element(&mut self, el: &RenderElement) -> SfcResult<()> {
        if let Some(d) = el.extra.first() {
            return Err(unsupported(d, &el.tag));
        }
        if self.options.hoist_static && el.hoistable && !el.children.is_empty() {
            return self.hoist(el);
        }

        self.push_helper("_c", "(");
        self.out.push_str(&string_lit(&el.tag));
        if !el.props.is_empty() {
            self.out.push(',');
            self.data(&el.props, el.offset)?;
        }
        if !el.children.is_empty() {
            self.out.push(',');
            self.list(&el.children)?;
            let hint = normalization_hint(&el.children);
            if hint > 0 {
                self.out.push_str(&format!(",{hint}"));
            }
        }
        self.out.push(')');
        Ok(())
    }

    fn hoist(&mut self, el: &RenderElement) -> SfcResult<()> {
        let opts = CompileOptions {
            hoist_static: false,
            source_map: false,
        };
        let mut inner = Emitter::new(&opts);
        inner.element(el)?;
        self.helpers.extend(inner.helpers);
        let index = self.statics.len();
        self.statics.push(inner.out);
        self.push_helper("_m", &format!("({index})"));
        Ok(())
    }

    fn data(&mut self, props: &ElementProps, offset: usize) -> SfcResult<()> {
        let model = match &props.model {
            Some(m) => Some(self.model(m)?),
            None => None,
        };
        let mut directives: Vec<String> =
            props.directives.iter().map(|d| self.directive(d)).collect();
        if !props.dom_props.is_empty() {
            self.helpers.insert("_s");
        }
        let mut dom_props: Vec<String> = props
            .dom_props
            .iter()
            .map(|(k, v)| format!("{}:_vm._s({})", string_lit(k), self.js(v)))
            .collect();
        let mut on: IndexMap<String, Vec<String>> = IndexMap::new();
        let mut component_model = None;
        if let Some(model) = model {
            if let Some(d) = model.directive {
                directives.insert(0, d);
            }
            if let Some(prop) = model.dom_prop {
                dom_props.push(prop);
            }
            for (event, code) in model.handlers {
                on.entry(event.to_string()).or_default().push(code);
            }
            component_model = model.component;
        }
        for (event, list) in &props.on {
            if event.is_empty() {
                return Err(SfcError::codegen(offset, "event handler without an event name"));
            }
            for h in list {
                let code = self.handler(h)?;
                on.entry(event.clone()).or_default().push(code);
            }
        }

        let mut entries: Vec<String> = Vec::new();
        if !directives.is_empty() {
            entries.push(format!("directives:[{}]", directives.join(",")));
        }
        if let Some(key) = &props.key {
            entries.push(format!("key:{}", self.attr_value(key)));
        }
        if let Some(r) = &props.ref_ {
            entries.push(format!("ref:{}", self.attr_value(r)));
        }
        if let Some(c) = &props.static_class {
            entries.push(format!("staticClass:{}", string_lit(c)));
        }
        if let Some(c) = &props.class {
            entries.push(format!("class:{}", self.js(c)));
        }
        if let Some(s) = &props.static_style {
            entries.push(format!("staticStyle:{}", style_object(s)));
        }
        if let Some(s) = &props.style {
            entries.push(format!("style:{}", self.js(s)));
        }
        if !props.attrs.is_empty() {
            entries.push(format!("attrs:{}", self.attrs(&props.attrs)));
        }
        if !dom_props.is_empty() {
            entries.push(format!("domProps:{{{}}}", dom_props.join(",")));
        }
        if !on.is_empty() {
            let events: Vec<String> = on
                .iter()
                .map(|(event, code)| {
                    let value = match code.as_slice() {
                        [one] => one.clone(),
                        many => format!("[{}]", many.join(",")),
                    };
                    format!("{}:{}", js_key(event), value)
                })
                .collect();
            entries.push(format!("on:{{{}}}", events.join(",")));
        }
        if let Some(slot) = &props.slot {
            entries.push(format!("slot:{}", string_lit(slot)));
        }
        if let Some(model) = component_model {
            entries.push(format!("model:{model}"));
        }
        self.out.push('{');
        self.out.push_str(&entries.join(","));
        self.out.push('}');
        Ok(())
    }

    fn attrs(&mut self, segments: &[AttrSegment]) -> String {
        if let [AttrSegment::Entries(map)] = segments {
            return self.attr_object(map);
        }
        self.helpers.insert("_mp");
        let parts: Vec<String> = segments
            .iter()
            .map(|seg| match seg {
                AttrSegment::Entries(map) => self.attr_object(map),
                AttrSegment::Spread(expr) => self.js(expr),
            })
            .collect();
        format!("_mp({})", parts.join(","))
    }

    fn attr_value(&self, v: &AttrValue) -> String {
        match v {
            AttrValue::Literal(Some(s)) => string_lit(s),
            AttrValue::Literal(None) => "true".to_string(),
            AttrValue::Expr(e) => self.js(e),
        }
    }

    fn attr_object(&self, map: &IndexMap<String, AttrValue>) -> String {
        let entries: Vec<String> = map
            .iter()
            .map(|(k, v)| format!("{}:{}", string_lit(k), self.attr_value(v)))
            .collect();
        format!("{{{}}}", entries.join(","))
    }

    /// `{name:"show",rawName:"v-show",value:(ok),expression:"ok"}`
    fn directive(&self, d: &RuntimeDirective) -> String {
        let mut out = format!(
            "{{name:{},rawName:{}",
            string_lit(&d.name),
            string_lit(&d.raw_name())
        );
        if let Some(expr) = &d.expression {
            out.push_str(&format!(
                ",value:({}),expression:{}",
                self.js(expr),
                string_lit(expr.trim())
            ));
        }
        if let Some(arg) = &d.arg {
            out.push_str(&format!(",arg:{}", string_lit(arg)));
        }
        if !d.modifiers.is_empty() {
            out.push_str(&format!(",modifiers:{}", modifier_object(&d.modifiers)));
        }
        out.push('}');
        out
    }

    fn model(&mut self, m: &ModelBinding) -> SfcResult<ModelCode> {
        let lazy = m.modifiers.iter().any(|x| x == "lazy");
        let trim = m.modifiers.iter().any(|x| x == "trim");
        let number = m.modifiers.iter().any(|x| x == "number");
        if let Some(other) = m
            .modifiers
            .iter()
            .find(|x| !matches!(x.as_str(), "lazy" | "trim" | "number"))
        {
            return Err(SfcError::codegen(
                m.offset,
                format!("v-model modifier .{other} is not supported"),
            ));
        }
        if number {
            self.helpers.insert("_n");
        }
        let target = self.js(&m.expression);
        let value_of = |raw: &str| {
            let mut v = raw.to_string();
            if trim {
                v = format!("{v}.trim()");
            }
            if number {
                v = format!("_vm._n({v})");
            }
            v
        };

        let mut code = ModelCode::default();
        let directive = RuntimeDirective {
            name: "model".to_string(),
            arg: None,
            modifiers: m.modifiers.clone(),
            expression: Some(m.expression.clone()),
            offset: m.offset,
        };

        match &m.target {
            ModelTarget::Component => {
                let assigned = if trim {
                    let inner = value_of("$$v");
                    format!("(typeof $$v === \"string\"?{inner}:$$v)")
                } else {
                    value_of("$$v")
                };
                code.component = Some(format!(
                    "{{value:({target}),callback:function($$v){{{target}={assigned}}},expression:{}}}",
                    string_lit(&m.expression)
                ));
                return Ok(code);
            }
            ModelTarget::Text => {
                let assigned = value_of("$event.target.value");
                let event = if lazy { "change" } else { "input" };
                let guard = if lazy { "" } else { "if($event.target.composing)return;" };
                code.dom_prop = Some(format!("\"value\":({target})"));
                code.handlers.push((
                    event,
                    format!("function($event){{{guard}{target}={assigned}}}"),
                ));
                if trim || number {
                    code.handlers.push((
                        "blur",
                        "function($event){return _vm.$forceUpdate()}".to_string(),
                    ));
                }
            }
            ModelTarget::Checkbox(value) => {
                self.helpers.insert("_i");
                let v = self.model_value(value.as_ref());
                code.dom_prop = Some(format!(
                    "\"checked\":Array.isArray({target})?_vm._i({target},{v})>-1:({target})"
                ));
                code.handlers.push((
                    "change",
                    format!(
                        "function($event){{var $$a={target},$$el=$event.target,$$c=$$el.checked?(true):(false);\
                         if(Array.isArray($$a)){{var $$v={v},$$i=_vm._i($$a,$$v);\
                         if($$el.checked){{$$i<0&&({target}=$$a.concat([$$v]))}}\
                         else{{$$i>-1&&({target}=$$a.slice(0,$$i).concat($$a.slice($$i+1)))}}}}\
                         else{{{target}=$$c}}}}"
                    ),
                ));
            }
            ModelTarget::Radio(value) => {
                self.helpers.insert("_q");
                let v = self.model_value(value.as_ref());
                let assigned = value_of(&v);
                code.dom_prop = Some(format!("\"checked\":_vm._q({target},{v})"));
                code.handlers.push((
                    "change",
                    format!("function($event){{{target}={assigned}}}"),
                ));
            }
            ModelTarget::Select => {
                let selected = value_of("val");
                code.handlers.push((
                    "change",
                    format!(
                        "function($event){{var $$selectedVal=Array.prototype.filter.call($event.target.options,\
                         function(o){{return o.selected}}).map(function(o){{var val=\"_value\" in o?o._value:o.value;\
                         return {selected}}});{target}=$event.target.multiple?$$selectedVal:$$selectedVal[0]}}"
                    ),
                ));
            }
        }
        code.directive = Some(self.directive(&directive));
        Ok(code)
    }

    /// The `value` a checkbox or radio contributes, `null` when absent.
    fn model_value(&self, value: Option<&AttrValue>) -> String {
        value.map_or_else(|| "null".to_string(), |v| self.attr_value(v))
    }

    /// `_vm._t(name, fallback, staticExtraProps, dynamicBinding)` with
    /// trailing absent arguments dropped.
    fn slot(&mut self, slot: &SlotInvocation) -> SfcResult<()> {
        if let Some(d) = slot.extra.first() {
            return Err(unsupported(d, "slot"));
        }
        let name = match &slot.name {
            SlotName::Static(n) => string_lit(n),
            SlotName::Dynamic(expr) => self.js(expr),
        };
        let extra = slot.bindings.static_extra_props().map(|props| self.object(props));
        let dynamic = match &slot.bindings {
            SlotBindings::None => None,
            SlotBindings::IndividualOnly(props) => Some(self.object(props)),
            SlotBindings::SpreadOnly(expr) | SlotBindings::Mixed(_, expr) => Some(self.js(expr)),
        };
        let present = [true, slot.fallback.is_some(), extra.is_some(), dynamic.is_some()];
        let last = present.iter().rposition(|p| *p).unwrap_or(0);

        self.push_helper("_t", "(");
        self.out.push_str(&name);
        if last >= 1 {
            self.out.push(',');
            match &slot.fallback {
                Some(children) => {
                    self.out.push_str("function(){return ");
                    self.list(children)?;
                    self.out.push('}');
                }
                None => self.out.push_str("null"),
            }
        }
        if last >= 2 {
            self.out.push(',');
            self.out.push_str(extra.as_deref().unwrap_or("null"));
        }
        if last >= 3 {
            self.out.push(',');
            self.out.push_str(dynamic.as_deref().unwrap_or("null"));
        }
        self.out.push(')');
        Ok(())
    }

    /// `{key:expr,...}` with prefixed values, keys in map order.
    fn object(&self, props: &IndexMap<String, String>) -> String {
        let entries: Vec<String> = props
            .iter()
            .map(|(k, v)| format!("{}:{}", js_key(k), self.js(v)))
            .collect();
        format!("{{{}}}", entries.join(","))
    }

    fn conditional(&mut self, branches: &[Branch]) -> SfcResult<()> {
        for branch in branches {
            match &branch.condition {
                Some(cond) => {
                    self.out.push('(');
                    let cond = self.js(cond);
                    self.out.push_str(&cond);
                    self.out.push_str(")?");
                    self.node(&branch.node)?;
                    self.out.push(':');
                }
                None => return self.node(&branch.node),
            }
        }
        self.push_helper("_e", "()");
        Ok(())
    }

    fn render_list(&mut self, list: &ListRender) -> SfcResult<()> {
        let mut params = vec![list.alias.clone()];
        params.extend(list.iterators.iter().cloned());
        self.push_helper("_l", "((");
        let source = self.js(&list.source);
        self.out.push_str(&source);
        self.out.push_str("),(");
        self.out.push_str(&params.join(","));
        self.out.push_str(")=>");

        let depth = self.scope.len();
        for p in &params {
            self.scope.extend(binding_names(p));
        }
        let body = self.node(&list.body);
        self.scope.truncate(depth);
        body?;
        self.out.push(')');
        Ok(())
    }

    fn handler(&self, h: &Handler) -> SfcResult<String> {
        let raw = h.expression.trim();
        let mut guards = String::new();
        for m in &h.modifiers {
            match m.as_str() {
                "stop" => guards.push_str("$event.stopPropagation();"),
                "prevent" => guards.push_str("$event.preventDefault();"),
                "self" => guards.push_str("if($event.target!==$event.currentTarget)return null;"),
                other => {
                    return Err(SfcError::codegen(
                        h.offset,
                        format!("event modifier .{other} is not supported"),
                    ));
                }
            }
        }
        let expr = self.js_event(raw);
        let simple = is_simple_path(raw);
        let callable = simple || is_function_expression(raw);
        Ok(match (guards.is_empty(), callable) {
            (true, true) => expr,
            (true, false) => format!("function($event){{{expr}}}"),
            (false, true) if simple => {
                format!("function($event){{{guards}return {expr}.apply(null,arguments)}}")
            }
            (false, true) => {
                format!("function($event){{{guards}return ({expr}).apply(null,arguments)}}")
            }
            (false, false) => format!("function($event){{{guards}{expr}}}"),
        })
    }
}

/// What a `v-model` contributes to the element data.
#[derive(Default)]
struct ModelCode {
    directive: Option<String>,
    dom_prop: Option<String>,
    handlers: Vec<(&'static str, String)>,
    /// `model:{...}` for components.
    component: Option<String>,
}

fn modifier_object(modifiers: &[String]) -> String {
    let entries: Vec<String> = modifiers
        .iter()
        .map(|m| format!("{}:true", string_lit(m)))
        .collect();
    format!("{{{}}}", entries.join(","))
}

fn unsupported(d: &Directive, tag: &str) -> SfcError {
    let message = match &d.kind {
        DirectiveKind::Other(name) if name == "model" => {
            format!("v-model is not supported on <{tag}>")
        }
        DirectiveKind::Other(name) => format!("directive v-{name} is not supported"),
        DirectiveKind::Bind if !d.modifiers.is_empty() => {
            format!("v-bind modifier .{} is not supported", d.modifiers.join("."))
        }
        DirectiveKind::Bind => "v-bind is not supported here".to_string(),
        DirectiveKind::On if tag == "slot" => "v-on is not supported on <slot>".to_string(),
        DirectiveKind::On => "v-on without an event name is not supported".to_string(),
        other => format!("{other:?} is not supported here"),
    };
    SfcError::codegen(d.offset, message)
}

/// 2 when a child may expand to several nodes, 1 when text must be
/// normalized, 0 otherwise.
pub fn normalization_hint(children: &[RenderNode]) -> u8 {
    if children.iter().any(RenderNode::is_variable_length) {
        2
    } else if children.iter().any(|c| matches!(c, RenderNode::Interpolation(_))) {
        1
    } else {
        0
    }
}

/// `"color: red; font-size: 2px"` as an object literal. Later declarations
/// of a property replace earlier ones.
pub fn style_object(style: &str) -> String {
    let mut decls: IndexMap<&str, &str> = IndexMap::new();
    for decl in style.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let (name, value) = (name.trim(), value.trim());
        if !name.is_empty() {
            decls.insert(name, value);
        }
    }
    let entries: Vec<String> = decls
        .iter()
        .map(|(k, v)| format!("{}:{}", string_lit(k), string_lit(v)))
        .collect();
    format!("{{{}}}", entries.join(","))
}
