use vellum_sfc::bindings::{
    AttrSegment, AttrValue, ModelTarget, RenderNode, SlotBindings, SlotInvocation, SlotName,
    resolve_element_props, resolve_slot, resolve_template,
};
use vellum_sfc::SfcError;
use vellum_sfc::template_parse::parse_template;

fn slot(src: &str) -> SlotInvocation {
    let root = parse_template(src).expect("parse");
    let el = root.children[0].as_element().expect("element");
    resolve_slot(el).expect("resolve")
}

#[test]
fn individual_only_collapses_into_dynamic_position() {
    let s = slot(r#"<slot name="test" bind:value="'data'"></slot>"#);
    assert_eq!(s.name, SlotName::Static("test".to_string()));
    assert!(matches!(s.bindings, SlotBindings::IndividualOnly(_)));
    assert_eq!(s.bindings.static_extra_props(), None);
    assert_eq!(s.bindings.dynamic_binding_expr().as_deref(), Some("{value:'data'}"));
}

#[test]
fn spread_only_matches_individual_only() {
    let spread = slot(r#"<slot name="test" bind="{value:'data'}"></slot>"#);
    let individual = slot(r#"<slot name="test" bind:value="'data'"></slot>"#);
    assert_eq!(spread.bindings, SlotBindings::SpreadOnly("{value:'data'}".to_string()));
    assert_eq!(spread.bindings.static_extra_props(), None);
    assert_eq!(
        spread.bindings.dynamic_binding_expr(),
        individual.bindings.dynamic_binding_expr()
    );
}

#[test]
fn mixed_sorts_extra_props_and_spread_wins_dynamic() {
    let s = slot(r#"<slot name="test" bind="{test:'ok'}" bind:foo="'foo'" bind:bar="'bar'"></slot>"#);
    let extra = s.bindings.static_extra_props().expect("extra props");
    let keys: Vec<&str> = extra.keys().map(String::as_str).collect();
    assert_eq!(keys, ["bar", "foo"]);
    assert_eq!(extra["bar"], "'bar'");
    assert_eq!(s.bindings.dynamic_binding_expr().as_deref(), Some("{test:'ok'}"));
}

#[test]
fn individual_order_is_declaration_order() {
    let s = slot(r#"<slot :zeta="z" :alpha="a"></slot>"#);
    assert_eq!(s.bindings.dynamic_binding_expr().as_deref(), Some("{zeta:z,alpha:a}"));
    assert_eq!(s.name, SlotName::Static("default".to_string()));
}

#[test]
fn last_spread_wins() {
    let s = slot(r#"<slot bind="first" v-bind="second"></slot>"#);
    assert_eq!(s.bindings, SlotBindings::SpreadOnly("second".to_string()));
}

#[test]
fn no_bindings_and_no_fallback() {
    let s = slot("<slot/>");
    assert_eq!(s.bindings, SlotBindings::None);
    assert_eq!(s.bindings.dynamic_binding_expr(), None);
    assert!(s.fallback.is_none());
}

#[test]
fn static_slot_attrs_bind_as_string_literals() {
    let s = slot(r#"<slot name="row" label="hi" :v="1"></slot>"#);
    assert_eq!(s.bindings.dynamic_binding_expr().as_deref(), Some(r#"{label:"hi",v:1}"#));
}

#[test]
fn bound_name_is_dynamic() {
    let s = slot(r#"<slot :name="current">x</slot>"#);
    assert_eq!(s.name, SlotName::Dynamic("current".to_string()));
    assert_eq!(s.fallback.as_ref().map(Vec::len), Some(1));
}

#[test]
fn duplicate_individual_key_on_slot() {
    let root = parse_template(r#"<slot bind:a="1" :a="2"></slot>"#).unwrap();
    match resolve_slot(root.children[0].as_element().unwrap()) {
        Err(SfcError::DuplicateKey { offset, key }) => {
            assert_eq!(key, "a");
            assert_eq!(offset, 17);
        }
        other => panic!("expected duplicate key, got {other:?}"),
    }
}

#[test]
fn duplicate_detection_uses_the_camelized_key() {
    let root = parse_template(r#"<div :foo-bar.camel="a" :fooBar="b"></div>"#).unwrap();
    assert_eq!(
        resolve_template(&root),
        Err(SfcError::DuplicateKey {
            offset: 24,
            key: "fooBar".to_string()
        })
    );
}

#[test]
fn bound_key_clashing_with_static_attribute() {
    let root = parse_template(r#"<div title="x" :title="b"></div>"#).unwrap();
    assert_eq!(
        resolve_template(&root),
        Err(SfcError::DuplicateKey {
            offset: 15,
            key: "title".to_string()
        })
    );
    let root = parse_template(r#"<div class="a" :class="b" style="c" :style="d"></div>"#).unwrap();
    assert!(resolve_template(&root).is_ok());
}

#[test]
fn duplicate_individual_key_on_element() {
    let root = parse_template(r#"<div :id="a" v-bind:id="b"></div>"#).unwrap();
    assert_eq!(
        resolve_template(&root),
        Err(SfcError::DuplicateKey {
            offset: 13,
            key: "id".to_string()
        })
    );
}

#[test]
fn element_attrs_keep_source_order_around_spreads() {
    let root = parse_template(r#"<div id="a" v-bind="obj" :title="t" class="x" :class="c"></div>"#).unwrap();
    let props = resolve_element_props(root.children[0].as_element().unwrap()).unwrap();
    assert_eq!(props.static_class.as_deref(), Some("x"));
    assert_eq!(props.class.as_deref(), Some("c"));
    assert_eq!(props.attrs.len(), 3);
    assert!(matches!(&props.attrs[0], AttrSegment::Entries(m) if m["id"] == AttrValue::Literal(Some("a".to_string()))));
    assert_eq!(props.attrs[1], AttrSegment::Spread("obj".to_string()));
    assert!(matches!(&props.attrs[2], AttrSegment::Entries(m) if m["title"] == AttrValue::Expr("t".to_string())));
}

#[test]
fn camel_modifier_renames_key() {
    let root = parse_template(r#"<svg :view-box.camel="box"></svg>"#).unwrap();
    let props = resolve_element_props(root.children[0].as_element().unwrap()).unwrap();
    assert!(matches!(&props.attrs[0], AttrSegment::Entries(m) if m.contains_key("viewBox")));
}

#[test]
fn static_subtrees_are_hoistable() {
    let root = parse_template(r#"<div><p class="a">x</p><p :id="i">y</p></div>"#).unwrap();
    let nodes = resolve_template(&root).unwrap();
    let RenderNode::Element(div) = &nodes[0] else {
        panic!("expected element");
    };
    assert!(!div.hoistable);
    let flags: Vec<bool> = div
        .children
        .iter()
        .map(|c| matches!(c, RenderNode::Element(e) if e.hoistable))
        .collect();
    assert_eq!(flags, [true, false]);
}

#[test]
fn for_wraps_if_on_same_element() {
    let root = parse_template(r#"<ul><li v-for="x in xs" v-if="x.ok">{{ x }}</li></ul>"#).unwrap();
    let nodes = resolve_template(&root).unwrap();
    let RenderNode::Element(ul) = &nodes[0] else {
        panic!("expected element");
    };
    match &ul.children[0] {
        RenderNode::List(list) => {
            assert_eq!(list.source, "xs");
            assert_eq!(list.alias, "x");
            assert!(matches!(list.body.as_ref(), RenderNode::Conditional(b) if b.len() == 1));
        }
        other => panic!("expected list, got {other:?}"),
    }
}

#[test]
fn model_target_follows_the_element() {
    let target = |src: &str| {
        let root = parse_template(src).unwrap();
        let el = root.children[0].as_element().unwrap();
        resolve_element_props(el).unwrap().model.map(|m| m.target)
    };
    assert_eq!(target(r#"<input v-model="a">"#), Some(ModelTarget::Text));
    assert_eq!(target(r#"<input type="email" v-model="a">"#), Some(ModelTarget::Text));
    assert_eq!(
        target(r#"<input type="checkbox" value="x" v-model="a">"#),
        Some(ModelTarget::Checkbox(Some(AttrValue::Literal(Some("x".into())))))
    );
    assert_eq!(
        target(r#"<input type="radio" :value="v" v-model="a">"#),
        Some(ModelTarget::Radio(Some(AttrValue::Expr("v".into()))))
    );
    assert_eq!(target(r#"<select v-model="a"></select>"#), Some(ModelTarget::Select));
    assert_eq!(target(r#"<MyField v-model="a"></MyField>"#), Some(ModelTarget::Component));
    assert_eq!(target(r#"<div v-model="a"></div>"#), None);
}

#[test]
fn runtime_directives_keep_their_shape() {
    let root = parse_template(r#"<div v-show="ok" v-cloak v-text="t" v-drag:x.once></div>"#).unwrap();
    let props = resolve_element_props(root.children[0].as_element().unwrap()).unwrap();
    let names: Vec<&str> = props.directives.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["show", "drag"]);
    assert_eq!(props.directives[1].raw_name(), "v-drag:x.once");
    assert_eq!(props.directives[1].expression, None);
    assert_eq!(props.dom_props["textContent"], "t");
}
