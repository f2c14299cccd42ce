use vellum_sfc::template_parse::parse_template;
use vellum_sfc::{CompileOptions, SfcError, generate};

fn code(src: &str) -> Result<String, SfcError> {
    Ok(generate(&parse_template(src)?, &CompileOptions::default())?.code)
}

#[test]
fn v_if_alone_falls_back_to_empty() {
    assert_eq!(
        code(r#"<h1 v-if="value">WHAA</h1>"#).unwrap(),
        r#"(_vm.value)?_c("h1",[_vm._v("WHAA")]):_vm._e()"#
    );
}

#[test]
fn v_if_v_else() {
    assert_eq!(
        code(r#"<div><h1 v-if="value">True</h1><h1 v-else>False</h1></div>"#).unwrap(),
        r#"_c("div",[(_vm.value)?_c("h1",[_vm._v("True")]):_c("h1",[_vm._v("False")])])"#
    );
}

#[test]
fn v_else_if_chain_across_whitespace() {
    let src = r#"<div>
  <p v-if="a">A</p>
  <p v-else-if="b">B</p>
  <p v-else>C</p>
</div>"#;
    assert_eq!(
        code(src).unwrap(),
        r#"_c("div",[(_vm.a)?_c("p",[_vm._v("A")]):(_vm.b)?_c("p",[_vm._v("B")]):_c("p",[_vm._v("C")])])"#
    );
}

#[test]
fn v_else_if_without_else() {
    assert_eq!(
        code(r#"<div><p v-if="a">A</p><p v-else-if="b">B</p></div>"#).unwrap(),
        r#"_c("div",[(_vm.a)?_c("p",[_vm._v("A")]):(_vm.b)?_c("p",[_vm._v("B")]):_vm._e()])"#
    );
}

#[test]
fn orphan_v_else_is_error() {
    assert!(matches!(
        code(r#"<div><p v-else>x</p></div>"#),
        Err(SfcError::TemplateSyntax { offset: 5, .. })
    ));
    assert!(matches!(
        code(r#"<div><p v-if="a"></p><span></span><p v-else></p></div>"#),
        Err(SfcError::TemplateSyntax { .. })
    ));
}

#[test]
fn v_else_after_v_else_is_error() {
    assert!(code(r#"<div><p v-if="a"></p><p v-else></p><p v-else></p></div>"#).is_err());
}

#[test]
fn template_fragment_in_conditional() {
    assert_eq!(
        code(r#"<div><template v-if="ok"><b>x</b><i>y</i></template></div>"#).unwrap(),
        r#"_c("div",[(_vm.ok)?[_c("b",[_vm._v("x")]),_c("i",[_vm._v("y")])]:_vm._e()],2)"#
    );
}

#[test]
fn v_for_list() {
    assert_eq!(
        code(r#"<div><div v-for="entry in list"></div></div>"#).unwrap(),
        r#"_c("div",[_vm._l((_vm.list),(entry)=>_c("div"))],2)"#
    );
}

#[test]
fn v_for_with_key_and_index() {
    assert_eq!(
        code(r#"<ul><li v-for="(item, i) in items" :key="i">{{ item }}</li></ul>"#).unwrap(),
        r#"_c("ul",[_vm._l((_vm.items),(item,i)=>_c("li",{key:i},[_vm._v(_vm._s(item))],1))],2)"#
    );
}

#[test]
fn v_for_with_v_if_filters_each_item() {
    assert_eq!(
        code(r#"<ul><li v-for="x in xs" v-if="x.ok">{{ x }}</li></ul>"#).unwrap(),
        r#"_c("ul",[_vm._l((_vm.xs),(x)=>(x.ok)?_c("li",[_vm._v(_vm._s(x))],1):_vm._e())],2)"#
    );
}

#[test]
fn v_for_next_to_static_child() {
    assert_eq!(
        code(r#"<div><h1>HELLO</h1><p v-for="e in list"></p></div>"#).unwrap(),
        r#"_c("div",[_c("h1",[_vm._v("HELLO")]),_vm._l((_vm.list),(e)=>_c("p"))],2)"#
    );
}

#[test]
fn loop_names_stay_local_to_the_loop_body() {
    let src = r#"<ul><li v-for="({ id, tags }, i) in rows" :key="id" :title="label(i)">{{ tags.length }}{{ id }}</li><li>{{ id }}</li></ul>"#;
    let out = code(src).unwrap();
    assert!(out.contains(r#"_vm._l((_vm.rows),({ id, tags },i)=>_c("li",{key:id,attrs:{"title":_vm.label(i)}}"#), "{out}");
    assert!(out.contains("_vm._s(tags.length)"), "{out}");
    assert!(out.ends_with(r#"_c("li",[_vm._v(_vm._s(_vm.id))],1)],2)"#), "{out}");
}

#[test]
fn nested_loops_see_outer_names() {
    let out = code(r#"<div><p v-for="row in rows"><b v-for="cell in row.cells">{{ row.n }}{{ cell }}{{ total }}</b></p></div>"#).unwrap();
    assert!(out.contains("_vm._l((row.cells),(cell)=>"), "{out}");
    assert!(out.contains("_vm._v(_vm._s(row.n))"), "{out}");
    assert!(out.contains("_vm._v(_vm._s(cell))"), "{out}");
    assert!(out.contains("_vm._v(_vm._s(_vm.total))"), "{out}");
}

#[test]
fn invalid_v_for_is_error() {
    assert!(matches!(
        code(r#"<p v-for="items"></p>"#),
        Err(SfcError::TemplateSyntax { offset: 3, .. })
    ));
}
