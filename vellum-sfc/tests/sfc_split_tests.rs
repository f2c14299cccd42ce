use vellum_sfc::{AttrValue, BlockKind, SfcError, parse_sfc, split};

const APP: &str = r#"<template>
  <div class="app">{{ count }}</div>
</template>

<!-- component logic -->
<script>
export default { data() { return { count: 0 } } }
</script>

<style scoped lang="css">
.app { color: red; }
</style>
<docs lang='md'>
# App
</docs>
"#;

#[test]
fn splits_basic_sfc() {
    let blocks = split(APP).expect("split ok");
    let kinds: Vec<&str> = blocks.iter().map(|b| b.kind.as_str()).collect();
    assert_eq!(kinds, ["template", "script", "style", "docs"]);

    let tpl = &blocks[0];
    assert!(tpl.content.contains("{{ count }}"));
    assert!(tpl.content.starts_with('\n'));

    let style = &blocks[2];
    assert!(style.scoped());
    assert_eq!(style.lang(), Some("css"));
    assert_eq!(style.attrs.get("scoped"), Some(&AttrValue::Flag(true)));

    assert_eq!(blocks[3].kind, BlockKind::Custom("docs".to_string()));
    assert_eq!(blocks[3].lang(), Some("md"));
}

#[test]
fn offsets_round_trip() {
    let blocks = split(APP).unwrap();
    let mut last_end = 0;
    for b in &blocks {
        assert_eq!(&APP[b.start_offset..b.end_offset], b.content);
        assert!(b.start_offset >= last_end);
        last_end = b.end_offset;
    }
}

#[test]
fn nested_template_tags_stay_inside_block() {
    let src = "<template><div><template v-if=\"ok\"><b>x</b></template></div></template>";
    let blocks = split(src).unwrap();
    assert_eq!(blocks.len(), 1);
    assert_eq!(
        blocks[0].content,
        "<div><template v-if=\"ok\"><b>x</b></template></div>"
    );
}

#[test]
fn two_templates_are_malformed() {
    let src = "<template><a></a></template>\n<template><b></b></template>";
    match split(src) {
        Err(SfcError::MalformedSource { offset, .. }) => assert_eq!(offset, 29),
        other => panic!("expected malformed source, got {other:?}"),
    }
}

#[test]
fn two_scripts_are_malformed() {
    let src = "<script></script><script></script>";
    assert!(matches!(split(src), Err(SfcError::MalformedSource { .. })));
}

#[test]
fn unclosed_block_is_malformed() {
    let src = "<template><div></div>";
    match split(src) {
        Err(SfcError::MalformedSource { offset, message }) => {
            assert_eq!(offset, 0);
            assert!(message.contains("</template>"), "{message}");
        }
        other => panic!("expected malformed source, got {other:?}"),
    }
}

#[test]
fn stray_top_level_text_is_malformed() {
    assert!(matches!(
        split("hello <template></template>"),
        Err(SfcError::MalformedSource { .. })
    ));
}

#[test]
fn script_and_style_bodies_are_raw_text() {
    let src = "<script>\nconst tag = \"<script>\";\n</script>\n<style>a::after { content: \"<style>\"; }</style>";
    let blocks = split(src).expect("split ok");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].content, "\nconst tag = \"<script>\";\n");
    assert_eq!(blocks[1].content, "a::after { content: \"<style>\"; }");
}

#[test]
fn tags_that_only_start_like_script_still_nest() {
    let src = "<scripts><scripts>x</scripts></scripts>";
    let blocks = split(src).expect("split ok");
    assert_eq!(blocks[0].kind, BlockKind::Custom("scripts".to_string()));
    assert_eq!(blocks[0].content, "<scripts>x</scripts>");
}

#[test]
fn descriptor_indexes_per_category() {
    let src = "<style>a{}</style><i18n>{}</i18n><style>b{}</style><docs>x</docs>";
    let sfc = parse_sfc(src).unwrap();
    let indexed: Vec<(usize, &str)> = sfc
        .indexed()
        .into_iter()
        .map(|(i, b)| (i, b.kind.as_str()))
        .collect();
    assert_eq!(indexed, [(0, "style"), (0, "i18n"), (1, "style"), (1, "docs")]);
    assert_eq!(sfc.styles().count(), 2);
    assert_eq!(sfc.custom_blocks().count(), 2);
    assert_eq!(
        sfc.block(&BlockKind::Style, 1).map(|b| b.content.as_str()),
        Some("b{}")
    );
    assert!(sfc.template().is_none());
}

#[test]
fn descriptor_serializes_to_json() {
    let sfc = parse_sfc("<style scoped>a{}</style>").unwrap();
    let json = serde_json::to_value(&sfc).unwrap();
    assert_eq!(json["blocks"][0]["kind"], "style");
    assert_eq!(json["blocks"][0]["attrs"]["scoped"], true);
    assert_eq!(json["blocks"][0]["start_offset"], 14);
}
