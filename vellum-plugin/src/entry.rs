use vellum_sfc::BlockKind;
use vellum_sfc::expr::string_lit;
use vellum_style::scope_id;

use crate::cache::RootEntry;

/// The module a bundler gets for the component file itself: it imports
/// every block id and assembles the component options.
pub fn entry_module(entry: &RootEntry, tag: &str) -> String {
    let mut imports = Vec::new();
    let mut body = Vec::new();
    let mut has_script = false;
    let mut has_template = false;
    let mut scoped = false;

    for id in &entry.ids {
        let specifier = string_lit(&id.encode(tag));
        match &id.kind {
            BlockKind::Script => {
                has_script = true;
                imports.push(format!("import script from {specifier};"));
            }
            BlockKind::Template => {
                has_template = true;
                imports.push(format!("import {{ render, staticRenderFns }} from {specifier};"));
            }
            BlockKind::Style => {
                scoped |= id.query.scoped;
                imports.push(format!("import {specifier};"));
            }
            BlockKind::Custom(_) => {
                let name = format!("block{}", id.index);
                imports.push(format!("import {name} from {specifier};"));
                body.push(format!("if (typeof {name} === \"function\") {name}(component);"));
            }
        }
    }

    let mut out = imports.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out.push('\n');
    if has_script {
        out.push_str("const component = script;\n");
    } else {
        out.push_str("const component = {};\n");
    }
    if has_template {
        out.push_str("component.render = render;\n");
        out.push_str("component.staticRenderFns = staticRenderFns;\n");
    }
    if scoped {
        let id = scope_id(&entry.path.to_string_lossy());
        out.push_str(&format!("component._scopeId = {};\n", string_lit(&id)));
    }
    for line in body {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("export default component;\n");
    out
}
