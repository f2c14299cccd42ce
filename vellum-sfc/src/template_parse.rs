use crate::error::{SfcError, SfcResult};
use crate::expr::{check_balanced, find_mustache_end};
use crate::template_ast::{
    Directive, DirectiveForm, DirectiveKind, ElementNode, InterpolationNode, Node, StaticAttr,
    TextNode,
};

/// Elements that never take a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Hand-rolled HTML-ish parser with support for:
/// - nested elements, void elements and self-closing tags (`<input/>`)
/// - attributes: static (`class="x"`), bind (`:value`, `v-bind:value`,
///   `bind:value`, spread `v-bind="obj"`), events (`@click`, `v-on:click`)
///   and structural directives (`v-if`, `v-else-if`, `v-else`, `v-for`)
/// - text and `{{ interpolation }}` splits
///
/// Returns a synthetic `template` element whose children are the
/// top-level nodes. Offsets are byte offsets into `input`.
pub fn parse_template(input: &str) -> SfcResult<ElementNode> {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    let mut stack: Vec<ElementNode> = vec![ElementNode::new("template", 0)];

    fn push_child(stack: &mut [ElementNode], node: Node) {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(node);
        }
    }

    while i < bytes.len() {
        if bytes[i..].starts_with(b"<!--") {
            let end = input[i + 4..]
                .find("-->")
                .ok_or_else(|| SfcError::syntax(i, "unterminated comment"))?;
            i += 4 + end + 3;
            continue;
        }
        if bytes[i..].starts_with(b"<!") {
            // doctype and friends
            let end = input[i..]
                .find('>')
                .ok_or_else(|| SfcError::syntax(i, "unterminated declaration"))?;
            i += end + 1;
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1) == Some(&b'/') {
            let close_at = i;
            i += 2;
            let tag = read_ident(bytes, &mut i);
            skip_ws(bytes, &mut i);
            if i >= bytes.len() || bytes[i] != b'>' {
                return Err(SfcError::syntax(close_at, format!("malformed closing tag </{tag}")));
            }
            i += 1;

            // index 0 is the synthetic root and can't be closed
            let pos = stack.iter().skip(1).rposition(|e| e.tag == tag).map(|p| p + 1);
            match pos {
                None => {
                    return Err(SfcError::syntax(
                        close_at,
                        format!("closing tag </{tag}> has no matching open tag"),
                    ));
                }
                Some(p) if p != stack.len() - 1 => {
                    let open = &stack[stack.len() - 1];
                    return Err(SfcError::syntax(
                        open.offset,
                        format!("<{}> is not closed before </{tag}>", open.tag),
                    ));
                }
                Some(_) => {}
            }
            if let Some(mut el) = stack.pop() {
                condense_children(&mut el.children, el.tag == "pre" || el.tag == "textarea");
                push_child(&mut stack, Node::Element(el));
            }
            continue;
        }

        if bytes[i] == b'<' && bytes.get(i + 1).is_some_and(|c| c.is_ascii_alphabetic()) {
            let mut el = read_open_tag(input, &mut i)?;
            check_slot_nesting(&stack, &el)?;
            if el.self_closing || VOID_ELEMENTS.contains(&el.tag.as_str()) {
                el.self_closing = true;
                push_child(&mut stack, Node::Element(el));
            } else {
                stack.push(el);
            }
            continue;
        }

        if bytes[i..].starts_with(b"{{") {
            let open_at = i;
            let end = find_mustache_end(input, i + 2)
                .map_err(|e| SfcError::syntax(open_at, e.message))?;
            let raw = &input[i + 2..end];
            let expression = raw.trim();
            let lead = raw.len() - raw.trim_start().len();
            check_balanced(expression)
                .map_err(|e| SfcError::syntax(i + 2 + lead + e.offset, e.message))?;
            push_child(
                &mut stack,
                Node::Interpolation(InterpolationNode {
                    expression: expression.to_string(),
                    offset: open_at,
                }),
            );
            i = end + 2;
            continue;
        }

        // text until the next tag, comment or interpolation
        let start = i;
        i += 1;
        while i < bytes.len() && !is_markup_start(bytes, i) && !bytes[i..].starts_with(b"{{") {
            i += 1;
        }
        push_child(
            &mut stack,
            Node::Text(TextNode {
                text: input[start..i].to_string(),
                offset: start,
            }),
        );
    }

    if stack.len() > 1 {
        let open = &stack[stack.len() - 1];
        return Err(SfcError::syntax(open.offset, format!("<{}> is never closed", open.tag)));
    }
    let mut root = stack
        .pop()
        .ok_or_else(|| SfcError::syntax(0, "template root lost"))?;
    merge_adjacent_text(&mut root.children);
    condense_children(&mut root.children, false);
    Ok(root)
}

/// Top-level nodes of a template, without the synthetic root.
pub fn parse_template_to_ast(input: &str) -> SfcResult<Vec<Node>> {
    parse_template(input).map(|root| root.children)
}

fn is_markup_start(bytes: &[u8], i: usize) -> bool {
    bytes[i] == b'<'
        && bytes
            .get(i + 1)
            .is_some_and(|c| c.is_ascii_alphabetic() || *c == b'/' || *c == b'!')
}

fn read_open_tag(input: &str, i: &mut usize) -> SfcResult<ElementNode> {
    let bytes = input.as_bytes();
    let offset = *i;
    *i += 1;
    let tag = read_ident(bytes, i);
    let mut el = ElementNode::new(tag, offset);

    loop {
        skip_ws(bytes, i);
        if *i >= bytes.len() {
            return Err(SfcError::syntax(offset, format!("<{}> tag is not terminated", el.tag)));
        }
        match bytes[*i] {
            b'/' if bytes.get(*i + 1) == Some(&b'>') => {
                el.self_closing = true;
                *i += 2;
                break;
            }
            b'>' => {
                *i += 1;
                break;
            }
            _ => {
                let attr_at = *i;
                match read_attribute(input, i)? {
                    Some((name, value)) => apply_attribute(&mut el, name, value, attr_at)?,
                    None => {
                        return Err(SfcError::syntax(
                            attr_at,
                            format!("unexpected character `{}` in <{}>", bytes[attr_at] as char, el.tag),
                        ));
                    }
                }
            }
        }
    }
    Ok(el)
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && (bytes[*i] as char).is_whitespace() {
        *i += 1;
    }
}

fn read_ident(bytes: &[u8], i: &mut usize) -> String {
    let start = *i;
    while *i < bytes.len() {
        let c = bytes[*i] as char;
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.' || c == ':' {
            *i += 1;
        } else {
            break;
        }
    }
    String::from_utf8_lossy(&bytes[start..*i]).into_owned()
}

/// Attribute name plus its value (with the value's byte offset) if one
/// was written.
type RawAttribute = (String, Option<(String, usize)>);

fn read_attribute(input: &str, i: &mut usize) -> SfcResult<Option<RawAttribute>> {
    let bytes = input.as_bytes();
    let name_start = *i;
    while *i < bytes.len() {
        let c = bytes[*i] as char;
        if c.is_whitespace() || c == '=' || c == '>' || c == '"' || c == '\'' || c == '<' {
            break;
        }
        if c == '/' && bytes.get(*i + 1) == Some(&b'>') {
            break;
        }
        *i += 1;
    }
    if *i == name_start {
        return Ok(None);
    }
    let name = input[name_start..*i].to_string();

    let before_eq = *i;
    skip_ws(bytes, i);
    if *i < bytes.len() && bytes[*i] == b'=' {
        *i += 1;
        skip_ws(bytes, i);
        let value = read_value(input, i, name_start)?;
        return Ok(Some((name, Some(value))));
    }
    *i = before_eq;
    Ok(Some((name, None)))
}

fn read_value(input: &str, i: &mut usize, attr_at: usize) -> SfcResult<(String, usize)> {
    let bytes = input.as_bytes();
    if *i >= bytes.len() {
        return Err(SfcError::syntax(attr_at, "attribute value is missing"));
    }
    let quote = bytes[*i];
    if quote == b'"' || quote == b'\'' {
        *i += 1;
        let start = *i;
        while *i < bytes.len() && bytes[*i] != quote {
            *i += 1;
        }
        if *i >= bytes.len() {
            return Err(SfcError::syntax(attr_at, "unterminated attribute value"));
        }
        let s = input[start..*i].to_string();
        *i += 1; // closing quote
        return Ok((s, start));
    }
    let start = *i;
    while *i < bytes.len() && !(bytes[*i] as char).is_whitespace() && bytes[*i] != b'>' {
        if bytes[*i] == b'/' && bytes.get(*i + 1) == Some(&b'>') {
            break;
        }
        *i += 1;
    }
    if *i == start {
        return Err(SfcError::syntax(attr_at, "attribute value is missing"));
    }
    Ok((input[start..*i].to_string(), start))
}

fn split_modifiers(raw: &str) -> (String, Vec<String>) {
    let mut parts = raw.split('.');
    let key = parts.next().unwrap_or_default().to_string();
    (key, parts.map(str::to_string).collect())
}

fn apply_attribute(
    el: &mut ElementNode,
    raw_name: String,
    value: Option<(String, usize)>,
    offset: usize,
) -> SfcResult<()> {
    let directive = classify(&raw_name);

    let Some((kind, form, key, modifiers)) = directive else {
        if raw_name == "slot" && !el.is_slot() {
            el.slot_name = Some(value.map(|(v, _)| v).unwrap_or_default());
            return Ok(());
        }
        if el.static_attrs.contains_key(&raw_name) {
            return Err(SfcError::syntax(offset, format!("duplicate attribute `{raw_name}`")));
        }
        el.static_attrs.insert(
            raw_name,
            StaticAttr {
                value: value.map(|(v, _)| v),
                offset,
            },
        );
        return Ok(());
    };

    let needs_value = matches!(
        kind,
        DirectiveKind::Bind | DirectiveKind::On | DirectiveKind::If | DirectiveKind::ElseIf | DirectiveKind::For
    );
    let expression = match value {
        Some((v, value_at)) => {
            let trimmed = v.trim();
            let lead = v.len() - v.trim_start().len();
            check_balanced(trimmed)
                .map_err(|e| SfcError::syntax(value_at + lead + e.offset, e.message))?;
            trimmed.to_string()
        }
        None => String::new(),
    };
    if needs_value && expression.is_empty() {
        return Err(SfcError::syntax(offset, format!("`{raw_name}` needs an expression")));
    }

    el.directives.push(Directive {
        kind,
        form,
        key,
        modifiers,
        expression,
        offset,
    });
    Ok(())
}

type Classified = (DirectiveKind, DirectiveForm, Option<String>, Vec<String>);

fn classify(raw_name: &str) -> Option<Classified> {
    let keyed = |kind: DirectiveKind, rest: &str| {
        let (key, modifiers) = split_modifiers(rest);
        (kind, DirectiveForm::Individual, Some(key), modifiers)
    };
    let spread = |kind: DirectiveKind| (kind, DirectiveForm::Spread, None, Vec::new());

    if let Some(rest) = raw_name.strip_prefix(':') {
        return Some(keyed(DirectiveKind::Bind, rest));
    }
    if let Some(rest) = raw_name.strip_prefix('@') {
        return Some(keyed(DirectiveKind::On, rest));
    }
    if let Some(rest) = raw_name.strip_prefix('#') {
        return Some(keyed(DirectiveKind::Other("slot".to_string()), rest));
    }
    if raw_name == "bind" {
        return Some(spread(DirectiveKind::Bind));
    }
    if let Some(rest) = raw_name.strip_prefix("bind:") {
        return Some(keyed(DirectiveKind::Bind, rest));
    }
    let rest = raw_name.strip_prefix("v-")?;
    let (name, arg) = match rest.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (rest, None),
    };
    let (name, name_modifiers) = split_modifiers(name);
    let kind = match name.as_str() {
        "bind" => DirectiveKind::Bind,
        "on" => DirectiveKind::On,
        "if" => DirectiveKind::If,
        "else-if" | "elseif" => DirectiveKind::ElseIf,
        "else" => DirectiveKind::Else,
        "for" => DirectiveKind::For,
        other => DirectiveKind::Other(other.to_string()),
    };
    Some(match arg {
        Some(arg) => keyed(kind, arg),
        None if matches!(kind, DirectiveKind::Bind | DirectiveKind::On) => spread(kind),
        None => (kind, DirectiveForm::Individual, None, name_modifiers),
    })
}

/// Name a `<slot>` is declared under, when it is static.
fn static_slot_name(el: &ElementNode) -> Option<String> {
    if !el.is_slot() {
        return None;
    }
    let bound = el
        .directives
        .iter()
        .any(|d| d.kind == DirectiveKind::Bind && d.key.as_deref() == Some("name"));
    if bound {
        return None;
    }
    Some(el.static_attr("name").unwrap_or("default").to_string())
}

fn check_slot_nesting(stack: &[ElementNode], el: &ElementNode) -> SfcResult<()> {
    let Some(name) = static_slot_name(el) else {
        return Ok(());
    };
    let nested = stack
        .iter()
        .filter_map(static_slot_name)
        .any(|outer| outer == name);
    if nested {
        return Err(SfcError::syntax(
            el.offset,
            format!("<slot name=\"{name}\"> cannot be nested inside a slot of the same name"),
        ));
    }
    Ok(())
}

fn merge_adjacent_text(children: &mut Vec<Node>) {
    let mut out: Vec<Node> = Vec::with_capacity(children.len());
    for node in children.drain(..) {
        match (out.last_mut(), node) {
            (Some(Node::Text(prev)), Node::Text(next)) => prev.text.push_str(&next.text),
            (_, node) => out.push(node),
        }
    }
    *children = out;
}

fn is_all_ws(s: &str) -> bool {
    s.chars().all(|c| c.is_whitespace())
}

/// Whitespace handling for a child list: whitespace-only text is dropped
/// when it holds a line break or sits at either end, otherwise it becomes a
/// single space; whitespace runs inside text collapse to one space.
fn condense_children(children: &mut Vec<Node>, preserve: bool) {
    merge_adjacent_text(children);
    if preserve {
        return;
    }
    let count = children.len();
    let mut out: Vec<Node> = Vec::with_capacity(count);
    for (idx, node) in children.drain(..).enumerate() {
        match node {
            Node::Text(mut t) => {
                if is_all_ws(&t.text) {
                    if idx == 0 || idx + 1 == count || t.text.contains('\n') {
                        continue;
                    }
                    t.text = " ".to_string();
                } else {
                    t.text = collapse_ws(&t.text);
                }
                out.push(Node::Text(t));
            }
            other => out.push(other),
        }
    }
    *children = out;
}

fn collapse_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}
