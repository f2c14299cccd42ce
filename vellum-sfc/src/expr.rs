//! Helpers over opaque expression text. Nothing here evaluates an
//! expression; the scanner only tracks brackets and string literals so the
//! parser can find where an expression ends and reject unbalanced ones.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub offset: usize,
    pub message: String,
}

enum Frame {
    Close(u8, usize),
    Template(usize),
    Substitution(usize),
}

fn scan(src: &str, start: usize, until_mustache: bool) -> Result<usize, ExprError> {
    let b = src.as_bytes();
    let mut stack: Vec<Frame> = Vec::new();
    let mut quote: Option<(u8, usize)> = None;
    let mut i = start;

    while i < b.len() {
        let c = b[i];
        if let Some((q, _)) = quote {
            if c == b'\\' {
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if let Some(Frame::Template(_)) = stack.last() {
            match c {
                b'\\' => {
                    i += 2;
                    continue;
                }
                b'`' => {
                    stack.pop();
                }
                b'$' if b.get(i + 1) == Some(&b'{') => {
                    stack.push(Frame::Substitution(i));
                    i += 2;
                    continue;
                }
                _ => {}
            }
            i += 1;
            continue;
        }
        if until_mustache && stack.is_empty() && c == b'}' && b.get(i + 1) == Some(&b'}') {
            return Ok(i);
        }
        match c {
            b'\'' | b'"' => quote = Some((c, i)),
            b'`' => stack.push(Frame::Template(i)),
            b'(' => stack.push(Frame::Close(b')', i)),
            b'[' => stack.push(Frame::Close(b']', i)),
            b'{' => stack.push(Frame::Close(b'}', i)),
            b')' | b']' | b'}' => match stack.pop() {
                Some(Frame::Close(expected, _)) if expected == c => {}
                Some(Frame::Substitution(_)) if c == b'}' => {}
                _ => {
                    return Err(ExprError {
                        offset: i,
                        message: format!("unbalanced `{}` in expression", c as char),
                    });
                }
            },
            _ => {}
        }
        i += 1;
    }

    if until_mustache {
        return Err(ExprError {
            offset: start,
            message: "interpolation is missing its closing `}}`".to_string(),
        });
    }
    if let Some((_, at)) = quote {
        return Err(ExprError {
            offset: at,
            message: "unterminated string literal in expression".to_string(),
        });
    }
    if let Some(frame) = stack.last() {
        let (offset, opener) = match frame {
            Frame::Close(b')', at) => (*at, "("),
            Frame::Close(b']', at) => (*at, "["),
            Frame::Close(_, at) => (*at, "{"),
            Frame::Template(at) => (*at, "`"),
            Frame::Substitution(at) => (*at, "${"),
        };
        return Err(ExprError {
            offset,
            message: format!("unclosed `{opener}` in expression"),
        });
    }
    Ok(b.len())
}

/// Reject expressions with unbalanced brackets or unterminated strings.
pub fn check_balanced(expr: &str) -> Result<(), ExprError> {
    scan(expr, 0, false).map(|_| ())
}

/// Byte index of the `}}` closing an interpolation whose body starts at
/// `start`.
pub fn find_mustache_end(src: &str, start: usize) -> Result<usize, ExprError> {
    scan(src, start, true)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$'),
        _ => false,
    }
}

/// `foo`, `foo.bar`, `$emit`: a member path usable directly as a handler.
pub fn is_simple_path(expr: &str) -> bool {
    let expr = expr.trim();
    !expr.is_empty() && expr.split('.').all(is_ident)
}

/// `function (...) {...}` or `(a) => ...` / `a => ...`.
pub fn is_function_expression(expr: &str) -> bool {
    let expr = expr.trim();
    if let Some(rest) = expr.strip_prefix("function") {
        return rest.trim_start().starts_with('(') || rest.starts_with(char::is_whitespace);
    }
    match expr.find("=>") {
        Some(pos) => {
            let head = expr[..pos].trim();
            is_ident(head) || (head.starts_with('(') && head.ends_with(')'))
        }
        None => false,
    }
}

/// Object key as written in generated code: bare when it is an identifier.
pub fn js_key(key: &str) -> String {
    if is_ident(key) {
        key.to_string()
    } else {
        string_lit(key)
    }
}

/// Double-quoted JavaScript string literal.
pub fn string_lit(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Words left alone by [`prefix_identifiers`]: literals, operators and
/// the globals a render function may reach.
const UNPREFIXED: &[&str] = &[
    "true", "false", "null", "undefined", "NaN", "Infinity", "typeof", "instanceof", "in", "of",
    "new", "void", "delete", "function", "return", "if", "else", "var", "let", "const", "async",
    "await", "arguments", "_vm", "Math", "Date", "Array", "Object", "Boolean", "String", "Number",
    "RegExp", "Map", "Set", "JSON", "Intl", "BigInt", "Symbol", "Promise", "parseInt",
    "parseFloat", "isNaN", "isFinite", "encodeURI", "encodeURIComponent", "decodeURI",
    "decodeURIComponent", "console", "require",
];

fn ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$' || b >= 0x80
}

fn ident_part(b: u8) -> bool {
    ident_start(b) || b.is_ascii_digit()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Prev {
    Start,
    Punct(u8),
    Dot,
    Operand,
}

/// Rewrite free identifiers of `expr` as `_vm.<name>` so the expression
/// resolves against the component instance. Member names, object keys,
/// string contents, `locals` and arrow or function parameters are kept as
/// written; `this` becomes `_vm`.
pub fn prefix_identifiers(expr: &str, locals: &[String]) -> String {
    let b = expr.as_bytes();
    let mut out = String::with_capacity(expr.len() + 16);
    let mut scope: Vec<String> = locals.to_vec();
    // `(`, `[`, `{`, '`' for a template literal, `$` for `${`
    let mut stack: Vec<u8> = Vec::new();
    let mut prev = Prev::Start;
    let mut function_head = false;
    let mut i = 0;

    while i < b.len() {
        if stack.last() == Some(&b'`') {
            let start = i;
            while i < b.len() && b[i] != b'`' && !(b[i] == b'$' && b.get(i + 1) == Some(&b'{')) {
                i += if b[i] == b'\\' { 2 } else { 1 };
            }
            let end = i.min(b.len());
            out.push_str(&expr[start..end]);
            if i >= b.len() {
                break;
            }
            if b[i] == b'`' {
                stack.pop();
                out.push('`');
                i += 1;
                prev = Prev::Operand;
            } else {
                stack.push(b'$');
                out.push_str("${");
                i += 2;
                prev = Prev::Start;
            }
            continue;
        }

        let c = b[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => {
                out.push(c as char);
                i += 1;
            }
            b'\'' | b'"' => {
                let start = i;
                i += 1;
                while i < b.len() && b[i] != c {
                    i += if b[i] == b'\\' { 2 } else { 1 };
                }
                i = (i + 1).min(b.len());
                out.push_str(&expr[start..i]);
                prev = Prev::Operand;
            }
            b'`' => {
                stack.push(b'`');
                out.push('`');
                i += 1;
            }
            b'0'..=b'9' => {
                let start = i;
                while i < b.len() && (ident_part(b[i]) || b[i] == b'.') {
                    i += 1;
                }
                out.push_str(&expr[start..i]);
                prev = Prev::Operand;
            }
            b'.' if expr[i..].starts_with("...") => {
                out.push_str("...");
                i += 3;
                prev = Prev::Punct(b',');
            }
            b'.' => {
                out.push('.');
                i += 1;
                prev = Prev::Dot;
            }
            b'?' if b.get(i + 1) == Some(&b'.') && !b.get(i + 2).is_some_and(u8::is_ascii_digit) => {
                out.push_str("?.");
                i += 2;
                prev = Prev::Dot;
            }
            b'(' => {
                let close = matching_paren(b, i);
                let params = close.filter(|&end| function_head || next_is_arrow(b, end + 1));
                if let Some(end) = params {
                    scope.extend(binding_names(&expr[i + 1..end]));
                    out.push_str(&expr[i..=end]);
                    i = end + 1;
                    prev = Prev::Operand;
                    function_head = false;
                } else {
                    stack.push(b'(');
                    out.push('(');
                    i += 1;
                    prev = Prev::Punct(b'(');
                }
            }
            b'[' | b'{' => {
                stack.push(c);
                out.push(c as char);
                i += 1;
                prev = Prev::Punct(c);
            }
            b'}' if stack.last() == Some(&b'$') => {
                stack.pop();
                out.push('}');
                i += 1;
            }
            b')' | b']' | b'}' => {
                stack.pop();
                out.push(c as char);
                i += 1;
                prev = Prev::Operand;
            }
            c if ident_start(c) => {
                let start = i;
                while i < b.len() && ident_part(b[i]) {
                    i += 1;
                }
                let word = &expr[start..i];
                let next = next_significant(b, i);
                let in_object = stack.last() == Some(&b'{')
                    && matches!(prev, Prev::Punct(b'{') | Prev::Punct(b','));

                if prev == Prev::Dot || (function_head && word != "function") {
                    out.push_str(word);
                } else if word == "this" {
                    out.push_str("_vm");
                } else if word == "function" {
                    function_head = true;
                    out.push_str(word);
                } else if next_is_arrow(b, i) {
                    scope.push(word.to_string());
                    out.push_str(word);
                } else if in_object && next == Some(b':') {
                    out.push_str(word);
                } else if UNPREFIXED.contains(&word) || scope.iter().any(|l| l == word) {
                    out.push_str(word);
                } else if in_object && matches!(next, Some(b',') | Some(b'}')) {
                    // shorthand property
                    out.push_str(word);
                    out.push_str(":_vm.");
                    out.push_str(word);
                } else {
                    out.push_str("_vm.");
                    out.push_str(word);
                }
                prev = if matches!(word, "typeof" | "instanceof" | "in" | "of" | "new" | "void" | "delete" | "return") {
                    Prev::Punct(b' ')
                } else {
                    Prev::Operand
                };
            }
            _ => {
                let ch = expr[i..].chars().next().unwrap_or(' ');
                out.push(ch);
                i += ch.len_utf8();
                prev = Prev::Punct(c);
            }
        }
    }
    out
}

fn next_significant(b: &[u8], mut i: usize) -> Option<u8> {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    b.get(i).copied()
}

fn next_is_arrow(b: &[u8], mut i: usize) -> bool {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    b.get(i) == Some(&b'=') && b.get(i + 1) == Some(&b'>')
}

/// Index of the `)` closing the `(` at `open`, skipping string literals.
fn matching_paren(b: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < b.len() {
        match b[i] {
            q @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < b.len() && b[i] != q {
                    i += if b[i] == b'\\' { 2 } else { 1 };
                }
            }
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Names introduced by a parameter list or a `v-for` alias, destructuring
/// included: `(a, { b, c: d }, ...rest)` binds `a`, `b`, `d` and `rest`.
pub fn binding_names(params: &str) -> Vec<String> {
    let b = params.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < b.len() {
        if ident_start(b[i]) {
            let start = i;
            while i < b.len() && ident_part(b[i]) {
                i += 1;
            }
            // `c: d` renames, so `c` is a key and `d` the binding
            if next_significant(b, i) != Some(b':') {
                names.push(params[start..i].to_string());
            }
        } else {
            i += 1;
        }
    }
    names
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForExpr {
    pub source: String,
    pub alias: String,
    /// Key and index names, when given: `(item, key, index) in list`.
    pub iterators: Vec<String>,
}

/// Parse the right-hand side of `v-for`.
pub fn parse_for(expr: &str) -> Option<ForExpr> {
    let (lhs, rhs) = split_for(expr)?;
    let lhs = lhs.trim();
    let lhs = lhs
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .unwrap_or(lhs);
    let mut names = split_top_level(lhs).into_iter().map(str::trim);
    let alias = names.next().filter(|a| !a.is_empty())?.to_string();
    let iterators: Vec<String> = names.map(str::to_string).collect();
    if iterators.iter().any(|n| n.is_empty()) || rhs.trim().is_empty() {
        return None;
    }
    Some(ForExpr {
        source: rhs.trim().to_string(),
        alias,
        iterators,
    })
}

/// Split at commas outside brackets, so destructured aliases stay whole.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn split_for(expr: &str) -> Option<(&str, &str)> {
    let bytes = expr.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_whitespace() {
            let rest = &expr[i..];
            let trimmed = rest.trim_start();
            for kw in ["in", "of"] {
                if let Some(after) = trimmed.strip_prefix(kw) {
                    if after.starts_with(char::is_whitespace) {
                        return Some((&expr[..i], after));
                    }
                }
            }
        }
        i += 1;
    }
    None
}
