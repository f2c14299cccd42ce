//! Style blocks are handed to a [`StylePreprocessor`] picked by the
//! block's `lang`. Plain CSS is checked for well-formed tokens and passed
//! through untouched; scoping is left to whatever runs after us.

use std::collections::HashMap;
use std::sync::Arc;

use cssparser::{BasicParseErrorKind, ParseError, ParseErrorKind, Parser, ParserInput, Token};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("css syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("{lang} preprocessor failed: {message}")]
    Preprocessor { lang: String, message: String },
}

impl StyleError {
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        StyleError::Syntax {
            offset,
            message: message.into(),
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            StyleError::Syntax { offset, .. } => Some(*offset),
            StyleError::Preprocessor { .. } => None,
        }
    }
}

/// What a preprocessor learns about the block it is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleContext {
    pub filename: String,
    pub lang: String,
    pub scoped: bool,
    /// `data-v-xxxxxxxx`, stable for a given file path.
    pub scope_id: String,
}

impl StyleContext {
    pub fn new(filename: impl Into<String>, lang: impl Into<String>, scoped: bool) -> Self {
        let filename = filename.into();
        let scope_id = scope_id(&filename);
        StyleContext {
            filename,
            lang: lang.into(),
            scoped,
            scope_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleOutput {
    pub code: String,
    /// Source map JSON, if the preprocessor produced one.
    pub map: Option<String>,
}

pub trait StylePreprocessor: Send + Sync {
    fn process(&self, source: &str, ctx: &StyleContext) -> Result<StyleOutput, StyleError>;
}

/// `data-v-` plus eight hex digits of a 32-bit FNV-1a hash of `path`.
pub fn scope_id(path: &str) -> String {
    let mut hash: u32 = 0x811c_9dc5;
    for b in path.bytes() {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    format!("data-v-{hash:08x}")
}

/// Built-in `css` preprocessor.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainCss;

impl StylePreprocessor for PlainCss {
    fn process(&self, source: &str, ctx: &StyleContext) -> Result<StyleOutput, StyleError> {
        validate_css(source)?;
        log::debug!("style: {} bytes of css from {}", source.len(), ctx.filename);
        Ok(StyleOutput {
            code: source.to_string(),
            map: None,
        })
    }
}

/// Reject unterminated strings and urls and closing brackets with no
/// opener. Anything else the css tokenizer accepts is fine.
pub fn validate_css(css: &str) -> Result<(), StyleError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    check_tokens(&mut parser).map_err(|e| into_style_error(css, e))
}

fn check_tokens<'i>(parser: &mut Parser<'i, '_>) -> Result<(), ParseError<'i, StyleError>> {
    loop {
        let at = parser.position().byte_index();
        let token = match parser.next_including_whitespace_and_comments() {
            Ok(token) => token.clone(),
            Err(e) if matches!(e.kind, BasicParseErrorKind::EndOfInput) => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        match token {
            Token::BadString(_) => {
                return Err(parser.new_custom_error(StyleError::syntax(at, "unterminated string")));
            }
            Token::BadUrl(_) => {
                return Err(parser.new_custom_error(StyleError::syntax(at, "malformed url()")));
            }
            Token::CloseParenthesis | Token::CloseSquareBracket | Token::CloseCurlyBracket => {
                return Err(parser.new_custom_error(StyleError::syntax(at, "closing bracket has no opener")));
            }
            Token::Function(_)
            | Token::ParenthesisBlock
            | Token::SquareBracketBlock
            | Token::CurlyBracketBlock => {
                parser.parse_nested_block(|nested| check_tokens(nested))?;
            }
            _ => {}
        }
    }
}

fn into_style_error(css: &str, err: ParseError<'_, StyleError>) -> StyleError {
    match err.kind {
        ParseErrorKind::Custom(e) => e,
        ParseErrorKind::Basic(kind) => {
            let offset = offset_of(css, err.location.line, err.location.column);
            StyleError::syntax(offset, format!("{kind:?}"))
        }
    }
}

/// Byte offset of a zero-based line and one-based column.
fn offset_of(css: &str, line: u32, column: u32) -> usize {
    let line_start: usize = css
        .split_inclusive('\n')
        .take(line as usize)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1) as usize).min(css.len())
}

/// Preprocessors keyed by `lang`. `css` is always present.
#[derive(Clone)]
pub struct PreprocessorRegistry {
    by_lang: HashMap<String, Arc<dyn StylePreprocessor>>,
}

impl Default for PreprocessorRegistry {
    fn default() -> Self {
        let mut registry = PreprocessorRegistry {
            by_lang: HashMap::new(),
        };
        registry.register("css", PlainCss);
        registry
    }
}

impl std::fmt::Debug for PreprocessorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut langs: Vec<&String> = self.by_lang.keys().collect();
        langs.sort();
        f.debug_struct("PreprocessorRegistry").field("langs", &langs).finish()
    }
}

impl PreprocessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, lang: impl Into<String>, preprocessor: impl StylePreprocessor + 'static) {
        self.by_lang.insert(lang.into(), Arc::new(preprocessor));
    }

    pub fn get(&self, lang: &str) -> Option<Arc<dyn StylePreprocessor>> {
        self.by_lang.get(lang).cloned()
    }

    pub fn contains(&self, lang: &str) -> bool {
        self.by_lang.contains_key(lang)
    }
}
