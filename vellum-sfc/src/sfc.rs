use indexmap::IndexMap;
use pest::Parser;
use pest::error::InputLocation;
use pest::iterators::Pair;
use serde::{Serialize, Serializer};

use crate::error::{SfcError, SfcResult};

#[derive(pest_derive::Parser)]
#[grammar = "sfc.pest"]
struct SfcParser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Template,
    Script,
    Style,
    /// Any other top-level tag; the tag name is kept.
    Custom(String),
}

impl BlockKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "template" => BlockKind::Template,
            "script" => BlockKind::Script,
            "style" => BlockKind::Style,
            other => BlockKind::Custom(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Template => "template",
            BlockKind::Script => "script",
            BlockKind::Style => "style",
            BlockKind::Custom(tag) => tag,
        }
    }
}

impl Serialize for BlockKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Value of an attribute on a block's opening tag. Attributes written
/// without a value (`<style scoped>`) are `Flag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttrValue {
    Text(String),
    Flag(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Flag(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub kind: BlockKind,
    /// Text between the opening and closing tag, whitespace included.
    pub content: String,
    pub start_offset: usize,
    pub end_offset: usize,
    pub attrs: IndexMap<String, AttrValue>,
}

impl Block {
    pub fn lang(&self) -> Option<&str> {
        self.attrs.get("lang").and_then(AttrValue::as_str)
    }

    pub fn scoped(&self) -> bool {
        match self.attrs.get("scoped") {
            Some(AttrValue::Flag(on)) => *on,
            Some(AttrValue::Text(v)) => v != "false",
            None => false,
        }
    }
}

/// Split a component source into its top-level blocks, in source order.
pub fn split(source: &str) -> SfcResult<Vec<Block>> {
    let mut pairs = SfcParser::parse(Rule::file, source).map_err(|e| {
        let offset = match e.location {
            InputLocation::Pos(p) => p,
            InputLocation::Span((s, _)) => s,
        };
        SfcError::malformed(offset, "expected a top-level block such as <template>, <script> or <style>")
    })?;
    let file = pairs
        .next()
        .ok_or_else(|| SfcError::malformed(0, "empty component source"))?;

    let mut blocks = Vec::new();
    let mut seen_template = false;
    let mut seen_script = false;

    for node in file.into_inner() {
        if node.as_rule() != Rule::block {
            continue;
        }
        let tag_offset = node.as_span().start();
        let block = consume_block(node)?;
        match block.kind {
            BlockKind::Template if seen_template => {
                return Err(SfcError::malformed(tag_offset, "a component can have only one <template> block"));
            }
            BlockKind::Script if seen_script => {
                return Err(SfcError::malformed(tag_offset, "a component can have only one <script> block"));
            }
            BlockKind::Template => seen_template = true,
            BlockKind::Script => seen_script = true,
            _ => {}
        }
        log::trace!(
            "split: <{}> {}..{}",
            block.kind.as_str(),
            block.start_offset,
            block.end_offset
        );
        blocks.push(block);
    }

    Ok(blocks)
}

fn consume_block(block: Pair<Rule>) -> SfcResult<Block> {
    let tag_offset = block.as_span().start();
    let mut tag = String::new();
    let mut attrs = IndexMap::new();
    let mut body = None;

    for p in block.into_inner() {
        match p.as_rule() {
            Rule::open_tag | Rule::raw_open => {
                // tag name and attributes are direct children of open_tag
                for a in p.into_inner() {
                    match a.as_rule() {
                        Rule::tag_name | Rule::raw_name => tag = a.as_str().to_string(),
                        Rule::attribute => {
                            let (name, value) = parse_attr(a);
                            attrs.insert(name, value);
                        }
                        _ => {}
                    }
                }
            }
            Rule::body | Rule::raw_body => {
                let span = p.as_span();
                body = Some((span.start(), span.end(), span.as_str().to_string()));
            }
            Rule::unclosed => {
                return Err(SfcError::malformed(
                    tag_offset,
                    format!("<{tag}> has no matching </{tag}>"),
                ));
            }
            _ => {}
        }
    }

    let (start_offset, end_offset, content) =
        body.ok_or_else(|| SfcError::malformed(tag_offset, "block without a body"))?;

    Ok(Block {
        kind: BlockKind::from_tag(&tag),
        content,
        start_offset,
        end_offset,
        attrs,
    })
}

fn parse_attr(attr: Pair<Rule>) -> (String, AttrValue) {
    // attribute = attr_name ( "=" value )?
    let mut name = String::new();
    let mut value = AttrValue::Flag(true);

    for part in attr.into_inner() {
        match part.as_rule() {
            Rule::attr_name => name = part.as_str().to_string(),
            Rule::dq_value | Rule::sq_value | Rule::unquoted_value => {
                value = AttrValue::Text(part.as_str().to_string())
            }
            _ => {}
        }
    }
    (name, value)
}

/// A split component together with its per-kind block indices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SfcDescriptor {
    pub blocks: Vec<Block>,
}

impl SfcDescriptor {
    pub fn template(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == BlockKind::Template)
    }

    pub fn script(&self) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == BlockKind::Script)
    }

    pub fn styles(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| b.kind == BlockKind::Style)
    }

    pub fn custom_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks
            .iter()
            .filter(|b| matches!(b.kind, BlockKind::Custom(_)))
    }

    /// Blocks paired with their index among blocks of the same category.
    /// Custom blocks share one index space regardless of tag name.
    pub fn indexed(&self) -> Vec<(usize, &Block)> {
        let mut styles = 0;
        let mut customs = 0;
        self.blocks
            .iter()
            .map(|b| {
                let index = match b.kind {
                    BlockKind::Template | BlockKind::Script => 0,
                    BlockKind::Style => {
                        styles += 1;
                        styles - 1
                    }
                    BlockKind::Custom(_) => {
                        customs += 1;
                        customs - 1
                    }
                };
                (index, b)
            })
            .collect()
    }

    /// Find a block by category and per-category index.
    pub fn block(&self, kind: &BlockKind, index: usize) -> Option<&Block> {
        self.indexed()
            .into_iter()
            .find(|(i, b)| *i == index && same_category(&b.kind, kind))
            .map(|(_, b)| b)
    }
}

fn same_category(a: &BlockKind, b: &BlockKind) -> bool {
    match (a, b) {
        (BlockKind::Custom(x), BlockKind::Custom(y)) => x == y,
        _ => a == b,
    }
}

pub fn parse_sfc(source: &str) -> SfcResult<SfcDescriptor> {
    Ok(SfcDescriptor {
        blocks: split(source)?,
    })
}
