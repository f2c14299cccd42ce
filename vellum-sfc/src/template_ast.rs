use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveForm {
    Individual, // :value="count"
    Spread,     // v-bind="obj"
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveKind {
    Bind,
    On,
    If,
    ElseIf,
    Else,
    For,
    /// Any other `v-*` attribute, name without the prefix.
    Other(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub form: DirectiveForm,
    /// Present only for `Individual`.
    pub key: Option<String>,
    pub modifiers: Vec<String>,
    /// Raw expression text; never interpreted.
    pub expression: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaticAttr {
    /// `None` for a value-less attribute such as `disabled`.
    pub value: Option<String>,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
    pub tag: String,
    pub static_attrs: IndexMap<String, StaticAttr>,
    pub directives: Vec<Directive>,
    pub children: Vec<Node>,
    /// `slot="name"`: this element is content for a named slot of its parent.
    pub slot_name: Option<String>,
    pub self_closing: bool,
    pub offset: usize,
}

impl ElementNode {
    pub fn new(tag: impl Into<String>, offset: usize) -> Self {
        Self {
            tag: tag.into(),
            static_attrs: IndexMap::new(),
            directives: Vec::new(),
            children: Vec::new(),
            slot_name: None,
            self_closing: false,
            offset,
        }
    }

    pub fn is_slot(&self) -> bool {
        self.tag == "slot"
    }

    pub fn directive(&self, kind: &DirectiveKind) -> Option<&Directive> {
        self.directives.iter().find(|d| &d.kind == kind)
    }

    pub fn static_attr(&self, name: &str) -> Option<&str> {
        self.static_attrs.get(name).and_then(|a| a.value.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationNode {
    pub expression: String, // {{ expr }}
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Interpolation(InterpolationNode),
}

impl Node {
    pub fn offset(&self) -> usize {
        match self {
            Node::Element(e) => e.offset,
            Node::Text(t) => t.offset,
            Node::Interpolation(i) => i.offset,
        }
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            Node::Element(e) => Some(e),
            _ => None,
        }
    }
}
