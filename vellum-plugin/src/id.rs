//! Virtual module ids: `<path>?<tag>&type=<kind>&index=<n>[&lang=<lang>][&scoped=true]`.

use std::fmt;
use std::path::{Path, PathBuf};

use vellum_sfc::{Block, BlockKind};

/// Block attributes carried in the id so a load can be answered from the
/// id alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct BlockQuery {
    pub lang: Option<String>,
    pub scoped: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VirtualModuleId {
    pub path: PathBuf,
    pub kind: BlockKind,
    /// Index among blocks of the same category.
    pub index: usize,
    pub query: BlockQuery,
}

impl VirtualModuleId {
    pub fn for_block(path: &Path, index: usize, block: &Block) -> Self {
        VirtualModuleId {
            path: path.to_path_buf(),
            kind: block.kind.clone(),
            index,
            query: BlockQuery {
                lang: block.lang().map(str::to_string),
                scoped: block.kind == BlockKind::Style && block.scoped(),
            },
        }
    }

    /// Text form of the id under the namespace marker `tag`.
    pub fn encode(&self, tag: &str) -> String {
        Encoded { id: self, tag }.to_string()
    }

    /// Parse an id carrying `tag`. Anything else is not ours and yields
    /// `None`; unknown query keys are ignored.
    pub fn parse(text: &str, tag: &str) -> Option<Self> {
        let (path, query) = text.split_once('?')?;
        let mut tagged = false;
        let mut kind = None;
        let mut index = None;
        let mut lang = None;
        let mut scoped = false;

        for part in query.split('&') {
            match part.split_once('=') {
                None if part == tag => tagged = true,
                Some(("type", v)) => kind = Some(BlockKind::from_tag(v)),
                Some(("index", v)) => index = v.parse::<usize>().ok(),
                Some(("lang", v)) => lang = Some(v.to_string()),
                Some(("scoped", v)) => scoped = v == "true",
                _ => log::warn!("ignoring query key `{part}` in {text}"),
            }
        }
        if !tagged || path.is_empty() {
            return None;
        }
        Some(VirtualModuleId {
            path: PathBuf::from(path),
            kind: kind?,
            index: index?,
            query: BlockQuery { lang, scoped },
        })
    }
}

struct Encoded<'a> {
    id: &'a VirtualModuleId,
    tag: &'a str,
}

impl fmt::Display for Encoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id;
        write!(
            f,
            "{}?{}&type={}&index={}",
            id.path.display(),
            self.tag,
            id.kind.as_str(),
            id.index
        )?;
        if let Some(lang) = &id.query.lang {
            write!(f, "&lang={lang}")?;
        }
        if id.query.scoped {
            f.write_str("&scoped=true")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_id() -> VirtualModuleId {
        VirtualModuleId {
            path: PathBuf::from("/src/App.vue"),
            kind: BlockKind::Style,
            index: 1,
            query: BlockQuery {
                lang: Some("scss".to_string()),
                scoped: true,
            },
        }
    }

    #[test]
    fn encodes_exact_text() {
        assert_eq!(
            style_id().encode("vue"),
            "/src/App.vue?vue&type=style&index=1&lang=scss&scoped=true"
        );
    }

    #[test]
    fn parses_what_it_encodes() {
        let id = style_id();
        assert_eq!(VirtualModuleId::parse(&id.encode("vue"), "vue"), Some(id));
    }

    #[test]
    fn ignores_unknown_keys() {
        let id = VirtualModuleId::parse("/a.vue?vue&type=template&index=0&t=123", "vue").unwrap();
        assert_eq!(id.kind, BlockKind::Template);
        assert_eq!(id.query, BlockQuery::default());
    }

    #[test]
    fn custom_block_type_is_its_tag() {
        let id = VirtualModuleId::parse("/a.vue?vue&type=i18n&index=2", "vue").unwrap();
        assert_eq!(id.kind, BlockKind::Custom("i18n".to_string()));
        assert_eq!(id.index, 2);
    }

    #[test]
    fn rejects_foreign_ids() {
        assert!(VirtualModuleId::parse("/a.vue", "vue").is_none());
        assert!(VirtualModuleId::parse("/a.vue?raw", "vue").is_none());
        assert!(VirtualModuleId::parse("/a.vue?sfc&type=script&index=0", "vue").is_none());
        assert!(VirtualModuleId::parse("/a.vue?vue&type=script", "vue").is_none());
        assert!(VirtualModuleId::parse("/a.vue?vue&type=script&index=x", "vue").is_none());
    }
}
