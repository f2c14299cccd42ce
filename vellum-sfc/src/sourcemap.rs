//! Source Map v3 output for generated template code and raw block content.

use serde::Serialize;

/// One generated position and the original position it came from, both as
/// byte offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Mapping {
    pub generated: usize,
    pub original: usize,
}

impl Mapping {
    pub fn shifted(self, generated_by: usize, original_by: usize) -> Self {
        Mapping {
            generated: self.generated + generated_by,
            original: self.original + original_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceMap {
    pub version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources_content: Option<Vec<String>>,
    pub names: Vec<String>,
    pub mappings: String,
}

impl SourceMap {
    /// Encode `mappings` from `generated` back into `original`, which is
    /// the full file text named `source`.
    pub fn compose(
        source: &str,
        original: &str,
        generated: &str,
        mappings: &[Mapping],
        include_content: bool,
    ) -> Self {
        let mut sorted = mappings.to_vec();
        sorted.sort_by_key(|m| m.generated);
        sorted.dedup_by_key(|m| m.generated);

        let gen_index = LineIndex::new(generated);
        let orig_index = LineIndex::new(original);

        let mut out = String::new();
        let mut line = 0;
        let mut first_in_line = true;
        let mut prev_gen_col = 0i64;
        let mut prev_orig_line = 0i64;
        let mut prev_orig_col = 0i64;

        for m in &sorted {
            if m.generated > generated.len() || m.original > original.len() {
                continue;
            }
            let (gl, gc) = gen_index.locate(generated, m.generated);
            let (ol, oc) = orig_index.locate(original, m.original);
            while line < gl {
                out.push(';');
                line += 1;
                first_in_line = true;
                prev_gen_col = 0;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;

            encode_vlq(&mut out, gc as i64 - prev_gen_col);
            encode_vlq(&mut out, 0);
            encode_vlq(&mut out, ol as i64 - prev_orig_line);
            encode_vlq(&mut out, oc as i64 - prev_orig_col);
            prev_gen_col = gc as i64;
            prev_orig_line = ol as i64;
            prev_orig_col = oc as i64;
        }

        SourceMap {
            version: 3,
            file: None,
            sources: vec![source.to_string()],
            sources_content: include_content.then(|| vec![original.to_string()]),
            names: Vec::new(),
            mappings: out,
        }
    }

    /// Line-identity map for block content served verbatim: line `n` of
    /// `content` maps to the matching line of the block in `original`.
    pub fn for_block(
        source: &str,
        original: &str,
        block_start: usize,
        content: &str,
        include_content: bool,
    ) -> Self {
        let mappings: Vec<Mapping> = LineIndex::new(content)
            .starts
            .iter()
            .map(|&start| Mapping {
                generated: start,
                original: block_start + start,
            })
            .collect();
        Self::compose(source, original, content, &mappings, include_content)
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        LineIndex { starts }
    }

    /// Zero-based line and UTF-16 column of a byte offset.
    fn locate(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = self.starts.partition_point(|&s| s <= offset).saturating_sub(1);
        let start = self.starts[line];
        let mut end = offset;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let col = text[start..end].encode_utf16().count();
        (line, col)
    }
}

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

fn encode_vlq(out: &mut String, value: i64) {
    let mut v = if value < 0 {
        ((-value as u64) << 1) | 1
    } else {
        (value as u64) << 1
    };
    loop {
        let mut digit = (v & 31) as usize;
        v >>= 5;
        if v > 0 {
            digit |= 32;
        }
        out.push(BASE64[digit] as char);
        if v == 0 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vlq(value: i64) -> String {
        let mut s = String::new();
        encode_vlq(&mut s, value);
        s
    }

    #[test]
    fn vlq_digits() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn columns_count_utf16_units() {
        let text = "a😀b\nc";
        let index = LineIndex::new(text);
        // the emoji is 4 bytes and 2 UTF-16 units
        assert_eq!(index.locate(text, 5), (0, 3));
        assert_eq!(index.locate(text, 7), (1, 0));
    }

    #[test]
    fn compose_splits_lines() {
        let original = "<div>\n  <p>x</p>\n</div>";
        let generated = "A\nB";
        let map = SourceMap::compose(
            "App.vue",
            original,
            generated,
            &[
                Mapping { generated: 0, original: 0 },
                Mapping { generated: 2, original: 8 },
            ],
            false,
        );
        assert_eq!(map.mappings, "AAAA;AACE");
        assert!(map.sources_content.is_none());
    }

    #[test]
    fn block_map_is_line_identity() {
        let original = "<script>\nexport default {}\n</script>";
        let map = SourceMap::for_block("App.vue", original, 8, "\nexport default {}\n", true);
        assert_eq!(map.mappings, "AAAQ;AACR;AACA");
        assert_eq!(map.sources_content.as_deref(), Some(&[original.to_string()][..]));
    }
}
