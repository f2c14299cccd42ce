use std::collections::BTreeSet;

use crate::error::SfcResult;
use crate::options::CompileOptions;
use crate::sourcemap::{Mapping, SourceMap};
use crate::template_codegen::{generate, generate_module};
use crate::template_parse::parse_template;

/// A template compiled into a render module.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledTemplate {
    pub code: String,
    pub helpers: BTreeSet<&'static str>,
    /// Module offsets to template offsets.
    pub mappings: Vec<Mapping>,
}

impl CompiledTemplate {
    /// Map back into `file_text`, where the template text starts at `base`.
    pub fn source_map(
        &self,
        source: &str,
        file_text: &str,
        base: usize,
        include_content: bool,
    ) -> SourceMap {
        let rebased: Vec<Mapping> = self.mappings.iter().map(|m| m.shifted(0, base)).collect();
        SourceMap::compose(source, file_text, &self.code, &rebased, include_content)
    }
}

/// Parse and compile template text. Error offsets are relative to
/// `template`.
pub fn compile_template(template: &str, options: &CompileOptions) -> SfcResult<CompiledTemplate> {
    let root = parse_template(template)?;
    let output = generate(&root, options)?;
    let (code, mappings) = generate_module(&output);
    Ok(CompiledTemplate {
        code,
        helpers: output.helpers,
        mappings,
    })
}
