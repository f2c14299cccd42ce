use std::ffi::OsStr;
use std::path::Path;

use serde::Deserialize;
use vellum_sfc::CompileOptions;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginOptions {
    /// File extension of component files, without the dot.
    pub extension: String,
    /// Bare query key marking a virtual block id as ours.
    pub id_tag: String,
    pub compile: CompileOptions,
    /// Embed the component text in emitted source maps.
    pub include_sources_content: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        PluginOptions {
            extension: "vue".to_string(),
            id_tag: "vue".to_string(),
            compile: CompileOptions::default(),
            include_sources_content: true,
        }
    }
}

impl PluginOptions {
    pub fn is_component(&self, path: &Path) -> bool {
        path.extension() == Some(OsStr::new(&self.extension))
    }
}
