use serde::Deserialize;

/// Knobs for template compilation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompileOptions {
    /// Move fully static subtrees into `staticRenderFns`.
    pub hoist_static: bool,
    /// Record generated-to-original mappings.
    pub source_map: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            hoist_static: false,
            source_map: true,
        }
    }
}
