use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use vellum_sfc::SfcError;
use vellum_style::StyleError;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("{}: {source}", path.display())]
    Compile { path: PathBuf, source: SfcError },

    #[error("`{id}` requested before {} was resolved", path.display())]
    ResolutionOrder { id: String, path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("{}: no style preprocessor registered for lang `{lang}`", path.display())]
    MissingPreprocessor { path: PathBuf, lang: String },

    #[error("{}: {source}", path.display())]
    Style { path: PathBuf, source: StyleError },

    #[error("{}: template lang `{lang}` is not supported", path.display())]
    UnsupportedTemplateLang { path: PathBuf, lang: String },
}

pub type PluginResult<T> = Result<T, PluginError>;

impl PluginError {
    pub fn path(&self) -> &Path {
        match self {
            PluginError::Compile { path, .. }
            | PluginError::ResolutionOrder { path, .. }
            | PluginError::Read { path, .. }
            | PluginError::MissingPreprocessor { path, .. }
            | PluginError::Style { path, .. }
            | PluginError::UnsupportedTemplateLang { path, .. } => path,
        }
    }

    /// Byte offset into the component file, when the failure has one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            PluginError::Compile { source, .. } => Some(source.offset()),
            PluginError::Style { source, .. } => source.offset(),
            _ => None,
        }
    }
}
