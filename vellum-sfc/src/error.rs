use thiserror::Error;

/// Errors raised by the compile pipeline. Offsets are byte offsets into the
/// text handed to the failing stage; [`SfcError::rebase`] shifts them when a
/// block is compiled out of a larger file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SfcError {
    #[error("malformed source at byte {offset}: {message}")]
    MalformedSource { offset: usize, message: String },

    #[error("template syntax error at byte {offset}: {message}")]
    TemplateSyntax { offset: usize, message: String },

    #[error("duplicate binding for `{key}` at byte {offset}")]
    DuplicateKey { offset: usize, key: String },

    #[error("code generation failed at byte {offset}: {message}")]
    CodeGen { offset: usize, message: String },
}

pub type SfcResult<T> = Result<T, SfcError>;

impl SfcError {
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        SfcError::MalformedSource {
            offset,
            message: message.into(),
        }
    }

    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        SfcError::TemplateSyntax {
            offset,
            message: message.into(),
        }
    }

    pub fn codegen(offset: usize, message: impl Into<String>) -> Self {
        SfcError::CodeGen {
            offset,
            message: message.into(),
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            SfcError::MalformedSource { offset, .. }
            | SfcError::TemplateSyntax { offset, .. }
            | SfcError::DuplicateKey { offset, .. }
            | SfcError::CodeGen { offset, .. } => *offset,
        }
    }

    pub fn rebase(mut self, base: usize) -> Self {
        match &mut self {
            SfcError::MalformedSource { offset, .. }
            | SfcError::TemplateSyntax { offset, .. }
            | SfcError::DuplicateKey { offset, .. }
            | SfcError::CodeGen { offset, .. } => *offset += base,
        }
        self
    }
}
