pub mod bindings;
pub mod compile;
pub mod error;
pub mod expr;
pub mod options;
pub mod sfc;
pub mod sourcemap;
pub mod template_ast;
pub mod template_codegen;
pub mod template_parse;

pub use bindings::{SlotBindings, resolve_slot, resolve_template};
pub use compile::{CompiledTemplate, compile_template};
pub use error::{SfcError, SfcResult};
pub use options::CompileOptions;
pub use sfc::{AttrValue, Block, BlockKind, SfcDescriptor, parse_sfc, split};
pub use sourcemap::{Mapping, SourceMap};
pub use template_codegen::{CodegenOutput, generate, generate_module};
pub use template_parse::{parse_template, parse_template_to_ast};
