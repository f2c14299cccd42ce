pub mod cache;
pub mod entry;
pub mod error;
pub mod id;
pub mod loader;
pub mod options;
pub mod resolver;

pub use error::{PluginError, PluginResult};
pub use id::{BlockQuery, VirtualModuleId};
pub use loader::{FsLoader, SourceLoader};
pub use options::PluginOptions;
pub use resolver::{ComponentResolver, ModuleMap, ModuleOutput, ModuleState, Resolved};
