use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use vellum_sfc::{BlockKind, SourceMap, compile_template, parse_sfc};
use vellum_style::{PreprocessorRegistry, StyleContext, StylePreprocessor};

use crate::cache::{RootCache, RootEntry};
use crate::entry::entry_module;
use crate::error::{PluginError, PluginResult};
use crate::id::VirtualModuleId;
use crate::loader::SourceLoader;
use crate::options::PluginOptions;

/// Lifecycle of one virtual block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModuleState {
    Unresolved,
    Resolved,
    Loaded,
    Transformed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A component file; it keeps its own path.
    Root(PathBuf),
    Block(VirtualModuleId),
}

/// Source map attached to a load or transform result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleMap {
    Composed(SourceMap),
    /// JSON handed back untouched by a style preprocessor.
    Json(String),
}

impl ModuleMap {
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            ModuleMap::Composed(map) => map.to_json(),
            ModuleMap::Json(json) => Ok(json.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleOutput {
    pub code: String,
    pub map: Option<ModuleMap>,
}

/// Answers the three bundler hooks for component files. Every method
/// returns `Ok(None)` for ids that belong to someone else.
pub struct ComponentResolver {
    options: PluginOptions,
    loader: Box<dyn SourceLoader>,
    styles: PreprocessorRegistry,
    cache: RootCache,
    states: Mutex<HashMap<VirtualModuleId, ModuleState>>,
}

impl ComponentResolver {
    pub fn new(options: PluginOptions, loader: impl SourceLoader + 'static) -> Self {
        ComponentResolver {
            options,
            loader: Box::new(loader),
            styles: PreprocessorRegistry::default(),
            cache: RootCache::default(),
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_preprocessor(
        mut self,
        lang: impl Into<String>,
        preprocessor: impl StylePreprocessor + 'static,
    ) -> Self {
        self.styles.register(lang, preprocessor);
        self
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    /// `resolveId`: recognize our block ids and component files. A
    /// component file is split and its block ids cached before this returns.
    pub fn resolve_id(&self, specifier: &str, importer: Option<&Path>) -> PluginResult<Option<Resolved>> {
        if let Some(id) = VirtualModuleId::parse(specifier, &self.options.id_tag) {
            if self.cache.get(&id.path).is_some() {
                self.advance(&id, ModuleState::Resolved);
            }
            return Ok(Some(Resolved::Block(id)));
        }
        let Some(path) = self.component_path(specifier, importer) else {
            return Ok(None);
        };
        self.root(&path)?;
        Ok(Some(Resolved::Root(path)))
    }

    /// Block ids a resolved component file exposes, in source order.
    pub fn block_ids(&self, path: &Path) -> Option<Vec<VirtualModuleId>> {
        self.cache.get(path).map(|entry| entry.ids.clone())
    }

    /// `load`: raw block content for a block id, the entry module for a
    /// component file.
    pub fn load(&self, id: &str) -> PluginResult<Option<ModuleOutput>> {
        if let Some(vid) = VirtualModuleId::parse(id, &self.options.id_tag) {
            let entry = self.resolved_root(&vid, id)?;
            let block = entry
                .block(&vid)
                .ok_or_else(|| order_error(&vid, id))?;
            let map = self.options.compile.source_map.then(|| {
                ModuleMap::Composed(SourceMap::for_block(
                    &source_name(&entry.path),
                    &entry.source,
                    block.start_offset,
                    &block.content,
                    self.options.include_sources_content,
                ))
            });
            log::debug!("load: {id}");
            self.advance(&vid, ModuleState::Loaded);
            return Ok(Some(ModuleOutput {
                code: block.content.clone(),
                map,
            }));
        }

        let path = PathBuf::from(id);
        if !self.options.is_component(&path) {
            return Ok(None);
        }
        let entry = self.root(&path)?;
        log::debug!("load: entry module for {}", path.display());
        Ok(Some(ModuleOutput {
            code: entry_module(&entry, &self.options.id_tag),
            map: None,
        }))
    }

    /// `transform`: compile template blocks, run style blocks through
    /// their preprocessor and pass everything else through.
    pub fn transform(&self, code: &str, id: &str) -> PluginResult<Option<ModuleOutput>> {
        let Some(vid) = VirtualModuleId::parse(id, &self.options.id_tag) else {
            return Ok(None);
        };
        let entry = self.resolved_root(&vid, id)?;
        let block = entry.block(&vid).ok_or_else(|| order_error(&vid, id))?;

        let output = match &vid.kind {
            BlockKind::Template => {
                if let Some(lang) = block.lang().filter(|l| *l != "html") {
                    return Err(PluginError::UnsupportedTemplateLang {
                        path: entry.path.clone(),
                        lang: lang.to_string(),
                    });
                }
                let compiled = compile_template(code, &self.options.compile).map_err(|e| {
                    PluginError::Compile {
                        path: entry.path.clone(),
                        source: e.rebase(block.start_offset),
                    }
                })?;
                let map = self.options.compile.source_map.then(|| {
                    ModuleMap::Composed(compiled.source_map(
                        &source_name(&entry.path),
                        &entry.source,
                        block.start_offset,
                        self.options.include_sources_content,
                    ))
                });
                Some(ModuleOutput {
                    code: compiled.code,
                    map,
                })
            }
            BlockKind::Style => {
                let lang = block.lang().unwrap_or("css");
                let preprocessor = self.styles.get(lang).ok_or_else(|| PluginError::MissingPreprocessor {
                    path: entry.path.clone(),
                    lang: lang.to_string(),
                })?;
                let ctx = StyleContext::new(source_name(&entry.path), lang, vid.query.scoped);
                let out = preprocessor
                    .process(code, &ctx)
                    .map_err(|source| PluginError::Style {
                        path: entry.path.clone(),
                        source,
                    })?;
                Some(ModuleOutput {
                    code: out.code,
                    map: out.map.map(ModuleMap::Json),
                })
            }
            BlockKind::Script | BlockKind::Custom(_) => None,
        };
        log::debug!("transform: {id}");
        self.advance(&vid, ModuleState::Transformed);
        Ok(output)
    }

    pub fn state(&self, id: &VirtualModuleId) -> ModuleState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .copied()
            .unwrap_or(ModuleState::Unresolved)
    }

    /// Forget a component file; the next resolve splits it again.
    pub fn invalidate(&self, path: &Path) -> bool {
        let removed = self.cache.remove(path);
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| id.path != path);
        if removed {
            log::debug!("invalidate: {}", path.display());
        }
        removed
    }

    fn root(&self, path: &Path) -> PluginResult<Arc<RootEntry>> {
        let (entry, fresh) = self.cache.get_or_try_insert(path, || self.split_root(path))?;
        if fresh {
            for id in &entry.ids {
                self.advance(id, ModuleState::Resolved);
            }
        } else {
            log::debug!("resolve: cache hit for {}", path.display());
        }
        Ok(entry)
    }

    fn split_root(&self, path: &Path) -> PluginResult<RootEntry> {
        let source = self.loader.read(path).map_err(|source| PluginError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let descriptor = parse_sfc(&source).map_err(|source| PluginError::Compile {
            path: path.to_path_buf(),
            source,
        })?;
        let ids: Vec<VirtualModuleId> = descriptor
            .indexed()
            .into_iter()
            .map(|(index, block)| VirtualModuleId::for_block(path, index, block))
            .collect();
        log::debug!("resolve: split {} into {} blocks", path.display(), ids.len());
        for id in &ids {
            log::trace!("resolve: {}", id.encode(&self.options.id_tag));
        }
        Ok(RootEntry {
            path: path.to_path_buf(),
            source,
            descriptor,
            ids,
        })
    }

    fn resolved_root(&self, vid: &VirtualModuleId, id: &str) -> PluginResult<Arc<RootEntry>> {
        self.cache.get(&vid.path).ok_or_else(|| order_error(vid, id))
    }

    fn advance(&self, id: &VirtualModuleId, to: ModuleState) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        let state = states.entry(id.clone()).or_insert(ModuleState::Unresolved);
        if *state < to {
            *state = to;
        }
    }

    fn component_path(&self, specifier: &str, importer: Option<&Path>) -> Option<PathBuf> {
        let path = Path::new(specifier);
        if !self.options.is_component(path) {
            return None;
        }
        let relative = specifier.starts_with("./") || specifier.starts_with("../");
        let joined = match importer {
            Some(importer) if relative => importer.parent().unwrap_or(Path::new("")).join(path),
            Some(_) if !path.is_absolute() => return None,
            _ => path.to_path_buf(),
        };
        Some(normalize(&joined))
    }
}

fn order_error(vid: &VirtualModuleId, id: &str) -> PluginError {
    PluginError::ResolutionOrder {
        id: id.to_string(),
        path: vid.path.clone(),
    }
}

fn source_name(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Collapse `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_lexical() {
        assert_eq!(normalize(Path::new("/src/./views/../App.vue")), PathBuf::from("/src/App.vue"));
        assert_eq!(normalize(Path::new("../a/b.vue")), PathBuf::from("../a/b.vue"));
        assert_eq!(normalize(Path::new("a/../../b.vue")), PathBuf::from("../b.vue"));
        assert_eq!(normalize(Path::new("../../b.vue")), PathBuf::from("../../b.vue"));
    }
}
