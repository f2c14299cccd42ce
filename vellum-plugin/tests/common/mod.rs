use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use vellum_plugin::SourceLoader;

pub const APP: &str = r#"<template>
  <div class="app">
    <slot name="header" :title="title"></slot>
    <p>{{ count }}</p>
  </div>
</template>
<script>
export default { data() { return { count: 0, title: 'Hi' } } }
</script>
<style scoped>
.app { color: red; }
</style>
<i18n>{ "en": {} }</i18n>
"#;

/// In-memory files, counting how often each path is read.
#[derive(Clone, Default)]
pub struct MemoryLoader {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    reads: Arc<AtomicUsize>,
}

impl MemoryLoader {
    pub fn with(path: &str, source: &str) -> Self {
        let loader = MemoryLoader::default();
        loader.set(path, source);
        loader
    }

    pub fn set(&self, path: &str, source: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(PathBuf::from(path), source.to_string());
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl SourceLoader for MemoryLoader {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }
}
