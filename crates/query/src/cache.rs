use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

use lru::LruCache;
use tracing::debug;

use kgpath_core::{Config, QueryTemplate};

use crate::compiled::CompiledQuery;
use crate::compiler::QueryCompiler;
use crate::error::CompileError;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(128) {
    Some(n) => n,
    None => unreachable!(),
};

/// LRU cache of compiled queries keyed by template fingerprint.
///
/// Compilation is deterministic, so a hit is indistinguishable from a fresh
/// compile. Failed compilations are never cached.
pub struct CachingCompiler {
    compiler: QueryCompiler,
    cache: Mutex<LruCache<String, Arc<CompiledQuery>>>,
}

impl CachingCompiler {
    pub fn new(compiler: QueryCompiler, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(FALLBACK_CAPACITY);
        Self {
            compiler,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Compiler settings and cache capacity from a loaded [`Config`].
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            QueryCompiler::new(config.compiler.clone()),
            config.executor.cache_capacity,
        )
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    pub fn compile(&self, template: &QueryTemplate) -> Result<Arc<CompiledQuery>, CompileError> {
        let key = template.fingerprint();

        if let Some(hit) = self.lock().get(&key) {
            debug!(fingerprint = %key, "compiled query cache hit");
            return Ok(Arc::clone(hit));
        }

        let compiled = Arc::new(self.compiler.compile(template)?);
        self.lock().put(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<CompiledQuery>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
