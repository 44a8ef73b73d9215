//! Explicitly owned pool of local recognition engines.
//!
//! Engines are expensive to construct and safe to share read-only, so one
//! instance per configuration is created lazily and reused across requests.
//! The pool is built once and handed to the orchestrator; it is never a
//! module-level global.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use super::types::TextRecognizer;
use super::ExtractionError;

/// Configuration identifying one engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineKey {
    pub model: String,
    pub languages: Vec<String>,
}

impl EngineKey {
    pub fn new(model: &str, languages: &[&str]) -> Self {
        Self {
            model: model.to_string(),
            languages: languages.iter().map(|l| l.to_string()).collect(),
        }
    }
}

type EngineFactory =
    dyn Fn(&EngineKey) -> Result<Arc<dyn TextRecognizer>, ExtractionError> + Send + Sync;

/// Cache hit/miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub hits: usize,
    pub misses: usize,
    pub engines: usize,
}

pub struct EnginePool {
    engines: RwLock<HashMap<EngineKey, Arc<dyn TextRecognizer>>>,
    factory: Box<EngineFactory>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl EnginePool {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&EngineKey) -> Result<Arc<dyn TextRecognizer>, ExtractionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            engines: RwLock::new(HashMap::new()),
            factory: Box::new(factory),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Shared engine for `key`, created on first use.
    pub fn get_or_create(
        &self,
        key: &EngineKey,
    ) -> Result<Arc<dyn TextRecognizer>, ExtractionError> {
        {
            let engines = self.engines.read().map_err(|_| ExtractionError::LockPoisoned)?;
            if let Some(engine) = engines.get(key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Ok(Arc::clone(engine));
            }
        }

        let mut engines = self.engines.write().map_err(|_| ExtractionError::LockPoisoned)?;
        // Another request may have created it between the two locks.
        if let Some(engine) = engines.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(engine));
        }

        let engine = (self.factory)(key)?;
        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::info!(
            model = %key.model,
            languages = ?key.languages,
            "Local recognition engine created"
        );
        engines.insert(key.clone(), Arc::clone(&engine));
        Ok(engine)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            engines: self.engines.read().map(|e| e.len()).unwrap_or(0),
        }
    }

    /// Drop every cached engine.
    pub fn clear(&self) -> Result<(), ExtractionError> {
        self.engines
            .write()
            .map_err(|_| ExtractionError::LockPoisoned)?
            .clear();
        Ok(())
    }
}
