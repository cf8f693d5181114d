//! Lazily-populated table of loaded model handles.
//!
//! Each model is loaded on first use and shared through an `Arc`, so a
//! request that is mid-inference keeps its session alive even if the table
//! is reloaded underneath it.

use super::traits::{ModelId, ModelStatus};
use crate::error::InferenceError;
use crate::events::{Event, EventSender, ModelEvent};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

/// Creates a model handle (e.g. an ONNX session) on demand
pub trait ModelLoader: Send + Sync {
    type Handle: Send + Sync;

    fn load(&self, model: ModelId) -> Result<Self::Handle, InferenceError>;
}

/// Process-wide handle table keyed by [`ModelId`]
pub struct ModelRegistry<L: ModelLoader> {
    loader: L,
    handles: RwLock<HashMap<ModelId, Arc<L::Handle>>>,
    failures: RwLock<HashMap<ModelId, String>>,
    events: Option<EventSender>,
}

impl<L: ModelLoader> ModelRegistry<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            handles: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            events: None,
        }
    }

    /// Report model loads on `events`
    pub fn with_events(mut self, events: EventSender) -> Self {
        self.events = Some(events);
        self
    }

    /// Return the handle for `model`, loading it if this is the first use
    pub fn get_or_load(&self, model: ModelId) -> Result<Arc<L::Handle>, InferenceError> {
        if let Some(handle) = self.read().get(&model) {
            return Ok(Arc::clone(handle));
        }

        let mut handles = self.write();
        // Another thread may have loaded it while we waited for the lock
        if let Some(handle) = handles.get(&model) {
            return Ok(Arc::clone(handle));
        }

        let handle = Arc::new(self.record(model, self.loader.load(model))?);
        handles.insert(model, Arc::clone(&handle));
        info!(%model, "model loaded");
        self.emit(ModelEvent::Loaded { model });

        Ok(handle)
    }

    /// Reload every model that is currently loaded.
    ///
    /// All replacements are loaded before any is swapped in, so a failed
    /// reload leaves the previous handles in place.
    pub fn reload_all(&self) -> Result<usize, InferenceError> {
        let mut handles = self.write();
        let models: Vec<ModelId> = handles.keys().copied().collect();

        let mut fresh = Vec::with_capacity(models.len());
        for model in &models {
            fresh.push((*model, Arc::new(self.record(*model, self.loader.load(*model))?)));
        }

        let count = fresh.len();
        for (model, handle) in fresh {
            handles.insert(model, handle);
            self.emit(ModelEvent::Reloaded { model });
        }
        info!(count, "models reloaded");

        Ok(count)
    }

    /// Drop the handle for `model`. Returns whether it was loaded.
    pub fn unload(&self, model: ModelId) -> bool {
        let removed = self.write().remove(&model).is_some();
        if removed {
            self.emit(ModelEvent::Unloaded { model });
        }
        removed
    }

    pub fn is_loaded(&self, model: ModelId) -> bool {
        self.read().contains_key(&model)
    }

    /// Currently loaded models, in a stable order
    pub fn loaded_models(&self) -> Vec<ModelId> {
        let mut models: Vec<ModelId> = self.read().keys().copied().collect();
        models.sort();
        models
    }

    /// Loaded models plus the last load error of each model that is not loaded
    pub fn status(&self) -> ModelStatus {
        let loaded = self.loaded_models();
        let mut failed: Vec<(ModelId, String)> = self
            .failures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|(model, _)| !loaded.contains(model))
            .map(|(model, reason)| (*model, reason.clone()))
            .collect();
        failed.sort_by_key(|(model, _)| *model);

        ModelStatus {
            total: ModelId::ALL.len(),
            loaded,
            failed,
        }
    }

    // Remember the outcome of a load so status can report it
    fn record(
        &self,
        model: ModelId,
        result: Result<L::Handle, InferenceError>,
    ) -> Result<L::Handle, InferenceError> {
        let mut failures = self.failures.write().unwrap_or_else(|e| e.into_inner());
        match &result {
            Ok(_) => {
                failures.remove(&model);
            }
            Err(e) => {
                warn!(%model, error = %e, "model load failed");
                failures.insert(model, e.to_string());
            }
        }
        result
    }

    fn emit(&self, event: ModelEvent) {
        if let Some(events) = &self.events {
            events.send(Event::Model(event));
        }
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so poisoning is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ModelId, Arc<L::Handle>>> {
        self.handles.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ModelId, Arc<L::Handle>>> {
        self.handles.write().unwrap_or_else(|e| e.into_inner())
    }
}
