//! Atlas - owns the world for a play session.
//!
//! The game loop holds one [`Atlas`]. Each merge runs to completion on the
//! caller's thread: merge, relax the layout around the current place, then
//! persist the whole world.

use rand::rngs::ThreadRng;
use rand::Rng;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use world_graph::{Facts, PlaceId, World};

use crate::config::MapConfig;
use crate::layout::LayoutEngine;
use crate::merger::{merge_facts, MergeReport};
use crate::persist::{MapStore, PersistError, Storage};

/// Errors surfaced by an [`Atlas`].
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("failed to persist world: {0}")]
    Persist(#[from] PersistError),

    #[error("fact extraction failed: {0}")]
    Extraction(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Turns a scene description into a raw facts payload.
///
/// Implemented by whatever talks to the generative backend. The payload is
/// untrusted; the atlas sanitizes it before merging.
pub trait FactExtractor {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `known_places` lists the names already on the map so the extractor can
    /// reuse their ids.
    fn extract(&mut self, scene: &str, known_places: &[String]) -> Result<Value, Self::Error>;
}

/// The world map for one session, with its layout, storage and randomness.
pub struct Atlas<S: Storage, R: Rng = ThreadRng> {
    world: World,
    config: MapConfig,
    layout: LayoutEngine,
    store: MapStore<S>,
    rng: R,
}

impl<S: Storage + std::fmt::Debug, R: Rng> std::fmt::Debug for Atlas<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Atlas")
            .field("places", &self.world.place_count())
            .field("relations", &self.world.relation_count())
            .field("store", &self.store)
            .finish()
    }
}

impl<S: Storage> Atlas<S, ThreadRng> {
    /// Restore the saved world (or start empty) using thread-local randomness.
    pub fn open(storage: S, config: MapConfig) -> Self {
        Self::with_rng(storage, config, rand::thread_rng())
    }
}

impl<S: Storage, R: Rng> Atlas<S, R> {
    /// Restore the saved world with an explicit random source.
    pub fn with_rng(storage: S, config: MapConfig, rng: R) -> Self {
        let store = MapStore::new(storage, config.storage.key.clone());
        let world = store.load();
        info!(
            places = world.place_count(),
            relations = world.relation_count(),
            "atlas opened"
        );
        Self {
            world,
            layout: LayoutEngine::new(config.layout.clone()),
            config,
            store,
            rng,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn store(&self) -> &MapStore<S> {
        &self.store
    }

    /// Merge a sanitized batch, re-layout, and persist.
    ///
    /// Bad entries never fail the call. The only error is a failed write, in
    /// which case the in-memory world is already updated.
    pub fn merge_facts(&mut self, facts: &Facts) -> Result<MergeReport, AtlasError> {
        let report = merge_facts(&mut self.world, facts);
        self.layout.relax(&mut self.world, &mut self.rng);
        self.store.save(&self.world)?;
        info!(
            added = report.places_added,
            enriched = report.places_enriched,
            relations = report.relations_added,
            current = report.current_place.as_ref().map(PlaceId::as_str),
            "merged facts"
        );
        Ok(report)
    }

    /// Sanitize an untyped payload with the configured limits, then merge.
    pub fn merge_value(&mut self, payload: &Value) -> Result<MergeReport, AtlasError> {
        let facts = Facts::from_value(payload, &self.config.limits);
        self.merge_facts(&facts)
    }

    /// Parse, sanitize and merge a JSON payload. Text that is not JSON merges
    /// as an empty batch.
    pub fn merge_json(&mut self, text: &str) -> Result<MergeReport, AtlasError> {
        let facts = Facts::parse(text, &self.config.limits).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unparsable facts payload");
            Facts::default()
        });
        self.merge_facts(&facts)
    }

    /// Ask `extractor` what `scene` says about the map and merge the answer.
    /// An extractor failure leaves the world untouched.
    pub fn ingest_scene<E: FactExtractor>(
        &mut self,
        extractor: &mut E,
        scene: &str,
    ) -> Result<MergeReport, AtlasError> {
        let known = self.world.known_place_names();
        let payload = extractor
            .extract(scene, &known)
            .map_err(|e| AtlasError::Extraction(Box::new(e)))?;
        self.merge_value(&payload)
    }

    /// Make the place with this name current. Unknown names change nothing.
    pub fn set_current_place_by_name(
        &mut self,
        name: &str,
    ) -> Result<Option<PlaceId>, AtlasError> {
        let id = self.world.set_current_place_by_name(name);
        if id.is_some() {
            self.store.save(&self.world)?;
        }
        Ok(id)
    }

    /// Forget the whole map and persist the empty world.
    pub fn clear_all(&mut self) -> Result<(), AtlasError> {
        self.world = self.store.clear_all()?;
        info!("atlas cleared");
        Ok(())
    }
}
