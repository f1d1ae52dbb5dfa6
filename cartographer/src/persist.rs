//! World persistence for save/load across sessions.
//!
//! The whole world is written as one JSON blob into a key/value slot after
//! every mutation. Reading is forgiving: a missing, unreadable or corrupt
//! slot restores as an empty world instead of failing.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use world_graph::World;

/// Slot the world is stored under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "adventure_map";

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A durable string key/value slot.
pub trait Storage {
    /// Read a slot; `Ok(None)` if it was never written.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError>;
}

/// In-process storage. Lives as long as the value does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        self.slots.insert(key.to_string(), value);
        Ok(())
    }
}

/// One `<key>.json` file per slot under a directory.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a slot. Key characters other than alphanumerics and `-`
    /// become `_`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        let sanitized: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{sanitized}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Writes a sibling `.tmp` file and renames it over the slot, so an
    /// interrupted write leaves the previous save intact.
    fn set(&mut self, key: &str, value: String) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// Saves and restores a [`World`] in one storage slot.
#[derive(Debug, Clone)]
pub struct MapStore<S: Storage> {
    storage: S,
    key: String,
}

impl<S: Storage> MapStore<S> {
    pub fn new(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Overwrite the slot with the whole world.
    pub fn save(&mut self, world: &World) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(world)?;
        self.storage.set(&self.key, content)?;
        Ok(())
    }

    /// Restore the saved world, or an empty one if there is nothing usable.
    pub fn load(&self) -> World {
        let content = match self.storage.get(&self.key) {
            Ok(Some(content)) => content,
            Ok(None) => return World::new(),
            Err(e) => {
                warn!(key = %self.key, error = %e, "could not read saved world, starting empty");
                return World::new();
            }
        };
        match serde_json::from_str::<World>(&content) {
            Ok(world) => {
                info!(
                    key = %self.key,
                    places = world.place_count(),
                    relations = world.relation_count(),
                    "restored saved world"
                );
                world
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "saved world is corrupt, starting empty");
                World::new()
            }
        }
    }

    /// Persist an empty world and return it.
    pub fn clear_all(&mut self) -> Result<World, PersistError> {
        let world = World::new();
        self.save(&world)?;
        Ok(world)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_graph::{PlaceFact, PlaceId, Relation, RelationType};

    fn sample_world() -> World {
        let mut world = World::new();
        world.upsert_place(&PlaceFact::named("Dock").with_tag("wet"));
        world.upsert_place(&PlaceFact::named("Inn"));
        world.add_relation(Relation::new("dock", "inn", RelationType::Road));
        world.place_mut(&PlaceId::from("dock")).unwrap().set_position(0.2, 0.8);
        world.mark_visited(&PlaceId::from("dock"));
        world
    }

    #[test]
    fn test_save_and_load() {
        let mut store = MapStore::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        let world = sample_world();
        store.save(&world).unwrap();

        assert_eq!(store.load(), world);
    }

    #[test]
    fn test_load_missing_slot_is_empty() {
        let store = MapStore::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_load_corrupt_slot_is_empty() {
        let mut storage = MemoryStorage::new();
        storage.set(DEFAULT_STORAGE_KEY, "{not json".to_string()).unwrap();
        let store = MapStore::new(storage, DEFAULT_STORAGE_KEY);
        assert!(store.load().is_empty());

        let mut storage = MemoryStorage::new();
        storage.set(DEFAULT_STORAGE_KEY, "null".to_string()).unwrap();
        let store = MapStore::new(storage, DEFAULT_STORAGE_KEY);
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_overwrites_whole_state() {
        let mut store = MapStore::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        store.save(&sample_world()).unwrap();
        store.save(&World::new()).unwrap();

        let raw = store.storage().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"places": {}, "relations": []}));
    }

    #[test]
    fn test_clear_all_persists_empty_world() {
        let mut store = MapStore::new(MemoryStorage::new(), DEFAULT_STORAGE_KEY);
        store.save(&sample_world()).unwrap();

        let cleared = store.clear_all().unwrap();
        assert!(cleared.is_empty());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_file_storage_replaces_slot_without_leftovers() {
        let dir = std::env::temp_dir().join(format!("wayfinder-persist-{}", uuid::Uuid::new_v4()));
        let mut storage = FileStorage::new(&dir);
        storage.set(DEFAULT_STORAGE_KEY, "first".to_string()).unwrap();
        storage.set(DEFAULT_STORAGE_KEY, "second".to_string()).unwrap();

        assert_eq!(
            storage.get(DEFAULT_STORAGE_KEY).unwrap().as_deref(),
            Some("second")
        );
        let files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(files, vec![std::ffi::OsString::from("adventure_map.json")]);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_file_storage_path_sanitizes_key() {
        let storage = FileStorage::new("/tmp/maps");
        assert_eq!(
            storage.path_for("adventure map/1"),
            PathBuf::from("/tmp/maps/adventure_map_1.json")
        );
    }
}
