//! Persistence of the favorite city names.
//!
//! Favorites live under a single key as a JSON array of strings. Every write
//! replaces the whole array.

use anyhow::{Context, Result, anyhow};
use std::{collections::HashMap, fs, io::Write, path::PathBuf, sync::Mutex};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Key under which the favorite names are stored.
pub const FAVORITES_KEY: &str = "weatherAppFavorites";

/// Durable string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read store file: {}", path.display()))?;
        Ok(Some(contents))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir).with_context(|| {
            format!("Failed to create data directory: {}", self.dir.display())
        })?;

        // Uniquely named temp file beside the target, then renamed over it.
        let path = self.key_path(key);
        let mut tmp = NamedTempFile::new_in(&self.dir).with_context(|| {
            format!("Failed to create temp file in: {}", self.dir.display())
        })?;

        tmp.write_all(value.as_bytes())
            .with_context(|| format!("Failed to write temp file: {}", tmp.path().display()))?;
        tmp.persist(&path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace store file: {}", path.display()))?;

        Ok(())
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| anyhow!("Memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Ordered, case-insensitively unique list of favorite city names.
#[derive(Debug)]
pub struct FavoritesStore<S> {
    store: S,
}

impl<S: KeyValueStore> FavoritesStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Stored names in insertion order. Missing or malformed data reads as empty.
    pub fn list_favorites(&self) -> Vec<String> {
        let raw = match self.store.get(FAVORITES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                warn!(error = %err, "Could not read favorites; treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => names,
            Err(err) => {
                warn!(error = %err, "Stored favorites are not a JSON string array; treating as empty");
                Vec::new()
            }
        }
    }

    /// Append `name` unless an equal name (ignoring case) is already stored.
    /// Returns whether it was newly added.
    pub fn add(&self, name: &str) -> Result<bool> {
        let mut favorites = self.list_favorites();
        let normalized = name.to_lowercase();

        if favorites.iter().any(|f| f.to_lowercase() == normalized) {
            debug!(city = %name, "Favorite already present");
            return Ok(false);
        }

        favorites.push(name.to_string());
        self.save(&favorites)?;
        debug!(city = %name, count = favorites.len(), "Favorite added");
        Ok(true)
    }

    /// Remove every name equal to `name` ignoring case. Absent names are not an error.
    pub fn remove(&self, name: &str) -> Result<()> {
        let normalized = name.to_lowercase();
        let favorites: Vec<String> = self
            .list_favorites()
            .into_iter()
            .filter(|f| f.to_lowercase() != normalized)
            .collect();

        self.save(&favorites)?;
        debug!(city = %name, count = favorites.len(), "Favorite removed");
        Ok(())
    }

    fn save(&self, favorites: &[String]) -> Result<()> {
        let json = serde_json::to_string(favorites).context("Failed to serialize favorites")?;
        self.store.set(FAVORITES_KEY, &json)
    }
}
