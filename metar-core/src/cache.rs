//! Time-to-live cache shared by the METAR and TAF fetchers.
//!
//! The cache itself only knows keys, JSON payloads and expiry instants; where
//! entries live is decided by a [`CacheStore`]. Expired entries are never swept,
//! they are detected (and dropped) when read.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{
    collections::HashMap,
    fmt::Debug,
    fs,
    path::PathBuf,
    sync::{Arc, Mutex},
};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::CacheKey;

/// Default lifetime of a cached report.
pub const DEFAULT_TTL_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache file I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache payload could not be (de)serialized")]
    Serde(#[from] serde_json::Error),

    #[error("cache store lock was poisoned")]
    Poisoned,
}

/// Stored value: payload plus absolute expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub payload: serde_json::Value,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Backing store for [`TtlCache`]. Every call must be atomic per key.
pub trait CacheStore: Send + Sync + Debug {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;
    fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError>;

    /// Drops the entry under `key` if it is no longer valid at `now`.
    ///
    /// Check and delete happen under one lock, so an entry written between a
    /// stale read and this call survives.
    fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), entry);
        Ok(())
    }

    fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        let expired = entries.get(key).is_some_and(|entry| !entry.is_valid_at(now));
        if expired {
            entries.remove(key);
        }
        Ok(expired)
    }
}

/// JSON file holding every entry; survives process restarts.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles on the file.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<HashMap<String, CacheEntry>, CacheError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_all(&self, entries: &HashMap<String, CacheEntry>) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(entries)?;
        fs::write(&self.path, json).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CacheStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(self.read_all()?.remove(key))
    }

    fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(CacheError::Serde(err)) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "cache file unreadable, starting over"
                );
                HashMap::new()
            }
            Err(err) => return Err(err),
        };
        entries.insert(key.to_string(), entry);
        self.write_all(&entries)
    }

    fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        let mut entries = self.read_all()?;
        let expired = entries.get(key).is_some_and(|entry| !entry.is_valid_at(now));
        if expired {
            entries.remove(key);
            self.write_all(&entries)?;
        }
        Ok(expired)
    }
}

#[derive(Debug, Clone)]
pub struct TtlCache {
    store: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(store: Arc<dyn CacheStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock))
    }

    /// Payload stored under `key`, unless it is missing, expired or unreadable.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let slot = key.to_string();

        let entry = match self.store.load(&slot) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                warn!(key = %slot, error = %err, "cache read failed, treating as miss");
                return None;
            }
        };

        let now = self.clock.now();
        if !entry.is_valid_at(now) {
            debug!(key = %slot, expired_at = %entry.expires_at, "cache entry expired");
            if let Err(err) = self.store.remove_expired(&slot, now) {
                warn!(key = %slot, error = %err, "failed to drop expired cache entry");
            }
            return None;
        }

        match serde_json::from_value(entry.payload) {
            Ok(payload) => Some(payload),
            Err(err) => {
                warn!(key = %slot, error = %err, "cached payload has unexpected shape");
                None
            }
        }
    }

    /// Store `payload` under `key` for `ttl` from now.
    pub fn set<T: Serialize>(&self, key: &CacheKey, payload: &T, ttl: Duration) {
        let slot = key.to_string();

        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(err) => {
                warn!(key = %slot, error = %err, "failed to serialize payload for cache");
                return;
            }
        };

        let entry = CacheEntry {
            payload,
            expires_at: self.clock.now() + ttl,
        };
        match self.store.store(&slot, entry) {
            Ok(()) => debug!(key = %slot, "cached payload"),
            Err(err) => warn!(key = %slot, error = %err, "cache write failed"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;
    use crate::model::{AirportCode, ResourceKind};
    use chrono::TimeZone;

    fn key(kind: ResourceKind, code: &str) -> CacheKey {
        CacheKey::new(kind, &AirportCode::parse(code).unwrap())
    }

    fn cache_with_clock(store: Arc<dyn CacheStore>) -> (TtlCache, Arc<ManualClock>) {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        (TtlCache::new(store, clock.clone()), clock)
    }

    #[test]
    fn round_trips_payload_before_expiry() {
        let (cache, clock) = cache_with_clock(Arc::new(MemoryStore::new()));
        let k = key(ResourceKind::Metar, "EHAM");
        let payload = serde_json::json!({ "icao": "EHAM", "wind": { "speed_kts": 12 } });

        cache.set(&k, &payload, Duration::minutes(DEFAULT_TTL_MINUTES));
        clock.advance(Duration::minutes(14));

        let read: Option<serde_json::Value> = cache.get(&k);
        assert_eq!(read, Some(payload));
    }

    #[test]
    fn entry_is_absent_after_ttl() {
        let store = Arc::new(MemoryStore::new());
        let (cache, clock) = cache_with_clock(store.clone());
        let k = key(ResourceKind::Metar, "EHAM");

        cache.set(&k, &"payload", Duration::minutes(DEFAULT_TTL_MINUTES));
        clock.advance(Duration::minutes(16));

        assert_eq!(cache.get::<String>(&k), None);
        // expired entries are dropped on read
        assert!(store.load(&k.to_string()).unwrap().is_none());
    }

    #[test]
    fn expiry_boundary_is_exclusive() {
        let (cache, clock) = cache_with_clock(Arc::new(MemoryStore::new()));
        let k = key(ResourceKind::Taf, "EGKK");

        cache.set(&k, &1u32, Duration::minutes(15));
        clock.advance(Duration::minutes(15));

        assert_eq!(cache.get::<u32>(&k), None);
    }

    #[test]
    fn kinds_do_not_share_slots() {
        let (cache, _clock) = cache_with_clock(Arc::new(MemoryStore::new()));
        let metar = key(ResourceKind::Metar, "EHAM");
        let taf = key(ResourceKind::Taf, "EHAM");

        cache.set(&metar, &"metar", Duration::minutes(15));
        assert_eq!(cache.get::<String>(&taf), None);

        cache.set(&taf, &"taf", Duration::minutes(15));
        assert_eq!(cache.get::<String>(&metar).as_deref(), Some("metar"));
        assert_eq!(cache.get::<String>(&taf).as_deref(), Some("taf"));
    }

    #[test]
    fn shape_mismatch_is_a_miss() {
        let (cache, _clock) = cache_with_clock(Arc::new(MemoryStore::new()));
        let k = key(ResourceKind::Metar, "EHAM");

        cache.set(&k, &"just a string", Duration::minutes(15));
        assert_eq!(cache.get::<Vec<u32>>(&k), None);
    }

    #[test]
    fn file_store_persists_between_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let k = key(ResourceKind::Taf, "LFPG");

        {
            let (cache, _clock) = cache_with_clock(Arc::new(FileStore::new(&path)));
            cache.set(&k, &vec![1, 2, 3], Duration::minutes(15));
        }

        let (cache, _clock) = cache_with_clock(Arc::new(FileStore::new(&path)));
        assert_eq!(cache.get::<Vec<i32>>(&k), Some(vec![1, 2, 3]));
    }

    #[test]
    fn corrupt_file_is_treated_as_miss() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();

        let (cache, _clock) = cache_with_clock(Arc::new(FileStore::new(&path)));
        assert_eq!(cache.get::<String>(&key(ResourceKind::Metar, "EHAM")), None);
    }

    #[test]
    fn corrupt_file_is_replaced_on_next_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, "{ not json").unwrap();
        let k = key(ResourceKind::Metar, "EHAM");

        let (cache, _clock) = cache_with_clock(Arc::new(FileStore::new(&path)));
        cache.set(&k, &"fresh", Duration::minutes(15));

        assert_eq!(cache.get::<String>(&k).as_deref(), Some("fresh"));
    }

    /// Store whose first read races with a write of a fresh entry.
    #[derive(Debug, Default)]
    struct RacingStore {
        inner: MemoryStore,
        pending: Mutex<Option<CacheEntry>>,
    }

    impl CacheStore for RacingStore {
        fn load(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
            let loaded = self.inner.load(key)?;
            if let Some(fresh) = self.pending.lock().unwrap().take() {
                self.inner.store(key, fresh)?;
            }
            Ok(loaded)
        }

        fn store(&self, key: &str, entry: CacheEntry) -> Result<(), CacheError> {
            self.inner.store(key, entry)
        }

        fn remove_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, CacheError> {
            self.inner.remove_expired(key, now)
        }
    }

    #[test]
    fn expired_read_keeps_entry_written_meanwhile() {
        let store = Arc::new(RacingStore::default());
        let (cache, clock) = cache_with_clock(store.clone());
        let k = key(ResourceKind::Metar, "EHAM");

        cache.set(&k, &"stale", Duration::minutes(15));
        clock.advance(Duration::minutes(16));
        *store.pending.lock().unwrap() = Some(CacheEntry {
            payload: serde_json::json!("fresh"),
            expires_at: clock.now() + Duration::minutes(15),
        });

        assert_eq!(cache.get::<String>(&k), None);
        assert_eq!(cache.get::<String>(&k).as_deref(), Some("fresh"));
    }

    #[test]
    fn remove_expired_leaves_valid_entries() {
        let store = MemoryStore::new();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let entry = CacheEntry {
            payload: serde_json::json!(1),
            expires_at: now + Duration::minutes(1),
        };
        store.store("METAR-EHAM", entry).unwrap();

        assert!(!store.remove_expired("METAR-EHAM", now).unwrap());
        let later = now + Duration::minutes(1);
        assert!(store.remove_expired("METAR-EHAM", later).unwrap());
        assert!(store.load("METAR-EHAM").unwrap().is_none());
    }
}
