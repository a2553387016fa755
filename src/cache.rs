use std::fmt::Write;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::{debug, warn};

/// Response cache shared by the HTTP collaborators. Misses are never errors.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: String, ttl: Duration);
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Display, EnumString, clap::ValueEnum)]
#[strum(serialize_all = "lowercase")]
pub enum CacheKind {
    Memory,
    Disk,
    None,
}

pub struct NoCache;

impl Cache for NoCache {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn put(&self, _key: &str, _value: String, _ttl: Duration) {}
}

#[derive(Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Instant,
}

pub struct MemoryCache {
    entries: quick_cache::sync::Cache<String, MemoryEntry>,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: quick_cache::sync::Cache::new(capacity),
        }
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if Instant::now() >= entry.expires_at {
            debug!("Memory cache entry {key} expired");
            return None;
        }
        Some(entry.value)
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(String::from(key), MemoryEntry { value, expires_at });
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    key: String,
    expires_at: DateTime<Utc>,
    value: String,
}

/// One JSON file per key under a directory. Survives restarts, unlike `MemoryCache`.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create cache dir {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Hex of the key bytes, so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        let file_name = key.bytes().fold(String::with_capacity(key.len() * 2), |mut acc, b| {
            let _ = write!(acc, "{b:02x}");
            acc
        });
        self.dir.join(format!("{file_name}.json"))
    }

    fn read(&self, key: &str) -> Result<Option<DiskEntry>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        let entry = serde_json::from_str::<DiskEntry>(&text)
            .with_context(|| format!("Corrupt cache file {}", path.display()))?;
        Ok(Some(entry))
    }

    fn write(&self, key: &str, entry: &DiskEntry) -> Result<()> {
        let path = self.path_for(key);
        fs::write(&path, serde_json::to_string(entry)?)
            .with_context(|| format!("Could not write cache file {}", path.display()))
    }
}

impl Cache for DiskCache {
    fn get(&self, key: &str) -> Option<String> {
        match self.read(key) {
            Ok(Some(entry)) if entry.key == key && Utc::now() < entry.expires_at => {
                Some(entry.value)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to load cache for {key}: {e:?}");
                None
            }
        }
    }

    fn put(&self, key: &str, value: String, ttl: Duration) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(1));
        let entry = DiskEntry {
            key: String::from(key),
            expires_at: Utc::now() + ttl,
            value,
        };
        if let Err(e) = self.write(key, &entry) {
            warn!("Failed to cache {key}: {e:?}");
        }
    }
}
