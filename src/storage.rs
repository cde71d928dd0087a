//! Key-value storage port
//!
//! Persistent client state (pipeline configuration, the play-session timer)
//! goes through an injected [`KeyValueStore`] rather than ambient globals.
//! Two implementations are provided: an in-memory map for tests and embedding,
//! and a JSON file for the CLI.

use crate::error::ComputeError;
use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Storage key for the configured play duration (seconds)
pub const SESSION_DURATION_KEY: &str = "session_duration";

/// Storage key for the play-session start (epoch milliseconds)
pub const SESSION_START_KEY: &str = "session_start_time";

/// Shortest play session a caregiver can configure (seconds)
pub const MIN_SESSION_DURATION_SECS: u64 = 60;

/// String key-value persistence
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, ComputeError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), ComputeError>;
    fn remove(&mut self, key: &str) -> Result<(), ComputeError>;
}

/// In-memory store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ComputeError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ComputeError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), ComputeError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a single JSON object on disk.
///
/// The whole file is re-read on every access; it holds a handful of keys.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, ComputeError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| ComputeError::StorageError(format!("{}: {e}", self.path.display())))?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), ComputeError> {
        let json = serde_json::to_string_pretty(entries)
            .map_err(|e| ComputeError::EncodingError(e.to_string()))?;
        fs::write(&self.path, json)
            .map_err(|e| ComputeError::StorageError(format!("{}: {e}", self.path.display())))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ComputeError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), ComputeError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), ComputeError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Caregiver-limited play session for the child's games.
///
/// The duration and start instant survive restarts through the store.
#[derive(Debug)]
pub struct PlaySession<S: KeyValueStore> {
    store: S,
    duration_secs: u64,
    started_at: Option<DateTime<Utc>>,
}

impl<S: KeyValueStore> PlaySession<S> {
    /// Restore timer state from the store
    pub fn load(store: S) -> Result<Self, ComputeError> {
        let duration_secs = match store.get(SESSION_DURATION_KEY)? {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => secs.max(MIN_SESSION_DURATION_SECS),
                Err(_) => {
                    warn!(value = %raw, "Ignoring unparsable session duration");
                    MIN_SESSION_DURATION_SECS
                }
            },
            None => MIN_SESSION_DURATION_SECS,
        };

        let started_at = match store.get(SESSION_START_KEY)? {
            Some(raw) => {
                let parsed = raw
                    .trim()
                    .parse::<i64>()
                    .ok()
                    .and_then(DateTime::<Utc>::from_timestamp_millis);
                if parsed.is_none() {
                    warn!(value = %raw, "Ignoring unparsable session start");
                }
                parsed
            }
            None => None,
        };

        Ok(Self {
            store,
            duration_secs,
            started_at,
        })
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Change the play duration; values below the minimum are raised to it
    pub fn set_duration(&mut self, secs: u64) -> Result<(), ComputeError> {
        self.duration_secs = secs.max(MIN_SESSION_DURATION_SECS);
        self.store
            .set(SESSION_DURATION_KEY, &self.duration_secs.to_string())
    }

    /// Start the timer. Returns `false` if a session was already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<bool, ComputeError> {
        if self.started_at.is_some() {
            return Ok(false);
        }
        self.store
            .set(SESSION_START_KEY, &now.timestamp_millis().to_string())?;
        self.started_at = Some(now);
        Ok(true)
    }

    pub fn reset(&mut self) -> Result<(), ComputeError> {
        self.started_at = None;
        self.store.remove(SESSION_START_KEY)
    }

    /// Games stay unlocked until a started session runs out
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self.remaining(now) {
            Some(left) => left > Duration::zero(),
            None => true,
        }
    }

    /// Time left in a started session, never negative
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let started_at = self.started_at?;
        let secs = i64::try_from(self.duration_secs)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1000);
        let total = Duration::seconds(secs);
        let left = total - now.signed_duration_since(started_at);
        Some(left.max(Duration::zero()))
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
