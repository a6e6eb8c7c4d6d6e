#![forbid(unsafe_code)]

//! Persisted suitability score records.
//!
//! A record either carries a real measurement (`raw` set) or a skip sentinel.
//! Skip records rank a node last and are never treated as a real measurement
//! when comparing peers. Only the `score` field is ever shared with peers; the
//! record itself is owned exclusively by the local node.

use chrono::{Local, TimeZone};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Sentinel score for skip records; low enough to rank last among real scores.
pub const SKIP_SCORE: f64 = -999.0;

/// Why scoring was skipped instead of measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// An explicit upstream/master relationship is configured.
    MasterConfigured,
    /// The node is a container; time sync should come from its host.
    Container,
    /// Auto-peering is disabled in configuration.
    AutoPeersDisabled,
    /// The combined source/peer/pool list is empty.
    NoSources,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MasterConfigured => "explicit-upstream-configured",
            Self::Container => "container",
            Self::AutoPeersDisabled => "auto-peers-disabled",
            Self::NoSources => "no-sources",
        };
        f.write_str(name)
    }
}

/// The most recently computed suitability score, with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Unweighted sum of per-source scores. `None` for skip records.
    pub raw: Option<f64>,
    pub multiplier: f64,
    pub divisor: f64,
    /// `raw * multiplier / divisor`, or the skip sentinel.
    pub score: f64,
    /// Unix seconds at computation time.
    pub time: u64,
    #[serde(default)]
    pub host_list: Vec<String>,
    #[serde(default)]
    pub skip_reason: Option<SkipReason>,
}

impl ScoreRecord {
    /// A sentinel record for a skipped scoring pass.
    pub fn skip(reason: SkipReason, multiplier: f64, now: u64) -> Self {
        Self {
            raw: None,
            multiplier,
            divisor: 1.0,
            score: SKIP_SCORE,
            time: now,
            host_list: Vec::new(),
            skip_reason: Some(reason),
        }
    }

    /// Skip records carry no real measurement.
    pub fn is_skip(&self) -> bool {
        self.raw.is_none()
    }

    /// Human-readable status summary; `None` for skip records.
    pub fn summary(&self) -> Option<String> {
        self.raw?;
        let when = Local.timestamp_opt(self.time as i64, 0).single()?;
        Some(format!(
            "score {:.3} ({:.1}) at {}",
            self.score,
            self.multiplier / self.divisor,
            when.format("%c")
        ))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("record serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Local key-value persistence for score records. No cross-process
/// coordination: the record is owned by this node's process.
pub trait ScoreStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError>;
    fn store(&self, key: &str, record: &ScoreRecord) -> Result<(), StoreError>;
}

/// In-memory store, mostly for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, ScoreRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScoreStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn store(&self, key: &str, record: &ScoreRecord) -> Result<(), StoreError> {
        self.records.write().insert(key.to_owned(), record.clone());
        Ok(())
    }
}

/// One JSON file per key under a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl ScoreStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<ScoreRecord>, StoreError> {
        match std::fs::read_to_string(self.path(key)) {
            Ok(data) => Ok(Some(serde_json::from_str(&data)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn store(&self, key: &str, record: &ScoreRecord) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let data = serde_json::to_string_pretty(record)?;
        std::fs::write(self.path(key), data)?;
        Ok(())
    }
}
