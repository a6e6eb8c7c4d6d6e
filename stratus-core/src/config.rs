#![forbid(unsafe_code)]

//! Stratus configuration handling. Parses a TOML file into a strongly-typed structure.
//! The source/peer/pool lists keep the whitespace-separated string form used by the
//! deployment tooling that feeds this subsystem.

use serde::Deserialize;
use std::{fs, path::Path};

use crate::StratusError;

/// Primary configuration structure shared across Stratus components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StratusConfig {
    /// Whitespace-separated NTP servers to use as upstream sources.
    pub source: String,

    /// Whitespace-separated NTP peers.
    pub peers: String,

    /// Whitespace-separated NTP pools.
    pub pools: String,

    /// Enable score-based automatic upstream/client role selection.
    pub auto_peers: bool,

    /// Number of best-ranked peers that qualify as upstream. `None` uses the default (6).
    pub auto_peers_upstream: Option<usize>,

    /// Pass the iburst flag to sources for faster convergence.
    pub use_iburst: bool,

    /// Orphan stratum for isolated operation, when set.
    pub orphan_stratum: Option<u8>,

    /// Explicit NTP implementation selection (`ntp` or `chrony`).
    pub ntp_package: Option<String>,

    /// Maximum age of a cached suitability score before recomputation.
    pub max_score_age_secs: u64,

    /// Upper bound on concurrent delay probes.
    pub max_probe_workers: usize,

    /// Logging verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,
}

impl Default for StratusConfig {
    fn default() -> Self {
        Self {
            source: String::new(),
            peers: String::new(),
            pools: String::new(),
            auto_peers: false,
            auto_peers_upstream: None,
            use_iburst: true,
            orphan_stratum: None,
            ntp_package: None,
            max_score_age_secs: 86_400,
            max_probe_workers: 32,
            log_level: Some("info".to_string()),
        }
    }
}

impl StratusConfig {
    /// Load a configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::StratusResult<Self> {
        let data = fs::read_to_string(&path).map_err(StratusError::from)?;
        let cfg = toml::from_str::<StratusConfig>(&data).map_err(StratusError::ConfigParse)?;
        Ok(cfg)
    }

    /// Combined source + peer + pool host list used for scoring probes.
    pub fn host_list(&self) -> Vec<String> {
        self.source
            .split_whitespace()
            .chain(self.peers.split_whitespace())
            .chain(self.pools.split_whitespace())
            .map(str::to_owned)
            .collect()
    }
}
