#![forbid(unsafe_code)]

//! Score computation and cache orchestration.
//!
//! `Scorer` owns every collaborator the pipeline needs: the delay probe, the
//! virtualization detector, the process census, and the persistence store.
//! There is no ambient global state; a node process constructs exactly one
//! `Scorer` and a single scoring pass is in flight at a time.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{ScoreRecord, ScoreStore, SkipReason, StoreError};
use crate::environment::{package_divisor, ProcessCensus, VirtDetect};
use crate::pool::ProbePool;
use crate::probe::DelayProbe;
use crate::stats::{raw_score, ScoreError};

/// Store key for the node's score record.
pub const SCORE_KEY: &str = "ntp_score";

/// Default maximum score age before recomputation.
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(86_400);

/// Maximum age used by periodic status reporting (roughly monthly).
pub const STATUS_MAX_AGE: Duration = Duration::from_secs(31 * 86_400);

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Error)]
pub enum ScorerError {
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Inputs that gate and shape a scoring pass.
#[derive(Debug, Clone)]
pub struct ScoringPolicy {
    /// An explicit upstream/master relationship is configured.
    pub master_configured: bool,
    /// Auto-peering is enabled.
    pub auto_peers: bool,
    /// Combined configured source + peer + pool list.
    pub host_list: Vec<String>,
    /// Upper bound on concurrent probe workers.
    pub max_workers: usize,
}

impl ScoringPolicy {
    pub fn from_config(config: &stratus_core::StratusConfig, master_configured: bool) -> Self {
        Self {
            master_configured,
            auto_peers: config.auto_peers,
            host_list: config.host_list(),
            max_workers: config.max_probe_workers,
        }
    }
}

/// Owner of the probe → aggregate → weight pipeline and its cached result.
pub struct Scorer {
    policy: ScoringPolicy,
    probe: Arc<dyn DelayProbe>,
    virt: Box<dyn VirtDetect>,
    census: Box<dyn ProcessCensus>,
    store: Box<dyn ScoreStore>,
}

impl Scorer {
    pub fn new(
        policy: ScoringPolicy,
        probe: Arc<dyn DelayProbe>,
        virt: Box<dyn VirtDetect>,
        census: Box<dyn ProcessCensus>,
        store: Box<dyn ScoreStore>,
    ) -> Self {
        Self {
            policy,
            probe,
            virt,
            census,
            store,
        }
    }

    /// Construct with the production collaborators and an in-memory store.
    pub fn with_defaults(policy: ScoringPolicy) -> Self {
        Self::new(
            policy,
            Arc::new(crate::probe::NtpdateProbe::default()),
            Box::new(crate::environment::FacterVirt),
            Box::new(crate::environment::SysinfoCensus),
            Box::new(crate::cache::MemoryStore::new()),
        )
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Compute a fresh score record at `now`, honoring the skip-condition
    /// ordering: master relation, container, auto-peers disabled, no sources.
    pub async fn compute_score(&self, now: u64) -> Result<ScoreRecord, ScorerError> {
        if self.policy.master_configured {
            info!("master relation configured - skipped scoring");
            return Ok(ScoreRecord::skip(SkipReason::MasterConfigured, 0.0, now));
        }

        let multiplier = self.virt.virt_type().await.multiplier();
        if multiplier <= 0.0 {
            info!("running in a container - skipped scoring");
            return Ok(ScoreRecord::skip(SkipReason::Container, multiplier, now));
        }

        if !self.policy.auto_peers {
            info!("auto_peers is disabled - skipped scoring");
            return Ok(ScoreRecord::skip(
                SkipReason::AutoPeersDisabled,
                multiplier,
                now,
            ));
        }

        if self.policy.host_list.is_empty() {
            info!("no sources configured - skipped scoring");
            return Ok(ScoreRecord::skip(SkipReason::NoSources, multiplier, now));
        }

        let divisor = package_divisor(self.census.as_ref());
        let pool = ProbePool::new(self.policy.max_workers);
        let results = pool.run(Arc::clone(&self.probe), &self.policy.host_list).await;
        let raw = raw_score(&results)?;
        let score = raw * multiplier / divisor;
        info!(score, raw, multiplier, divisor, "suitability score computed");

        Ok(ScoreRecord {
            raw: Some(raw),
            multiplier,
            divisor,
            score,
            time: now,
            host_list: self.policy.host_list.clone(),
            skip_reason: None,
        })
    }

    /// Return the cached record while it is at most `max_age` old; otherwise
    /// recompute, persist, and return the fresh record.
    pub async fn get_score(&self, max_age: Duration) -> Result<ScoreRecord, ScorerError> {
        self.get_score_at(max_age, unix_now()).await
    }

    /// `get_score` with an explicit notion of "now", for callers that manage
    /// their own clock.
    pub async fn get_score_at(
        &self,
        max_age: Duration,
        now: u64,
    ) -> Result<ScoreRecord, ScorerError> {
        if let Some(record) = self.store.load(SCORE_KEY)? {
            if now.saturating_sub(record.time) <= max_age.as_secs() {
                debug!(age = now.saturating_sub(record.time), "serving cached score");
                return Ok(record);
            }
        }

        let record = self.compute_score(now).await?;
        self.store.store(SCORE_KEY, &record)?;
        debug!(score = record.score, time = record.time, "saved score record");
        Ok(record)
    }
}
