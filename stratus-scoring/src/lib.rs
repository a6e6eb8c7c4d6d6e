#![forbid(unsafe_code)]

//! NTP source suitability scoring.
//!
//! This crate measures network delay to a list of candidate time sources with a
//! bounded pool of concurrent probes, reduces the samples to a single comparable
//! suitability score, weights it by the node's environment (virtualization type,
//! competing services), and caches the result until it goes stale.

pub mod cache;
pub mod environment;
pub mod pool;
pub mod probe;
pub mod scorer;
pub mod stats;

pub use cache::{
    JsonFileStore, MemoryStore, ScoreRecord, ScoreStore, SkipReason, StoreError, SKIP_SCORE,
};
pub use environment::{
    package_divisor, worst_case_divisor, CensusError, FacterVirt, ProcessCensus, ServiceClass,
    SysinfoCensus, VirtDetect, VirtType,
};
pub use pool::{ProbePool, MAX_WORKERS};
pub use probe::{parse_delays, run_cmd, DelayProbe, NtpdateProbe, DEFAULT_PROBE_TIMEOUT_SECS};
pub use scorer::{
    unix_now, Scorer, ScorerError, ScoringPolicy, DEFAULT_MAX_AGE, SCORE_KEY, STATUS_MAX_AGE,
};
pub use stats::{delay_score, host_scores, mean, pstdev, raw_score, rms, ScoreError, SourceStats};
