#![forbid(unsafe_code)]

//! Reduction of delay samples into suitability scores.
//!
//! The per-source score is `-ln(rms(delays))`: strictly decreasing in delay,
//! and large for low-delay sources. Mean and population standard deviation are
//! computed for diagnostic output only. A delay that is not strictly positive
//! is a domain error and fails loudly; it indicates an upstream parsing defect.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("delay must be strictly positive, got {0}")]
    NonPositiveDelay(f64),
}

/// Root mean square of the samples; NaN for an empty list.
pub fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mean_of_squares = values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64;
    mean_of_squares.sqrt()
}

/// Arithmetic mean; NaN for an empty list.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; NaN for an empty list.
pub fn pstdev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Score a single delay value. Under most sane NTP setups this lands between
/// 0 and 10, higher is better.
pub fn delay_score(delay: f64) -> Result<f64, ScoreError> {
    // NaN fails this comparison too
    if !(delay > 0.0) {
        return Err(ScoreError::NonPositiveDelay(delay));
    }
    Ok(-delay.ln())
}

/// Per-source reduction of a delay sample list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceStats {
    pub rms: f64,
    pub mean: f64,
    pub stdev: f64,
    pub score: f64,
}

impl SourceStats {
    /// Reduce one source's delay samples. An empty list contributes nothing
    /// (all-zero stats), it is not an error.
    pub fn from_delays(delays: &[f64]) -> Result<Self, ScoreError> {
        if delays.is_empty() {
            return Ok(Self {
                rms: 0.0,
                mean: 0.0,
                stdev: 0.0,
                score: 0.0,
            });
        }
        let rms = rms(delays);
        Ok(Self {
            rms,
            mean: mean(delays),
            stdev: pstdev(delays),
            score: delay_score(rms)?,
        })
    }
}

/// Cumulative score per host. Duplicate hosts sum their contributions.
pub fn host_scores(
    results: &[(String, Vec<f64>)],
) -> Result<std::collections::HashMap<String, f64>, ScoreError> {
    let mut scores: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    for (host, delays) in results {
        let stats = SourceStats::from_delays(delays)?;
        debug!(
            %host,
            score = stats.score,
            rms = stats.rms,
            mean = stats.mean,
            stdevp = stats.stdev,
            ?delays,
            "source scored"
        );
        *scores.entry(host.clone()).or_insert(0.0) += stats.score;
    }
    Ok(scores)
}

/// Raw score for a whole result set: the sum of all per-source scores.
pub fn raw_score(results: &[(String, Vec<f64>)]) -> Result<f64, ScoreError> {
    Ok(host_scores(results)?.values().sum())
}
