#![forbid(unsafe_code)]

//! Delay probing against a single candidate source.
//!
//! Runs an external latency-measurement tool (`ntpdate` in test mode) and parses
//! the delay samples it reports. A source may resolve to several addresses, each
//! contributing its own sample. Every failure mode short of a programming error
//! collapses to "no samples": one bad source must never fail a scoring pass.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Token that marks a delay-sample line in the probe tool's output.
const DELAY_MARKER: &str = "delay";

/// Per-attempt probe timeout in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: f64 = 0.2;

/// Run a command and return its stdout lines; all errors yield an empty list.
pub async fn run_cmd(program: &str, args: &[&str]) -> Vec<String> {
    let output = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(err) => {
            debug!(program, %err, "probe command could not be spawned");
            return Vec::new();
        }
    };
    if !output.status.success() {
        debug!(program, status = ?output.status, "probe command failed");
        return Vec::new();
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Extract delay samples from probe tool output.
///
/// A line whose first field is the delay marker contributes one sample: the
/// second field, with any trailing comma-separated annotation stripped. Values
/// that are not strictly positive and lines in any other format are skipped.
pub fn parse_delays<S: AsRef<str>>(lines: &[S]) -> Vec<f64> {
    let mut delays = Vec::new();
    for line in lines {
        let mut fields = line.as_ref().split_whitespace();
        if fields.next() != Some(DELAY_MARKER) {
            continue;
        }
        let Some(raw) = fields.next() else {
            continue;
        };
        let value = raw.split(',').next().unwrap_or(raw);
        if let Ok(delay) = value.parse::<f64>() {
            if delay > 0.0 {
                delays.push(delay);
            }
        }
    }
    delays
}

/// A latency probe against one source address.
#[async_trait]
pub trait DelayProbe: Send + Sync {
    /// Measure network delay to `source`. Unreachable or unparseable sources
    /// yield an empty vector, never an error.
    async fn measure(&self, source: &str) -> Vec<f64>;
}

/// Default probe: `ntpdate -d -t <timeout> <source>`.
#[derive(Debug, Clone)]
pub struct NtpdateProbe {
    pub timeout_secs: f64,
}

impl Default for NtpdateProbe {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
        }
    }
}

#[async_trait]
impl DelayProbe for NtpdateProbe {
    async fn measure(&self, source: &str) -> Vec<f64> {
        let timeout = format!("{}", self.timeout_secs);
        let lines = run_cmd("ntpdate", &["-d", "-t", &timeout, source]).await;
        parse_delays(&lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured from a real `ntpdate -d` run against a pool host.
    const NTPDATE_OUTPUT: &str = "\
reference time:    dda179ee.3ec34fdd  Mon, Oct 30 2017 20:14:06.245
originate timestamp: dda17a5b.af7c528b  Mon, Oct 30 2017 20:15:55.685
transmit timestamp:  dda17a5b.80b4dc04  Mon, Oct 30 2017 20:15:55.502
filter delay:  0.54126  0.36757  0.36655  0.36743
filter offset: 0.099523 0.012978 0.011831 0.011770
delay 0.36655, dispersion 0.01126
offset 0.011831

delay 0.36487, dispersion 0.00049
offset 0.013758

delay 0.28406, dispersion 0.00050
offset -0.008544

delay 0.37044, dispersion 0.00046
offset 0.013993

delay 0.36781, dispersion 0.00026
offset 0.014239

delay 0.36554, dispersion 0.00018
offset 0.012466
";

    #[test]
    fn parses_real_transcript() {
        let lines: Vec<&str> = NTPDATE_OUTPUT.lines().collect();
        assert_eq!(
            parse_delays(&lines),
            vec![0.36655, 0.36487, 0.28406, 0.37044, 0.36781, 0.36554]
        );
    }

    #[test]
    fn ignores_malformed_lines() {
        let lines = vec![
            "delay",                   // no value field
            "delay notanumber",        // unparseable
            "delays 0.5",              // wrong marker
            " delay 0.5",              // leading whitespace is fine
            "filter delay: 0.1 0.2",   // not a sample line
            "delay 0.25, extra stuff", // annotation stripped
        ];
        assert_eq!(parse_delays(&lines), vec![0.5, 0.25]);
    }

    #[test]
    fn filters_non_positive_delays() {
        let lines = vec!["delay 0.0", "delay -0.1", "delay 0.125"];
        assert_eq!(parse_delays(&lines), vec![0.125]);
    }

    #[test]
    fn empty_output_means_no_samples() {
        let lines: Vec<&str> = Vec::new();
        assert!(parse_delays(&lines).is_empty());
    }

    #[tokio::test]
    async fn missing_binary_yields_no_lines() {
        let lines = run_cmd("definitely-not-a-real-binary-xyz", &[]).await;
        assert!(lines.is_empty());
    }
}
