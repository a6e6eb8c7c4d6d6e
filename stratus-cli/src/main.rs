#![forbid(unsafe_code)]

//! Operator diagnostic tool: score a list of NTP sources.
//!
//! Probes every host with the same bounded worker pool the scoring subsystem
//! uses and prints each host's cumulative score, sorted descending, so an
//! operator can compare candidate sources by hand. Scores are raw delay scores;
//! environment weighting is not applied here.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use stratus_scoring::{host_scores, NtpdateProbe, ProbePool, SourceStats, MAX_WORKERS};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Display per-source scoring detail
    #[arg(short, long)]
    verbose: bool,

    /// Maximum concurrent probe workers
    #[arg(short, long, default_value_t = MAX_WORKERS)]
    workers: usize,

    /// Probe timeout per attempt, in seconds
    #[arg(short, long, default_value_t = 0.2)]
    timeout: f64,

    /// Hosts to check
    #[arg(required = true)]
    hosts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let probe = Arc::new(NtpdateProbe {
        timeout_secs: cli.timeout,
    });
    let pool = ProbePool::new(cli.workers);
    let results = pool.run(probe, &cli.hosts).await;

    if cli.verbose {
        for (host, delays) in &results {
            let stats = SourceStats::from_delays(delays)?;
            let delay_strings: Vec<String> = delays.iter().map(f64::to_string).collect();
            println!(
                "{} score={:.3} rms={:.3} mean={:.3} stdevp={:.3} [{}]",
                host,
                stats.score,
                stats.rms,
                stats.mean,
                stats.stdev,
                delay_strings.join(", ")
            );
        }
    }

    let scores = host_scores(&results)?;
    let mut ranked: Vec<(&String, &f64)> = scores.iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap_or(std::cmp::Ordering::Equal));
    for (host, score) in ranked {
        println!("{host} {score:.3}");
    }

    Ok(())
}
