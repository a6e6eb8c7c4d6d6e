#![forbid(unsafe_code)]

//! Bounded worker pool for concurrent delay probes.
//!
//! Workers pull sources one at a time from a shared queue and push completed
//! `(source, delays)` pairs to a results channel. An empty queue is the stop
//! signal; the pool joins every worker before returning, so in-flight probes
//! always finish. Sources that yield no samples are omitted from the results.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use crate::probe::DelayProbe;

/// Default upper bound on concurrent probe workers.
pub const MAX_WORKERS: usize = 32;

#[derive(Debug, Clone)]
pub struct ProbePool {
    max_workers: usize,
}

impl Default for ProbePool {
    fn default() -> Self {
        Self {
            max_workers: MAX_WORKERS,
        }
    }
}

impl ProbePool {
    pub fn new(max_workers: usize) -> Self {
        Self {
            max_workers: max_workers.max(1),
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Probe every source, never more workers than sources. Results arrive in
    /// completion order, not submission order.
    pub async fn run(
        &self,
        probe: Arc<dyn DelayProbe>,
        sources: &[String],
    ) -> Vec<(String, Vec<f64>)> {
        if sources.is_empty() {
            return Vec::new();
        }

        let queue: Arc<Mutex<VecDeque<String>>> =
            Arc::new(Mutex::new(sources.iter().cloned().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let workers = sources.len().min(self.max_workers);
        let max_workers = self.max_workers as f64;

        let mut handles = Vec::with_capacity(workers);
        for index in 0..workers {
            let queue = Arc::clone(&queue);
            let probe = Arc::clone(&probe);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let source = queue.lock().await.pop_front();
                    let Some(source) = source else { break };

                    // lower-indexed workers sleep for a shorter time, on average
                    let jitter = rand::random::<f64>() * index as f64 / max_workers;
                    tokio::time::sleep(Duration::from_secs_f64(jitter)).await;

                    debug!(worker = index, %source, "probing source");
                    let delays = probe.measure(&source).await;
                    if !delays.is_empty() {
                        let _ = tx.send((source, delays));
                    }
                }
            }));
        }
        drop(tx);

        for handle in handles {
            let _ = handle.await;
        }

        let mut results = Vec::new();
        while let Ok(pair) = rx.try_recv() {
            results.push(pair);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProbe {
        delays: HashMap<String, Vec<f64>>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(delays: &[(&str, &[f64])]) -> Self {
            Self {
                delays: delays
                    .iter()
                    .map(|(host, d)| (host.to_string(), d.to_vec()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DelayProbe for FakeProbe {
        async fn measure(&self, source: &str) -> Vec<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.delays.get(source).cloned().unwrap_or_default()
        }
    }

    #[tokio::test]
    async fn empty_source_list_is_legal() {
        let probe = Arc::new(FakeProbe::new(&[]));
        let results = ProbePool::default().run(probe, &[]).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn unreachable_sources_are_absent_from_results() {
        let probe = Arc::new(FakeProbe::new(&[
            ("a.example.com", &[0.1, 0.2][..]),
            ("c.example.com", &[0.3][..]),
        ]));
        let sources: Vec<String> = ["a.example.com", "b.example.com", "c.example.com"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let results = ProbePool::new(2)
            .run(Arc::clone(&probe) as Arc<dyn DelayProbe>, &sources)
            .await;

        // every source was probed exactly once
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);
        // but only the ones with samples appear
        assert_eq!(results.len(), 2);
        let hosts: Vec<&str> = results.iter().map(|(h, _)| h.as_str()).collect();
        assert!(hosts.contains(&"a.example.com"));
        assert!(hosts.contains(&"c.example.com"));
        assert!(!hosts.contains(&"b.example.com"));
    }

    #[tokio::test]
    async fn more_sources_than_workers_still_drains_queue() {
        let entries: Vec<(String, Vec<f64>)> = (0..20)
            .map(|i| (format!("host{i}"), vec![0.05 + i as f64 * 0.01]))
            .collect();
        let probe = Arc::new(FakeProbe {
            delays: entries.iter().cloned().collect(),
            calls: AtomicUsize::new(0),
        });
        let sources: Vec<String> = entries.iter().map(|(h, _)| h.clone()).collect();

        let results = ProbePool::new(3)
            .run(Arc::clone(&probe) as Arc<dyn DelayProbe>, &sources)
            .await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 20);
        assert_eq!(results.len(), 20);
    }
}
