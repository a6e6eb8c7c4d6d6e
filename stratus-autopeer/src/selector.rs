#![forbid(unsafe_code)]

//! Role selection against the visible peer set.
//!
//! Run on every event that could change the ranking: configuration change,
//! peer joined, changed, or departed. A `None` decision means "no role change";
//! the caller keeps whatever static configuration is in effect.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use stratus_scoring::ScoreRecord;

use crate::exchange::{relation_attributes, PeerExchange, PEERS_RELATION, SCORE_ATTRIBUTE};

/// Default number of best-ranked peers that qualify as upstream.
pub const DEFAULT_TOP_N: usize = 6;

/// A peer's published score; transient, discarded after each decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerEntry {
    pub address: String,
    pub score: f64,
}

/// The local node's role in the peer cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Serve time from the locally configured sources, pools, and peers.
    Upstream,
    /// Synchronize from these better-ranked peer addresses instead.
    Client(Vec<String>),
}

pub struct PeerSelector {
    exchange: Arc<dyn PeerExchange>,
    top_n: usize,
}

impl PeerSelector {
    pub fn new(exchange: Arc<dyn PeerExchange>, top_n: Option<usize>) -> Self {
        Self {
            exchange,
            top_n: top_n.unwrap_or(DEFAULT_TOP_N),
        }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Publish the local score to every peer relation. Skip records are never
    /// published: their sentinel score must not leak into peer ranking.
    pub async fn publish_score(&self, record: &ScoreRecord) {
        if record.is_skip() {
            debug!(reason = ?record.skip_reason, "skip record is not published to peers");
            return;
        }
        let mut values = HashMap::new();
        values.insert(SCORE_ATTRIBUTE.to_owned(), record.score.to_string());
        for relation_id in self.exchange.relation_ids(PEERS_RELATION).await {
            debug!(%relation_id, score = record.score, "publishing score");
            self.exchange.set(&relation_id, values.clone()).await;
        }
    }

    /// Peers that have published a parseable score.
    pub async fn visible_peers(&self) -> Vec<PeerEntry> {
        let mut peers = Vec::new();
        for (address, value) in
            relation_attributes(self.exchange.as_ref(), PEERS_RELATION, SCORE_ATTRIBUTE).await
        {
            let Some(raw) = value else { continue };
            match raw.parse::<f64>() {
                Ok(score) => peers.push(PeerEntry { address, score }),
                Err(err) => warn!(%address, %raw, %err, "ignoring unparseable peer score"),
            }
        }
        peers
    }

    /// Decide the local node's role from the currently visible peer scores.
    ///
    /// `None` when no decision can be made: the local record is a skip record,
    /// or fewer peers than top-N are visible. Ties in score keep the order the
    /// peers were observed in (stable sort); simultaneous identical scores are
    /// an accepted nondeterminism.
    pub async fn select_role(&self, record: &ScoreRecord) -> Option<Role> {
        if record.is_skip() {
            info!(reason = ?record.skip_reason, "no usable local score; auto-peering not possible");
            return None;
        }

        let peers = self.visible_peers().await;
        if peers.len() < self.top_n {
            info!(
                peers = peers.len(),
                top_n = self.top_n,
                "not enough peers for auto-peering"
            );
            return None;
        }

        let better = peers.iter().filter(|p| p.score > record.score).count();
        info!(
            better,
            top_n = self.top_n,
            local_score = record.score,
            "peers ranked above local score"
        );

        if better < self.top_n {
            return Some(Role::Upstream);
        }

        let mut ranked = peers;
        ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        let upstreams: Vec<String> = ranked
            .into_iter()
            .take(self.top_n)
            .map(|p| p.address)
            .collect();
        Some(Role::Client(upstreams))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{MemoryExchange, ADDRESS_ATTRIBUTE};
    use stratus_scoring::{ScoreRecord, SkipReason};

    fn record(score: f64) -> ScoreRecord {
        ScoreRecord {
            raw: Some(score),
            multiplier: 1.0,
            divisor: 1.0,
            score,
            time: 0,
            host_list: vec!["cfg.example.com".into()],
            skip_reason: None,
        }
    }

    async fn exchange_with_peers(scores: &[f64]) -> Arc<MemoryExchange> {
        let exchange = Arc::new(MemoryExchange::new());
        exchange.add_relation(PEERS_RELATION, "ntp-peers:0").await;
        for (i, score) in scores.iter().enumerate() {
            let mut attrs = HashMap::new();
            attrs.insert(ADDRESS_ATTRIBUTE.to_string(), format!("10.0.0.{}", i + 1));
            attrs.insert(SCORE_ATTRIBUTE.to_string(), score.to_string());
            exchange
                .add_unit("ntp-peers:0", &format!("ntp/{i}"), attrs)
                .await;
        }
        exchange
    }

    #[tokio::test]
    async fn too_few_peers_defers_the_decision() {
        let exchange = exchange_with_peers(&[10.0, 8.0, 6.0, 4.0, 2.0]).await;
        let selector = PeerSelector::new(exchange, None);
        assert_eq!(selector.select_role(&record(5.0)).await, None);
    }

    #[tokio::test]
    async fn within_top_n_elects_upstream() {
        let exchange = exchange_with_peers(&[10.0, 8.0, 6.0, 4.0, 2.0, 1.0]).await;
        let selector = PeerSelector::new(exchange, None);
        // three peers better than us, top-N is six: we are in the top six
        assert_eq!(
            selector.select_role(&record(5.0)).await,
            Some(Role::Upstream)
        );
    }

    #[tokio::test]
    async fn outside_top_n_becomes_client_of_ranked_peers() {
        let exchange = exchange_with_peers(&[10.0, 8.0, 6.0, 4.0, 2.0, 1.0]).await;
        let selector = PeerSelector::new(exchange, None);

        let role = selector.select_role(&record(0.5)).await;
        let Some(Role::Client(upstreams)) = role else {
            panic!("expected client role, got {role:?}");
        };
        // all six peer addresses, descending by score
        assert_eq!(
            upstreams,
            vec![
                "10.0.0.1", "10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5", "10.0.0.6"
            ]
        );
    }

    #[tokio::test]
    async fn skip_record_aborts_the_decision() {
        let exchange = exchange_with_peers(&[10.0, 8.0, 6.0, 4.0, 2.0, 1.0]).await;
        let selector = PeerSelector::new(exchange, None);
        let skip = ScoreRecord::skip(SkipReason::Container, -1.0, 0);
        assert_eq!(selector.select_role(&skip).await, None);
    }

    #[tokio::test]
    async fn unparseable_scores_are_not_visible_peers() {
        let exchange = exchange_with_peers(&[10.0, 8.0]).await;
        let mut attrs = HashMap::new();
        attrs.insert(ADDRESS_ATTRIBUTE.to_string(), "10.0.0.99".to_string());
        attrs.insert(SCORE_ATTRIBUTE.to_string(), "not-a-number".to_string());
        exchange.add_unit("ntp-peers:0", "ntp/99", attrs).await;

        let selector = PeerSelector::new(exchange, Some(3));
        let peers = selector.visible_peers().await;
        assert_eq!(peers.len(), 2);
        // two parseable peers < top_n of three: no decision
        assert_eq!(selector.select_role(&record(1.0)).await, None);
    }

    #[tokio::test]
    async fn smaller_top_n_promotes_clients_sooner() {
        let exchange = exchange_with_peers(&[10.0, 8.0, 6.0]).await;
        let selector = PeerSelector::new(exchange, Some(2));

        let role = selector.select_role(&record(5.0)).await;
        let Some(Role::Client(upstreams)) = role else {
            panic!("expected client role, got {role:?}");
        };
        assert_eq!(upstreams, vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test]
    async fn publishes_real_scores_to_every_peer_relation() {
        let exchange = Arc::new(MemoryExchange::new());
        exchange.add_relation(PEERS_RELATION, "ntp-peers:0").await;
        exchange.add_relation(PEERS_RELATION, "ntp-peers:1").await;

        let selector = PeerSelector::new(Arc::clone(&exchange) as Arc<dyn PeerExchange>, None);
        selector.publish_score(&record(4.25)).await;

        for relation_id in ["ntp-peers:0", "ntp-peers:1"] {
            let published = exchange.published(relation_id).await.unwrap();
            assert_eq!(published.get(SCORE_ATTRIBUTE), Some(&"4.25".to_string()));
        }
    }

    #[tokio::test]
    async fn never_publishes_skip_sentinels() {
        let exchange = Arc::new(MemoryExchange::new());
        exchange.add_relation(PEERS_RELATION, "ntp-peers:0").await;

        let selector = PeerSelector::new(Arc::clone(&exchange) as Arc<dyn PeerExchange>, None);
        let skip = ScoreRecord::skip(SkipReason::AutoPeersDisabled, 1.0, 0);
        selector.publish_score(&skip).await;

        assert!(exchange.published("ntp-peers:0").await.is_none());
    }
}
