#![forbid(unsafe_code)]

//! Peer attribute exchange abstraction.
//!
//! The cluster-membership transport is an external collaborator; this module
//! only defines the relation/attribute primitive the role-selection protocol
//! consumes, plus helpers over it. Attribute values are strings on the wire.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Relation carrying peer score attributes.
pub const PEERS_RELATION: &str = "ntp-peers";

/// Relation naming an explicitly configured upstream.
pub const MASTER_RELATION: &str = "master";

/// Attribute under which a node publishes its suitability score.
pub const SCORE_ATTRIBUTE: &str = "score";

/// Attribute carrying a unit's reachable address.
pub const ADDRESS_ATTRIBUTE: &str = "private-address";

/// Generic relation/attribute exchange primitive.
#[async_trait]
pub trait PeerExchange: Send + Sync {
    /// Identifiers of all relations of the given name this node participates in.
    async fn relation_ids(&self, relation: &str) -> Vec<String>;

    /// Remote units visible on a relation.
    async fn units(&self, relation_id: &str) -> Vec<String>;

    /// Read one attribute a unit published on a relation.
    async fn get(&self, attribute: &str, unit: &str, relation_id: &str) -> Option<String>;

    /// Publish attribute values on a relation.
    async fn set(&self, relation_id: &str, values: HashMap<String, String>);
}

/// Collect `(address, attribute)` pairs from every unit on every relation of
/// the given name. Units without an address are skipped.
pub async fn relation_attributes(
    exchange: &dyn PeerExchange,
    relation: &str,
    attribute: &str,
) -> Vec<(String, Option<String>)> {
    let mut out = Vec::new();
    for relation_id in exchange.relation_ids(relation).await {
        for unit in exchange.units(&relation_id).await {
            let Some(address) = exchange.get(ADDRESS_ATTRIBUTE, &unit, &relation_id).await else {
                continue;
            };
            let value = exchange.get(attribute, &unit, &relation_id).await;
            out.push((address, value));
        }
    }
    out
}

/// Addresses of explicitly configured upstream units, if any.
pub async fn master_addresses(exchange: &dyn PeerExchange) -> Vec<String> {
    relation_attributes(exchange, MASTER_RELATION, ADDRESS_ATTRIBUTE)
        .await
        .into_iter()
        .map(|(address, _)| address)
        .collect()
}

/// In-memory exchange for embedders and tests.
///
/// Keyed as relation name -> relation id -> unit -> attribute map. Locally
/// published values are kept per relation id under a reserved local unit.
#[derive(Debug, Default)]
pub struct MemoryExchange {
    relations: RwLock<HashMap<String, Vec<String>>>,
    units: RwLock<HashMap<String, HashMap<String, HashMap<String, String>>>>,
    published: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl MemoryExchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a relation id under a relation name.
    pub async fn add_relation(&self, relation: &str, relation_id: &str) {
        self.relations
            .write()
            .await
            .entry(relation.to_owned())
            .or_default()
            .push(relation_id.to_owned());
    }

    /// Register a remote unit with its published attributes.
    pub async fn add_unit(
        &self,
        relation_id: &str,
        unit: &str,
        attributes: HashMap<String, String>,
    ) {
        self.units
            .write()
            .await
            .entry(relation_id.to_owned())
            .or_default()
            .insert(unit.to_owned(), attributes);
    }

    /// Values this node has published on a relation.
    pub async fn published(&self, relation_id: &str) -> Option<HashMap<String, String>> {
        self.published.read().await.get(relation_id).cloned()
    }
}

#[async_trait]
impl PeerExchange for MemoryExchange {
    async fn relation_ids(&self, relation: &str) -> Vec<String> {
        self.relations
            .read()
            .await
            .get(relation)
            .cloned()
            .unwrap_or_default()
    }

    async fn units(&self, relation_id: &str) -> Vec<String> {
        self.units
            .read()
            .await
            .get(relation_id)
            .map(|units| {
                let mut names: Vec<String> = units.keys().cloned().collect();
                names.sort();
                names
            })
            .unwrap_or_default()
    }

    async fn get(&self, attribute: &str, unit: &str, relation_id: &str) -> Option<String> {
        self.units
            .read()
            .await
            .get(relation_id)?
            .get(unit)?
            .get(attribute)
            .cloned()
    }

    async fn set(&self, relation_id: &str, values: HashMap<String, String>) {
        self.published
            .write()
            .await
            .entry(relation_id.to_owned())
            .or_default()
            .extend(values);
    }
}
