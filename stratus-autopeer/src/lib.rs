#![forbid(unsafe_code)]

//! Distributed auto-peer role selection.
//!
//! Each node publishes its locally computed suitability score to its peers,
//! reads the scores its peers have published, and decides independently whether
//! it should act as an upstream time source or synchronize from better-ranked
//! peers. Decisions are made from a local snapshot; transient disagreement
//! across the cluster is expected and resolves as attribute data propagates.

pub mod exchange;
pub mod plan;
pub mod selector;

pub use exchange::{
    master_addresses, relation_attributes, MemoryExchange, PeerExchange, ADDRESS_ATTRIBUTE,
    MASTER_RELATION, PEERS_RELATION, SCORE_ATTRIBUTE,
};
pub use plan::{source_plan, SourcePlan};
pub use selector::{PeerEntry, PeerSelector, Role, DEFAULT_TOP_N};
