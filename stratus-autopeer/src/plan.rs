#![forbid(unsafe_code)]

//! Applying a role decision to the configured source lists.
//!
//! An upstream node (or one with no decision) keeps its configured servers,
//! pools, and peers. A client node discards all of them and uses exactly the
//! elected peer addresses as its server list.

use stratus_core::{source_list, SourceEntry, StratusConfig};

use crate::selector::Role;

/// The effective source lists handed to the daemon configuration layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePlan {
    pub servers: Vec<SourceEntry>,
    pub pools: Vec<SourceEntry>,
    pub peers: Vec<SourceEntry>,
}

impl SourcePlan {
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty() && self.pools.is_empty() && self.peers.is_empty()
    }
}

/// Build the effective source plan for a role decision. `None` means the
/// decision was deferred and static configuration stays in effect.
pub fn source_plan(config: &StratusConfig, role: Option<&Role>) -> SourcePlan {
    match role {
        Some(Role::Client(upstreams)) => SourcePlan {
            servers: upstreams
                .iter()
                .map(|address| SourceEntry::new(address, config.use_iburst))
                .collect(),
            pools: Vec::new(),
            peers: Vec::new(),
        },
        Some(Role::Upstream) | None => SourcePlan {
            servers: source_list(&config.source, config.use_iburst),
            pools: source_list(&config.pools, config.use_iburst),
            peers: source_list(&config.peers, config.use_iburst),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StratusConfig {
        StratusConfig {
            source: "s1.example.com s2.example.com".into(),
            pools: "pool.example.com".into(),
            peers: "peer.example.com".into(),
            use_iburst: true,
            ..StratusConfig::default()
        }
    }

    #[test]
    fn upstream_keeps_configured_lists() {
        let plan = source_plan(&config(), Some(&Role::Upstream));
        assert_eq!(plan.servers.len(), 2);
        assert_eq!(plan.pools.len(), 1);
        assert_eq!(plan.peers.len(), 1);
        assert!(plan.servers.iter().all(|entry| entry.iburst));
    }

    #[test]
    fn deferred_decision_keeps_configured_lists() {
        assert_eq!(
            source_plan(&config(), None),
            source_plan(&config(), Some(&Role::Upstream))
        );
    }

    #[test]
    fn client_overrides_everything() {
        let role = Role::Client(vec!["10.0.0.1".into(), "10.0.0.2".into()]);
        let plan = source_plan(&config(), Some(&role));

        assert_eq!(plan.servers.len(), 2);
        assert_eq!(plan.servers[0].name, "10.0.0.1");
        assert!(plan.servers[0].iburst);
        assert!(plan.pools.is_empty());
        assert!(plan.peers.is_empty());
    }

    #[test]
    fn iburst_flag_follows_config() {
        let mut cfg = config();
        cfg.use_iburst = false;
        let role = Role::Client(vec!["10.0.0.1".into()]);
        let plan = source_plan(&cfg, Some(&role));
        assert!(!plan.servers[0].iburst);
        assert_eq!(plan.servers[0].iburst_flag(), "");
    }

    #[test]
    fn empty_config_yields_empty_plan() {
        let plan = source_plan(&StratusConfig::default(), None);
        assert!(plan.is_empty());
    }
}
