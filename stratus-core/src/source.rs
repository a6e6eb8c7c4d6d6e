#![forbid(unsafe_code)]

//! Source list entries handed to the NTP daemon configuration layer.

use serde::Serialize;

/// One server, peer, or pool entry with its convergence flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceEntry {
    pub name: String,
    pub iburst: bool,
}

impl SourceEntry {
    pub fn new(name: impl Into<String>, iburst: bool) -> Self {
        Self {
            name: name.into(),
            iburst,
        }
    }

    /// The flag string rendered into daemon configuration.
    pub fn iburst_flag(&self) -> &'static str {
        if self.iburst {
            "iburst"
        } else {
            ""
        }
    }
}

/// Build source entries from a whitespace-separated host string.
pub fn source_list(hosts: &str, iburst: bool) -> Vec<SourceEntry> {
    hosts
        .split_whitespace()
        .map(|name| SourceEntry::new(name, iburst))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_flags() {
        let entries = source_list("a.example.com  b.example.com", true);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.example.com");
        assert_eq!(entries[0].iburst_flag(), "iburst");

        let entries = source_list("c.example.com", false);
        assert_eq!(entries[0].iburst_flag(), "");
    }

    #[test]
    fn empty_string_yields_no_entries() {
        assert!(source_list("", true).is_empty());
        assert!(source_list("   ", true).is_empty());
    }
}
