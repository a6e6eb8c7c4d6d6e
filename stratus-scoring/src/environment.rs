#![forbid(unsafe_code)]

//! Environment-aware score weighting.
//!
//! Two independent adjustments to the raw delay score: a multiplier derived from
//! the virtualization type (bare metal beats VMs; containers must not serve time
//! at all), and a divisor that grows for each class of competing time-sensitive
//! service running on the host.

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

use crate::probe::run_cmd;

/// Virtualization class of the local node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtType {
    Physical,
    Container,
    Vm,
}

impl VirtType {
    /// Classify the output of `facter virtual`: first field of the first
    /// non-empty line. Anything unrecognized is assumed to be a VM.
    pub fn from_output<S: AsRef<str>>(lines: &[S]) -> Self {
        for line in lines {
            let mut fields = line.as_ref().split_whitespace();
            if let Some(kind) = fields.next() {
                return match kind {
                    "physical" | "xen0" => Self::Physical,
                    "docker" | "lxc" | "openvz" => Self::Container,
                    _ => Self::Vm,
                };
            }
        }
        Self::Vm
    }

    /// Score multiplier. Containers return a negative value, which signals
    /// "skip scoring entirely": time sync should come from their host.
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Container => -1.0,
            Self::Physical => {
                debug!("running on physical host - score bump 25%");
                1.25
            }
            Self::Vm => {
                debug!("probably running in a VM - score bump 0%");
                1.0
            }
        }
    }
}

/// Virtualization-type detection collaborator.
#[async_trait]
pub trait VirtDetect: Send + Sync {
    async fn virt_type(&self) -> VirtType;
}

/// Default detector: shells out to `facter virtual`.
#[derive(Debug, Clone, Default)]
pub struct FacterVirt;

#[async_trait]
impl VirtDetect for FacterVirt {
    async fn virt_type(&self) -> VirtType {
        VirtType::from_output(&run_cmd("facter", &["virtual"]).await)
    }
}

/// Competing time-sensitive service classes. Each class counts at most once
/// toward the divisor, regardless of how many of its processes are running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceClass {
    /// nova-compute: high impact.
    Compute,
    /// ceph-osd: high impact.
    StorageOsd,
    /// other ceph daemons: moderate impact.
    Storage,
    /// swift: moderate impact.
    ObjectStore,
}

impl ServiceClass {
    pub const ALL: [ServiceClass; 4] = [
        ServiceClass::Compute,
        ServiceClass::StorageOsd,
        ServiceClass::Storage,
        ServiceClass::ObjectStore,
    ];

    pub fn weight(self) -> f64 {
        match self {
            Self::Compute | Self::StorageOsd => 1.25,
            Self::Storage | Self::ObjectStore => 1.1,
        }
    }

    /// Classify a process name. ceph-osd takes precedence over the generic
    /// ceph match, so an OSD process counts only as StorageOsd.
    pub fn classify(process_name: &str) -> Option<Self> {
        if process_name.starts_with("nova-compute") {
            Some(Self::Compute)
        } else if process_name.starts_with("ceph-osd") {
            Some(Self::StorageOsd)
        } else if process_name.starts_with("ceph-") {
            Some(Self::Storage)
        } else if process_name.starts_with("swift-") {
            Some(Self::ObjectStore)
        } else {
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum CensusError {
    #[error("process table unavailable: {0}")]
    Unavailable(String),
}

/// Running-process census collaborator.
pub trait ProcessCensus: Send + Sync {
    fn process_names(&self) -> Result<HashSet<String>, CensusError>;
}

/// Default census backed by `sysinfo`.
#[derive(Debug, Clone, Default)]
pub struct SysinfoCensus;

impl ProcessCensus for SysinfoCensus {
    fn process_names(&self) -> Result<HashSet<String>, CensusError> {
        let mut system = sysinfo::System::new();
        system.refresh_processes();
        let names: HashSet<String> = system
            .processes()
            .values()
            .map(|process| process.name().to_string())
            .collect();
        // at minimum this process itself must be visible
        if names.is_empty() {
            return Err(CensusError::Unavailable("no processes visible".into()));
        }
        Ok(names)
    }
}

/// Divisor assumed when the process census fails: the product of every known
/// class weight, so an unreadable host is never over-scored.
pub fn worst_case_divisor() -> f64 {
    ServiceClass::ALL.iter().map(|class| class.weight()).product()
}

/// Score divisor for the competing services running on this host.
pub fn package_divisor(census: &dyn ProcessCensus) -> f64 {
    let names = match census.process_names() {
        Ok(names) => names,
        Err(err) => {
            warn!(%err, "process census unavailable, assuming worst case");
            return worst_case_divisor();
        }
    };

    let mut running: HashSet<ServiceClass> = HashSet::new();
    for name in &names {
        if let Some(class) = ServiceClass::classify(name) {
            running.insert(class);
        }
    }

    let mut divisor = 1.0;
    for class in running {
        debug!(?class, weight = class.weight(), "competing service running");
        divisor *= class.weight();
    }
    divisor
}
