#![forbid(unsafe_code)]

//! NTP daemon implementation details.
//!
//! A closed set of supported implementations, each carrying its fixed paths and
//! service metadata. Config generation and service control live outside this
//! subsystem; callers only need to know which implementation they are driving.

use std::path::Path;

/// Supported NTP daemon implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NtpImplementation {
    Chronyd,
    Ntpd,
}

impl NtpImplementation {
    /// Select the implementation named in configuration, defaulting to chronyd.
    pub fn select(name: Option<&str>) -> Self {
        match name.map(str::to_ascii_lowercase).as_deref() {
            Some("ntp") | Some("ntpd") => Self::Ntpd,
            Some("chrony") | Some("chronyd") => Self::Chronyd,
            _ => Self::Chronyd,
        }
    }

    pub fn client_executable(self) -> &'static str {
        match self {
            Self::Chronyd => "/usr/bin/chronyc",
            Self::Ntpd => "/usr/bin/ntpq",
        }
    }

    pub fn config_file(self) -> &'static str {
        match self {
            Self::Chronyd => "/etc/chrony/chrony.conf",
            Self::Ntpd => "/etc/ntp.conf",
        }
    }

    pub fn service_name(self) -> &'static str {
        match self {
            Self::Chronyd => "chrony",
            Self::Ntpd => "ntp",
        }
    }

    pub fn package_name(self) -> &'static str {
        match self {
            Self::Chronyd => "chrony",
            Self::Ntpd => "ntp",
        }
    }

    pub fn packages_to_install(self) -> Vec<&'static str> {
        vec![self.package_name()]
    }

    /// Whether the implementation's client binary is present on this host.
    pub fn detect_presence(self) -> bool {
        Path::new(self.client_executable()).exists()
    }
}

/// External tools the scoring pipeline shells out to.
pub fn scoring_packages() -> [&'static str; 2] {
    ["facter", "ntpdate"]
}
