#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod implementation;
pub mod source;

pub use config::StratusConfig;
pub use error::{StratusError, StratusResult};
pub use implementation::NtpImplementation;
pub use source::{source_list, SourceEntry};
