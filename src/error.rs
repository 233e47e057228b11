//! Error types for the edge back gesture

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("input monitor registration failed: {0}")]
    MonitorRegistration(String),

    #[error("exclusion listener error: {0}")]
    ExclusionListener(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
