use super::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Missing controller region (set --region or 'region' in config).")]
    MissingRegion,
    #[error("Invalid region: {source}")]
    InvalidRegion {
        #[source]
        source: ValidationError,
    },
    #[error("Invalid duration for '{field}': {source}")]
    InvalidDuration {
        field: &'static str,
        #[source]
        source: ValidationError,
    },
    #[error("Invalid agent listen address '{value}': {source}")]
    InvalidListenAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error(
        "Request TTL ({ttl_ms}ms) must be longer than the drain interval ({drain_ms}ms) so requests survive one drain."
    )]
    RequestTtlTooShort { ttl_ms: u128, drain_ms: u128 },
    #[error(
        "Region TTL ({ttl_ms}ms) must be longer than the region announce interval ({announce_ms}ms) so live regions never lapse between announcements."
    )]
    RegionTtlTooShort { ttl_ms: u128, announce_ms: u128 },
    #[error("Config 'max_agents_per_console' must be >= 1.")]
    MaxAgentsPerConsoleZero,
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
