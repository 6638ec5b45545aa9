//! Errors that abort the process rather than a single strategy evaluation.
//!
//! [`judge_core::JudgeError`] covers per-strategy failures the scheduler
//! swallows and logs; this enum covers the ambient concerns around it —
//! configuration, the strategy snapshot fetch, and telemetry startup —
//! where failure means the process cannot run at all.

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("strategy snapshot fetch failed: {0}")]
    StrategyFetch(String),

    #[error("telemetry server failed to bind {addr}: {source}")]
    TelemetryBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}
