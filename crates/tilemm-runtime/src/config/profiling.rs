use super::logger::{LogLevel, LoggerConfig};

/// Profiling settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ProfilingConfig {
    /// Logger used for timed kernel executions.
    #[serde(default)]
    pub logger: LoggerConfig<ProfilingLogLevel>,
}

/// Log levels for profiling.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProfilingLogLevel {
    /// Profiling logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Only the elapsed time of each timed execution is logged.
    #[serde(rename = "basic")]
    Basic,

    /// Elapsed time plus the launch geometry of each timed execution.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for ProfilingLogLevel {}
