use super::logger::{BinaryLogLevel, LoggerConfig};
use crate::compiler::CompileOptions;

/// Compilation settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct CompilationConfig {
    /// Logger used to dump generated sources and the flags they were compiled with.
    #[serde(default)]
    pub logger: LoggerConfig<CompilationLogLevel>,

    /// Toolchain options used when the caller doesn't provide its own.
    ///
    /// ```toml
    /// [compilation.options]
    /// use_fast_math = true
    /// gpu-architecture = "sm_80"
    /// ```
    #[serde(default)]
    pub options: CompileOptions,
}

/// Log level for compilation.
pub type CompilationLogLevel = BinaryLogLevel;
