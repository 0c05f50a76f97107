use core::fmt::Display;

use crate::compiler::CompileOptions;
use crate::config::{
    compilation::CompilationLogLevel, profiling::ProfilingLogLevel, GlobalConfig, Logger,
};
use crate::server::LaunchGeometry;

static KERNEL_LOGGER: spin::Mutex<Option<KernelLogger>> = spin::Mutex::new(None);

/// Run a closure with the process-wide kernel logger.
///
/// The logger is created from [GlobalConfig::get] on first use.
pub fn with_kernel_logger<O>(func: impl FnOnce(&mut KernelLogger) -> O) -> O {
    let mut state = KERNEL_LOGGER.lock();
    let logger = state.get_or_insert_with(KernelLogger::new);
    func(logger)
}

/// Logger for kernel compilations and timed executions.
#[derive(Debug)]
pub struct KernelLogger {
    kind: DebugLoggerKind,
}

#[derive(Debug)]
enum DebugLoggerKind {
    Activated {
        logger: Logger,
        compilation: bool,
        profiling: Option<ProfilingLogLevel>,
    },
    None,
}

impl Default for KernelLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelLogger {
    /// Create a kernel logger from the global configuration.
    pub fn new() -> Self {
        Self::from_logger(Logger::new())
    }

    /// Create a kernel logger from an explicit configuration.
    pub fn from_config(config: std::sync::Arc<GlobalConfig>) -> Self {
        Self::from_logger(Logger::from_config(config))
    }

    fn from_logger(logger: Logger) -> Self {
        let compilation = matches!(logger.log_level_compilation(), CompilationLogLevel::Full);
        let profiling = match logger.log_level_profiling() {
            ProfilingLogLevel::Disabled => None,
            level => Some(level),
        };

        if !compilation && profiling.is_none() {
            return Self {
                kind: DebugLoggerKind::None,
            };
        }

        Self {
            kind: DebugLoggerKind::Activated {
                logger,
                compilation,
                profiling,
            },
        }
    }

    /// Returns true if compilation info should be logged.
    pub fn compilation_activated(&self) -> bool {
        matches!(
            self.kind,
            DebugLoggerKind::Activated {
                compilation: true,
                ..
            }
        )
    }

    /// Returns the profile level, none if profiling is deactivated.
    pub fn profile_level(&self) -> Option<ProfilingLogLevel> {
        match &self.kind {
            DebugLoggerKind::Activated { profiling, .. } => *profiling,
            DebugLoggerKind::None => None,
        }
    }

    /// Log a generated source and the options it is compiled with.
    pub fn log_compilation<N: Display>(
        &mut self,
        name: N,
        source: &str,
        options: &CompileOptions,
    ) {
        if let DebugLoggerKind::Activated {
            logger,
            compilation: true,
            ..
        } = &mut self.kind
        {
            logger.log_compilation(&format!(
                "[Compiling kernel] {name}\n[Options] {options}\n{source}"
            ));
        }
    }

    /// Register a timed execution.
    pub fn register_profiled<N: Display>(
        &mut self,
        name: N,
        elapsed_ms: f64,
        geometry: &LaunchGeometry,
    ) {
        let DebugLoggerKind::Activated {
            logger,
            profiling: Some(level),
            ..
        } = &mut self.kind
        else {
            return;
        };

        match level {
            ProfilingLogLevel::Full => {
                logger.log_profiling(&format!("| {elapsed_ms:<10.4} ms | {name} | {geometry}"))
            }
            _ => logger.log_profiling(&format!("| {elapsed_ms:<10.4} ms | {name}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{CubeCount, CubeDim};
    use std::sync::Arc;

    fn geometry() -> LaunchGeometry {
        LaunchGeometry {
            cube_dim: CubeDim::new(8, 8, 1),
            cube_count: CubeCount::new(2, 2, 1),
        }
    }

    fn read_log(name: &str, config: impl FnOnce(&mut GlobalConfig, std::path::PathBuf)) -> String {
        let path = std::env::temp_dir().join(name);
        let mut global = GlobalConfig::default();
        config(&mut global, path.clone());

        let mut logger = KernelLogger::from_config(Arc::new(global));
        let options = CompileOptions::default().flag("use_fast_math");
        logger.log_compilation("f64-tw8-rolled", "__global__ void matmul() {}", &options);
        logger.register_profiled("f64-tw8-rolled", 1.5, &geometry());
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap_or_default();
        std::fs::remove_file(&path).ok();
        content
    }

    #[test]
    fn disabled_config_deactivates_logger() {
        let logger = KernelLogger::from_config(Arc::new(GlobalConfig::default()));

        assert!(!logger.compilation_activated());
        assert_eq!(logger.profile_level(), None);
    }

    #[test]
    fn compilation_only_skips_profiling() {
        let content = read_log("tilemm-compilation-only.log", |config, path| {
            config.compilation.logger.level = CompilationLogLevel::Full;
            config.compilation.logger.file = Some(path);
            config.compilation.logger.append = false;
        });

        assert_eq!(
            content,
            "[Compiling kernel] f64-tw8-rolled\n[Options] --use_fast_math\n__global__ void matmul() {}\n"
        );
    }

    #[test]
    fn full_profiling_includes_geometry() {
        let content = read_log("tilemm-full-profiling.log", |config, path| {
            config.profiling.logger.level = ProfilingLogLevel::Full;
            config.profiling.logger.file = Some(path);
            config.profiling.logger.append = false;
        });

        assert!(!content.contains("[Compiling kernel]"));
        assert!(content.contains("f64-tw8-rolled | grid=(2, 2, 1) block=(8, 8, 1)"));
    }
}
