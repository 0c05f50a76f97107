use super::{compilation::CompilationConfig, profiling::ProfilingConfig};
use std::path::Path;
use std::sync::Arc;

/// Loaded lazily by [GlobalConfig::get] unless [GlobalConfig::set] ran first.
static TILEMM_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Default log file used when `TILEMM_DEBUG_LOG` is set to `1` or `true`.
const DEFAULT_LOG_FILE: &str = "/tmp/tilemm.log";

/// Process-wide settings: compiler options and the kernel loggers.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration for kernel compilation.
    #[serde(default)]
    pub compilation: CompilationConfig,

    /// Configuration for profiling timed executions.
    #[serde(default)]
    pub profiling: ProfilingConfig,
}

impl GlobalConfig {
    /// The active configuration.
    ///
    /// The first call looks for `tilemm.toml` (or `Tilemm.toml`) in the working directory and its
    /// ancestors, falls back to the defaults, then applies [GlobalConfig::override_from_env].
    pub fn get() -> Arc<Self> {
        let mut state = TILEMM_GLOBAL_CONFIG.lock();
        if let Some(config) = state.as_ref() {
            return config.clone();
        }

        let config = Arc::new(Self::from_current_dir().override_from_env());
        *state = Some(config.clone());

        config
    }

    /// Install the configuration used by the whole process.
    ///
    /// # Panics
    ///
    /// When a configuration was already installed or loaded by [GlobalConfig::get].
    pub fn set(config: Self) {
        let mut state = TILEMM_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("The tilemm configuration is already initialized");
        }
        *state = Some(Arc::new(config));
    }

    /// Write the active configuration as TOML, a convenient starting point for a `tilemm.toml`.
    pub fn save_default<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Apply the debug environment variables on top of the configuration.
    ///
    /// - `TILEMM_DEBUG_LOG`: `stdout`, `stderr`, `1`/`true` (log to `/tmp/tilemm.log`),
    ///   `0`/`false` (disable everything) or any other value as a file path.
    /// - `TILEMM_DEBUG_OPTION`: `debug` (compilation and full profiling) or `profile`
    ///   (basic profiling only).
    pub fn override_from_env(mut self) -> Self {
        use super::{compilation::CompilationLogLevel, profiling::ProfilingLogLevel};

        if let Ok(target) = std::env::var("TILEMM_DEBUG_LOG") {
            let enabled = !matches!(target.as_str(), "0" | "false");

            self.compilation.logger.level = match enabled {
                true => CompilationLogLevel::Full,
                false => CompilationLogLevel::Disabled,
            };
            self.profiling.logger.level = match enabled {
                true => ProfilingLogLevel::Basic,
                false => ProfilingLogLevel::Disabled,
            };

            let (stdout, stderr, file) = match target.as_str() {
                "stdout" => (true, false, None),
                "stderr" => (false, true, None),
                "1" | "true" => (false, false, Some(DEFAULT_LOG_FILE)),
                "0" | "false" => (false, false, None),
                path => (false, false, Some(path)),
            };
            self.compilation.logger.stdout |= stdout;
            self.profiling.logger.stdout |= stdout;
            self.compilation.logger.stderr |= stderr;
            self.profiling.logger.stderr |= stderr;
            if let Some(file) = file {
                self.compilation.logger.file = Some(file.into());
                self.profiling.logger.file = Some(file.into());
            }
        }

        match std::env::var("TILEMM_DEBUG_OPTION").as_deref() {
            Ok("debug") => {
                self.compilation.logger.level = CompilationLogLevel::Full;
                self.profiling.logger.level = ProfilingLogLevel::Full;
            }
            Ok("profile") => self.profiling.logger.level = ProfilingLogLevel::Basic,
            _ => {}
        }

        self
    }

    /// Parse a TOML configuration file. Missing sections take their default values.
    pub fn from_file_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    // Malformed files are reported and skipped.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            for name in ["tilemm.toml", "Tilemm.toml"] {
                let path = dir.join(name);
                if !path.is_file() {
                    continue;
                }
                match Self::from_file_path(&path) {
                    Ok(config) => return config,
                    Err(err) => log::warn!("Ignoring config file {}: {err}", path.display()),
                }
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{compilation::CompilationLogLevel, profiling::ProfilingLogLevel};
    use serial_test::serial;

    #[test]
    fn parses_partial_file() {
        let path = std::env::temp_dir().join("tilemm-parses-partial-file.toml");
        std::fs::write(
            &path,
            r#"
[compilation.logger]
level = "full"
stderr = true

[compilation.options]
use_fast_math = true
gpu-architecture = "sm_80"
"#,
        )
        .unwrap();

        let config = GlobalConfig::from_file_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(matches!(
            config.compilation.logger.level,
            CompilationLogLevel::Full
        ));
        assert!(config.compilation.logger.stderr);
        assert_eq!(config.compilation.options.len(), 2);
        assert_eq!(config.profiling.logger.level, ProfilingLogLevel::Disabled);
    }

    #[test]
    fn malformed_file_is_an_io_error() {
        let path = std::env::temp_dir().join("tilemm-malformed-file.toml");
        std::fs::write(&path, "[compilation\nlevel = ").unwrap();

        let err = GlobalConfig::from_file_path(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    #[serial]
    fn env_debug_log_stdout_enables_both_loggers() {
        std::env::set_var("TILEMM_DEBUG_LOG", "stdout");
        let config = GlobalConfig::default().override_from_env();
        std::env::remove_var("TILEMM_DEBUG_LOG");

        assert!(config.compilation.logger.stdout);
        assert!(config.profiling.logger.stdout);
        assert!(matches!(
            config.compilation.logger.level,
            CompilationLogLevel::Full
        ));
        assert_eq!(config.profiling.logger.level, ProfilingLogLevel::Basic);
    }

    #[test]
    #[serial]
    fn env_debug_log_false_disables_logging() {
        std::env::set_var("TILEMM_DEBUG_LOG", "false");
        let config = GlobalConfig::default().override_from_env();
        std::env::remove_var("TILEMM_DEBUG_LOG");

        assert!(matches!(
            config.compilation.logger.level,
            CompilationLogLevel::Disabled
        ));
        assert_eq!(config.profiling.logger.level, ProfilingLogLevel::Disabled);
    }

    #[test]
    #[serial]
    fn env_debug_option_profile_only_touches_profiling() {
        std::env::set_var("TILEMM_DEBUG_OPTION", "profile");
        let config = GlobalConfig::default().override_from_env();
        std::env::remove_var("TILEMM_DEBUG_OPTION");

        assert!(matches!(
            config.compilation.logger.level,
            CompilationLogLevel::Disabled
        ));
        assert_eq!(config.profiling.logger.level, ProfilingLogLevel::Basic);
    }
}
