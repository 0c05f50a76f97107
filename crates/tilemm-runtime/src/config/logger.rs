use super::GlobalConfig;
use crate::config::{compilation::CompilationLogLevel, profiling::ProfilingLogLevel};
use core::fmt::Display;
use hashbrown::HashMap;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Where and how verbosely one category of kernel events is logged.
///
/// Outputs are cumulative: a file, stdout, stderr and the `log` facade can all be enabled.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Log file, created when missing.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Keep the previous content of `file` instead of truncating it. Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Print to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Print to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Forward messages to the `log` facade at the given level.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// Verbosity of the category.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

impl<L: LogLevel> LoggerConfig<L> {
    fn outputs(&self) -> Vec<Output> {
        let mut outputs = Vec::new();

        if let Some(path) = &self.file {
            outputs.push(Output::File(path.clone()));
        }
        if self.stdout {
            outputs.push(Output::Stdout);
        }
        if self.stderr {
            outputs.push(Output::Stderr);
        }
        if let Some(level) = self.log {
            outputs.push(Output::Facade(level));
        }

        outputs
    }
}

fn append_default() -> bool {
    true
}

/// Level used when forwarding messages to the `log` facade.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// `log::info!`.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// `log::debug!`.
    #[serde(rename = "debug")]
    Debug,

    /// `log::trace!`.
    #[serde(rename = "trace")]
    Trace,
}

/// Verbosity of a logging category.
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// On/off verbosity.
#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Everything is logged.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for BinaryLogLevel {}

/// Fans compilation and profiling messages out to their configured outputs.
#[derive(Debug)]
pub struct Logger {
    sinks: Vec<Sink>,
    compilation: Vec<usize>,
    profiling: Vec<usize>,

    /// The configuration the outputs were opened from.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Open the outputs configured in [GlobalConfig::get].
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Open the outputs of an explicit configuration.
    ///
    /// An output used by both categories, e.g. the same file, is opened once. Outputs of a
    /// disabled category aren't opened at all.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut sinks = SinkSet::default();

        let compilation = match config.compilation.logger.level {
            CompilationLogLevel::Disabled => Vec::new(),
            CompilationLogLevel::Full => sinks.attach(&config.compilation.logger),
        };
        let profiling = match config.profiling.logger.level {
            ProfilingLogLevel::Disabled => Vec::new(),
            _ => sinks.attach(&config.profiling.logger),
        };

        Self {
            sinks: sinks.sinks,
            compilation,
            profiling,
            config,
        }
    }

    /// Write a compilation message to every compilation output.
    pub fn log_compilation<S: Display>(&mut self, msg: &S) {
        let msg = msg.to_string();
        for &index in &self.compilation {
            self.sinks[index].write(&msg);
        }
    }

    /// Write a profiling message to every profiling output.
    pub fn log_profiling<S: Display>(&mut self, msg: &S) {
        let msg = msg.to_string();
        for &index in &self.profiling {
            self.sinks[index].write(&msg);
        }
    }

    /// The configured compilation verbosity.
    pub fn log_level_compilation(&self) -> CompilationLogLevel {
        self.config.compilation.logger.level
    }

    /// The configured profiling verbosity.
    pub fn log_level_profiling(&self) -> ProfilingLogLevel {
        self.config.profiling.logger.level
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
enum Output {
    File(PathBuf),
    Stdout,
    Stderr,
    Facade(LogCrateLevel),
}

#[derive(Default)]
struct SinkSet {
    sinks: Vec<Sink>,
    opened: HashMap<Output, usize>,
}

impl SinkSet {
    /// Open the outputs of a category, reusing the ones already opened by another category.
    fn attach<L: LogLevel>(&mut self, config: &LoggerConfig<L>) -> Vec<usize> {
        let mut indices = Vec::new();

        for output in config.outputs() {
            if let Some(&index) = self.opened.get(&output) {
                indices.push(index);
                continue;
            }

            match Sink::open(&output, config.append) {
                Ok(sink) => {
                    let index = self.sinks.len();
                    self.sinks.push(sink);
                    self.opened.insert(output, index);
                    indices.push(index);
                }
                Err(err) => log::warn!("Unable to open log output {output:?}: {err}"),
            }
        }

        indices
    }
}

#[derive(Debug)]
enum Sink {
    File(BufWriter<File>),
    Stdout,
    Stderr,
    Facade(LogCrateLevel),
}

impl Sink {
    fn open(output: &Output, append: bool) -> std::io::Result<Self> {
        Ok(match output {
            Output::File(path) => Sink::File(open_file(path, append)?),
            Output::Stdout => Sink::Stdout,
            Output::Stderr => Sink::Stderr,
            Output::Facade(level) => Sink::Facade(*level),
        })
    }

    fn write(&mut self, msg: &str) {
        match self {
            // Flushed per message, a crashing kernel must not swallow the source it crashed on.
            Sink::File(writer) => {
                if let Err(err) = writeln!(writer, "{msg}").and_then(|_| writer.flush()) {
                    log::warn!("Unable to write to log file: {err}");
                }
            }
            Sink::Stdout => println!("{msg}"),
            Sink::Stderr => eprintln!("{msg}"),
            Sink::Facade(LogCrateLevel::Info) => log::info!("{msg}"),
            Sink::Facade(LogCrateLevel::Debug) => log::debug!("{msg}"),
            Sink::Facade(LogCrateLevel::Trace) => log::trace!("{msg}"),
        }
    }
}

fn open_file(path: &Path, append: bool) -> std::io::Result<BufWriter<File>> {
    let file = OpenOptions::new()
        .write(true)
        .append(append)
        .truncate(!append)
        .create(true)
        .open(path)?;

    Ok(BufWriter::new(file))
}
