use std::collections::BTreeMap;
use std::fmt::Display;

use thiserror::Error;

use crate::config::GlobalConfig;

/// An open map of toolchain options.
///
/// Keys and values are not interpreted by tilemm, they are handed to the device toolchain as is.
/// Backends driven by command-line style flags render each entry with [CompileOptions::to_args].
#[derive(Default, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CompileOptions {
    entries: BTreeMap<String, OptionValue>,
}

/// The value of a single toolchain option.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A switch, only emitted when `true`.
    Flag(bool),
    /// A single value.
    Value(String),
    /// A repeated option, emitted once per value.
    List(Vec<String>),
}

impl CompileOptions {
    /// Options configured in the `[compilation.options]` table of the global configuration.
    pub fn global() -> Self {
        GlobalConfig::get().compilation.options.clone()
    }

    /// Add a switch.
    pub fn flag(mut self, key: impl Into<String>) -> Self {
        self.entries.insert(key.into(), OptionValue::Flag(true));
        self
    }

    /// Add an option with a value.
    pub fn value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries
            .insert(key.into(), OptionValue::Value(value.into()));
        self
    }

    /// Add an option repeated for every value.
    pub fn list<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.entries.insert(key.into(), OptionValue::List(values));
        self
    }

    /// Get the value registered for the given key.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    /// Iterate over the options, sorted by key.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// The number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no option is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Render the options as command-line arguments.
    ///
    /// Keys without a leading dash are prefixed with `--`; values are attached with `=`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.entries.len());

        for (key, value) in self.entries.iter() {
            let key = if key.starts_with('-') {
                key.clone()
            } else {
                format!("--{key}")
            };

            match value {
                OptionValue::Flag(true) => args.push(key),
                OptionValue::Flag(false) => {}
                OptionValue::Value(value) => args.push(format!("{key}={value}")),
                OptionValue::List(values) => {
                    args.extend(values.iter().map(|value| format!("{key}={value}")))
                }
            }
        }

        args
    }
}

impl Display for CompileOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_args().join(" "))
    }
}

/// Errors raised while turning generated source into a device function.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompilationError {
    /// The toolchain rejected the source.
    #[error("The device toolchain rejected the kernel source\nCaused by:\n{log}")]
    Toolchain {
        /// The toolchain diagnostics, verbatim.
        log: String,
    },

    /// The source compiled but the entry point couldn't be resolved.
    #[error("Unable to resolve the entry point `{name}`\nCaused by:\n  {reason}")]
    MissingEntrypoint {
        /// The name of the entry point.
        name: String,
        /// Why resolution failed.
        reason: String,
    },

    /// The compiled module couldn't be loaded on the device.
    #[error("Unable to load the compiled module\nCaused by:\n  {reason}")]
    Load {
        /// Why loading failed.
        reason: String,
    },
}
