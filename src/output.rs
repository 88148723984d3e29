//! # Output Rendering
//!
//! This module turns a run's documents into text and controls how the CLI
//! presents messages.
//!
//! ## Documents
//!
//! YAML output joins documents with `---` separators. JSON output prints
//! one JSON value per document.
//!
//! ## Respecting User Preferences
//!
//! The module respects the following environment variables and flags:
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::documents::DocumentSet;
use crate::error::{Error, Result};

/// Output configuration for controlling colors.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Whether colors should be used in output.
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// In auto mode, colors are disabled if:
    /// - `NO_COLOR` environment variable is set (any value, including empty)
    /// - `CLICOLOR=0` is set
    /// - `TERM=dumb` is set
    /// - stderr is not a TTY (unless `CLICOLOR_FORCE=1`)
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }

        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }

        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }

        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        // Messages go to stderr; documents go to stdout uncolored.
        console::Term::stderr().features().colors_supported()
    }

    /// Create a configuration with colors always enabled.
    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    /// Create a configuration with colors always disabled.
    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }

    /// Format an error message with a highlighted prefix.
    pub fn error_message(&self, message: &str) -> String {
        if self.use_color {
            format!("{} {}", console::style("Error:").red().bold(), message)
        } else {
            format!("Error: {}", message)
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Format of documents written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "yaml" => Ok(OutputFormat::Yaml),
            "json" => Ok(OutputFormat::Json),
            other => Err(Error::FileSource {
                message: format!("Unknown output format '{}' (expected yaml or json)", other),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Render YAML documents as one stream separated by `---`.
pub fn render_yaml_documents<'a, I>(documents: I) -> Result<String>
where
    I: IntoIterator<Item = &'a YamlValue>,
{
    let rendered = documents
        .into_iter()
        .map(serde_yaml::to_string)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rendered.join("---\n"))
}

/// Render a document set in the given format.
pub fn render_documents(doc_set: &DocumentSet, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Yaml => render_yaml_documents(doc_set.values()),
        OutputFormat::Json => {
            let mut out = String::new();
            for value in doc_set.values() {
                out.push_str(&serde_json::to_string_pretty(value)?);
                out.push('\n');
            }
            Ok(out)
        }
    }
}

/// Logs the elapsed time under a label when dropped.
#[derive(Debug)]
pub struct DebugTimer {
    label: &'static str,
    start: Instant,
    enabled: bool,
}

impl DebugTimer {
    pub fn start(label: &'static str, enabled: bool) -> Self {
        Self {
            label,
            start: Instant::now(),
            enabled,
        }
    }
}

impl Drop for DebugTimer {
    fn drop(&mut self) {
        if self.enabled {
            debug!("{}: {:?}", self.label, self.start.elapsed());
        }
    }
}
