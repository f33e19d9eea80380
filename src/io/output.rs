use std::borrow::Cow;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use super::DocumentFormat;

/// Where a saved mod document goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    pub fn file(path: impl AsRef<Path>) -> Self {
        OutputDestination::File(path.as_ref().to_path_buf())
    }

    /// Writes `payload` plus a trailing newline. Files are written to a
    /// sibling temp file first and renamed over the target, so a failed
    /// save leaves the previous document intact.
    fn write(&self, payload: &str) -> Result<()> {
        match self {
            OutputDestination::Stdout => {
                let mut stdout = io::stdout().lock();
                writeln!(stdout, "{payload}")?;
                stdout.flush()?;
            }
            OutputDestination::File(path) => {
                let staged = staged_path(path);
                fs::write(&staged, format!("{payload}\n"))
                    .with_context(|| format!("failed to write {}", staged.display()))?;
                if let Err(err) = fs::rename(&staged, path) {
                    let _ = fs::remove_file(&staged);
                    return Err(err).with_context(|| format!("failed to replace {}", path.display()));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for OutputDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputDestination::Stdout => f.write_str("stdout"),
            OutputDestination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn staged_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".civmod-tmp");
    path.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: DocumentFormat,
    pub pretty: bool,
    pub destinations: Vec<OutputDestination>,
}

impl OutputOptions {
    pub fn new(format: DocumentFormat) -> Self {
        Self {
            format,
            pretty: true,
            destinations: vec![OutputDestination::Stdout],
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn with_destinations(mut self, destinations: Vec<OutputDestination>) -> Self {
        self.destinations = destinations;
        self
    }
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self::new(DocumentFormat::Json)
    }
}

/// Renders the document once and writes it to every destination, stopping
/// at the first failure.
pub fn emit(value: &Value, options: &OutputOptions) -> Result<()> {
    if options.destinations.is_empty() {
        return Ok(());
    }
    let payload = render(value, options.format, options.pretty)?;
    for destination in &options.destinations {
        destination
            .write(&payload)
            .with_context(|| format!("failed to save document to {destination}"))?;
        debug!(%destination, format = %options.format, bytes = payload.len(), "document saved");
    }
    Ok(())
}

/// Serializes a document in `format`. Pretty output is ignored by YAML,
/// which has a single layout.
pub fn render(value: &Value, format: DocumentFormat, pretty: bool) -> Result<String> {
    let value = prepared_for(format, value);
    let rendered = match format {
        DocumentFormat::Json if pretty => serde_json::to_string_pretty(&*value)?,
        DocumentFormat::Json => serde_json::to_string(&*value)?,
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(&*value)?,
        #[cfg(feature = "toml")]
        DocumentFormat::Toml if pretty => toml::to_string_pretty(&*value)?,
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::to_string(&*value)?,
    };
    Ok(rendered)
}

/// TOML has no null, so cleared fields are left out rather than failing
/// the save. Other formats take the document as is.
fn prepared_for(format: DocumentFormat, value: &Value) -> Cow<'_, Value> {
    match format {
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => Cow::Owned(without_nulls(value)),
        _ => Cow::Borrowed(value),
    }
}

#[cfg(feature = "toml")]
fn without_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, child)| !child.is_null())
                .map(|(key, child)| (key.clone(), without_nulls(child)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|child| !child.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other.clone(),
    }
}
