//! Launch argument overrides from the command line and parameter files

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

/// Override values in a parameter file can be strings, booleans, or numbers
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ArgValue {
    /// Convert to string representation
    pub fn as_str(&self) -> String {
        match self {
            ArgValue::Bool(b) => b.to_string(),
            ArgValue::Int(i) => i.to_string(),
            ArgValue::Float(f) => format!("{:?}", f),
            ArgValue::String(s) => s.clone(),
        }
    }
}

/// Parse an override in format "key:=value" or "key=value"
pub fn parse_override(s: &str) -> Result<(String, String), OverrideError> {
    let (key, value) = s
        .split_once(":=")
        .or_else(|| s.split_once('='))
        .ok_or_else(|| OverrideError::InvalidFormat(s.to_string()))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(OverrideError::InvalidFormat(s.to_string()));
    }

    Ok((key.to_string(), value.to_string()))
}

/// Load overrides from a flat YAML map
///
/// ```yaml
/// port: /dev/ttyACM0
/// baud: 921600
/// delay_uav2_sec: 2.5
/// ```
pub fn load_params_file(path: impl AsRef<Path>) -> Result<IndexMap<String, String>, OverrideError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| OverrideError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_params(&content)
}

/// Parse overrides from a YAML string
pub fn parse_params(content: &str) -> Result<IndexMap<String, String>, OverrideError> {
    if content.trim().is_empty() {
        return Ok(IndexMap::new());
    }

    let values: IndexMap<String, ArgValue> = serde_yaml::from_str(content)?;
    Ok(values
        .into_iter()
        .map(|(name, value)| (name, value.as_str()))
        .collect())
}

/// Errors that can occur when reading overrides
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("Invalid argument format '{0}'. Expected 'key:=value' or 'key=value'")]
    InvalidFormat(String),

    #[error("Failed to read params file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse params file: {0}")]
    Parse(#[from] serde_yaml::Error),
}
