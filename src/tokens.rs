//! Disk authorization tokens supplied with `--disk-tokens FILE`.
//!
//! The file is JSON5 (comments, unquoted keys and trailing commas are
//! accepted), holding a flat object whose keys mirror the disk's config keys:
//!
//! ```json5
//! {
//!     key: "app-key",
//!     secret: "app-secret",
//! }
//! ```
//!
//! [`decode_document`] reads the other JSON5 inputs: repository server lists
//! and gist account files.

use std::{collections::BTreeMap, fs, path::Path};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("File not found at: {0}")]
    NotFound(String),

    #[error("expected json found directory: {0}")]
    IsDirectory(String),

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Error when decoding json: {0}")]
    Decode(String),
}

/// Decoded token map.
pub type Tokens = BTreeMap<String, Value>;

/// Decode JSON5 text into a flat token map.
pub fn decode(text: &str) -> Result<Tokens, TokenError> {
    json5::from_str(text).map_err(|e| TokenError::Decode(e.to_string()))
}

/// Read and decode the token file at `path`.
pub fn decode_path(path: &Path) -> Result<Tokens, TokenError> {
    decode(&read(path)?)
}

/// Read any JSON5 document, e.g. a repository servers file or gist account.
pub fn decode_document(path: &Path) -> Result<Value, TokenError> {
    json5::from_str(&read(path)?).map_err(|e| TokenError::Decode(e.to_string()))
}

fn read(path: &Path) -> Result<String, TokenError> {
    let shown = path.display().to_string();
    if path.is_dir() {
        return Err(TokenError::IsDirectory(shown));
    }
    if !path.exists() {
        return Err(TokenError::NotFound(shown));
    }
    fs::read_to_string(path).map_err(|source| TokenError::Io {
        path: shown,
        source,
    })
}

/// Token value as a config value.  `null`, arrays and objects have no
/// counterpart and yield `None`.
pub fn to_config_value(value: &Value) -> Option<toml::Value> {
    match value {
        Value::String(s) => Some(toml::Value::String(s.clone())),
        Value::Bool(b) => Some(toml::Value::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(toml::Value::Integer)
            .or_else(|| n.as_f64().map(toml::Value::Float)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
