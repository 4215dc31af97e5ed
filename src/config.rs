//! Configuration types and loading logic.
//!
//! `Config` is a direct mapping of `diskput.toml`.  Every field has a
//! `Default` so the file is optional: without one, a single `local` disk
//! rooted at `./.diskput` is available.
//!
//! # File format
//!
//! ```toml
//! [disks.backups]
//! driver = "local"          # storage adapter
//! root   = "~/backups"      # where the disk lives; `~` is expanded
//!
//! [disks.dropbox]
//! driver = "dropbox"
//! key    = ""               # extra keys are authorization tokens,
//! secret = ""               # filled in by `--disk-tokens`
//!
//! [put]
//! log_to = "~/diskput.log"  # default for `put --log-to`
//! ```

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::tokens::{self, Tokens};

// ─── Top-level ────────────────────────────────────────────────────────────────

/// Root configuration object, deserialised from `diskput.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Named storage disks, keyed by the name passed to `--disk`.
    #[serde(default = "default_disks")]
    pub disks: BTreeMap<String, DiskConfig>,

    /// Defaults for the `put` command.
    #[serde(default)]
    pub put: PutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            disks: default_disks(),
            put: PutConfig::default(),
        }
    }
}

// ─── [disks.<name>] ───────────────────────────────────────────────────────────

/// One storage disk.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DiskConfig {
    /// Storage adapter name.  Only `local` is built in.
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Root directory of a `local` disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,

    /// Every other key: authorization tokens and adapter options.
    #[serde(flatten)]
    pub tokens: BTreeMap<String, toml::Value>,
}

impl DiskConfig {
    /// `root` with a leading `~` expanded.
    pub fn root_path(&self) -> Option<PathBuf> {
        self.root.as_deref().map(resolve_home)
    }

    /// Overwrite keys that already exist on this disk with values from
    /// `tokens`.  `driver` and unknown keys are ignored.
    ///
    /// Returns the keys that were set.
    pub fn apply_tokens(&mut self, tokens: &Tokens) -> Vec<String> {
        let mut applied = Vec::new();
        for (key, value) in tokens {
            if key == "driver" {
                continue;
            }
            let Some(value) = tokens::to_config_value(value) else {
                continue;
            };
            if key == "root" {
                if let toml::Value::String(root) = value {
                    self.root = Some(root);
                    applied.push(key.clone());
                }
                continue;
            }
            if let Some(slot) = self.tokens.get_mut(key) {
                *slot = value;
                applied.push(key.clone());
            }
        }
        applied
    }
}

// ─── [put] ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct PutConfig {
    /// Existing file that upload events are appended to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_to: Option<String>,
}

// ─── Defaults ─────────────────────────────────────────────────────────────────

pub fn default_driver() -> String {
    "local".into()
}

pub fn default_disks() -> BTreeMap<String, DiskConfig> {
    BTreeMap::from([("local".to_string(), DiskConfig {
        driver: default_driver(),
        root: Some("./.diskput".into()),
        tokens: BTreeMap::new(),
    })])
}

// ─── Partial config (global + local merge) ────────────────────────────────────

/// A config file where every section may be absent, so two files can be
/// layered.
#[derive(Debug, Default, Deserialize)]
pub struct PartialConfig {
    #[serde(default)]
    pub disks: Option<BTreeMap<String, DiskConfig>>,
    #[serde(default)]
    pub put: Option<PutConfig>,
}

impl PartialConfig {
    /// Layer `local` over `self`.  Disks are merged by name, local wins.
    pub fn merge(self, local: Self) -> Self {
        let disks = match (self.disks, local.disks) {
            (Some(mut global), Some(local)) => {
                global.extend(local);
                Some(global)
            },
            (global, local) => local.or(global),
        };
        let put = match (self.put, local.put) {
            (Some(global), Some(local)) => Some(PutConfig {
                log_to: local.log_to.or(global.log_to),
            }),
            (global, local) => local.or(global),
        };
        Self { disks, put }
    }

    pub fn resolve(self) -> Config {
        Config {
            disks: self.disks.unwrap_or_else(default_disks),
            put: self.put.unwrap_or_default(),
        }
    }
}

/// Parse `path` as a partial config.  `Ok(None)` when the file is absent.
pub fn parse_partial(path: &Path) -> Result<Option<PartialConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let partial = toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(partial))
}

/// Expand a leading `~` to the user's home directory.
pub fn resolve_home(path: &str) -> PathBuf {
    match (path.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches('/')),
        _ => PathBuf::from(path),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
