//! Repository mirroring: the servers file, repository name discovery and
//! clone-or-fetch.
//!
//! # Servers file
//!
//! JSON5, one entry per server:
//!
//! ```json5
//! {
//!     servers: [
//!         {
//!             name: "github",
//!             clone: { to: "~/mirrors/github", using: "git@github.com:me/<repo>" },
//!             "repo-names": {
//!                 fromApi: {
//!                     url: "https://api.github.com/user/repos?per_page=100",
//!                     withPagination: true,
//!                     total: 230,
//!                     perPage: 100,
//!                 },
//!                 pattern: "*.name",
//!                 token: "ghp_...",
//!             },
//!         },
//!     ],
//! }
//! ```
//!
//! `repo-names.names` (a string or a list) skips the API entirely.
//!
//! # `use`
//!
//! The root object, any server and any `repo-names` block may carry
//! `use: "path.json5"` or `use: { from: "path.json5", with: { key: value } }`.
//! Keys missing from the block are filled from that file; keys already present
//! win, nested objects are filled key by key.  `with` replaces every `-key-` in
//! the file's strings by `value` before filling.  A `repo-names` file may wrap
//! its keys in a `repo-names` object.

pub mod git;

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::{
    config::resolve_home,
    http::{Api, ApiError},
    tokens::{self, TokenError},
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Read(#[from] TokenError),

    #[error("file not found: {0}")]
    UseNotFound(String),

    #[error("Use must be json file not directory: {0}")]
    UseIsDirectory(String),

    #[error("`use` must be a path or {{ from, with }}")]
    UseShape,

    #[error("required config key {0} missing.")]
    MissingKey(String),
}

/// A parsed servers file.
#[derive(Debug, Clone, PartialEq)]
pub struct ReposConfig {
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Server {
    pub name: String,
    /// Directory holding the `<repo>.git` mirrors.
    pub clone_to: PathBuf,
    /// Clone source; `<repo>` is replaced by each repository name.
    pub clone_using: String,
    pub repo_names: RepoNames,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepoNames {
    Listed(Vec<String>),
    FromApi {
        source: ApiSource,
        /// Dotted path to the names in each response, `*` for every item.
        pattern: String,
        token: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiSource {
    pub urls: Vec<String>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pagination {
    pub total: Total,
    pub per_page: u64,
    /// Query parameter carrying the page number.
    pub page_query: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Total {
    Count(u64),
    /// Read the item count from `key` of the JSON at `url`.
    FromUrl { url: String, key: String },
}

// ─── Reading ──────────────────────────────────────────────────────────────────

impl ReposConfig {
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        Self::from_value(tokens::decode_document(path)?)
    }

    pub fn from_value(mut root: Value) -> Result<Self, ConfigError> {
        inherit(&mut root)?;

        let mut servers = match root.get_mut("servers") {
            Some(Value::Array(servers)) => std::mem::take(servers),
            _ => return Err(missing("servers")),
        };
        for server in &mut servers {
            inherit(server)?;
            if let Some(names) = server.get_mut("repo-names") {
                inherit(names)?;
                if let Some(Value::Object(inner)) = names.get("repo-names").cloned() {
                    fill(names, Value::Object(inner));
                    if let Some(map) = names.as_object_mut() {
                        map.remove("repo-names");
                    }
                }
            }
        }

        for key in ["name", "clone.to", "clone.using"] {
            if servers.iter().any(|s| filled_str(s, key).is_none()) {
                return Err(missing(&format!("servers.*.{key}")));
            }
        }

        let servers = servers
            .iter()
            .map(server_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { servers })
    }

    /// Servers whose name contains `matches`.
    pub fn filter_servers(&mut self, matches: &str) {
        self.servers.retain(|s| s.name.contains(matches));
    }
}

fn missing(key: &str) -> ConfigError {
    ConfigError::MissingKey(key.to_string())
}

fn server_from(server: &Value) -> Result<Server, ConfigError> {
    let text = |key: &str| filled_str(server, key).unwrap_or_default();
    Ok(Server {
        name: text("name"),
        clone_to: resolve_home(&text("clone.to")),
        clone_using: text("clone.using"),
        repo_names: repo_names_from(server.get("repo-names").unwrap_or(&Value::Null))?,
    })
}

fn repo_names_from(block: &Value) -> Result<RepoNames, ConfigError> {
    let listed: Vec<String> = match block.get("names") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar).collect(),
        Some(value) => scalar(value).into_iter().collect(),
        None => Vec::new(),
    };
    if !listed.is_empty() {
        return Ok(RepoNames::Listed(listed));
    }

    let api = block
        .get("fromApi")
        .or_else(|| block.get("from-api"))
        .filter(|v| is_filled(v))
        .ok_or_else(|| missing("repo-names.fromApi"))?;
    let pattern = filled_str(block, "pattern").ok_or_else(|| missing("repo-names.pattern"))?;

    Ok(RepoNames::FromApi {
        source: api_source_from(api)?,
        pattern,
        token: filled_str(block, "token"),
    })
}

fn api_source_from(api: &Value) -> Result<ApiSource, ConfigError> {
    if let Some(url) = scalar(api) {
        return Ok(ApiSource {
            urls: vec![url],
            pagination: None,
        });
    }

    let mut urls: Vec<String> = filled_str(api, "url").into_iter().collect();
    if let Some(Value::Array(items)) = api.get("urls") {
        urls.extend(items.iter().filter_map(scalar));
    }
    if urls.is_empty() {
        return Err(missing("repo-names.fromApi.url"));
    }

    let paginated = api
        .get("withPagination")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if !paginated {
        return Ok(ApiSource {
            urls,
            pagination: None,
        });
    }

    let total = match api.get("total") {
        Some(Value::String(url)) if !url.is_empty() => Total::FromUrl {
            url: url.clone(),
            key: filled_str(api, "totalKey")
                .ok_or_else(|| missing("repo-names.fromApi.totalKey"))?,
        },
        Some(value) => Total::Count(
            value
                .as_u64()
                .ok_or_else(|| missing("repo-names.fromApi.total"))?,
        ),
        None => return Err(missing("repo-names.fromApi.total")),
    };
    let per_page = api
        .get("perPage")
        .and_then(Value::as_u64)
        .filter(|n| *n > 0)
        .ok_or_else(|| missing("repo-names.fromApi.perPage"))?;

    Ok(ApiSource {
        urls,
        pagination: Some(Pagination {
            total,
            per_page,
            page_query: filled_str(api, "pageQueryString").unwrap_or_else(|| "page".into()),
        }),
    })
}

// ─── `use` inheritance ────────────────────────────────────────────────────────

/// Resolve and remove the `use` key of `block`, filling missing keys.
fn inherit(block: &mut Value) -> Result<(), ConfigError> {
    let Some(spec) = block.as_object_mut().and_then(|m| m.remove("use")) else {
        return Ok(());
    };

    let (from, with) = match spec {
        Value::String(from) => (from, Map::new()),
        Value::Object(mut spec) => {
            let from = spec
                .get("from")
                .and_then(scalar)
                .ok_or(ConfigError::UseShape)?;
            let with = match spec.remove("with") {
                Some(Value::Object(with)) => with,
                _ => Map::new(),
            };
            (from, with)
        },
        _ => return Err(ConfigError::UseShape),
    };

    let path = resolve_home(&from);
    if path.is_dir() {
        return Err(ConfigError::UseIsDirectory(from));
    }
    if !path.exists() {
        return Err(ConfigError::UseNotFound(from));
    }
    let mut used = tokens::decode_document(&path)?;
    for (key, value) in &with {
        let value = scalar(value).unwrap_or_default();
        substitute(&mut used, &format!("-{key}-"), &value);
    }
    debug!(from = %path.display(), "filled config block");

    fill(block, used);
    Ok(())
}

/// Copy keys of `defaults` that `target` lacks, recursing into objects.
fn fill(target: &mut Value, defaults: Value) {
    let (Value::Object(target), Value::Object(defaults)) = (target, defaults) else {
        return;
    };
    for (key, default) in defaults {
        match target.get_mut(&key) {
            Some(existing) => fill(existing, default),
            None => {
                target.insert(key, default);
            },
        }
    }
}

fn substitute(value: &mut Value, placeholder: &str, replacement: &str) {
    match value {
        Value::String(s) => *s = s.replace(placeholder, replacement),
        Value::Array(items) => items
            .iter_mut()
            .for_each(|v| substitute(v, placeholder, replacement)),
        Value::Object(map) => map
            .values_mut()
            .for_each(|v| substitute(v, placeholder, replacement)),
        _ => {},
    }
}

// ─── Value helpers ────────────────────────────────────────────────────────────

/// Strings and numbers as text; blanks and everything else as `None`.
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_filled(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Non-blank scalar at a dotted `key`.
fn filled_str(value: &Value, key: &str) -> Option<String> {
    key.split('.')
        .try_fold(value, |v, part| v.get(part))
        .and_then(scalar)
}

/// Every non-blank scalar reached by a dotted `pattern`; `*` walks all items
/// of an array or object.
pub fn pluck(value: &Value, pattern: &str) -> Vec<String> {
    let mut reached = vec![value];
    for part in pattern.split('.') {
        reached = reached
            .into_iter()
            .flat_map(|v| -> Vec<&Value> {
                match (part, v) {
                    ("*", Value::Array(items)) => items.iter().collect(),
                    ("*", Value::Object(map)) => map.values().collect(),
                    (key, Value::Object(map)) => map.get(key).into_iter().collect(),
                    (index, Value::Array(items)) => index
                        .parse::<usize>()
                        .ok()
                        .and_then(|i| items.get(i))
                        .into_iter()
                        .collect(),
                    _ => Vec::new(),
                }
            })
            .collect();
    }
    reached.into_iter().filter_map(scalar).collect()
}

// ─── Names ────────────────────────────────────────────────────────────────────

/// `?page=N` (or `&page=N`) appended to every url, for every page up to
/// `total / per_page` rounded up.
pub fn paginate(urls: &[String], total: u64, per_page: u64, page_query: &str) -> Vec<String> {
    let pages = total.div_ceil(per_page.max(1));
    urls.iter()
        .flat_map(|url| {
            let sep = if url.contains('?') { '&' } else { '?' };
            (1..=pages).map(move |page| format!("{url}{sep}{page_query}={page}"))
        })
        .collect()
}

/// Urls to query, after resolving pagination.
pub fn api_urls(
    source: &ApiSource,
    api: &dyn Api,
    token: Option<&str>,
) -> Result<Vec<String>, ApiError> {
    let Some(pagination) = &source.pagination else {
        return Ok(source.urls.clone());
    };
    let total = match &pagination.total {
        Total::Count(n) => *n,
        Total::FromUrl { url, key } => {
            let body = api.json(url, token)?;
            pluck(&body, key)
                .first()
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| ApiError::MissingNumber {
                    url: url.clone(),
                    key: key.clone(),
                })?
        },
    };
    Ok(paginate(
        &source.urls,
        total,
        pagination.per_page,
        &pagination.page_query,
    ))
}

/// Repository names of `server`, listed or collected from its API.
pub fn repo_names(server: &Server, api: &dyn Api) -> Result<Vec<String>, ApiError> {
    match &server.repo_names {
        RepoNames::Listed(names) => Ok(names.clone()),
        RepoNames::FromApi {
            source,
            pattern,
            token,
        } => {
            let token = token.as_deref();
            let mut names = Vec::new();
            for url in api_urls(source, api, token)? {
                names.extend(pluck(&api.json(&url, token)?, pattern));
            }
            Ok(names)
        },
    }
}

/// Directory of the mirror for `repo` under `clone_to`.
pub fn mirror_dir(clone_to: &Path, repo: &str) -> PathBuf {
    clone_to.join(format!("{}.git", repo.trim_end_matches(".git")))
}
