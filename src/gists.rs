//! Gist archiving: every gist of a user, its files and its comments, kept
//! under a local directory.
//!
//! # Layout
//!
//! ```text
//! <to-dir>/<login>_gists/<slug(description_id)>/<file>…
//!                                              comments.txt
//! ```
//!
//! `gists/` is used when the owner has no login and the bare id when the gist
//! has no description.  Files are only rewritten when their content changed.

use std::{
    collections::BTreeMap,
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use console::style;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::{
    detect::{EMPTY_FILE_SENTINEL, digest},
    http::{Api, ApiError},
    tokens::{self, TokenError},
};

pub const DEFAULT_API: &str = "https://api.github.com";
const PER_PAGE: u32 = 50;
const MAX_PAGES: u32 = 1000;

#[derive(Debug, Error)]
pub enum GistError {
    #[error(transparent)]
    Read(#[from] TokenError),

    #[error("no `username` key found in config.")]
    NoUsername,

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("unexpected gist listing from {url}: {source}")]
    Listing {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Couldn't put content to file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Account file passed with `--account`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub username: String,
    pub token: Option<String>,
    /// API root, `https://api.github.com` unless the file sets `api`.
    pub api: String,
}

impl Account {
    pub fn read(path: &Path) -> Result<Self, GistError> {
        Self::from_value(&tokens::decode_document(path)?)
    }

    pub fn from_value(doc: &Value) -> Result<Self, GistError> {
        let text = |key: &str| {
            doc.get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_owned)
        };
        Ok(Self {
            username: text("username").ok_or(GistError::NoUsername)?,
            token: text("token"),
            api: text("api")
                .map(|a| a.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API.to_string()),
        })
    }

    pub fn list_url(&self, page: u32) -> String {
        format!(
            "{}/users/{}/gists?per_page={PER_PAGE}&page={page}",
            self.api, self.username
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gist {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub owner: Option<Owner>,
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
    pub comments_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GistFile {
    pub filename: String,
    pub raw_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub user: Owner,
    pub body: String,
    pub created_at: String,
    pub updated_at: String,
}

impl Gist {
    fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.trim().is_empty())
    }

    fn login(&self) -> Option<&str> {
        self.owner
            .as_ref()
            .and_then(|o| o.login.as_deref())
            .filter(|l| !l.trim().is_empty())
    }

    /// Directory the gist is archived in.
    pub fn dir(&self, to_dir: &Path) -> PathBuf {
        let all = match self.login() {
            Some(login) => format!("{login}_gists"),
            None => "gists".to_string(),
        };
        let own = match self.description() {
            Some(desc) => slug(&format!("{desc}_{}", self.id)),
            None => self.id.clone(),
        };
        to_dir.join(all).join(own)
    }

    /// Description, or the id when there is none.
    pub fn label(&self) -> &str {
        self.description().unwrap_or(&self.id)
    }
}

/// Lowercase ASCII-friendly form: `_`, `-` and whitespace runs become one
/// `-`, `@` becomes `-at-`, other punctuation is dropped.
pub fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.replace('@', "-at-").chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(c.to_lowercase());
        } else if c == '-' || c == '_' || c.is_whitespace() {
            pending_dash = true;
        }
    }
    out
}

/// `comments.txt` text: each comment under a dashed title, trimmed of
/// leading and trailing newlines.
pub fn comments_text(comments: &[Comment]) -> String {
    let mut text = String::new();
    for c in comments {
        let author = c.user.login.as_deref().unwrap_or_default();
        let title = format!(
            "created_at: [{}] updated_at: [{}] author: {author}",
            c.created_at, c.updated_at
        );
        let rule = "-".repeat(title.len());
        for line in [&rule, &title, &rule, &c.body] {
            text.push_str(line);
            text.push('\n');
        }
    }
    text.trim_matches('\n').to_string()
}

/// What [`store_file`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Created,
    Checked,
    Updated,
}

/// Write `content` to `path` unless it already holds it.  Blank content is
/// stored as a single space.
pub fn store_file(path: &Path, content: &[u8]) -> Result<FileAction, GistError> {
    let content = if content.iter().all(u8::is_ascii_whitespace) {
        EMPTY_FILE_SENTINEL
    } else {
        content
    };
    let write = |action| {
        fs::write(path, content)
            .map(|()| action)
            .map_err(|source| GistError::Write {
                path: path.to_path_buf(),
                source,
            })
    };

    if !path.is_file() {
        return write(FileAction::Created);
    }
    let existing = fs::read(path).map_err(|source| GistError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    if digest(&existing) == digest(content) {
        return Ok(FileAction::Checked);
    }
    write(FileAction::Updated)
}

/// Archives gists into `to_dir`, reporting each step to `out`.
pub struct Archiver<'a> {
    pub api: &'a dyn Api,
    pub account: &'a Account,
    pub to_dir: &'a Path,
    pub out: &'a mut dyn Write,
}

impl Archiver<'_> {
    /// Archive every gist whose description contains `desc_matches`.
    ///
    /// Returns how many gists were processed.
    pub fn run(&mut self, desc_matches: Option<&str>) -> Result<usize, GistError> {
        let token = self.account.token.as_deref();
        let mut processed = 0;
        for page in 1..=MAX_PAGES {
            let url = self.account.list_url(page);
            let listing = self.api.json(&url, token)?;
            let gists: Vec<Gist> = serde_json::from_value(listing)
                .map_err(|source| GistError::Listing { url, source })?;
            if gists.is_empty() {
                break;
            }
            for gist in gists {
                let desc = gist.description.as_deref().unwrap_or_default();
                if desc_matches.is_some_and(|m| !desc.contains(m)) {
                    continue;
                }
                self.backup(&gist)?;
                processed += 1;
            }
        }
        Ok(processed)
    }

    fn backup(&mut self, gist: &Gist) -> Result<(), GistError> {
        let token = self.account.token.as_deref();
        let dir = gist.dir(self.to_dir);
        fs::create_dir_all(&dir).map_err(|source| GistError::Write {
            path: dir.clone(),
            source,
        })?;
        debug!(id = %gist.id, dir = %dir.display(), "archiving gist");

        self.say(&format!("\nProcessing {}", style(gist.label()).yellow()));
        for file in gist.files.values() {
            let content = self.api.text(&file.raw_url, token)?;
            self.store(&dir, &file.filename, content.as_bytes())?;
        }

        let mut comments = Vec::new();
        for page in 1..=MAX_PAGES {
            let url = format!("{}?page={page}", gist.comments_url);
            let batch: Vec<Comment> = match self.api.json(&url, token)? {
                Value::Null => Vec::new(),
                listing => serde_json::from_value(listing)
                    .map_err(|source| GistError::Listing { url, source })?,
            };
            if batch.is_empty() {
                break;
            }
            comments.extend(batch);
        }
        let text = comments_text(&comments);
        if !text.trim().is_empty() {
            self.store(&dir, "comments.txt", text.as_bytes())?;
        }
        Ok(())
    }

    fn store(&mut self, dir: &Path, name: &str, content: &[u8]) -> Result<(), GistError> {
        let line = match store_file(&dir.join(name), content)? {
            FileAction::Created => format!("Creating file {}", style(name).yellow()),
            FileAction::Checked => format!("Checked file {name}"),
            FileAction::Updated => format!("Updating file {}", style(name).yellow()),
        };
        self.say(&line);
        Ok(())
    }

    fn say(&mut self, line: &str) {
        // stdout going away mid-run is not worth aborting the archive for
        let _ = writeln!(self.out, "{line}");
    }
}
