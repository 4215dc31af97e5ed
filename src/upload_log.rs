//! Per-item upload log: one line per uploaded file or created directory,
//! printed above the progress bar and optionally appended to a log file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use console::style;
use indicatif::ProgressBar;
use time::{OffsetDateTime, macros::format_description};
use tracing::warn;

use crate::{
    sync::UploadLog,
    terminal::{self, fit_width, readable_size, two_col},
};

/// An existing file that log lines are appended to.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    /// `None` when `path` is not an existing regular file.
    pub fn existing(path: &Path) -> Option<Self> {
        path.is_file().then(|| Self {
            path: path.to_path_buf(),
        })
    }

    /// Append `[YYYY-MM-DD HH:MM:SS] line`.
    ///
    /// The file is rewritten trimmed, so it never starts or ends with blank
    /// lines.
    pub fn append(&self, line: &str) -> io::Result<()> {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        let stamp = now
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .map_err(io::Error::other)?;

        let existing = fs::read_to_string(&self.path)?;
        let existing = existing.trim_matches(|c| " \t\n\r\0\x0B".contains(c));
        let entry = format!("[{stamp}] {line}");
        let text = if existing.is_empty() {
            entry
        } else {
            format!("{existing}\n{entry}")
        };
        fs::write(&self.path, text)
    }
}

/// Terminal line and file line for an uploaded file.
///
/// The file line carries the full path whenever the terminal line had to be
/// shortened.
pub fn file_lines(remote: &str, size: u64, width: usize) -> (String, String) {
    let size = format!("({})", readable_size(size));
    let fitted = fit_width(remote, 2 + size.len() + 1, width);
    let line = two_col(&format!("- {fitted}"), &size, width);
    if fitted.ends_with("..") && fitted != remote {
        (line, format!("- {remote} {size}"))
    } else {
        (line.clone(), line)
    }
}

/// Terminal line and file line for a created directory.
pub fn dir_lines(remote: &str, width: usize) -> (String, String) {
    let fitted = fit_width(remote, 2, width);
    (format!("d {fitted}"), format!("d {remote}"))
}

/// [`UploadLog`] that writes to the terminal and an optional log file.
pub struct ConsoleLog {
    bar: Option<ProgressBar>,
    file: Option<LogFile>,
    width: usize,
}

impl ConsoleLog {
    pub fn new(file: Option<LogFile>) -> Self {
        Self {
            bar: None,
            file,
            width: terminal::width(),
        }
    }

    /// Print above `bar` instead of straight to stdout.
    pub fn attach(&mut self, bar: ProgressBar) {
        self.bar = Some(bar);
    }

    fn emit(&self, shown: String, plain: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{shown}")),
            None => println!("{shown}"),
        }
        if let Some(file) = &self.file {
            if let Err(e) = file.append(plain) {
                warn!(path = %file.path.display(), "could not write log file: {e}");
            }
        }
    }
}

impl UploadLog for ConsoleLog {
    fn file_uploaded(&mut self, shown: &str, size: u64) {
        let (line, plain) = file_lines(shown, size, self.width);
        let styled = match line.split_once(' ') {
            Some((dash, rest)) => format!("{dash} {}", style(rest).yellow()),
            None => line.clone(),
        };
        self.emit(styled, &plain);
    }

    fn dir_created(&mut self, shown: &str) {
        let (line, plain) = dir_lines(shown, self.width);
        let styled = format!("d {}", style(&line[2..]).yellow());
        self.emit(styled, &plain);
    }
}
