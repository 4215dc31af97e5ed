//! `git` invocations behind a trait so mirroring can be tested without a
//! network or a git binary.

use std::{
    path::Path,
    process::{Command, Output, Stdio},
};

use thiserror::Error;
use tracing::debug;

use super::mirror_dir;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn git {args}: {source}")]
    Spawn {
        args: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {args} exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },
}

pub trait Git {
    /// `git clone --mirror <source…>` run inside `into`.
    fn clone_mirror(&mut self, into: &Path, source: &[&str]) -> Result<(), GitError>;

    /// `git fetch` inside the mirror at `repo`; returns its output lines.
    fn fetch(&mut self, repo: &Path) -> Result<Vec<String>, GitError>;

    fn is_repo(&mut self, path: &Path) -> bool;

    /// Remote-tracking branches, e.g. `origin/main`.
    fn remote_branches(&mut self, repo: &Path) -> Result<Vec<String>, GitError>;

    /// Fetch every remote and create a local branch for each remote one.
    fn fetch_all_branches(&mut self, repo: &Path, remote: &[String]) -> Result<(), GitError>;
}

/// [`Git`] through the `git` binary on `PATH`.
pub struct GitCli;

fn run(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
    debug!(dir = %dir.display(), ?args, "git");
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| GitError::Spawn {
            args: args.join(" "),
            source,
        })
}

fn checked(dir: &Path, args: &[&str]) -> Result<Output, GitError> {
    let output = run(dir, args)?;
    if output.status.success() {
        return Ok(output);
    }
    Err(GitError::Failed {
        args: args.join(" "),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect()
}

impl Git for GitCli {
    fn clone_mirror(&mut self, into: &Path, source: &[&str]) -> Result<(), GitError> {
        let mut args = vec!["clone", "--mirror"];
        args.extend_from_slice(source);
        checked(into, &args).map(|_| ())
    }

    fn fetch(&mut self, repo: &Path) -> Result<Vec<String>, GitError> {
        let output = checked(repo, &["fetch"])?;
        // git reports fetched refs on stderr
        let mut out = lines(&output.stdout);
        out.extend(lines(&output.stderr));
        Ok(out)
    }

    fn is_repo(&mut self, path: &Path) -> bool {
        run(path, &["rev-parse", "--git-dir"]).is_ok_and(|o| o.status.success())
    }

    fn remote_branches(&mut self, repo: &Path) -> Result<Vec<String>, GitError> {
        let output = checked(repo, &["branch", "-r"])?;
        Ok(lines(&output.stdout)
            .into_iter()
            .filter(|b| !b.contains("->"))
            .collect())
    }

    fn fetch_all_branches(&mut self, repo: &Path, remote: &[String]) -> Result<(), GitError> {
        for branch in remote {
            let Some((_, local)) = branch.split_once('/') else {
                continue;
            };
            // an existing local branch makes this fail; it is tracked already
            let _ = run(repo, &["branch", "--track", local, branch]);
        }
        checked(repo, &["fetch", "--all"]).map(|_| ())
    }
}

/// What [`clone_or_fetch`] did for one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mirrored {
    Cloned,
    Fetched(Vec<String>),
}

/// Fetch into `<clone_to>/<repo>.git` when it exists, else clone a mirror
/// from `using` with `<repo>` replaced by `repo`.  `using` may carry extra
/// clone arguments separated by spaces.
pub fn clone_or_fetch(
    git: &mut dyn Git,
    clone_to: &Path,
    repo: &str,
    using: &str,
) -> Result<Mirrored, GitError> {
    let dir = mirror_dir(clone_to, repo);
    if dir.is_dir() {
        return git.fetch(&dir).map(Mirrored::Fetched);
    }
    let source = using.replace("<repo>", repo);
    let source: Vec<&str> = source.split_whitespace().collect();
    git.clone_mirror(clone_to, &source)?;
    Ok(Mirrored::Cloned)
}


#[cfg(test)]
mod tests {
    use std::fs;

    use super::{fake::FakeGit, *};

    #[test]
    fn missing_mirror_is_cloned_with_repo_substituted() {
        let to = tempfile::tempdir().unwrap();
        let mut git = FakeGit::default();

        let done = clone_or_fetch(&mut git, to.path(), "tool", "git@github.com:me/<repo>").unwrap();

        assert_eq!(done, Mirrored::Cloned);
        assert_eq!(git.calls, vec!["clone git@github.com:me/tool"]);
        assert!(to.path().join("tool.git").is_dir());
    }

    #[test]
    fn existing_mirror_is_fetched() {
        let to = tempfile::tempdir().unwrap();
        fs::create_dir(to.path().join("tool.git")).unwrap();
        let mut git = FakeGit::default();

        let done = clone_or_fetch(&mut git, to.path(), "tool", "x/<repo>").unwrap();

        assert_eq!(done, Mirrored::Fetched(vec!["From origin".into()]));
        assert_eq!(git.calls.len(), 1);
        assert!(git.calls[0].starts_with("fetch "));
    }

    #[test]
    fn output_lines_are_trimmed_and_blank_free() {
        assert_eq!(lines(b"  a\n\n b \n"), vec!["a", "b"]);
    }
}
