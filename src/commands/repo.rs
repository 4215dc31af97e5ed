//! `diskput repo get` and `diskput repo add` — bare mirrors of git
//! repositories.
//!
//! # `repo get`
//!
//! | # | Step      | Failure                                             |
//! |---|-----------|-----------------------------------------------------|
//! | 1 | Servers   | file missing, undecodable, or a required key absent |
//! | 2 | Filter    | `--matches` leaves no server                        |
//! | 3 | Names     | an API request fails (stops the whole run)          |
//! | 4 | Mirror    | `clone.to` missing: reported, server skipped        |
//! | 5 | Summary   | any clone or fetch failed                           |

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use console::style;
use tracing::{info, warn};

use crate::{
    cli::{RepoAddArgs, RepoGetArgs},
    config::resolve_home,
    http::{Api, HttpApi},
    repos::{
        self, ReposConfig,
        git::{Git, GitCli, Mirrored, clone_or_fetch},
    },
    sync::Progress,
    ui::{self, BarProgress},
};

/// Outcome for one server, printed in the summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub name: String,
    pub found: usize,
    pub path: PathBuf,
    pub cloned: usize,
    pub fetched: usize,
    pub failed: usize,
    pub skipped: bool,
}

// ─── repo get ─────────────────────────────────────────────────────────────────

pub fn get(args: &RepoGetArgs) -> Result<()> {
    let api = HttpApi::new()?;
    let mut progress = BarProgress::new();
    let reports = get_with(args, &api, &mut GitCli, &mut progress, &mut io::stdout())?;

    let failed: usize = reports.iter().map(|r| r.failed).sum();
    if failed > 0 {
        bail!("{failed} repositories could not be cloned or fetched");
    }
    Ok(())
}

fn get_with(
    args: &RepoGetArgs,
    api: &dyn Api,
    git: &mut dyn Git,
    progress: &mut dyn Progress,
    out: &mut dyn Write,
) -> Result<Vec<ServerReport>> {
    let path = resolve_home(&args.servers.to_string_lossy());
    if !path.is_file() {
        bail!("Couldn't find config file in path: {}", path.display());
    }
    let mut cfg = ReposConfig::read(&path)?;
    if let Some(matches) = &args.matches {
        cfg.filter_servers(matches);
    }
    if cfg.servers.is_empty() {
        bail!("No server found!");
    }

    let mut reports = Vec::new();
    for server in &cfg.servers {
        writeln!(
            out,
            "\nCollecting repository names for: {}",
            style(&server.name).yellow()
        )?;
        let mut names = repos::repo_names(server, api)?;
        if let Some(matches) = &args.repo_matches {
            names.retain(|n| n.contains(matches.as_str()));
        }
        writeln!(out, "{} repository found. Cloning/Fetching...", style(names.len()).yellow())?;

        let mut report = ServerReport {
            name: server.name.clone(),
            found: names.len(),
            path: server.clone_to.clone(),
            ..ServerReport::default()
        };

        if !server.clone_to.is_dir() {
            writeln!(
                out,
                "{}",
                style(format!("Directory not found: {}", server.clone_to.display())).red()
            )?;
            report.skipped = true;
            reports.push(report);
            continue;
        }

        progress.start(names.len() as u64);
        for name in &names {
            progress.set_message(name);
            match clone_or_fetch(git, &server.clone_to, name, &server.clone_using) {
                Ok(Mirrored::Cloned) => report.cloned += 1,
                Ok(Mirrored::Fetched(lines)) => {
                    report.fetched += 1;
                    for line in lines {
                        writeln!(out, "{line}")?;
                    }
                },
                Err(e) => {
                    warn!(server = %server.name, repo = %name, "{e}");
                    writeln!(out, "{}", style(format!("{name}: {e}")).red())?;
                    report.failed += 1;
                },
            }
            progress.advance();
        }
        progress.finish();
        info!(?report, "server mirrored");
        reports.push(report);
    }

    writeln!(out, "\n{}", style("Clone/Fetch summary:").yellow())?;
    for r in &reports {
        writeln!(out)?;
        writeln!(out, "name: {}", style(&r.name).yellow())?;
        writeln!(out, "found repos count: {}", style(r.found).yellow())?;
        writeln!(out, "path to repos: {}", r.path.display())?;
        if !r.skipped {
            writeln!(
                out,
                "cloned: {}, fetched: {}, failed: {}",
                r.cloned, r.fetched, r.failed
            )?;
        }
    }
    Ok(reports)
}

// ─── repo add ─────────────────────────────────────────────────────────────────

pub fn add(args: &RepoAddArgs) -> Result<()> {
    let target = add_with(args, &mut GitCli, &mut io::stdout())?;
    ui::task(&format!("Mirrored to {}", target.display()), true);
    Ok(())
}

fn add_with(args: &RepoAddArgs, git: &mut dyn Git, out: &mut dyn Write) -> Result<PathBuf> {
    let to_dir = resolve_home(&args.to_dir.to_string_lossy());
    let repo = resolve_home(&args.repo_path.to_string_lossy());
    for dir in [&to_dir, &repo] {
        if !dir.is_dir() {
            bail!("Couldn't find folder in path: {}", dir.display());
        }
    }
    let repo = fs::canonicalize(&repo).with_context(|| format!("resolving {}", repo.display()))?;
    let name = repo_name(&repo);
    let target = repos::mirror_dir(&to_dir, &name);
    if target.exists() {
        bail!("Directory already exists: {}", target.display());
    }
    if !git.is_repo(&repo) {
        bail!("It's not a git repo: {}", repo.display());
    }

    if args.fetch_branches {
        let branches = git.remote_branches(&repo)?;
        if !branches.is_empty() {
            writeln!(
                out,
                "Getting/Fetching all remote branches of {}...",
                style(&name).yellow()
            )?;
            git.fetch_all_branches(&repo, &branches)?;
        }
    }

    writeln!(out, "Cloning {} to {}", style(&name).yellow(), target.display())?;
    let source = repo.to_string_lossy();
    git.clone_mirror(&to_dir, &[source.as_ref()])?;
    Ok(target)
}

fn repo_name(repo: &Path) -> String {
    repo.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{http::fake::FakeApi, repos::git::fake::FakeGit, ui::Silent};

    struct Run {
        result: Result<Vec<ServerReport>>,
        out: String,
        git: FakeGit,
    }

    fn run_get(servers: &Path, api: &FakeApi, git: FakeGit, extra: impl FnOnce(&mut RepoGetArgs)) -> Run {
        console::set_colors_enabled(false);
        let mut args = RepoGetArgs {
            servers: servers.to_path_buf(),
            matches: None,
            repo_matches: None,
        };
        extra(&mut args);
        let mut git = git;
        let mut out = Vec::new();
        let result = get_with(&args, api, &mut git, &mut Silent, &mut out);
        Run {
            result,
            out: String::from_utf8(out).unwrap(),
            git,
        }
    }

    fn servers_file(dir: &tempfile::TempDir, servers: serde_json::Value) -> PathBuf {
        let path = dir.path().join("servers.json");
        fs::write(&path, json!({ "servers": servers }).to_string()).unwrap();
        path
    }

    #[test]
    fn missing_servers_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_get(&dir.path().join("nope"), &FakeApi::default(), FakeGit::default(), |_| {});
        let err = run.result.unwrap_err().to_string();
        assert!(err.starts_with("Couldn't find config file in path:"), "{err}");
    }

    #[test]
    fn no_matching_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = servers_file(&dir, json!([{
            "name": "some name", "clone": {"to": "/some/path", "using": "u"},
            "repo-names": {"names": "repo-name"},
        }]));
        let run = run_get(&path, &FakeApi::default(), FakeGit::default(), |a| {
            a.matches = Some("notfoundserver".into());
        });
        assert_eq!(run.result.unwrap_err().to_string(), "No server found!");
    }

    #[test]
    fn missing_clone_dir_skips_the_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = servers_file(&dir, json!([{
            "name": "some name", "clone": {"to": "/some/not/found/path", "using": "u"},
            "repo-names": {"names": ["first", "second"]},
        }]));

        let run = run_get(&path, &FakeApi::default(), FakeGit::default(), |_| {});

        let reports = run.result.unwrap();
        assert!(reports[0].skipped);
        assert_eq!(reports[0].found, 2);
        assert!(run.git.calls.is_empty());
        for line in [
            "Collecting repository names for: some name",
            "2 repository found. Cloning/Fetching...",
            "Directory not found: /some/not/found/path",
            "Clone/Fetch summary:",
            "name: some name",
            "found repos count: 2",
            "path to repos: /some/not/found/path",
        ] {
            assert!(run.out.contains(line), "missing {line:?} in:\n{}", run.out);
        }
    }

    #[test]
    fn clones_new_and_fetches_existing_mirrors() {
        let dir = tempfile::tempdir().unwrap();
        let mirrors = dir.path().join("mirrors");
        fs::create_dir_all(mirrors.join("old.git")).unwrap();
        let path = servers_file(&dir, json!([{
            "name": "gh", "clone": {"to": mirrors, "using": "https://example.com/me/<repo>"},
            "repo-names": {"fromApi": "api/repos", "pattern": "*.name", "token": "t"},
        }]));
        let api = FakeApi::default().with_json("api/repos", json!([{"name": "old"}, {"name": "new"}]));

        let run = run_get(&path, &api, FakeGit::default(), |_| {});

        let reports = run.result.unwrap();
        assert_eq!((reports[0].cloned, reports[0].fetched, reports[0].failed), (1, 1, 0));
        assert_eq!(run.git.calls[1], "clone https://example.com/me/new");
        assert!(mirrors.join("new.git").is_dir());
        assert!(run.out.contains("From origin"));
        assert!(run.out.contains("cloned: 1, fetched: 1, failed: 0"));
        assert_eq!(api.requests.borrow()[0].1.as_deref(), Some("t"));
    }

    #[test]
    fn repo_filter_and_failures_are_counted() {
        let dir = tempfile::tempdir().unwrap();
        let path = servers_file(&dir, json!([{
            "name": "gh", "clone": {"to": dir.path(), "using": "src/<repo>"},
            "repo-names": {"names": ["tool-a", "tool-b", "other"]},
        }]));
        let mut git = FakeGit::default();
        git.failing.insert("src/tool-b".into());

        let run = run_get(&path, &FakeApi::default(), git, |a| a.repo_matches = Some("tool".into()));

        let reports = run.result.unwrap();
        assert_eq!(reports[0].found, 2);
        assert_eq!((reports[0].cloned, reports[0].failed), (1, 1));
        assert!(run.out.contains("tool-b: git clone --mirror src/tool-b exited with"));
    }

    #[test]
    fn api_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = servers_file(&dir, json!([{
            "name": "gh", "clone": {"to": dir.path(), "using": "u"},
            "repo-names": {"fromApi": "api/repos", "pattern": "items.*.name"},
        }]));

        let run = run_get(&path, &FakeApi::default(), FakeGit::default(), |_| {});

        assert!(run.result.unwrap_err().to_string().starts_with("Request failed with status code: 404."));
        assert!(run.out.contains("Collecting repository names for: gh"));
    }

    // ── repo add ─────────────────────────────────────────────────────────────

    fn run_add(repo: &Path, to: &Path, git: &mut FakeGit, fetch_branches: bool) -> (Result<PathBuf>, String) {
        console::set_colors_enabled(false);
        let args = RepoAddArgs {
            repo_path: repo.to_path_buf(),
            to_dir: to.to_path_buf(),
            fetch_branches,
        };
        let mut out = Vec::new();
        let result = add_with(&args, git, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn add_checks_folders_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nowhere = dir.path().join("nowhere");
        let mut git = FakeGit::default();

        let (res, _) = run_add(&nowhere, &nowhere, &mut git, true);
        assert_eq!(
            res.unwrap_err().to_string(),
            format!("Couldn't find folder in path: {}", nowhere.display())
        );

        let (res, _) = run_add(&nowhere, dir.path(), &mut git, true);
        assert_eq!(
            res.unwrap_err().to_string(),
            format!("Couldn't find folder in path: {}", nowhere.display())
        );
    }

    #[test]
    fn add_refuses_existing_mirror_and_non_repos() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("project");
        let to = dir.path().join("mirrors");
        fs::create_dir_all(&repo).unwrap();
        fs::create_dir_all(to.join("project.git")).unwrap();
        let mut git = FakeGit::default();

        let (res, _) = run_add(&repo, &to, &mut git, true);
        assert!(res.unwrap_err().to_string().starts_with("Directory already exists:"));

        fs::remove_dir(to.join("project.git")).unwrap();
        let (res, _) = run_add(&repo, &to, &mut git, true);
        assert!(res.unwrap_err().to_string().starts_with("It's not a git repo:"));
        assert!(git.calls.is_empty());
    }

    #[test]
    fn add_fetches_branches_then_clones() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path().join("project");
        let to = dir.path().join("mirrors");
        fs::create_dir_all(&repo).unwrap();
        fs::create_dir_all(&to).unwrap();
        let repo = fs::canonicalize(&repo).unwrap();
        let mut git = FakeGit {
            branches: vec!["origin/main".into(), "origin/dev".into()],
            ..FakeGit::default()
        };
        git.repos.insert(repo.clone());

        let (res, out) = run_add(&repo, &to, &mut git, true);

        assert_eq!(res.unwrap(), to.join("project.git"));
        assert_eq!(git.calls, vec![
            format!("fetch-all {} origin/main,origin/dev", repo.display()),
            format!("clone {}", repo.display()),
        ]);
        assert!(out.contains("Getting/Fetching all remote branches of project..."));
        assert!(out.contains("Cloning project to"));

        let mut git = FakeGit {
            branches: vec!["origin/main".into()],
            ..FakeGit::default()
        };
        git.repos.insert(repo.clone());
        fs::remove_dir_all(to.join("project.git")).unwrap();
        let (res, _) = run_add(&repo, &to, &mut git, false);
        res.unwrap();
        assert_eq!(git.calls, vec![format!("clone {}", repo.display())]);
    }
}
