//! `diskput gist get` — archive a user's gists with their comments.

use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Result, bail};
use console::style;

use crate::{
    cli::GistGetArgs,
    config::resolve_home,
    gists::{Account, Archiver},
    http::{Api, HttpApi},
};

pub fn run(args: &GistGetArgs) -> Result<()> {
    let (to_dir, account) = prepare(args)?;
    let api = HttpApi::new()?;
    archive(&api, &account, &to_dir, args.desc_matches.as_deref(), &mut io::stdout())?;
    Ok(())
}

/// Validate the destination, then read the account file.
fn prepare(args: &GistGetArgs) -> Result<(PathBuf, Account)> {
    let to_dir = resolve_home(&args.to_dir.to_string_lossy());
    if !to_dir.is_dir() {
        bail!("Directory not found: {}", to_dir.display());
    }
    let path = resolve_home(&args.account.to_string_lossy());
    if !path.exists() {
        bail!("Config file not found: {}", path.display());
    }
    Ok((to_dir, Account::read(&path)?))
}

fn archive(
    api: &dyn Api,
    account: &Account,
    to_dir: &Path,
    desc_matches: Option<&str>,
    out: &mut dyn Write,
) -> Result<usize> {
    writeln!(out, "{}", style("Getting gists...").yellow())?;
    let processed = Archiver {
        api,
        account,
        to_dir,
        out: &mut *out,
    }
    .run(desc_matches)?;
    writeln!(out, "\nTotal proceeded gists: {}", style(processed).yellow())?;
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;
    use crate::http::fake::FakeApi;

    fn args(account: PathBuf, to_dir: PathBuf) -> GistGetArgs {
        GistGetArgs {
            account,
            to_dir,
            desc_matches: None,
        }
    }

    #[test]
    fn destination_is_checked_before_the_account() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = prepare(&args(missing.clone(), missing.clone())).unwrap_err();
        assert_eq!(err.to_string(), format!("Directory not found: {}", missing.display()));

        let err = prepare(&args(missing.clone(), dir.path().to_path_buf())).unwrap_err();
        assert_eq!(err.to_string(), format!("Config file not found: {}", missing.display()));
    }

    #[test]
    fn account_without_username_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let account = dir.path().join("account.json");
        fs::write(&account, r#"{ token: "t" }"#).unwrap();

        let err = prepare(&args(account, dir.path().to_path_buf())).unwrap_err();
        assert_eq!(err.to_string(), "no `username` key found in config.");
    }

    #[test]
    fn archive_reports_the_total() {
        console::set_colors_enabled(false);
        let dir = tempfile::tempdir().unwrap();
        let account = Account::from_value(&json!({"username": "me"})).unwrap();
        let api = FakeApi::default().with_json(&account.list_url(1), json!([]));
        let mut out = Vec::new();

        let processed = archive(&api, &account, dir.path(), None, &mut out).unwrap();

        assert_eq!(processed, 0);
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Getting gists..."));
        assert!(out.ends_with("\nTotal proceeded gists: 0\n"));
    }
}
