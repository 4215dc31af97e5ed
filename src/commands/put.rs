//! `diskput put` — upload a directory or a single file to a disk.
//!
//! # Flow (directory)
//!
//! | # | Step        | Failure                                      |
//! |---|-------------|----------------------------------------------|
//! | 1 | Log file    | `--log-to` names a file that does not exist  |
//! | 2 | Source      | directory missing                            |
//! | 3 | Disk        | name not configured, bad tokens, bad driver  |
//! | 4 | Check       | destination lookup fails                     |
//! | 5 | Mode        | destination exists and no answer was given   |
//! | 6 | Upload      | any remote call fails                        |
//!
//! Choosing "select new name" asks for another destination and starts over
//! from step 1 with it.

use std::{fs, path::Path};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::{
    cli::PutArgs,
    config::{Config, resolve_home},
    error::{RemoteOp, SyncError},
    store::{self, RemoteStore, open_store},
    sync::{SyncEngine, UploadMode},
    terminal::readable_size,
    tokens,
    ui::{self, BarProgress, Silent},
    upload_log::{ConsoleLog, LogFile},
};

// ─── Entry point ──────────────────────────────────────────────────────────────

pub fn run(args: &PutArgs, cfg: &Config) -> Result<()> {
    let log_file = open_log_file(args, cfg)?;

    match (&args.file, &args.dir) {
        (Some(file), _) => put_file(args, cfg, file, log_file),
        (None, Some(dir)) => put_dir(args, cfg, dir, log_file),
        (None, None) => bail!("either --dir or --file is required"),
    }
}

// ─── Directory upload ─────────────────────────────────────────────────────────

fn put_dir(args: &PutArgs, cfg: &Config, dir: &Path, log_file: Option<LogFile>) -> Result<()> {
    let dir = resolve_home(&dir.to_string_lossy());
    if !dir.is_dir() {
        return Err(SyncError::NotFound { path: dir }.into());
    }
    let dir = fs::canonicalize(&dir).with_context(|| format!("resolving {}", dir.display()))?;
    let dest = destination(args.to_dir.as_deref(), &dir);

    let mut store = open_disk(args, cfg)?;

    println!();
    ui::info("Checking disk...");
    let exists = store
        .directory_exists(&dest)
        .map_err(|e| SyncError::remote(RemoteOp::Check, &dest, e))?;

    let mode = if exists {
        choose_mode(args, &dest)?
    } else {
        UploadMode::Directly
    };
    debug!(%mode, dest = %dest, "upload mode");

    match mode {
        UploadMode::SelectNewName => {
            let default = format!("{dest}(1)");
            let to_dir = ui::ask("Write path (equivalent of --to-dir option)", &default)?;
            let next = PutArgs {
                to_dir: Some(to_dir),
                ..args.clone()
            };
            return run(&next, cfg);
        },
        UploadMode::DeleteFromDisk => {
            let mut log = ConsoleLog::new(log_file);
            let result = SyncEngine::new(store.as_mut(), &mut Silent, &mut log).run(mode, &dir, &dest);
            ui::task(&format!("Deleted {dest}/ from disk {}", args.disk), result.is_ok());
            result?;
            return Ok(());
        },
        _ => {},
    }

    println!("Uploading to disk: {}, path: {dest}/", args.disk);

    let mut progress = BarProgress::new();
    let mut log = ConsoleLog::new(log_file);
    log.attach(progress.bar());

    let result = SyncEngine::new(store.as_mut(), &mut progress, &mut log).run(mode, &dir, &dest);
    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            progress.abandon();
            ui::task(&format!("Upload {dest}/ to disk {}", args.disk), false);
            return Err(e.into());
        },
    };
    info!(?summary, "upload finished");

    println!();
    println!("Uploaded {} to {dest}/ successfully.", dir.display());
    println!(
        "total uploaded file size: {}",
        readable_size(summary.total_bytes_uploaded)
    );
    println!(
        "{} steps: {} uploaded, {} reused, {} unchanged, {} directories created",
        summary.steps,
        summary.files_uploaded,
        summary.files_moved,
        summary.files_skipped,
        summary.dirs_created
    );
    Ok(())
}

/// Mode from the flags, or asked interactively.
fn choose_mode(args: &PutArgs, dest: &str) -> Result<UploadMode> {
    if let Some(mode) = args.mode_flag() {
        return Ok(mode);
    }

    let labels: Vec<&str> = UploadMode::EXISTING_CHOICES
        .iter()
        .map(|m| m.describe())
        .collect();
    let question = format!("Directory {dest} exists in disk {}", args.disk);
    let picked = ui::choose(&question, &labels).context(
        "no upload mode chosen; pass one of --merge, --replace, --fresh, --upload-remained",
    )?;
    Ok(UploadMode::EXISTING_CHOICES[picked])
}

// ─── Single file upload ───────────────────────────────────────────────────────

fn put_file(args: &PutArgs, cfg: &Config, file: &Path, log_file: Option<LogFile>) -> Result<()> {
    let file = resolve_home(&file.to_string_lossy());
    if !file.is_file() {
        bail!("File not found in path: {}", file.display());
    }
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("File not found in path: {}", file.display()))?;
    let dest = match args.to_dir.as_deref() {
        Some(to_dir) => store::join(to_dir.trim_end_matches('/'), &name),
        None => name,
    };

    let mut store = open_disk(args, cfg)?;

    println!();
    ui::info("Checking disk...");
    let exists = store
        .exists(&dest)
        .map_err(|e| SyncError::remote(RemoteOp::Check, &dest, e))?;
    if exists {
        let question = format!(
            "File exists in disk: {} path: {dest} Do you want to delete and reupload file?",
            args.disk
        );
        if !ui::confirm(&question)? {
            bail!("File was not uploaded: {dest} already exists in disk {}", args.disk);
        }
        store
            .delete(&dest)
            .map_err(|e| SyncError::remote(RemoteOp::Delete, &dest, e))?;
    }

    println!("Uploading to disk: {}, path: {dest}", args.disk);
    let mut log = ConsoleLog::new(log_file);
    let size = SyncEngine::new(store.as_mut(), &mut Silent, &mut log).upload_single(&file, &dest)?;
    println!("Uploaded file size: {}", readable_size(size));
    Ok(())
}

// ─── Shared steps ─────────────────────────────────────────────────────────────

fn open_log_file(args: &PutArgs, cfg: &Config) -> Result<Option<LogFile>> {
    let Some(path) = args.log_to.as_deref().or(cfg.put.log_to.as_deref()) else {
        return Ok(None);
    };
    LogFile::existing(&resolve_home(path))
        .map(Some)
        .ok_or_else(|| anyhow!("File for logging not found: {path}"))
}

/// Look up the disk, apply `--disk-tokens` and open its store.
fn open_disk(args: &PutArgs, cfg: &Config) -> Result<Box<dyn RemoteStore>> {
    let Some(disk) = cfg.disks.get(&args.disk) else {
        bail!(
            "disk {} not found.\nSee available disk list via, diskput show-disk",
            args.disk
        );
    };
    let mut disk = disk.clone();

    if let Some(path) = &args.disk_tokens {
        let tokens = tokens::decode_path(&resolve_home(&path.to_string_lossy()))?;
        let applied = disk.apply_tokens(&tokens);
        debug!(disk = %args.disk, ?applied, "applied disk tokens");
    }

    open_store(&disk).with_context(|| format!("opening disk {}", args.disk))
}

/// `--to-dir` without trailing slashes, else the source directory's name.
fn destination(to_dir: Option<&str>, dir: &Path) -> String {
    match to_dir {
        Some(to_dir) => to_dir.trim_end_matches('/').to_string(),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args() -> PutArgs {
        PutArgs {
            dir: Some(PathBuf::from("photos")),
            file: None,
            disk: "local".into(),
            to_dir: None,
            disk_tokens: None,
            log_to: None,
            merge: false,
            replace: false,
            fresh: false,
            upload_remained: false,
        }
    }

    #[test]
    fn destination_defaults_to_directory_name() {
        assert_eq!(destination(None, Path::new("/home/me/photos")), "photos");
    }

    #[test]
    fn destination_trims_trailing_slashes() {
        assert_eq!(
            destination(Some("backups/photos//"), Path::new("/x")),
            "backups/photos"
        );
    }

    #[test]
    fn unknown_disk_points_to_show_disk() {
        let cfg = Config::default();
        let err = open_disk(&PutArgs { disk: "nope".into(), ..args() }, &cfg)
            .err()
            .unwrap();
        insta::assert_snapshot!(err.to_string(), @r"
        disk nope not found.
        See available disk list via, diskput show-disk
        ");
    }

    #[test]
    fn missing_log_file_is_reported() {
        let cfg = Config::default();
        let err = open_log_file(
            &PutArgs {
                log_to: Some("/no/such/diskput.log".into()),
                ..args()
            },
            &cfg,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "File for logging not found: /no/such/diskput.log");
    }

    #[test]
    fn log_file_falls_back_to_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut cfg = Config::default();
        cfg.put.log_to = Some(file.path().to_string_lossy().into_owned());
        assert!(open_log_file(&args(), &cfg).unwrap().is_some());
    }

    #[test]
    fn mode_flag_skips_the_prompt() {
        let picked = choose_mode(&PutArgs { merge: true, ..args() }, "photos").unwrap();
        assert_eq!(picked, UploadMode::Merge);
    }
}
