//! Command-line interface definition.
//!
//! All argument parsing lives here so the rest of the codebase can stay
//! agnostic to `clap`.  The `Cli` struct is parsed once in `main` and then
//! passed (by reference) into the command handlers.

use std::path::PathBuf;

use clap::{ArgAction, ArgGroup, Args, Parser};

use crate::sync::UploadMode;

/// Top-level CLI arguments, shared across every subcommand.
#[derive(Parser, Debug)]
#[command(
    name    = "diskput",
    about   = "Upload directory trees to a configured storage disk",
    version,
    // Show a compact two-column help layout.
    help_template = "\
{before-help}{name} {version}
{about}

{usage-heading} {usage}

{all-args}{after-help}"
)]
pub struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to `diskput.toml` in the current working directory.  Values
    /// from `~/.config/diskput/config.toml` are used for anything it omits.
    #[arg(short, long, default_value = "diskput.toml", global = true)]
    pub config: PathBuf,

    /// More diagnostics on stderr (`-v` info, `-vv` debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print the parsed configuration and exit without running anything.
    #[arg(long)]
    pub print_config: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Subcommand>,
}

#[derive(clap::Subcommand, Debug, PartialEq)]
pub enum Subcommand {
    /// Scaffold a `diskput.toml` in the current directory.
    ///
    /// Exits with an error if the file already exists to avoid accidental
    /// overwrites.
    Init,

    /// Upload a directory (or a single file) to a disk.
    Put(PutArgs),

    /// List the configured disks.
    ShowDisk,

    /// Keep bare mirrors of git repositories.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Archive a user's gists with their comments.
    Gist {
        #[command(subcommand)]
        command: GistCommand,
    },
}

#[derive(clap::Subcommand, Debug, PartialEq)]
pub enum RepoCommand {
    /// Clone or fetch every repository of the configured servers.
    Get(RepoGetArgs),

    /// Add a mirror of a local git repository to a directory.
    Add(RepoAddArgs),
}

#[derive(clap::Subcommand, Debug, PartialEq)]
pub enum GistCommand {
    /// Download every gist, its files and comments.
    Get(GistGetArgs),
}

/// Arguments of `diskput repo get`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RepoGetArgs {
    /// JSON5 file listing the servers to mirror.
    #[arg(long)]
    pub servers: PathBuf,

    /// Only servers whose name contains this text.
    #[arg(long)]
    pub matches: Option<String>,

    /// Only repositories whose name contains this text.
    #[arg(long)]
    pub repo_matches: Option<String>,
}

/// Arguments of `diskput repo add`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RepoAddArgs {
    /// Local git repository to mirror.
    #[arg(long)]
    pub repo_path: PathBuf,

    /// Directory receiving `<name>.git`.
    #[arg(long)]
    pub to_dir: PathBuf,

    /// Create local branches for every remote branch before cloning.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub fetch_branches: bool,
}

/// Arguments of `diskput gist get`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct GistGetArgs {
    /// JSON5 file with `username` and optionally `token`.
    #[arg(long)]
    pub account: PathBuf,

    /// Directory the gists are archived in.
    #[arg(long)]
    pub to_dir: PathBuf,

    /// Only gists whose description contains this text.
    #[arg(long)]
    pub desc_matches: Option<String>,
}

/// Arguments of `diskput put`.
#[derive(Args, Debug, Clone, PartialEq)]
#[command(group(ArgGroup::new("source").required(true).args(["dir", "file"])))]
#[command(group(ArgGroup::new("mode").args(["merge", "replace", "fresh", "upload_remained"])))]
pub struct PutArgs {
    /// Directory to upload.
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Single file to upload.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Disk to upload into.  See `diskput show-disk`.
    #[arg(long)]
    pub disk: String,

    /// Destination path on the disk.  Defaults to the directory's name.
    #[arg(long)]
    pub to_dir: Option<String>,

    /// JSON5 file with authorization values for the disk.
    #[arg(long)]
    pub disk_tokens: Option<PathBuf>,

    /// Existing file to append upload events to.
    #[arg(long)]
    pub log_to: Option<String>,

    /// When the destination exists, upload only new or changed files.
    #[arg(long)]
    pub merge: bool,

    /// When the destination exists, replace it, reusing unchanged files.
    #[arg(long)]
    pub replace: bool,

    /// When the destination exists, delete it first.
    #[arg(long)]
    pub fresh: bool,

    /// When the destination exists, upload only files it is missing.
    #[arg(long)]
    pub upload_remained: bool,
}

impl PutArgs {
    /// Mode picked by flag, if any.
    pub const fn mode_flag(&self) -> Option<UploadMode> {
        if self.merge {
            Some(UploadMode::Merge)
        } else if self.replace {
            Some(UploadMode::Replace)
        } else if self.fresh {
            Some(UploadMode::FreshDir)
        } else if self.upload_remained {
            Some(UploadMode::UploadRemained)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("diskput").chain(extra.iter().copied()))
    }

    fn put_args(extra: &[&str]) -> PutArgs {
        match parse(extra).unwrap().command {
            Some(Subcommand::Put(args)) => args,
            other => panic!("expected put, got {other:?}"),
        }
    }

    #[test]
    fn put_requires_a_source() {
        assert!(parse(&["put", "--disk", "local"]).is_err());
    }

    #[test]
    fn put_requires_a_disk() {
        assert!(parse(&["put", "--dir", "photos"]).is_err());
    }

    #[test]
    fn dir_and_file_conflict() {
        assert!(parse(&["put", "--disk", "local", "--dir", "a", "--file", "b"]).is_err());
    }

    #[test]
    fn mode_flags_are_exclusive() {
        assert!(parse(&["put", "--disk", "l", "--dir", "a", "--merge", "--replace"]).is_err());
    }

    #[test]
    fn mode_flag_maps_to_upload_mode() {
        let cases = [
            ("--merge", UploadMode::Merge),
            ("--replace", UploadMode::Replace),
            ("--fresh", UploadMode::FreshDir),
            ("--upload-remained", UploadMode::UploadRemained),
        ];
        for (flag, mode) in cases {
            let args = put_args(&["put", "--disk", "local", "--dir", "a", flag]);
            assert_eq!(args.mode_flag(), Some(mode), "{flag}");
        }
        let args = put_args(&["put", "--disk", "local", "--dir", "a"]);
        assert_eq!(args.mode_flag(), None);
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = parse(&["show-disk", "-vv", "--config", "other.toml"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, PathBuf::from("other.toml"));
        assert_eq!(cli.command, Some(Subcommand::ShowDisk));
    }

    #[test]
    fn repo_add_fetches_branches_unless_told_not_to() {
        let parse_add = |extra: &[&str]| match parse(extra).unwrap().command {
            Some(Subcommand::Repo {
                command: RepoCommand::Add(args),
            }) => args,
            other => panic!("expected repo add, got {other:?}"),
        };
        let base = ["repo", "add", "--repo-path", "r", "--to-dir", "m"];
        assert!(parse_add(&base).fetch_branches);

        let off: Vec<&str> = base.iter().copied().chain(["--fetch-branches", "false"]).collect();
        assert!(!parse_add(&off).fetch_branches);
    }

    #[test]
    fn repo_get_and_gist_get_require_their_files() {
        assert!(parse(&["repo", "get"]).is_err());
        assert!(parse(&["gist", "get", "--to-dir", "x"]).is_err());
        let cli = parse(&["gist", "get", "--account", "a.json5", "--to-dir", "x"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Subcommand::Gist {
                command: GistCommand::Get(GistGetArgs {
                    account: PathBuf::from("a.json5"),
                    to_dir: PathBuf::from("x"),
                    desc_matches: None,
                })
            })
        );
    }

    #[test]
    fn to_dir_is_kept_verbatim() {
        let args = put_args(&["put", "--disk", "local", "--dir", "a", "--to-dir", "x/y/"]);
        assert_eq!(args.to_dir.as_deref(), Some("x/y/"));
    }
}
