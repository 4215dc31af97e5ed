//! `diskput` — upload directory trees to configured storage disks.
//!
//! # Overview
//!
//! A disk is a named storage backend declared in `diskput.toml`.  `put`
//! mirrors a local directory onto a disk; when the destination already
//! exists the user picks how to reconcile it (merge, replace, upload only
//! what is missing, start fresh, delete, or pick another name).
//!
//! # Usage
//!
//! ```text
//! diskput init                                  # scaffold a diskput.toml
//! diskput show-disk                             # list configured disks
//! diskput put --disk local --dir ./photos       # upload a directory
//! diskput put --disk local --dir ./photos --merge
//! diskput put --disk local --file ./notes.txt --to-dir docs
//! diskput repo get --servers servers.json5     # clone or fetch mirrors
//! diskput repo add --repo-path ./app --to-dir ~/mirrors
//! diskput gist get --account gh.json5 --to-dir ~/gists
//! diskput --print-config                        # show parsed config
//! ```
//!
//! # Module layout
//!
//! | Module                   | Responsibility                                |
//! |--------------------------|-----------------------------------------------|
//! | [`cli`]                  | Argument types parsed by clap                 |
//! | [`config`]               | `Config` struct + TOML loader                 |
//! | [`tokens`]               | `--disk-tokens` JSON5 decoding                |
//! | [`store`]                | `RemoteStore` trait and the local adapter     |
//! | [`fs_tree`]              | Sorted local listings and step counting       |
//! | [`detect`]               | Local/remote change detection                 |
//! | [`sync`]                 | Upload engine and per-mode policies           |
//! | [`upload_log`]           | Per-item upload lines and log file            |
//! | [`terminal`]             | Size formatting and width fitting             |
//! | [`ui`]                   | Progress bar, task lines, prompts             |
//! | [`http`]                 | Blocking JSON API client                      |
//! | [`repos`]                | Servers file, repo names, git mirroring       |
//! | [`gists`]                | Gist listing and archiving                    |
//! | [`logging`]              | `tracing` subscriber setup                    |
//! | [`commands`]             | `init`, `put`, `show-disk`, `repo`, `gist`    |

mod cli;
mod commands;
mod config;
mod detect;
mod error;
mod fs_tree;
mod gists;
mod http;
mod logging;
mod repos;
mod store;
mod sync;
mod terminal;
mod tokens;
mod ui;
mod upload_log;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, GistCommand, RepoCommand, Subcommand};
use config::{PartialConfig, parse_partial};

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose);

    match &cli.command {
        // ── diskput init ──────────────────────────────────────────────────────
        Some(Subcommand::Init) => {
            commands::init::run(&cli.config)?;
        },

        // ── diskput show-disk ─────────────────────────────────────────────────
        Some(Subcommand::ShowDisk) => {
            let cfg = load_merged_config(&cli.config)?;
            commands::show_disk::run(&cfg);
        },

        // ── diskput put ───────────────────────────────────────────────────────
        Some(Subcommand::Put(args)) => {
            let cfg = load_merged_config(&cli.config)?;
            commands::put::run(args, &cfg)?;
        },

        // ── diskput repo get | repo add ───────────────────────────────────────
        Some(Subcommand::Repo { command }) => match command {
            RepoCommand::Get(args) => commands::repo::get(args)?,
            RepoCommand::Add(args) => commands::repo::add(args)?,
        },

        // ── diskput gist get ──────────────────────────────────────────────────
        Some(Subcommand::Gist {
            command: GistCommand::Get(args),
        }) => {
            commands::gist::run(args)?;
        },

        // ── diskput [--print-config] ──────────────────────────────────────────
        None => {
            let cfg = load_merged_config(&cli.config)?;

            if cli.print_config {
                println!("{cfg:#?}");
                return Ok(());
            }

            eprintln!("Nothing to do. Run 'diskput --help' to see the available commands.");
        },
    }

    Ok(())
}

/// Load configuration from two sources and merge them.
///
/// 1. `~/.config/diskput/config.toml` — global disks shared by every project
/// 2. `local_path` (default: `./diskput.toml`) — per-project overrides
///
/// Local values win on a per-field basis.  Either file may be absent.
fn load_merged_config(local_path: &std::path::Path) -> Result<config::Config> {
    let global_path = dirs_next::config_dir().map(|d| d.join("diskput").join("config.toml"));

    let global: PartialConfig = global_path
        .as_deref()
        .and_then(|p| parse_partial(p).ok().flatten())
        .unwrap_or_default();

    let local: PartialConfig = if let Some(p) = parse_partial(local_path)? {
        p
    } else {
        tracing::warn!(
            "config file '{}' not found, using defaults; run 'diskput init' to generate one",
            local_path.display()
        );
        PartialConfig::default()
    };

    Ok(global.merge(local).resolve())
}
