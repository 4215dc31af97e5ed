//! Subcommand handlers.
//!
//! Each file in this module corresponds to one user-facing command:
//!
//! | File           | Invocation           | Description                        |
//! |----------------|----------------------|------------------------------------|
//! | `gist.rs`      | `diskput gist get`   | Archive gists and their comments   |
//! | `init.rs`      | `diskput init`       | Scaffold a `diskput.toml`          |
//! | `put.rs`       | `diskput put`        | Upload a directory or a file       |
//! | `repo.rs`      | `diskput repo get`   | Clone or fetch configured mirrors  |
//! |                | `diskput repo add`   | Mirror a local repository          |
//! | `show_disk.rs` | `diskput show-disk`  | List configured disks              |

pub mod gist;
pub mod init;
pub mod put;
pub mod repo;
pub mod show_disk;
