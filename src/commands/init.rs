//! `diskput init` — scaffold a starter `diskput.toml`.

use std::{fs, path::Path};

use anyhow::{Context, Result, bail};

use crate::ui;

const TEMPLATE: &str = r#"# diskput configuration
#
# Every [disks.NAME] table is one disk usable with `diskput put --disk NAME`.
# Keys other than `driver` and `root` are authorization tokens; they can be
# filled in at upload time with `--disk-tokens FILE`.

[disks.local]
driver = "local"
root   = "./.diskput"

# [disks.backups]
# driver = "local"
# root   = "~/backups"

[put]
# Existing file that upload events are appended to (same as --log-to).
# log_to = "~/diskput.log"
"#;

pub fn run(path: &Path) -> Result<()> {
    if path.exists() {
        bail!(
            "{} already exists; remove it first to generate a new one",
            path.display()
        );
    }
    fs::write(path, TEMPLATE).with_context(|| format!("writing {}", path.display()))?;
    ui::task(&format!("Created {}", path.display()), true);
    Ok(())
}
