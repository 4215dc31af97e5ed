//! `diskput show-disk` — list the configured disks.
//!
//! Token values are never printed; a set token shows as `****`.

use console::style;

use crate::config::Config;

pub fn run(cfg: &Config) {
    println!();
    println!("{}", style("Available disks:").green());
    print!("{}", render(cfg));
}

fn render(cfg: &Config) -> String {
    let mut out = String::new();
    for (name, disk) in &cfg.disks {
        out.push_str(&format!("  {name}  (driver: {})\n", disk.driver));
        if let Some(root) = &disk.root {
            out.push_str(&format!("      root: {root}\n"));
        }
        for (key, value) in &disk.tokens {
            out.push_str(&format!("      {key}: {}\n", mask(value)));
        }
    }
    out
}

fn mask(value: &toml::Value) -> &'static str {
    match value {
        toml::Value::String(s) if s.is_empty() => "(not set)",
        _ => "****",
    }
}
