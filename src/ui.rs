//! Terminal UI — progress bar, task lines and interactive prompts.
//!
//! # Design goals
//!
//! - **Quiet by default.** While an upload runs the user sees one progress bar; per-item lines
//!   are printed above it by [`crate::upload_log::ConsoleLog`].
//! - **Prompts only when needed.** Questions are asked only when the destination already exists
//!   and no mode flag was given.  Prompts read plain lines from stdin so they can be scripted; end
//!   of input is an error rather than a silent default.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::sync::Progress;

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Green ✓  — printed when a task succeeds.
fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
/// Red ✗    — printed when a task fails.
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}

// ─── Task lines ───────────────────────────────────────────────────────────────

/// Print `label: ✓` or `label: ✗`.
pub fn task(label: &str, success: bool) {
    println!("{}", task_line(label, success));
}

fn task_line(label: &str, success: bool) -> String {
    let icon = if success { icon_ok() } else { icon_err() };
    format!("{label}: {icon}")
}

/// Green status line, e.g. `Checking disk...`.
pub fn info(text: &str) {
    println!("{}", style(text).green());
}

// ─── Progress bar ─────────────────────────────────────────────────────────────

/// [`Progress`] rendered with indicatif.
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                " {pos}/{len}  {percent:>3}%    ({elapsed:>6}/{eta:<6})  {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Handle for printing above the bar.
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    /// Leave the bar where it stopped after a failure.
    pub fn abandon(&self) {
        self.bar.abandon();
    }
}

impl Progress for BarProgress {
    fn start(&mut self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.reset_elapsed();
    }

    fn set_message(&mut self, text: &str) {
        self.bar.set_message(text.to_string());
    }

    fn advance(&mut self) {
        self.bar.inc(1);
    }

    fn finish(&mut self) {
        self.bar.set_message("");
        self.bar.finish();
    }
}

/// [`Progress`] that shows nothing.
pub struct Silent;

impl Progress for Silent {
    fn start(&mut self, _total: u64) {}
    fn set_message(&mut self, _text: &str) {}
    fn advance(&mut self) {}
    fn finish(&mut self) {}
}

// ─── Prompts ──────────────────────────────────────────────────────────────────

fn read_answer(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Pick one of `options` by index or by its exact text.
pub fn choose(question: &str, options: &[&str]) -> Result<usize> {
    choose_from(&mut io::stdin().lock(), question, options)
}

fn choose_from(input: &mut impl BufRead, question: &str, options: &[&str]) -> Result<usize> {
    loop {
        println!();
        println!(" {}:", style(question).green());
        for (i, option) in options.iter().enumerate() {
            println!("  [{}] {option}", style(i).yellow());
        }
        print!(" > ");
        io::stdout().flush()?;

        let Some(answer) = read_answer(input)? else {
            bail!("no answer given to: {question}");
        };
        if let Ok(i) = answer.parse::<usize>() {
            if i < options.len() {
                return Ok(i);
            }
        }
        if let Some(i) = options.iter().position(|o| *o == answer) {
            return Ok(i);
        }
        eprintln!("  {} Value \"{answer}\" is invalid", icon_err());
    }
}

/// Free-text question; an empty answer takes `default`.
pub fn ask(question: &str, default: &str) -> Result<String> {
    ask_from(&mut io::stdin().lock(), question, default)
}

fn ask_from(input: &mut impl BufRead, question: &str, default: &str) -> Result<String> {
    println!();
    println!(" {} [{}]:", style(question).green(), style(default).yellow());
    print!(" > ");
    io::stdout().flush()?;

    match read_answer(input)? {
        Some(answer) if !answer.is_empty() => Ok(answer),
        Some(_) => Ok(default.to_string()),
        None => bail!("no answer given to: {question}"),
    }
}

/// Yes/no question; anything but `y`/`yes` is no.
pub fn confirm(question: &str) -> Result<bool> {
    confirm_from(&mut io::stdin().lock(), question)
}

fn confirm_from(input: &mut impl BufRead, question: &str) -> Result<bool> {
    println!();
    println!(" {} (yes/no) [no]:", style(question).green());
    print!(" > ");
    io::stdout().flush()?;

    let answer = read_answer(input)?.unwrap_or_default().to_lowercase();
    Ok(matches!(answer.as_str(), "y" | "yes"))
}

// ─── Tests ────────────────────────────────────────────────────────────────────
