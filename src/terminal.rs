//! Width-fitting and size formatting for single-line terminal output.

use console::Term;

/// Marker appended to a truncated string.
const ELLIPSIS: &str = "..";

/// Current terminal width in columns (`79` when not attached to a tty).
pub fn width() -> usize {
    usize::from(Term::stdout().size().1)
}

/// Human-readable byte count.
///
/// Kilobytes are 1024-based; megabytes are 10⁶-based and gigabytes are
/// derived from the rounded megabyte figure.
pub fn readable_size(bytes: u64) -> String {
    fn round2(v: f64) -> f64 {
        (v * 100.0).round() / 100.0
    }

    if bytes < 1024 {
        return format!("{bytes} bytes");
    }
    if bytes < 1_048_576 {
        return format!("{} KB", round2(bytes as f64 / 1024.0));
    }

    let mb = round2(bytes as f64 / 1_000_000.0);
    let gb = round2(mb / 1024.0);
    if gb >= 1.0 {
        format!("{gb} GB")
    } else {
        format!("{mb} MB")
    }
}

/// Shorten `s` so it fits in `width` columns after `used` are taken.
pub fn fit_width(s: &str, used: usize, width: usize) -> String {
    let Some(available) = width
        .checked_sub(used + ELLIPSIS.len())
        .filter(|a| *a > 0)
    else {
        return ELLIPSIS.to_string();
    };

    if available > s.chars().count() {
        return s.to_string();
    }
    let head: String = s.chars().take(available).collect();
    format!("{head}{ELLIPSIS}")
}

/// `first` and `second` on one line, the gap between them filled with `-`.
pub fn two_col(first: &str, second: &str, width: usize) -> String {
    let used = first.chars().count() + second.chars().count();
    let remained = width.saturating_sub(used);

    let mut line = String::with_capacity(width);
    line.push_str(first);
    line.push(' ');
    if remained > 2 {
        line.push_str(&"-".repeat(remained - 2));
        line.push(' ');
    }
    line.push_str(second);
    line
}
