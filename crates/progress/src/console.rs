//! Carriage-return console counter.

use std::io::{self, Write};
use std::sync::Mutex;

use crate::sink::ProgressSink;

/// Renders progress as a single self-overwriting line on stderr.
///
/// Output looks like `Syncing [3/7] fetch-deps`, rewritten in place on
/// each update and terminated with a newline by `end`. Write errors are
/// ignored; a broken pipe must not take the run down with it.
pub struct ConsoleProgress {
    title: String,
    last_len: Mutex<usize>,
}

impl ConsoleProgress {
    /// Create a console sink with a line title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            last_len: Mutex::new(0),
        }
    }
}

/// Build the visible part of the progress line.
fn format_line(title: &str, finished: usize, total: usize, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{title} [{finished}/{total}] {label}"),
        None => format!("{title} [{finished}/{total}]"),
    }
}

impl ProgressSink for ConsoleProgress {
    fn update(&self, finished: usize, total: usize, label: Option<&str>) {
        let line = format_line(&self.title, finished, total, label);
        let mut last_len = self.last_len.lock().unwrap();
        // Pad with spaces so a shorter line fully covers the previous one.
        let pad = last_len.saturating_sub(line.len());
        let mut err = io::stderr().lock();
        let _ = write!(err, "\r{}{}", line, " ".repeat(pad));
        let _ = err.flush();
        *last_len = line.len();
    }

    fn end(&self) {
        let mut last_len = self.last_len.lock().unwrap();
        let mut err = io::stderr().lock();
        let _ = writeln!(err, "\r{} done{}", self.title, " ".repeat(*last_len));
        *last_len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_includes_counts_and_label() {
        assert_eq!(
            format_line("Syncing", 3, 7, Some("fetch-deps")),
            "Syncing [3/7] fetch-deps"
        );
    }

    #[test]
    fn line_without_label_is_just_the_counter() {
        assert_eq!(format_line("Syncing", 0, 4, None), "Syncing [0/4]");
    }
}
