//! Dual-destination output: interactive console plus a durable session log.
//!
//! The console handle is shared with the status animator behind a mutex, so
//! exactly one writer touches the terminal at a time. The durable copy is
//! ASCII-normalized and timestamped per line; it stays readable in
//! environments that cannot render the console's glyphs.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;

/// Bound on the sanitized report-filename stem.
const FILENAME_STEM_CHARS: usize = 50;

/// Mutex-guarded console writer, shared between the sink and the animator.
pub type ConsoleHandle = Arc<Mutex<Box<dyn Write + Send>>>;

/// Console handle over the process stdout.
pub fn stdout_console() -> ConsoleHandle {
    Arc::new(Mutex::new(Box::new(std::io::stdout())))
}

/// Console handle over an arbitrary writer (tests, capture).
pub fn console_over(writer: impl Write + Send + 'static) -> ConsoleHandle {
    Arc::new(Mutex::new(Box::new(writer)))
}

/// Append-only writer pair: interactive console + durable session log.
pub struct OutputSink {
    console: ConsoleHandle,
    durable: Option<BufWriter<File>>,
}

impl OutputSink {
    /// Sink with no durable log (console only).
    pub fn new(console: ConsoleHandle) -> Self {
        Self {
            console,
            durable: None,
        }
    }

    /// Sink with a fresh timestamped session log under `logs_dir`.
    pub fn with_session_log(console: ConsoleHandle, logs_dir: &Path) -> Result<(Self, PathBuf)> {
        fs::create_dir_all(logs_dir)
            .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;
        let path = logs_dir.join(format!(
            "session_{}.log",
            Local::now().format("%Y%m%d_%H%M%S")
        ));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create session log {}", path.display()))?;
        Ok((
            Self {
                console,
                durable: Some(BufWriter::new(file)),
            },
            path,
        ))
    }

    /// A clone of the console handle, for the animator.
    pub fn console(&self) -> ConsoleHandle {
        Arc::clone(&self.console)
    }

    /// Appends one line to the selected destinations. Console output is
    /// verbatim; the durable copy is timestamped and ASCII-normalized.
    /// Write failures on either destination never fail the session.
    pub fn write(&mut self, line: &str, to_console: bool, to_durable: bool) {
        if to_console && let Ok(mut console) = self.console.lock() {
            let _ = writeln!(console, "{line}");
            let _ = console.flush();
        }
        if to_durable && let Some(durable) = self.durable.as_mut() {
            let stamp = Local::now().format("%H:%M:%S");
            let _ = writeln!(durable, "[{stamp}] {}", normalize_ascii(line));
        }
    }

    /// Writes console-only text without a newline, flushed immediately.
    /// Used for token fragments and dot-progress.
    pub fn fragment(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Ok(mut console) = self.console.lock() {
            let _ = write!(console, "{text}");
            let _ = console.flush();
        }
    }

    /// Flushes both destinations, best effort.
    pub fn flush(&mut self) {
        if let Ok(mut console) = self.console.lock() {
            let _ = console.flush();
        }
        if let Some(durable) = self.durable.as_mut() {
            let _ = durable.flush();
        }
    }
}

/// Persists a report as a timestamped Markdown artifact under `reports_dir`
/// and returns its path.
pub fn save_report(reports_dir: &Path, question: &str, report: &str) -> Result<PathBuf> {
    fs::create_dir_all(reports_dir).with_context(|| {
        format!(
            "Failed to create report directory {}",
            reports_dir.display()
        )
    })?;

    let now = Local::now();
    let path = reports_dir.join(format!(
        "{}_{}.md",
        sanitize_filename(question),
        now.format("%Y%m%d_%H%M%S")
    ));
    let contents = format!(
        "# Research Report\n\n**Question:** {question}\n\n**Generated:** {}\n\n---\n\n{report}\n",
        now.format("%Y-%m-%d %H:%M:%S")
    );
    fs::write(&path, contents)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(path)
}

/// Derives a filesystem-safe stem from a question: whitelist of alphanumeric,
/// space, underscore and hyphen, bounded length, `research` when nothing
/// survives. Re-sanitizing a sanitized stem is a no-op.
pub fn sanitize_filename(question: &str) -> String {
    let stem: String = question
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .take(FILENAME_STEM_CHARS)
        .collect();
    let stem = stem.trim();
    if stem.is_empty() {
        "research".to_string()
    } else {
        stem.to_string()
    }
}

/// Replaces box-drawing, block and bar glyphs with ASCII equivalents.
/// Characters outside the table pass through unchanged.
pub fn normalize_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '█' | '▓' => out.push('#'),
            '░' | '▒' => out.push('.'),
            '─' | '━' | '═' => out.push('-'),
            '│' | '┃' | '║' => out.push('|'),
            '┌' | '┐' | '└' | '┘' | '├' | '┤' | '┬' | '┴' | '┼' | '╔' | '╗' | '╚' | '╝' | '╠'
            | '╣' | '╦' | '╩' | '╬' => out.push('+'),
            other => out.push(other),
        }
    }
    out
}
