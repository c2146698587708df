//! Terminal output for CLI commands.
//!
//! Every command prints through this module so `--json` and `--quiet`
//! behave the same everywhere. In JSON mode each line is an object of the
//! form `{"type": ..., "payload": ...}`; command results that are a single
//! document use [`json_document`] instead.

use std::fmt::Display;
use std::sync::atomic::{AtomicU8, Ordering};

use owo_colors::OwoColorize;
use serde_json::{json, Value};

/// Output flags taken from the global CLI arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    pub json: bool,
    pub quiet: bool,
}

impl OutputConfig {
    #[must_use]
    pub const fn new(json: bool, quiet: bool) -> Self {
        Self { json, quiet }
    }

    const fn mode(self) -> Mode {
        match (self.json, self.quiet) {
            (true, _) => Mode::Json,
            (false, true) => Mode::Quiet,
            (false, false) => Mode::Human,
        }
    }
}

/// JSON wins over quiet: scripts always get their payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Mode {
    Human = 0,
    Quiet = 1,
    Json = 2,
}

static MODE: AtomicU8 = AtomicU8::new(Mode::Human as u8);

fn mode() -> Mode {
    match MODE.load(Ordering::Relaxed) {
        2 => Mode::Json,
        1 => Mode::Quiet,
        _ => Mode::Human,
    }
}

/// Apply output settings from global CLI flags.
pub fn configure(config: OutputConfig) {
    MODE.store(config.mode() as u8, Ordering::Relaxed);
}

/// Force colors on or off; `None` leaves terminal detection in charge.
pub fn set_color(enabled: Option<bool>) {
    match enabled {
        Some(enabled) => owo_colors::set_override(enabled),
        None => owo_colors::unset_override(),
    }
}

#[must_use]
pub fn is_json() -> bool {
    mode() == Mode::Json
}

#[must_use]
pub fn is_quiet() -> bool {
    mode() == Mode::Quiet
}

fn json_line(kind: &str, payload: Value) -> String {
    json!({ "type": kind, "payload": payload }).to_string()
}

/// Print `human` unless quiet, or a typed JSON line in JSON mode.
fn emit(kind: &str, payload: impl FnOnce() -> Value, human: impl FnOnce() -> String) {
    match mode() {
        Mode::Json => println!("{}", json_line(kind, payload())),
        Mode::Quiet => {}
        Mode::Human => println!("{}", human()),
    }
}

/// Emit a complete JSON document for a command result.
pub fn json_document(payload: &Value) {
    println!("{payload}");
}

/// Print the program name and version.
pub fn header(version: &str) {
    if mode() == Mode::Human {
        println!("{} {}\n", "riskguard".bold(), version.dimmed());
    }
}

/// Print a section title.
pub fn section(title: &str) {
    emit(
        "section",
        || json!({ "title": title }),
        || format!("\n{}", title.bold()),
    );
}

/// Print a labeled value, labels aligned.
pub fn field(label: &str, value: impl Display) {
    let value = value.to_string();
    emit(
        "field",
        || json!({ "label": label, "value": value }),
        || format!("  {:<14} {}", label.dimmed(), value),
    );
}

pub fn success(message: &str) {
    emit(
        "success",
        || json!({ "message": message }),
        || format!("  {} {message}", "✓".green()),
    );
}

pub fn note(message: &str) {
    emit(
        "note",
        || json!({ "message": message }),
        || format!("  {}", message.dimmed()),
    );
}

/// Print a warning. Shown even in quiet mode.
pub fn warning(message: &str) {
    if is_json() {
        println!("{}", json_line("warning", json!({ "message": message })));
    } else {
        println!("  {} {message}", "⚠".yellow());
    }
}

/// Print an error to stderr. Shown even in quiet mode.
pub fn error(message: &str) {
    if is_json() {
        eprintln!("{}", json_line("error", json!({ "message": message })));
    } else {
        eprintln!("  {} {message}", "×".red());
    }
}

/// Print one stored alert, colored by severity.
pub fn alert(timestamp: &str, level: &str, message: &str) {
    emit(
        "alert",
        || json!({ "timestamp": timestamp, "level": level, "message": message }),
        || {
            let padded = format!("{level:<8}");
            let level = match level {
                "critical" => padded.red().bold().to_string(),
                "error" => padded.red().to_string(),
                "warning" => padded.yellow().to_string(),
                _ => padded.cyan().to_string(),
            };
            format!("  {} {level} {message}", timestamp.dimmed())
        },
    );
}

/// Style `value` for a terminal; JSON mode keeps it plain.
fn styled(value: impl Display, style: impl FnOnce(&String) -> String) -> String {
    let value = value.to_string();
    if is_json() {
        value
    } else {
        style(&value)
    }
}

/// A gain or a healthy state.
pub fn positive(value: impl Display) -> String {
    styled(value, |v| v.green().to_string())
}

/// A loss or a tripped state.
pub fn negative(value: impl Display) -> String {
    styled(value, |v| v.red().to_string())
}

pub fn muted(value: impl Display) -> String {
    styled(value, |v| v.dimmed().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_takes_precedence_over_quiet() {
        assert_eq!(OutputConfig::new(true, true).mode(), Mode::Json);
        assert_eq!(OutputConfig::new(false, true).mode(), Mode::Quiet);
        assert_eq!(OutputConfig::default().mode(), Mode::Human);
    }

    #[test]
    fn json_lines_carry_type_and_payload() {
        let line: Value = serde_json::from_str(&json_line("field", json!({ "label": "x" }))).unwrap();
        assert_eq!(line["type"], "field");
        assert_eq!(line["payload"]["label"], "x");
    }
}
