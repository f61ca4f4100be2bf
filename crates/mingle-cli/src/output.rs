//! Output layer for the run summary.
//!
//! The assignment itself always goes to the output CSV; stdout only carries a
//! short summary, rendered as pretty text for humans, tab-separated rows for
//! scripts, or JSON.
//!
//! # Output mode resolution
//!
//! Precedence (highest wins):
//! 1. `--format` / `--json` flag
//! 2. `FORMAT` env var → `"pretty"` | `"text"` | `"json"`
//! 3. `output` key from the config files
//! 4. Default: [`OutputMode::Pretty`] if stdout is a TTY; [`OutputMode::Text`] if piped.

use clap::ValueEnum;
use mingle_core::config::normalize_output_mode;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Width of the dashed rule under each summary heading.
pub const SECTION_RULE_WIDTH: usize = 72;

/// Write a summary heading underlined with dashes.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}\n{}", "-".repeat(SECTION_RULE_WIDTH))
}

/// Write one `key: value` summary line, keys padded to a common column.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Human-optimized output (sections, aligned keys).
    Pretty,
    /// Tab-separated rows for pipes and scripts.
    Text,
    /// Machine-readable JSON.
    Json,
}

impl OutputMode {
    fn from_normalized(name: &str) -> Option<Self> {
        match normalize_output_mode(name)? {
            "json" => Some(Self::Json),
            "text" => Some(Self::Text),
            _ => Some(Self::Pretty),
        }
    }
}

/// Output-related global flags, carried from `main` into commands.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputRequest {
    pub format: Option<OutputMode>,
    pub json: bool,
    pub quiet: bool,
}

impl OutputRequest {
    /// Resolve the final mode given the config file's `output` value.
    pub fn resolve(&self, configured: Option<&str>) -> OutputMode {
        let env_val = std::env::var("FORMAT").ok();
        let is_tty = io::stdout().is_terminal();
        resolve_output_mode_inner(self.format, self.json, env_val.as_deref(), configured, is_tty)
    }
}

/// Core resolution logic, separated from I/O for testability.
fn resolve_output_mode_inner(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    configured: Option<&str>,
    is_tty: bool,
) -> OutputMode {
    if let Some(mode) = format_flag {
        return mode;
    }

    if json_flag {
        return OutputMode::Json;
    }

    // unknown values fall through to the next source
    if let Some(mode) = format_env.and_then(OutputMode::from_normalized) {
        return mode;
    }

    if let Some(mode) = configured.and_then(OutputMode::from_normalized) {
        return mode;
    }

    if is_tty {
        OutputMode::Pretty
    } else {
        OutputMode::Text
    }
}

/// Render a serializable value with explicit pretty/text renderers.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_flag_wins() {
        let mode = resolve_output_mode_inner(Some(OutputMode::Text), true, Some("json"), Some("json"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_beats_env_and_config() {
        let mode = resolve_output_mode_inner(None, true, Some("text"), Some("pretty"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn env_beats_config() {
        let mode = resolve_output_mode_inner(None, false, Some("JSON"), Some("text"), true);
        assert_eq!(mode, OutputMode::Json);
    }

    #[test]
    fn config_used_when_env_unknown() {
        let mode = resolve_output_mode_inner(None, false, Some("yaml"), Some("table"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn tty_fallback() {
        assert_eq!(
            resolve_output_mode_inner(None, false, None, None, true),
            OutputMode::Pretty
        );
        assert_eq!(
            resolve_output_mode_inner(None, false, None, None, false),
            OutputMode::Text
        );
    }

    #[test]
    fn pretty_kv_aligns_keys() {
        let mut buf = Vec::new();
        pretty_kv(&mut buf, "records", "12").unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "records:     12\n");
    }

    #[test]
    fn pretty_section_draws_rule() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Run").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Run"));
        assert_eq!(lines.next().map(str::len), Some(SECTION_RULE_WIDTH));
    }
}
