//! Rendering of reports and errors for `lachesis` commands.
//!
//! Every report can be printed three ways. The mode is picked in this order:
//! an explicit `--format` (or the hidden `--json`), then the `FORMAT`
//! environment variable, then `pretty` on a terminal and `text` in a pipe.

use clap::ValueEnum;
use lachesis_core::{ErrorCode, IngestError, LineError};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Column width of the dashed rule in pretty output.
pub const PRETTY_RULE_WIDTH: usize = 72;

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(PRETTY_RULE_WIDTH))
}

/// A heading line underlined by [`pretty_rule`].
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    pretty_rule(w)
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{key}:");
    writeln!(w, "{label:<12} {}", value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Sectioned report for a terminal.
    Pretty,
    /// One whitespace-separated row per event or frame.
    Text,
    /// The report serialized as JSON.
    Json,
}

impl OutputMode {
    fn from_env_value(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Some(Self::Pretty),
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

fn pick_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    stdout_is_tty: bool,
) -> OutputMode {
    format_flag
        .or_else(|| json_flag.then_some(OutputMode::Json))
        .or_else(|| format_env.and_then(OutputMode::from_env_value))
        .unwrap_or(if stdout_is_tty {
            OutputMode::Pretty
        } else {
            OutputMode::Text
        })
}

/// The mode for this process, from flags, `FORMAT` and whether stdout is a TTY.
pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let format_env = std::env::var("FORMAT").ok();
    pick_mode(
        format_flag,
        json_flag,
        format_env.as_deref(),
        io::stdout().is_terminal(),
    )
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

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A failed command as shown to the user: the full context chain, the
/// catalog code and the catalog hint.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// `E####` from [`ErrorCode`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

/// Classify an error chain into one of the shared [`ErrorCode`]s.
pub fn error_code(err: &anyhow::Error) -> ErrorCode {
    if let Some(ingest) = err.downcast_ref::<IngestError>() {
        return ingest.code();
    }
    if let Some(line) = err.downcast_ref::<LineError>() {
        return line.code();
    }
    if err.downcast_ref::<toml::de::Error>().is_some() {
        return ErrorCode::ConfigParseError;
    }
    if err.downcast_ref::<io::Error>().is_some() {
        return ErrorCode::InputReadFailed;
    }
    ErrorCode::InternalUnexpected
}

impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let code = error_code(err);
        Self {
            message: format!("{err:#}"),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// Print `error` on stderr: a `{"error": ...}` object in JSON mode, else an
/// `error[E####]: ...` line and the hint.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, &serde_json::json!({ "error": error }))?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(out, "error[{code}]: {}", error.message)?,
                None => writeln!(out, "error: {}", error.message)?,
            }
            if let Some(hint) = &error.suggestion {
                writeln!(out, "  suggestion: {hint}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use lachesis_core::{EventId, parse_lines};

    #[test]
    fn explicit_format_beats_json_flag_and_env() {
        let mode = pick_mode(Some(OutputMode::Text), true, Some("pretty"), true);
        assert_eq!(mode, OutputMode::Text);
    }

    #[test]
    fn json_flag_beats_env() {
        assert_eq!(pick_mode(None, true, Some("text"), true), OutputMode::Json);
    }

    #[test]
    fn env_value_ignores_case() {
        assert_eq!(pick_mode(None, false, Some("JSON"), true), OutputMode::Json);
    }

    #[test]
    fn unrecognized_env_uses_terminal_default() {
        assert_eq!(pick_mode(None, false, Some("yaml"), true), OutputMode::Pretty);
        assert_eq!(pick_mode(None, false, None, false), OutputMode::Text);
    }

    #[test]
    fn ingest_errors_keep_their_code_through_context() {
        let err = anyhow::Error::new(IngestError::MissingAncestor {
            event: EventId::new("a2"),
            parent: EventId::new("a1"),
        })
        .context("log.jsonl:2: failed to seal event");
        let cli = CliError::from(&err);
        assert_eq!(cli.error_code.as_deref(), Some("E2002"));
        assert!(cli.message.contains("unknown parent a1"));
        assert!(cli.suggestion.is_some());
    }

    #[test]
    fn malformed_lines_map_to_malformed_event() {
        let err = parse_lines("nope")
            .context("failed to parse log.jsonl")
            .unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::MalformedEvent);
    }

    #[test]
    fn io_errors_map_to_input_read_failed() {
        let err = std::fs::read_to_string("/definitely/not/here.jsonl")
            .context("failed to read event log")
            .unwrap_err();
        assert_eq!(error_code(&err), ErrorCode::InputReadFailed);
    }

    #[test]
    fn cli_error_json_omits_absent_fields() {
        let err = CliError {
            message: "line 2: seq must be at least 1".to_string(),
            suggestion: None,
            error_code: Some(ErrorCode::MalformedEvent.code().to_string()),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["error_code"], "E2001");
        assert!(json.get("suggestion").is_none());
        for mode in [OutputMode::Json, OutputMode::Pretty, OutputMode::Text] {
            assert!(render_error(mode, &err).is_ok());
        }
    }

    #[test]
    fn pretty_helpers_write_expected_shape() {
        let mut buf = Vec::new();
        pretty_section(&mut buf, "Roots").unwrap();
        pretty_kv(&mut buf, "frame", "2").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Roots");
        assert_eq!(lines[1].len(), PRETTY_RULE_WIDTH);
        assert_eq!(lines[2], "frame:       2");
    }
}
