//! JSON-lines event log parser.
//!
//! One event per line:
//!
//! ```text
//! {"epoch": 1, "seq": 2, "frame": 1, "creator": "alice", "node": "n1", "parents": ["..."], "id": "..."}
//! ```
//!
//! - `seq` and `creator` are required. `seq` starts at 1.
//! - `epoch` and `frame` default to 1, `node` to the creator, `parents` to
//!   none.
//! - Without an `id`, the event is content-addressed via
//!   [`Event::hashed`].
//! - Lines starting with `#` and blank lines are skipped.

use serde::Deserialize;

use crate::error::ErrorCode;

use super::{Epoch, Event, EventId, Frame, NodeId, Seq, ValidatorId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors from parsing one event line.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The line is not a JSON event object.
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),

    /// `seq` is 0; counters start at 1.
    #[error("seq must be at least 1")]
    ZeroSeq,

    /// An identifier field is empty.
    #[error("field `{0}` must not be empty")]
    EmptyField(&'static str),
}

/// A [`ParseError`] located at a 1-based line number.
#[derive(Debug, thiserror::Error)]
#[error("line {line}: {source}")]
pub struct LineError {
    pub line: usize,
    #[source]
    pub source: ParseError,
}

impl LineError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedEvent
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Result of parsing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    Comment(String),
    Blank,
    Event(Box<Event>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventRecord {
    #[serde(default = "first")]
    epoch: u64,
    seq: u64,
    #[serde(default = "first")]
    frame: u64,
    creator: ValidatorId,
    #[serde(default)]
    node: Option<NodeId>,
    #[serde(default)]
    parents: Vec<EventId>,
    #[serde(default)]
    id: Option<EventId>,
}

const fn first() -> u64 {
    1
}

impl EventRecord {
    fn into_event(self) -> Result<Event, ParseError> {
        if self.seq == 0 {
            return Err(ParseError::ZeroSeq);
        }
        if self.creator.as_str().is_empty() {
            return Err(ParseError::EmptyField("creator"));
        }
        if self.parents.iter().any(|p| p.as_str().is_empty()) {
            return Err(ParseError::EmptyField("parents"));
        }

        let node = self
            .node
            .unwrap_or_else(|| NodeId::new(self.creator.as_str()));
        let (epoch, seq, frame) = (Epoch(self.epoch), Seq(self.seq), Frame(self.frame));

        Ok(match self.id {
            Some(id) if id.as_str().is_empty() => return Err(ParseError::EmptyField("id")),
            Some(id) => Event::new(epoch, seq, frame, self.creator, node, id, self.parents),
            None => Event::hashed(epoch, seq, frame, self.creator, node, self.parents),
        })
    }
}

/// Parse a single event log line.
///
/// # Errors
///
/// Returns [`ParseError`] if the line is neither a comment, blank, nor a
/// valid event object.
pub fn parse_line(line: &str) -> Result<ParsedLine, ParseError> {
    let trimmed = line.trim_end_matches('\n').trim_end_matches('\r');

    if trimmed.starts_with('#') {
        return Ok(ParsedLine::Comment(trimmed.to_string()));
    }
    if trimmed.trim().is_empty() {
        return Ok(ParsedLine::Blank);
    }

    let record: EventRecord = serde_json::from_str(trimmed)?;
    Ok(ParsedLine::Event(Box::new(record.into_event()?)))
}

/// Parse a whole event log, keeping each event's 1-based line number.
///
/// # Errors
///
/// Returns a [`LineError`] for the first malformed line.
pub fn parse_lines(input: &str) -> Result<Vec<(usize, Event)>, LineError> {
    let mut events = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line_no = index + 1;
        match parse_line(line) {
            Ok(ParsedLine::Event(event)) => events.push((line_no, *event)),
            Ok(ParsedLine::Comment(_) | ParsedLine::Blank) => {}
            Err(source) => {
                return Err(LineError {
                    line: line_no,
                    source,
                });
            }
        }
    }
    Ok(events)
}
