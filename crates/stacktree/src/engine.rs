//! Engine event log decoding
//!
//! The engine writes one JSON object per line. Each object carries exactly
//! one payload key (`preludeEvent`, `resourcePreEvent`, ...) next to an
//! envelope with a sequence number and a unix timestamp. Decoding turns
//! every line into at most one [`EngineUpdate`].

use crate::error::{Error, Result};
use crate::types::{OpKind, ResourceEvent, StatusKind};
use crate::value::PropertyMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;

/// Kind of operation run the events belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunKind {
    #[default]
    Preview,
    Update,
    Refresh,
    Destroy,
}

impl RunKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim().to_lowercase().as_str() {
            "preview" => Some(Self::Preview),
            "update" | "up" => Some(Self::Update),
            "refresh" => Some(Self::Refresh),
            "destroy" => Some(Self::Destroy),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Update => "update",
            Self::Refresh => "refresh",
            Self::Destroy => "destroy",
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Prelude {
    #[serde(default)]
    pub config: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

impl Prelude {
    /// Run kind named by the prelude's `kind` config entry
    pub fn run_kind(&self) -> Option<RunKind> {
        self.config
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .and_then(RunKind::parse)
    }
}

/// Diagnostic severity as spelled by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    #[default]
    Info,
    #[serde(rename = "info#err")]
    InfoErr,
    Warning,
    Error,
    #[serde(other)]
    Unknown,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::InfoErr => "info#err",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

/// A diagnostic message, optionally tied to a resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urn: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub ephemeral: bool,
}

impl Diagnostic {
    /// The resource URN, if the diagnostic names a non-empty one
    pub fn resource_urn(&self) -> Option<&str> {
        self.urn.as_deref().filter(|urn| !urn.is_empty())
    }
}

/// End-of-run totals reported by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Resource count per op spelling
    #[serde(default)]
    pub resource_changes: BTreeMap<String, u64>,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub maybe_corrupt: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunSummary {
    /// Total of every non-`same` change
    pub fn total_changes(&self) -> u64 {
        self.resource_changes
            .iter()
            .filter(|(op, _)| OpKind::parse(op) != OpKind::Same)
            .map(|(_, count)| count)
            .sum()
    }
}

/// One decoded engine event
#[derive(Debug, Clone, PartialEq)]
pub enum EngineUpdate {
    Prelude(Prelude),
    Resource(ResourceEvent),
    Diagnostic(Diagnostic),
    Summary(RunSummary),
    Cancel,
}

impl EngineUpdate {
    /// Whether the engine sends nothing after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Summary(_) | Self::Cancel)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    prelude_event: Option<RawPrelude>,
    #[serde(default)]
    resource_pre_event: Option<RawStep>,
    #[serde(default)]
    res_outputs_event: Option<RawStep>,
    #[serde(default)]
    res_op_failed_event: Option<RawStep>,
    #[serde(default)]
    diagnostic_event: Option<Diagnostic>,
    #[serde(default)]
    summary_event: Option<RunSummary>,
    #[serde(default)]
    cancel_event: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawPrelude {
    #[serde(default)]
    config: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    metadata: StepMetadata,
    #[serde(default)]
    planning: bool,
}

#[derive(Debug, Deserialize)]
struct StepMetadata {
    #[serde(default)]
    op: OpKind,
    #[serde(default)]
    urn: String,
    #[serde(default, rename = "type")]
    resource_type: String,
    #[serde(default)]
    old: Option<StepState>,
    #[serde(default)]
    new: Option<StepState>,
}

#[derive(Debug, Default, Deserialize)]
struct StepState {
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    inputs: Option<PropertyMap>,
    #[serde(default)]
    outputs: Option<PropertyMap>,
}

fn non_empty_map(map: Option<PropertyMap>) -> Option<PropertyMap> {
    map.filter(|m| !m.is_empty())
}

fn non_empty_str(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}

impl RawStep {
    fn into_event(self, status: StatusKind) -> ResourceEvent {
        let StepMetadata {
            op,
            urn,
            resource_type,
            old,
            new,
        } = self.metadata;
        let old = old.unwrap_or_default();
        let new = new.unwrap_or_default();
        let status = if self.planning && status == StatusKind::Running {
            StatusKind::Pending
        } else {
            status
        };

        ResourceEvent {
            urn,
            op,
            resource_type: Some(resource_type).filter(|t| !t.is_empty()),
            parent: non_empty_str(new.parent).or_else(|| non_empty_str(old.parent)),
            status: Some(status),
            inputs: non_empty_map(new.inputs),
            outputs: non_empty_map(new.outputs),
            old_inputs: non_empty_map(old.inputs),
            old_outputs: non_empty_map(old.outputs),
            message: None,
        }
    }
}

/// Decode one log line
///
/// `line` is the 1-based line number used in errors. Blank lines decode to
/// `None`.
pub fn decode_line(text: &str, line: usize) -> Result<Option<EngineUpdate>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let envelope: Envelope =
        serde_json::from_str(text).map_err(|source| Error::Decode { line, source })?;
    let at = envelope
        .timestamp
        .and_then(|secs| DateTime::from_timestamp(secs, 0));

    let update = if let Some(prelude) = envelope.prelude_event {
        EngineUpdate::Prelude(Prelude {
            config: prelude.config,
            started_at: at,
        })
    } else if let Some(step) = envelope.resource_pre_event {
        EngineUpdate::Resource(step.into_event(StatusKind::Running))
    } else if let Some(step) = envelope.res_outputs_event {
        EngineUpdate::Resource(step.into_event(StatusKind::Success))
    } else if let Some(step) = envelope.res_op_failed_event {
        EngineUpdate::Resource(step.into_event(StatusKind::Failed))
    } else if let Some(diagnostic) = envelope.diagnostic_event {
        EngineUpdate::Diagnostic(diagnostic)
    } else if let Some(mut summary) = envelope.summary_event {
        summary.finished_at = summary.finished_at.or(at);
        EngineUpdate::Summary(summary)
    } else if envelope.cancel_event.is_some() {
        EngineUpdate::Cancel
    } else {
        return Err(Error::UnknownEvent { line });
    };

    Ok(Some(update))
}

/// Counters kept while decoding a log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Lines read, blank ones included
    pub lines: usize,
    /// Updates produced
    pub decoded: usize,
    /// Lines that were not valid event JSON
    pub malformed: usize,
    /// Valid JSON with no payload this decoder knows
    pub ignored: usize,
}

/// Stateful line decoder that skips bad lines instead of failing
#[derive(Debug, Default)]
pub struct EventDecoder {
    stats: DecodeStats,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next line of the log
    pub fn decode(&mut self, text: &str) -> Option<EngineUpdate> {
        self.stats.lines += 1;
        match decode_line(text, self.stats.lines) {
            Ok(Some(update)) => {
                self.stats.decoded += 1;
                Some(update)
            }
            Ok(None) => None,
            Err(Error::UnknownEvent { line }) => {
                log::debug!("Ignoring unrecognised event on line {line}");
                self.stats.ignored += 1;
                None
            }
            Err(err) => {
                log::warn!("Skipping {err}");
                self.stats.malformed += 1;
                None
            }
        }
    }

    /// Decode a raw line, counting invalid UTF-8 as malformed
    pub fn decode_bytes(&mut self, bytes: &[u8]) -> Option<EngineUpdate> {
        match std::str::from_utf8(bytes) {
            Ok(text) => self.decode(text),
            Err(err) => {
                self.stats.lines += 1;
                self.stats.malformed += 1;
                log::warn!("Skipping line {}: {err}", self.stats.lines);
                None
            }
        }
    }

    pub fn stats(&self) -> DecodeStats {
        self.stats
    }
}

/// Decode a complete log
///
/// Only reading can fail; undecodable lines are skipped and counted.
pub fn decode_log<R: BufRead>(mut reader: R) -> Result<(Vec<EngineUpdate>, DecodeStats)> {
    let mut decoder = EventDecoder::new();
    let mut updates = Vec::new();
    let mut line = Vec::new();
    while reader.read_until(b'\n', &mut line)? > 0 {
        if let Some(update) = decoder.decode_bytes(&line) {
            updates.push(update);
        }
        line.clear();
    }
    Ok((updates, decoder.stats()))
}
