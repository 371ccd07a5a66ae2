//! Structured JSONL logging for probe sessions.
//!
//! Provides:
//! - [`LogEntry`]: canonical JSONL record with required + optional fields.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.
//! - [`validate_log_line`]: validates a single JSONL line against the schema.
//! - [`validate_log_file`]: validates an entire JSONL file.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::catalog::Group;
use crate::runner::Outcome;

// ---------------------------------------------------------------------------
// Log entry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Step outcome, flattened for log aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOutcome {
    Pass,
    CompileFailure,
    RunFailure,
    Error,
}

impl From<&Outcome> for EventOutcome {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Outcome::Pass => Self::Pass,
            Outcome::CompileFailure(_) => Self::CompileFailure,
            Outcome::RunFailure(_) => Self::RunFailure,
        }
    }
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    // Required
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    // Optional
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<EventOutcome>,
    /// Exit code for the tool itself (on `probe_end`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// `path#sha256` references to written artifacts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            compiler: None,
            group: None,
            feature: None,
            outcome: None,
            exit_code: None,
            duration_ms: None,
            artifact_refs: None,
            details: None,
        }
    }

    #[must_use]
    pub fn with_compiler(mut self, compiler: impl Into<String>) -> Self {
        self.compiler = Some(compiler.into());
        self
    }

    /// Set the catalog group and feature name.
    #[must_use]
    pub fn with_feature(mut self, group: Group, feature: impl Into<String>) -> Self {
        self.group = Some(group);
        self.feature = Some(feature.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: EventOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_exit_code(mut self, exit_code: i32) -> Self {
        self.exit_code = Some(exit_code);
        self
    }

    #[must_use]
    pub fn with_duration_ms(mut self, ms: u64) -> Self {
        self.duration_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn with_artifacts(mut self, refs: Vec<String>) -> Self {
        self.artifact_refs = Some(refs);
        self
    }

    /// Set free-form details.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Log emitter
// ---------------------------------------------------------------------------

/// Shared byte buffer handed out by [`LogEmitter::to_buffer`].
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Current buffer contents as text.
    #[must_use]
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().map(|b| b.clone()).unwrap_or_default();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Writes structured JSONL log entries to a file or buffer.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    seq: u64,
    run_id: String,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            seq: 0,
            run_id: run_id.to_string(),
        })
    }

    /// Create an emitter that writes to a shared in-memory buffer (for testing).
    #[must_use]
    pub fn to_buffer(run_id: &str) -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        let emitter = Self {
            writer: Box::new(buffer.clone()),
            seq: 0,
            run_id: run_id.to_string(),
        };
        (emitter, buffer)
    }

    fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{:03}", self.run_id, self.seq)
    }

    /// Start an entry with the next trace id.
    #[must_use]
    pub fn entry(&mut self, level: LogLevel, event: &str) -> LogEntry {
        let trace_id = self.next_trace_id();
        LogEntry::new(trace_id, level, event)
    }

    /// Emit a fully-populated log entry.
    pub fn emit_entry(&mut self, mut entry: LogEntry) -> std::io::Result<()> {
        if entry.trace_id.is_empty() {
            entry.trace_id = self.next_trace_id();
        }
        let line = serde_json::to_string(&entry).map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validation error for a log line.
#[derive(Debug)]
pub struct LogValidationError {
    pub line_number: usize,
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for LogValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "line {}: field '{}': {}",
            self.line_number, self.field, self.message
        )
    }
}

/// Validate a single JSONL line against the schema.
pub fn validate_log_line(
    line: &str,
    line_number: usize,
) -> Result<LogEntry, Vec<LogValidationError>> {
    let mut errors = Vec::new();
    let mut push = |field: &str, message: String| {
        errors.push(LogValidationError {
            line_number,
            field: field.to_string(),
            message,
        });
    };

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            push("<json>", format!("invalid JSON: {e}"));
            return Err(errors);
        }
    };
    let Some(obj) = value.as_object() else {
        push("<root>", "expected JSON object".to_string());
        return Err(errors);
    };

    for field in ["timestamp", "trace_id", "level", "event"] {
        if !obj.contains_key(field) {
            push(field, "required field missing".to_string());
        }
    }

    if let Some(trace_id) = obj.get("trace_id").and_then(|v| v.as_str())
        && !trace_id.contains("::")
    {
        push("trace_id", format!("expected '<run>::<seq>', got '{trace_id}'"));
    }

    if let Some(level) = obj.get("level").and_then(|v| v.as_str())
        && !["debug", "info", "warn", "error"].contains(&level)
    {
        push("level", format!("invalid level: '{level}'"));
    }

    if let Some(group) = obj.get("group").and_then(|v| v.as_str())
        && !["required", "optional"].contains(&group)
    {
        push("group", format!("invalid group: '{group}'"));
    }

    if let Some(outcome) = obj.get("outcome").and_then(|v| v.as_str())
        && !["pass", "compile_failure", "run_failure", "error"].contains(&outcome)
    {
        push("outcome", format!("invalid outcome: '{outcome}'"));
    }

    // Per-case events must say which case they describe.
    if obj.get("event").and_then(|v| v.as_str()) == Some("case_result") {
        for field in ["group", "feature", "outcome"] {
            if !obj.contains_key(field) {
                push(field, "case_result events require this field".to_string());
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    serde_json::from_value(value).map_err(|e| {
        vec![LogValidationError {
            line_number,
            field: "<entry>".to_string(),
            message: format!("does not decode as LogEntry: {e}"),
        }]
    })
}

/// Validate every non-empty line of a JSONL file.
///
/// Returns the number of valid entries, or every error found.
pub fn validate_log_file(path: &Path) -> Result<usize, Vec<LogValidationError>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        vec![LogValidationError {
            line_number: 0,
            field: "<file>".to_string(),
            message: format!("cannot read {}: {e}", path.display()),
        }]
    })?;

    let mut count = 0;
    let mut errors = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match validate_log_line(line, idx + 1) {
            Ok(_) => count += 1,
            Err(mut errs) => errors.append(&mut errs),
        }
    }
    if errors.is_empty() {
        Ok(count)
    } else {
        Err(errors)
    }
}

/// Current UTC time as RFC 3339 with millisecond precision.
#[must_use]
pub fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format_utc(duration.as_secs(), duration.subsec_millis())
}

fn format_utc(secs: u64, millis: u32) -> String {
    let days = secs / 86_400;
    let rem = secs % 86_400;
    let (year, month, day) = civil_from_days(days);
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}.{millis:03}Z",
        rem / 3600,
        (rem % 3600) / 60,
        rem % 60,
    )
}

// Days since 1970-01-01 to (year, month, day) in the proleptic Gregorian calendar.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_entry_serializes_required_fields() {
        let entry = LogEntry::new("run-1::001", LogLevel::Info, "probe_start");
        let json = entry.to_jsonl().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed["timestamp"].is_string());
        assert_eq!(parsed["trace_id"], "run-1::001");
        assert_eq!(parsed["level"], "info");
        assert_eq!(parsed["event"], "probe_start");
        assert!(parsed.get("feature").is_none());
        assert!(parsed.get("outcome").is_none());
    }

    #[test]
    fn case_entry_serializes_optional_fields() {
        let entry = LogEntry::new("run-1::002", LogLevel::Warn, "case_result")
            .with_compiler("g++ -std=c++11")
            .with_feature(Group::Optional, "THREAD")
            .with_outcome(EventOutcome::from(&Outcome::RunFailure("x".into())))
            .with_duration_ms(12)
            .with_details(serde_json::json!({"diagnostic": "x"}));
        let parsed: serde_json::Value = serde_json::from_str(&entry.to_jsonl().unwrap()).unwrap();
        assert_eq!(parsed["group"], "optional");
        assert_eq!(parsed["feature"], "THREAD");
        assert_eq!(parsed["outcome"], "run_failure");
        assert_eq!(parsed["duration_ms"], 12);
        assert_eq!(parsed["compiler"], "g++ -std=c++11");
        assert!(parsed["details"].is_object());
        assert!(validate_log_line(&entry.to_jsonl().unwrap(), 1).is_ok());
    }

    #[test]
    fn validate_missing_required_field() {
        let json = r#"{"timestamp":"2026-01-01T00:00:00Z","level":"info","event":"x"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "trace_id"));
    }

    #[test]
    fn validate_rejects_bad_enums_and_trace_ids() {
        let json = r#"{"timestamp":"t","trace_id":"flat","level":"critical","event":"x","outcome":"maybe"}"#;
        let errors = validate_log_line(json, 4).unwrap_err();
        for field in ["trace_id", "level", "outcome"] {
            assert!(errors.iter().any(|e| e.field == field), "missing {field}");
        }
        assert!(errors.iter().all(|e| e.line_number == 4));
    }

    #[test]
    fn validate_case_result_requires_feature_fields() {
        let json = r#"{"timestamp":"t","trace_id":"r::001","level":"info","event":"case_result"}"#;
        let errors = validate_log_line(json, 1).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn validate_invalid_json() {
        let errors = validate_log_line("not json at all", 1).unwrap_err();
        assert!(errors.iter().any(|e| e.field == "<json>"));
    }

    #[test]
    fn emitter_generates_sequential_trace_ids() {
        let (mut emitter, buffer) = LogEmitter::to_buffer("run-42");
        let first = emitter.entry(LogLevel::Info, "start");
        let second = emitter.entry(LogLevel::Info, "end");
        assert_eq!(first.trace_id, "run-42::001");
        assert_eq!(second.trace_id, "run-42::002");

        emitter.emit_entry(first).unwrap();
        emitter
            .emit_entry(LogEntry::new("", LogLevel::Debug, "filled"))
            .unwrap();
        let contents = buffer.contents();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("run-42::003"));
    }

    #[test]
    fn file_emitter_output_validates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("probe.log.jsonl");
        let mut emitter = LogEmitter::to_file(&path, "run-7").unwrap();
        let entry = emitter
            .entry(LogLevel::Info, "case_result")
            .with_feature(Group::Required, "AUTO")
            .with_outcome(EventOutcome::Pass);
        emitter.emit_entry(entry).unwrap();
        let end = emitter.entry(LogLevel::Info, "probe_end").with_exit_code(0);
        emitter.emit_entry(end).unwrap();
        emitter.flush().unwrap();
        assert_eq!(validate_log_file(&path).unwrap(), 2);
    }

    #[test]
    fn utc_formatting_matches_known_instants() {
        assert_eq!(format_utc(0, 0), "1970-01-01T00:00:00.000Z");
        // 2000-02-29T12:34:56Z
        assert_eq!(format_utc(951_827_696, 7), "2000-02-29T12:34:56.007Z");
        // 2026-10-18T00:00:00Z
        assert_eq!(format_utc(1_792_281_600, 0), "2026-10-18T00:00:00.000Z");
    }
}
