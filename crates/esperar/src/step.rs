//! Step Buffer and Commit Log
//!
//! Two-mode recorder of human-readable progress entries. Immediate steps
//! write straight through to the reporting sink; buffered steps
//! accumulate invisibly until a commit. On failure the buffered trail is
//! merged with a terminal failure marker into one atomic commit, so the
//! context leading up to a failed assertion is never silently dropped.
//!
//! Every record is stamped with its original call-order sequence number
//! regardless of mode, so the logical per-flow order stays
//! reconstructable even though immediate and buffered records reach the
//! sink at different times.

use crate::result::{EsperarError, EsperarResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::debug;

// =============================================================================
// RECORDS AND EVENTS
// =============================================================================

/// Reporting mode for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepMode {
    /// Written straight to the sink at record time
    Immediate,
    /// Withheld in the step buffer until the next commit
    Buffered,
}

/// Commit disposition for buffered records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitAction {
    /// Flush every buffered record in insertion order
    FlushAll,
    /// Flush buffered records and append a terminal failure marker
    MergeOnFailure,
}

/// One progress/assertion entry in the test report. Never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Original call-order stamp within the owning context
    pub sequence: u64,
    /// Human-readable description of the action or assertion
    pub description: String,
    /// Whether the step passed
    pub passed: bool,
    /// Reporting mode the step was recorded with
    pub mode: StepMode,
    /// Wall-clock creation time
    pub timestamp: SystemTime,
}

impl StepRecord {
    /// Create a step record
    #[must_use]
    pub fn new(sequence: u64, description: impl Into<String>, passed: bool, mode: StepMode) -> Self {
        Self {
            sequence,
            description: description.into(),
            passed,
            mode,
            timestamp: SystemTime::now(),
        }
    }

    /// Create the synthetic failure marker appended by a
    /// [`CommitAction::MergeOnFailure`] commit
    #[must_use]
    pub fn failure_marker(sequence: u64, message: impl Into<String>) -> Self {
        Self::new(sequence, message, false, StepMode::Buffered)
    }

    /// Render the record as one timestamped report line
    #[must_use]
    pub fn render(&self) -> String {
        let ts: DateTime<Utc> = self.timestamp.into();
        format!(
            "[{}] {} {}",
            ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            if self.passed { "PASS" } else { "FAIL" },
            self.description
        )
    }
}

/// The atomic unit written to the reporting sink by a commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitEvent {
    /// What kind of commit produced this event
    pub action: CommitAction,
    /// Records in insertion order; for `MergeOnFailure` the failure
    /// marker is the terminal entry
    pub records: Vec<StepRecord>,
}

impl CommitEvent {
    /// Create a commit event
    #[must_use]
    pub fn new(action: CommitAction, records: Vec<StepRecord>) -> Self {
        Self { action, records }
    }

    /// Number of records in the event
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the event carries no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The terminal failure marker, if this is a failure commit
    #[must_use]
    pub fn failure_marker(&self) -> Option<&StepRecord> {
        match self.action {
            CommitAction::MergeOnFailure => self.records.last(),
            CommitAction::FlushAll => None,
        }
    }
}

// =============================================================================
// SINKS
// =============================================================================

/// Reporting sink consumed by the step log.
///
/// The sink is the only resource shared across concurrently running test
/// executions; implementations must tolerate concurrent writes.
pub trait StepSink: Send + Sync {
    /// Persist one immediate-mode record
    fn write_record(&self, record: &StepRecord) -> EsperarResult<()>;

    /// Persist one commit event atomically
    fn write_commit(&self, event: &CommitEvent) -> EsperarResult<()>;
}

/// One entry as observed by an in-memory sink
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEntry {
    /// An immediate-mode record written through
    Record(StepRecord),
    /// A committed batch
    Commit(CommitEvent),
}

/// In-memory sink: collects entries in arrival order. Intended as a test
/// double and as the reference for sink semantics.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<SinkEntry>>,
}

fn lock_poisoned() -> EsperarError {
    EsperarError::Io(std::io::Error::other("sink lock poisoned"))
}

impl MemorySink {
    /// Create an empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in arrival order
    #[must_use]
    pub fn entries(&self) -> Vec<SinkEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// All records in chronological sink order, commits flattened
    #[must_use]
    pub fn chronological_records(&self) -> Vec<StepRecord> {
        self.entries()
            .into_iter()
            .flat_map(|entry| match entry {
                SinkEntry::Record(record) => vec![record],
                SinkEntry::Commit(event) => event.records,
            })
            .collect()
    }

    /// Commit events only, in arrival order
    #[must_use]
    pub fn commits(&self) -> Vec<CommitEvent> {
        self.entries()
            .into_iter()
            .filter_map(|entry| match entry {
                SinkEntry::Commit(event) => Some(event),
                SinkEntry::Record(_) => None,
            })
            .collect()
    }

    /// Total number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the sink has seen no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop all collected entries
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl StepSink for MemorySink {
    fn write_record(&self, record: &StepRecord) -> EsperarResult<()> {
        let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        entries.push(SinkEntry::Record(record.clone()));
        Ok(())
    }

    fn write_commit(&self, event: &CommitEvent) -> EsperarResult<()> {
        let mut entries = self.entries.lock().map_err(|_| lock_poisoned())?;
        entries.push(SinkEntry::Commit(event.clone()));
        Ok(())
    }
}

/// JSON-lines sink: one JSON object per immediate record, one per commit
/// event, over any writer
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Create a sink over `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> StepSink for JsonLinesSink<W> {
    fn write_record(&self, record: &StepRecord) -> EsperarResult<()> {
        let line = serde_json::to_string(record)?;
        let mut writer = self.writer.lock().map_err(|_| lock_poisoned())?;
        writeln!(writer, "{line}")?;
        Ok(())
    }

    fn write_commit(&self, event: &CommitEvent) -> EsperarResult<()> {
        let line = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().map_err(|_| lock_poisoned())?;
        writeln!(writer, "{line}")?;
        Ok(())
    }
}

/// Human-readable sink: timestamped PASS/FAIL lines over any writer
#[derive(Debug)]
pub struct TextSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> TextSink<W> {
    /// Create a sink over `writer`
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> StepSink for TextSink<W> {
    fn write_record(&self, record: &StepRecord) -> EsperarResult<()> {
        let mut writer = self.writer.lock().map_err(|_| lock_poisoned())?;
        writeln!(writer, "{}", record.render())?;
        Ok(())
    }

    fn write_commit(&self, event: &CommitEvent) -> EsperarResult<()> {
        let mut writer = self.writer.lock().map_err(|_| lock_poisoned())?;
        for record in &event.records {
            writeln!(writer, "{}", record.render())?;
        }
        Ok(())
    }
}

// =============================================================================
// STEP LOG
// =============================================================================

/// Per-test step recorder: owns the step buffer and the sequence counter,
/// writes to a shared sink.
///
/// The buffer is append-only between commits; a commit is the only
/// operation that drains it, and it drains completely or not at all. If
/// the sink rejects a commit, the buffered records are retained.
pub struct StepLog {
    sink: Arc<dyn StepSink>,
    buffer: Vec<StepRecord>,
    next_sequence: u64,
}

impl std::fmt::Debug for StepLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepLog")
            .field("pending", &self.buffer.len())
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl StepLog {
    /// Create a log writing to `sink`
    #[must_use]
    pub fn new(sink: Arc<dyn StepSink>) -> Self {
        Self {
            sink,
            buffer: Vec::new(),
            next_sequence: 0,
        }
    }

    /// Record one step. Immediate steps go straight to the sink;
    /// buffered steps wait for the next commit. Returns the record's
    /// sequence stamp.
    pub fn record(
        &mut self,
        description: impl Into<String>,
        passed: bool,
        mode: StepMode,
    ) -> EsperarResult<u64> {
        let record = StepRecord::new(self.next_sequence, description, passed, mode);
        self.next_sequence += 1;
        let sequence = record.sequence;
        debug!(sequence, ?mode, passed, step = %record.description, "step recorded");

        match mode {
            StepMode::Immediate => self.sink.write_record(&record)?,
            StepMode::Buffered => self.buffer.push(record),
        }
        Ok(sequence)
    }

    /// Flush every buffered record to the sink in insertion order and
    /// clear the buffer. A commit with nothing buffered writes no event.
    /// Returns the number of records flushed.
    pub fn commit_all(&mut self) -> EsperarResult<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }
        let event = CommitEvent::new(CommitAction::FlushAll, self.buffer.clone());
        let count = event.len();
        self.sink.write_commit(&event)?;
        self.buffer.clear();
        debug!(count, "buffered steps flushed");
        Ok(count)
    }

    /// Flush buffered records plus a terminal failure marker carrying
    /// `message` as one atomic commit, then clear the buffer. The marker
    /// is written even when nothing is buffered - a failure is never
    /// silently dropped. Returns the number of records written,
    /// including the marker.
    pub fn commit_failure(&mut self, message: impl Into<String>) -> EsperarResult<usize> {
        let marker = StepRecord::failure_marker(self.next_sequence, message);
        self.next_sequence += 1;

        let mut records = self.buffer.clone();
        records.push(marker);
        let event = CommitEvent::new(CommitAction::MergeOnFailure, records);
        let count = event.len();
        self.sink.write_commit(&event)?;
        self.buffer.clear();
        debug!(count, "failure commit written");
        Ok(count)
    }

    /// Number of records currently buffered
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing is buffered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Next sequence stamp to be assigned
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// The sink this log writes to
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn StepSink> {
        &self.sink
    }
}

// =============================================================================
// TESTS
// =============================================================================
