// crates/stageflow-core/src/audit/mod.rs
// ============================================================================
// Module: Stageflow Audit Logging
// Description: Structured audit events for process loads and evaluations.
// Purpose: Emit JSON-lines audit records without a logging framework.
// Dependencies: crate::core, serde, serde_json
// ============================================================================

//! ## Overview
//! Audit events are plain serializable records. Sinks decide where they go:
//! stderr, an append-only file, or nowhere. Sinks never fail the caller; a
//! record that cannot be written is dropped. Events carry digests and counts
//! only, never element payloads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::results::StageStatus;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Process load audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessLoadEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Process name as declared, when known.
    pub process: Option<String>,
    /// Canonical digest of the definition, when computed.
    pub digest: Option<HashDigest>,
    /// Whether the load succeeded.
    pub success: bool,
    /// Number of fatal issues.
    pub fatal_issues: usize,
    /// Number of warning issues.
    pub warning_issues: usize,
    /// Number of informational issues.
    pub info_issues: usize,
}

/// Element evaluation audit event payload.
#[derive(Debug, Clone, Serialize)]
pub struct ElementEvaluationEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Process name.
    pub process: String,
    /// Canonical digest of the process definition.
    pub digest: HashDigest,
    /// Stage the element was evaluated at.
    pub stage: String,
    /// Resulting stage status.
    pub status: StageStatus,
    /// Number of passing gates.
    pub ready_gates: usize,
    /// Number of recommended actions.
    pub actions: usize,
    /// Whether a regression was detected.
    pub regression: bool,
}

/// Inputs required to construct a process load event.
pub struct ProcessLoadEventParams {
    /// Process name as declared, when known.
    pub process: Option<String>,
    /// Canonical digest of the definition, when computed.
    pub digest: Option<HashDigest>,
    /// Whether the load succeeded.
    pub success: bool,
    /// Number of fatal issues.
    pub fatal_issues: usize,
    /// Number of warning issues.
    pub warning_issues: usize,
    /// Number of informational issues.
    pub info_issues: usize,
}

/// Inputs required to construct an element evaluation event.
pub struct ElementEvaluationEventParams {
    /// Process name.
    pub process: String,
    /// Canonical digest of the process definition.
    pub digest: HashDigest,
    /// Stage the element was evaluated at.
    pub stage: String,
    /// Resulting stage status.
    pub status: StageStatus,
    /// Number of passing gates.
    pub ready_gates: usize,
    /// Number of recommended actions.
    pub actions: usize,
    /// Whether a regression was detected.
    pub regression: bool,
}

impl ProcessLoadEvent {
    /// Creates a new load event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ProcessLoadEventParams) -> Self {
        Self {
            event: "process_load",
            timestamp_ms: now_ms(),
            process: params.process,
            digest: params.digest,
            success: params.success,
            fatal_issues: params.fatal_issues,
            warning_issues: params.warning_issues,
            info_issues: params.info_issues,
        }
    }
}

impl ElementEvaluationEvent {
    /// Creates a new evaluation event with a consistent timestamp.
    #[must_use]
    pub fn new(params: ElementEvaluationEventParams) -> Self {
        Self {
            event: "element_evaluation",
            timestamp_ms: now_ms(),
            process: params.process,
            digest: params.digest,
            stage: params.stage,
            status: params.status,
            ready_gates: params.ready_gates,
            actions: params.actions,
            regression: params.regression,
        }
    }
}

/// Milliseconds since the Unix epoch; zero if the clock is before it.
fn now_ms() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Audit sink for load and evaluation events.
pub trait EvaluationAuditSink: Send + Sync {
    /// Record a process load event.
    fn record_load(&self, event: &ProcessLoadEvent);

    /// Record an element evaluation event.
    fn record_evaluation(&self, event: &ElementEvaluationEvent);
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl EvaluationAuditSink for StderrAuditSink {
    fn record_load(&self, event: &ProcessLoadEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }

    fn record_evaluation(&self, event: &ElementEvaluationEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    /// Appends one serialized record.
    fn append<T: Serialize>(&self, event: &T) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

impl EvaluationAuditSink for FileAuditSink {
    fn record_load(&self, event: &ProcessLoadEvent) {
        self.append(event);
    }

    fn record_evaluation(&self, event: &ElementEvaluationEvent) {
        self.append(event);
    }
}

/// No-op audit sink.
pub struct NoopAuditSink;

impl EvaluationAuditSink for NoopAuditSink {
    fn record_load(&self, _event: &ProcessLoadEvent) {}

    fn record_evaluation(&self, _event: &ElementEvaluationEvent) {}
}
