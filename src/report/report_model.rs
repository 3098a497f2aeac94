use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Status and stage
// ============================================================================

/// Outcome of a step, a case, or a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
}

impl Status {
    pub fn is_passed(self) -> bool {
        self == Status::Passed
    }

    /// Ordering used when picking the worst status of a run.
    fn rank(self) -> u8 {
        match self {
            Status::Passed => 0,
            Status::Skipped => 1,
            Status::Broken => 2,
            Status::Failed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Broken => "broken",
            Status::Skipped => "skipped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Running,
    Finished,
}

// ============================================================================
// Small building blocks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: &str, value: impl Into<String>) -> Self {
        Label {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub url: String,
    #[serde(rename = "type", default = "default_link_type")]
    pub link_type: String,
}

fn default_link_type() -> String {
    "link".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// A persisted artifact linked to a step. `source` is relative to the
/// results directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

/// Error kind, message and trace of a failure, as written into
/// error-detail attachments and `statusDetails`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    pub kind: String,
    pub message: String,
    pub trace: Option<String>,
}

impl ErrorDetail {
    pub fn new(kind: &str, message: impl Into<String>) -> Self {
        ErrorDetail {
            kind: kind.to_string(),
            message: message.into(),
            trace: None,
        }
    }

    pub fn status_details(&self) -> StatusDetails {
        StatusDetails {
            message: Some(format!("{}: {}", self.kind, self.message)),
            trace: self.trace.clone(),
        }
    }

    /// Text block stored as the error-detail attachment.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Error type: {}\nError message: {}\n",
            self.kind, self.message
        );
        if let Some(trace) = &self.trace {
            out.push_str("Trace:\n");
            out.push_str(trace);
            out.push('\n');
        }
        out
    }
}

// ============================================================================
// Case metadata
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Blocker,
    Critical,
    Normal,
    Minor,
    Trivial,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Blocker => "blocker",
            Severity::Critical => "critical",
            Severity::Normal => "normal",
            Severity::Minor => "minor",
            Severity::Trivial => "trivial",
        }
    }
}

/// Optional descriptive metadata attached to a case result as labels,
/// links and description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseMeta {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub epic: Option<String>,
    #[serde(default)]
    pub feature: Option<String>,
    #[serde(default)]
    pub story: Option<String>,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl CaseMeta {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Labels contributed by this metadata, in a fixed order.
    pub fn labels(&self) -> Vec<Label> {
        let mut labels = Vec::new();
        if let Some(epic) = &self.epic {
            labels.push(Label::new("epic", epic.as_str()));
        }
        if let Some(feature) = &self.feature {
            labels.push(Label::new("feature", feature.as_str()));
        }
        if let Some(story) = &self.story {
            labels.push(Label::new("story", story.as_str()));
        }
        if let Some(severity) = self.severity {
            labels.push(Label::new("severity", severity.as_str()));
        }
        for tag in &self.tags {
            labels.push(Label::new("tag", tag.as_str()));
        }
        labels
    }
}

// ============================================================================
// Steps and case results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    pub stage: Stage,
    pub start: i64,
    pub stop: i64,
    pub attachments: Vec<Attachment>,
}

impl Step {
    pub fn new(name: &str, status: Status, at: i64) -> Self {
        Step {
            name: name.to_string(),
            status,
            status_details: None,
            stage: Stage::Finished,
            start: at,
            stop: at,
            attachments: Vec::new(),
        }
    }
}

/// One `<uuid>-result.json` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub uuid: Uuid,
    pub history_id: String,
    pub name: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    pub stage: Stage,
    pub steps: Vec<Step>,
    pub attachments: Vec<Attachment>,
    pub labels: Vec<Label>,
    pub links: Vec<Link>,
    pub start: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
}

impl CaseResult {
    /// Sticky-first-failure: only the first non-passed step moves the case
    /// away from `Passed`; nothing moves it afterwards.
    pub fn apply_step_status(&mut self, status: Status) {
        if self.status.is_passed() && !status.is_passed() {
            self.status = status;
        }
    }

    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    pub fn suite(&self) -> Option<&str> {
        self.label("suite")
    }

    pub fn tags(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| l.name == "tag")
            .map(|l| l.value.as_str())
            .collect()
    }

    /// Status details of the first non-passed step, if any.
    pub fn first_failure_details(&self) -> Option<&StatusDetails> {
        self.steps
            .iter()
            .find(|s| !s.status.is_passed())
            .and_then(|s| s.status_details.as_ref())
    }
}

// ============================================================================
// Containers
// ============================================================================

/// Synthetic before/after hook entry used by the renderer to label a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureResult {
    pub name: String,
    pub status: Status,
    pub stage: Stage,
    pub start: i64,
    pub stop: i64,
}

/// One `<uuid>-container.json` record: the cases of one suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub uuid: Uuid,
    pub name: String,
    pub children: Vec<Uuid>,
    pub befores: Vec<FixtureResult>,
    pub afters: Vec<FixtureResult>,
    pub start: i64,
    pub stop: i64,
}

// ============================================================================
// Run summary
// ============================================================================

/// Aggregate pass/fail status handed back to the scheduling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Passed => f.write_str("passed"),
            RunStatus::Failed => f.write_str("failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub broken: usize,
    pub skipped: usize,
    /// Worst case status seen (`Passed` for an empty run)
    pub worst: Status,
}

impl Default for RunSummary {
    fn default() -> Self {
        RunSummary {
            total: 0,
            passed: 0,
            failed: 0,
            broken: 0,
            skipped: 0,
            worst: Status::Passed,
        }
    }
}

impl RunSummary {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = Status>,
    {
        let mut summary = RunSummary::default();
        for status in statuses {
            summary.record(status);
        }
        summary
    }

    pub fn record(&mut self, status: Status) {
        self.total += 1;
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Broken => self.broken += 1,
            Status::Skipped => self.skipped += 1,
        }
        if status.rank() > self.worst.rank() {
            self.worst = status;
        }
    }

    /// Any failed or broken case fails the run.
    pub fn run_status(&self) -> RunStatus {
        if self.failed > 0 || self.broken > 0 {
            RunStatus::Failed
        } else {
            RunStatus::Passed
        }
    }
}
