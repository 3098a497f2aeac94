use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{AttachmentWriteError, RenderError, ReportError};
use crate::report::attachment::{AttachmentContent, AttachmentType};
use crate::report::environment::{categories, EnvironmentInfo};
use crate::report::render::{Renderer, ENTRY_FILE};
use crate::report::report_model::{
    Attachment, CaseMeta, CaseResult, Container, ErrorDetail, FixtureResult, Label, RunSummary,
    Stage, Status, Step,
};

const ATTACHMENTS_DIR: &str = "attachments";
const RENDER_DIR: &str = "html";

/// Opaque reference to a case owned by a [`ReportBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseHandle(usize);

/// Opaque reference to one step of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepHandle {
    case: usize,
    step: usize,
}

impl StepHandle {
    pub fn case(&self) -> CaseHandle {
        CaseHandle(self.case)
    }
}

struct CaseEntry {
    result: CaseResult,
    finalized: bool,
}

struct SuiteGroup {
    name: String,
    children: Vec<usize>,
}

/// What `finalize_report` hands back: where the raw results live, where the
/// rendered entry file is (if rendering worked), and the run statistics.
#[derive(Debug)]
pub struct ReportOutcome {
    pub report_dir: PathBuf,
    pub results_dir: PathBuf,
    pub entry: Option<PathBuf>,
    pub render_error: Option<RenderError>,
    /// `<report_dir>.zip`, when compression is enabled and succeeded
    pub archive: Option<PathBuf>,
    pub summary: RunSummary,
}

impl ReportOutcome {
    /// False for a degraded report: results are on disk but unrendered.
    pub fn is_rendered(&self) -> bool {
        self.entry.is_some()
    }
}

/// Owns every case result of one run and the on-disk results directory.
///
/// Layout under `<reports_root>/execution_<id>_<timestamp>/results/`:
/// `<uuid>-result.json`, `<uuid>-container.json`,
/// `attachments/<uuid>-attachment.<ext>`, `categories.json`,
/// `environment.properties`.
pub struct ReportBuilder {
    report_dir: PathBuf,
    results_dir: PathBuf,
    attachments_dir: PathBuf,
    framework: String,
    run_start: i64,
    cases: Vec<CaseEntry>,
    suites: Vec<SuiteGroup>,
    containers_written: bool,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Stable history id: the same full name maps to the same id across runs.
pub fn history_id(full_name: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(full_name.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl ReportBuilder {
    /// Plan a run directory named after the execution id and the current
    /// time. Nothing touches the disk until the first write.
    pub fn new(reports_root: &Path, execution_id: &str, framework: &str) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let report_dir = reports_root.join(format!("execution_{}_{}", execution_id, timestamp));
        Self::at(report_dir, framework)
    }

    /// Use an explicit report directory.
    pub fn at(report_dir: PathBuf, framework: &str) -> Self {
        let results_dir = report_dir.join("results");
        let attachments_dir = results_dir.join(ATTACHMENTS_DIR);
        Self {
            report_dir,
            results_dir,
            attachments_dir,
            framework: framework.to_string(),
            run_start: now_millis(),
            cases: Vec::new(),
            suites: Vec::new(),
            containers_written: false,
        }
    }

    pub fn report_dir(&self) -> &Path {
        &self.report_dir
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn run_start(&self) -> i64 {
        self.run_start
    }

    fn ensure_dirs(&self) -> Result<(), ReportError> {
        fs::create_dir_all(&self.attachments_dir).map_err(|e| ReportError::CreateDir {
            path: self.attachments_dir.clone(),
            source: e,
        })
    }

    // ------------------------------------------------------------------------
    // Cases and steps
    // ------------------------------------------------------------------------

    /// Allocate a new passed case with no steps and register it under its
    /// suite for container grouping.
    pub fn create_case(
        &mut self,
        name: &str,
        full_name: &str,
        suite: &str,
        meta: &CaseMeta,
    ) -> Result<CaseHandle, ReportError> {
        self.ensure_dirs()?;

        let mut labels = vec![
            Label::new("suite", suite),
            Label::new("framework", self.framework.as_str()),
        ];
        labels.extend(meta.labels());

        let result = CaseResult {
            uuid: Uuid::new_v4(),
            history_id: history_id(full_name),
            name: name.to_string(),
            full_name: full_name.to_string(),
            description: meta.description.clone(),
            status: Status::Passed,
            status_details: None,
            stage: Stage::Running,
            steps: Vec::new(),
            attachments: Vec::new(),
            labels,
            links: meta.links.clone(),
            start: now_millis(),
            stop: None,
        };

        let index = self.cases.len();
        self.cases.push(CaseEntry {
            result,
            finalized: false,
        });

        match self.suites.iter_mut().find(|g| g.name == suite) {
            Some(group) => group.children.push(index),
            None => self.suites.push(SuiteGroup {
                name: suite.to_string(),
                children: vec![index],
            }),
        }

        debug!(case = name, suite, "case created");
        Ok(CaseHandle(index))
    }

    /// `create_case` with the conventional `<suite>.<name>` full name.
    pub fn create_case_in_suite(
        &mut self,
        name: &str,
        suite: &str,
        meta: &CaseMeta,
    ) -> Result<CaseHandle, ReportError> {
        let full_name = format!("{}.{}", suite, name);
        self.create_case(name, &full_name, suite, meta)
    }

    /// Append a finished step. A non-passed step with an error gets the error
    /// as status details plus an error-detail text attachment.
    pub fn add_step(
        &mut self,
        case: CaseHandle,
        name: &str,
        status: Status,
        error: Option<&ErrorDetail>,
    ) -> Result<StepHandle, ReportError> {
        let entry = self
            .cases
            .get_mut(case.0)
            .ok_or(ReportError::UnknownCase(case.0))?;

        let mut step = Step::new(name, status, now_millis());
        let failure = error.filter(|_| !status.is_passed());
        if let Some(detail) = failure {
            step.status_details = Some(detail.status_details());
        }

        let index = entry.result.steps.len();
        entry.result.steps.push(step);
        entry.result.apply_step_status(status);

        let handle = StepHandle {
            case: case.0,
            step: index,
        };

        if let Some(detail) = failure {
            if let Err(e) = self.add_attachment(
                handle,
                "Error detail",
                AttachmentContent::Text(detail.render()),
                AttachmentType::Text,
            ) {
                warn!(step = name, error = %e, "could not store error detail");
            }
        }

        Ok(handle)
    }

    /// Write `content` to a fresh file under `attachments/` and link it to
    /// the step. Content that does not match the declared type is rejected
    /// before anything is written.
    pub fn add_attachment(
        &mut self,
        step: StepHandle,
        name: &str,
        content: AttachmentContent,
        kind: AttachmentType,
    ) -> Result<PathBuf, AttachmentWriteError> {
        if self.step_mut(step).is_none() {
            return Err(AttachmentWriteError::UnknownStep {
                case: step.case,
                step: step.step,
            });
        }
        if content.is_text() != kind.is_textual() {
            return Err(AttachmentWriteError::Unsupported {
                name: name.to_string(),
                mime: kind.mime(),
                content: content.describe(),
            });
        }

        fs::create_dir_all(&self.attachments_dir).map_err(|e| AttachmentWriteError::Io {
            path: self.attachments_dir.clone(),
            source: e,
        })?;

        let file_name = format!("{}-attachment.{}", Uuid::new_v4(), kind.extension());
        let path = self.attachments_dir.join(&file_name);
        let written = match &content {
            AttachmentContent::Text(text) => fs::write(&path, text),
            AttachmentContent::Binary(bytes) => fs::write(&path, bytes),
        };
        written.map_err(|e| AttachmentWriteError::Io {
            path: path.clone(),
            source: e,
        })?;

        let attachment = Attachment {
            name: name.to_string(),
            source: format!("{}/{}", ATTACHMENTS_DIR, file_name),
            mime_type: kind.mime().to_string(),
        };
        if let Some(target) = self.step_mut(step) {
            target.attachments.push(attachment);
        }

        Ok(path)
    }

    /// Capture a PNG and attach it. Capture or write failures are logged and
    /// never affect the step or the case.
    pub fn add_screenshot<F, E>(&mut self, step: StepHandle, capture: F, name: &str) -> Option<PathBuf>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
        E: std::fmt::Display,
    {
        let bytes = match capture() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(screenshot = name, error = %e, "screenshot capture failed");
                return None;
            }
        };

        match self.add_attachment(step, name, AttachmentContent::Binary(bytes), AttachmentType::Png) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(screenshot = name, error = %e, "screenshot not stored");
                None
            }
        }
    }

    fn step_mut(&mut self, step: StepHandle) -> Option<&mut Step> {
        self.cases
            .get_mut(step.case)
            .and_then(|c| c.result.steps.get_mut(step.step))
    }

    /// Stamp `stop`, fill missing failure details and write
    /// `<uuid>-result.json`. A second call is a no-op.
    pub fn finalize_case(
        &mut self,
        case: CaseHandle,
        error: Option<&ErrorDetail>,
    ) -> Result<(), ReportError> {
        let entry = self
            .cases
            .get_mut(case.0)
            .ok_or(ReportError::UnknownCase(case.0))?;
        if entry.finalized {
            return Ok(());
        }

        let result = &mut entry.result;
        if result.stop.is_none() {
            result.stop = Some(now_millis());
        }
        if !result.status.is_passed() && result.status_details.is_none() {
            result.status_details = match error {
                Some(detail) => Some(detail.status_details()),
                None => result.first_failure_details().cloned(),
            };
        }
        result.stage = Stage::Finished;

        let path = self.results_dir.join(format!("{}-result.json", result.uuid));
        write_json(&path, &*result, "case result")?;
        entry.finalized = true;

        debug!(case = %entry.result.name, status = %entry.result.status, "case finalized");
        Ok(())
    }

    /// Mark every case that was never finalized as interrupted by `detail`.
    /// A case still passing becomes `broken`; a case that already failed
    /// keeps its status. Returns how many cases were marked.
    pub fn mark_interrupted(&mut self, detail: &ErrorDetail) -> usize {
        let mut marked = 0;
        for entry in self.cases.iter_mut().filter(|c| !c.finalized) {
            let result = &mut entry.result;
            result.apply_step_status(Status::Broken);
            if result.status_details.is_none() {
                result.status_details = Some(
                    result
                        .first_failure_details()
                        .cloned()
                        .unwrap_or_else(|| detail.status_details()),
                );
            }
            warn!(case = %result.name, status = %result.status, "case interrupted");
            marked += 1;
        }
        marked
    }

    // ------------------------------------------------------------------------
    // Run-level files
    // ------------------------------------------------------------------------

    /// One container per suite that has cases, children in creation order.
    pub fn generate_containers(&mut self) -> Result<Vec<PathBuf>, ReportError> {
        self.ensure_dirs()?;
        let mut paths = Vec::new();

        for group in &self.suites {
            if group.children.is_empty() {
                continue;
            }
            let members: Vec<&CaseResult> = group
                .children
                .iter()
                .filter_map(|i| self.cases.get(*i).map(|c| &c.result))
                .collect();

            let start = members.iter().map(|c| c.start).min().unwrap_or(self.run_start);
            let stop = members
                .iter()
                .map(|c| c.stop.unwrap_or(c.start))
                .max()
                .unwrap_or(start);

            let container = Container {
                uuid: Uuid::new_v4(),
                name: group.name.clone(),
                children: members.iter().map(|c| c.uuid).collect(),
                befores: vec![FixtureResult {
                    name: group.name.clone(),
                    status: Status::Passed,
                    stage: Stage::Finished,
                    start,
                    stop: start,
                }],
                afters: Vec::new(),
                start,
                stop,
            };

            let path = self
                .results_dir
                .join(format!("{}-container.json", container.uuid));
            write_json(&path, &container, "container")?;
            paths.push(path);
        }

        self.containers_written = true;
        Ok(paths)
    }

    pub fn write_environment(&self, info: &EnvironmentInfo) -> Result<PathBuf, ReportError> {
        self.ensure_dirs()?;
        let path = self.results_dir.join("environment.properties");
        fs::write(&path, info.to_properties()).map_err(|e| ReportError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(path)
    }

    pub fn write_categories(&self) -> Result<PathBuf, ReportError> {
        self.ensure_dirs()?;
        let path = self.results_dir.join("categories.json");
        write_json(&path, &categories(), "categories")?;
        Ok(path)
    }

    /// Finalize outstanding cases, write containers and categories, then run
    /// the renderer. A render failure yields a degraded outcome; the raw
    /// results are left exactly as written.
    pub fn finalize_report(&mut self, renderer: &dyn Renderer) -> Result<ReportOutcome, ReportError> {
        for index in 0..self.cases.len() {
            self.finalize_case(CaseHandle(index), None)?;
        }
        if !self.containers_written {
            self.generate_containers()?;
        }
        self.write_categories()?;

        let output_dir = self.report_dir.join(RENDER_DIR);
        let rendered = renderer.render(&self.results_dir, &output_dir).and_then(|()| {
            let entry = output_dir.join(ENTRY_FILE);
            if entry.is_file() {
                Ok(entry)
            } else {
                Err(RenderError::MissingEntry(entry))
            }
        });

        let (entry, render_error) = match rendered {
            Ok(entry) => {
                info!(report = %entry.display(), "report ready");
                (Some(entry), None)
            }
            Err(e) => {
                error!(results = %self.results_dir.display(), error = %e, "report not rendered");
                (None, Some(e))
            }
        };

        Ok(ReportOutcome {
            report_dir: self.report_dir.clone(),
            results_dir: self.results_dir.clone(),
            entry,
            render_error,
            archive: None,
            summary: self.summary(),
        })
    }

    // ------------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------------

    pub fn case(&self, case: CaseHandle) -> Option<&CaseResult> {
        self.cases.get(case.0).map(|c| &c.result)
    }

    pub fn step(&self, step: StepHandle) -> Option<&Step> {
        self.cases
            .get(step.case)
            .and_then(|c| c.result.steps.get(step.step))
    }

    pub fn cases(&self) -> impl Iterator<Item = &CaseResult> {
        self.cases.iter().map(|c| &c.result)
    }

    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_statuses(self.cases.iter().map(|c| c.result.status))
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, what: &str) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ReportError::Serialize {
        what: what.to_string(),
        source: e,
    })?;
    fs::write(path, json).map_err(|e| ReportError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_id_is_stable_per_full_name() {
        assert_eq!(history_id("Suite.case"), history_id("Suite.case"));
        assert_ne!(history_id("Suite.case"), history_id("Suite.other"));
        assert_eq!(history_id("x").len(), 40);
    }
}
