use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, info, warn};

use crate::browser::guard::{SessionGuard, SessionLauncher};
use crate::config::RunnerConfig;
use crate::error::{ReportError, RunError};
use crate::report::archive::compress_dir;
use crate::report::builder::{ReportBuilder, ReportOutcome};
use crate::report::environment::EnvironmentInfo;
use crate::report::render::Renderer;
use crate::report::report_model::{ErrorDetail, RunStatus, RunSummary};
use crate::spec::runner::CaseRunner;
use crate::spec::spec_model::{CaseSpec, SuiteContext};

/// What a run hands back to the scheduling layer.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: ReportOutcome,
    pub status: RunStatus,
    pub summary: RunSummary,
    /// Number of cases that were started
    pub attempted: usize,
    /// Set when iteration stopped on an unexpected (non-case) error
    pub aborted: Option<String>,
}

/// Runs an ordered case list against one browser session.
pub struct SuiteRunner<'a> {
    config: &'a RunnerConfig,
    renderer: &'a dyn Renderer,
}

impl<'a> SuiteRunner<'a> {
    pub fn new(config: &'a RunnerConfig, renderer: &'a dyn Renderer) -> Self {
        Self { config, renderer }
    }

    /// Execute `cases` in ascending `order` and produce the report.
    ///
    /// The session is released exactly once and the report is always
    /// finalized, whether the loop completes, stops on a failed case, or
    /// aborts. A storage error or a panic inside a case aborts the loop; the
    /// case it interrupted is reported as broken.
    pub fn run(
        &self,
        execution_id: &str,
        launcher: &dyn SessionLauncher,
        suite: &SuiteContext,
        cases: &[CaseSpec],
        continue_on_failure: bool,
    ) -> Result<RunOutcome, RunError> {
        let mut report = ReportBuilder::new(&self.config.reports_root, execution_id, &self.config.framework_label);
        self.run_with(&mut report, launcher, suite, cases, continue_on_failure)
    }

    /// `run` with a caller-provided report builder.
    pub fn run_with(
        &self,
        report: &mut ReportBuilder,
        launcher: &dyn SessionLauncher,
        suite: &SuiteContext,
        cases: &[CaseSpec],
        continue_on_failure: bool,
    ) -> Result<RunOutcome, RunError> {
        let driver = launcher.launch().map_err(RunError::Session)?;
        let mut session = SessionGuard::new(driver);

        info!(suite = %suite.name, cases = cases.len(), continue_on_failure, "suite run started");

        let iteration = panic::catch_unwind(AssertUnwindSafe(|| {
            self.iterate(&mut session, report, suite, cases, continue_on_failure)
        }));
        let aborted = match iteration {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(format!("case execution panicked: {}", panic_message(payload.as_ref()))),
        };

        session.release();
        if let Some(reason) = &aborted {
            error!(%reason, "suite run aborted");
            report.mark_interrupted(&ErrorDetail::new("RunInterrupted", reason.as_str()));
        }
        let mut outcome = report.finalize_report(self.renderer)?;
        if self.config.compress_reports {
            outcome.archive = match compress_dir(&outcome.report_dir) {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "report not compressed");
                    None
                }
            };
        }

        let summary = outcome.summary;
        let status = if aborted.is_some() {
            RunStatus::Failed
        } else {
            summary.run_status()
        };

        info!(
            suite = %suite.name,
            %status,
            passed = summary.passed,
            failed = summary.failed,
            "suite run finished"
        );

        Ok(RunOutcome {
            attempted: report.case_count(),
            report: outcome,
            status,
            summary,
            aborted,
        })
    }

    fn iterate(
        &self,
        session: &mut SessionGuard,
        report: &mut ReportBuilder,
        suite: &SuiteContext,
        cases: &[CaseSpec],
        continue_on_failure: bool,
    ) -> Result<(), ReportError> {
        let info = session.driver().browser_info();
        if let Err(e) = report.write_environment(&EnvironmentInfo::new(&suite.name, &info.name, &info.version)) {
            warn!(error = %e, "environment info not written");
        }

        let mut ordered: Vec<&CaseSpec> = cases.iter().collect();
        ordered.sort_by_key(|c| c.order);

        let mut runner = CaseRunner::new(session.driver(), report, self.config);
        for case in ordered {
            let passed = runner.execute_case(case, suite)?;
            if !passed && !continue_on_failure {
                warn!(case_id = case.id, "stopping after failed case");
                break;
            }
        }
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}
