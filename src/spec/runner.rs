use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::browser::driver::{Driver, ElementRef, Locator};
use crate::config::RunnerConfig;
use crate::error::{CaseError, ReportError};
use crate::report::attachment::{AttachmentContent, AttachmentType};
use crate::report::builder::{CaseHandle, ReportBuilder, StepHandle};
use crate::report::report_model::Status;
use crate::spec::assertion::{AssertionOutcome, AssertionTarget};
use crate::spec::resolve::{resolve_locator, resolve_url};
use crate::spec::spec_model::{AssertionKind, CaseSpec, SuiteContext};

/// Why a case stopped early.
enum Interrupt {
    /// The case failed in a phase; the phase's step has not been recorded yet.
    Case { step: String, error: CaseError },
    /// A phase recorded its own failed step already.
    Recorded(CaseError),
    /// The report could not be written. Fatal for the run.
    Report(ReportError),
}

impl From<ReportError> for Interrupt {
    fn from(e: ReportError) -> Self {
        Interrupt::Report(e)
    }
}

fn fail(step: impl Into<String>, error: CaseError) -> Interrupt {
    Interrupt::Case {
        step: step.into(),
        error,
    }
}

/// Executes one case against a live browser session, reporting every phase
/// through the report builder.
pub struct CaseRunner<'a> {
    driver: &'a mut dyn Driver,
    report: &'a mut ReportBuilder,
    config: &'a RunnerConfig,
}

impl<'a> CaseRunner<'a> {
    pub fn new(driver: &'a mut dyn Driver, report: &'a mut ReportBuilder, config: &'a RunnerConfig) -> Self {
        Self {
            driver,
            report,
            config,
        }
    }

    /// Run navigate → locate → act → assert for one case.
    ///
    /// Returns `Ok(false)` when the case failed (the failure is in the
    /// report), `Err` only when the report itself could not be written.
    pub fn execute_case(&mut self, case: &CaseSpec, suite: &SuiteContext) -> Result<bool, ReportError> {
        let handle = self
            .report
            .create_case_in_suite(&case.name, &suite.name, &case.report_meta())?;

        info!(case_id = case.id, case = %case.name, "executing case");

        match self.run_phases(handle, case, suite) {
            Ok(()) => {
                self.report.finalize_case(handle, None)?;
                info!(case_id = case.id, "case passed");
                Ok(true)
            }
            Err(Interrupt::Case { step, error }) => {
                error!(case_id = case.id, phase = %step, kind = error.kind(), error = %error, "case failed");
                let detail = error.detail(&step);
                let failed = self.report.add_step(handle, &step, Status::Failed, Some(&detail))?;
                let driver = &mut *self.driver;
                self.report
                    .add_screenshot(failed, || driver.screenshot(), "Failure screenshot");
                self.report.finalize_case(handle, Some(&detail))?;
                Ok(false)
            }
            Err(Interrupt::Recorded(error)) => {
                error!(case_id = case.id, kind = error.kind(), error = %error, "case failed");
                self.report.finalize_case(handle, None)?;
                Ok(false)
            }
            Err(Interrupt::Report(e)) => Err(e),
        }
    }

    fn run_phases(&mut self, handle: CaseHandle, case: &CaseSpec, suite: &SuiteContext) -> Result<(), Interrupt> {
        // Navigation
        match resolve_url(case, suite).map_err(|e| fail("Resolve target URL", e))? {
            Some(url) => self
                .navigate(&url)
                .map_err(|e| fail(format!("Navigate to {}", url), e))?,
            None if case.navigation_required => {
                return Err(fail(
                    "Resolve target URL",
                    CaseError::Configuration(format!("case '{}' has no URL to navigate to", case.name)),
                ));
            }
            None => info!(case_id = case.id, "no target URL, staying on current page"),
        }

        // Locate
        let locator = resolve_locator(case).map_err(|e| fail("Resolve locator", e))?;
        let locate_step = format!("Locate element: {}", locator);
        let element = self
            .wait_for_element(&locator)
            .map_err(|e| fail(locate_step.clone(), e))?;
        let step = self.report.add_step(handle, &locate_step, Status::Passed, None)?;
        self.screenshot(step, "Screenshot after locate");

        // Act
        let action_step = format!("Perform action: {}", case.action);
        case.action
            .perform(self.driver, &element, case.action_value.as_deref())
            .map_err(|e| fail(action_step.clone(), e))?;
        let step = self.report.add_step(handle, &action_step, Status::Passed, None)?;
        self.screenshot(step, "Screenshot after action");

        // Assert
        let Some(kind) = case.assert_type else {
            return Ok(());
        };
        let assert_step = format!("Assert: {}", kind);
        let expression = match case.assert_expression.as_deref() {
            Some(expression) => expression,
            None if kind == AssertionKind::Presence => "",
            None => {
                return Err(fail(
                    assert_step,
                    CaseError::Configuration(format!("assertion '{}' needs an expression", kind)),
                ));
            }
        };
        let target = AssertionTarget {
            element: &element,
            locator: &locator,
        };
        let outcome = kind
            .evaluate(expression, self.driver, &target)
            .map_err(|e| fail(assert_step.clone(), e))?;

        match outcome {
            AssertionOutcome::Passed { .. } => {
                let step = self.report.add_step(handle, &assert_step, Status::Passed, None)?;
                if let Err(e) = self.report.add_attachment(
                    step,
                    "Assertion result",
                    AttachmentContent::Text(outcome.summary()),
                    AttachmentType::Text,
                ) {
                    warn!(error = %e, "assertion result not stored");
                }
                Ok(())
            }
            AssertionOutcome::Failed { expected, actual } => {
                let error = CaseError::AssertionFailure {
                    assertion: kind.to_string(),
                    expected,
                    actual,
                };
                let detail = error.detail(&assert_step);
                let step = self
                    .report
                    .add_step(handle, &assert_step, Status::Failed, Some(&detail))?;
                self.screenshot(step, "Failure screenshot");
                Err(Interrupt::Recorded(error))
            }
        }
    }

    fn screenshot(&mut self, step: StepHandle, name: &str) {
        let driver = &mut *self.driver;
        self.report.add_screenshot(step, || driver.screenshot(), name);
    }

    /// Navigate unless the session already shows `url`, then wait (bounded)
    /// for the document to finish loading.
    fn navigate(&mut self, url: &str) -> Result<(), CaseError> {
        let current = self
            .driver
            .current_url()
            .map_err(|e| CaseError::Navigation(format!("cannot read current URL: {}", e)))?;
        if current == url {
            info!(url, "already on target page");
            return Ok(());
        }

        info!(url, "navigating");
        self.driver
            .navigate(url)
            .map_err(|e| CaseError::Navigation(format!("navigation to {} failed: {}", url, e)))?;

        let timeout = self.config.page_load_timeout();
        let mut last_state = String::new();
        let ready = poll_until(timeout, self.config.poll_interval(), || {
            match self.driver.ready_state() {
                Ok(state) if state == "complete" => Ok(Some(())),
                Ok(state) => {
                    last_state = state;
                    Ok(None)
                }
                Err(e) => Err(CaseError::Navigation(format!("cannot read page state: {}", e))),
            }
        })?;

        ready.ok_or_else(|| {
            CaseError::Navigation(format!(
                "page {} not ready after {} ms (readyState: {})",
                url,
                timeout.as_millis(),
                if last_state.is_empty() { "unknown" } else { last_state.as_str() }
            ))
        })
    }

    /// Poll for the element until it is present or the timeout elapses.
    /// Driver errors while polling are retried; the last one is reported.
    fn wait_for_element(&mut self, locator: &Locator) -> Result<ElementRef, CaseError> {
        let timeout = self.config.element_timeout();
        let mut last_error = None;
        let found = poll_until(timeout, self.config.poll_interval(), || {
            match self.driver.find_element(locator) {
                Ok(found) => Ok(found),
                Err(e) => {
                    last_error = Some(e.to_string());
                    Ok(None)
                }
            }
        })?;

        found.ok_or_else(|| CaseError::LocateTimeout {
            locator: locator.to_string(),
            timeout_ms: self.config.element_timeout_ms,
            last_error,
        })
    }
}

/// Call `probe` until it yields a value or `timeout` has elapsed. The probe
/// always runs at least once. `Ok(None)` means the deadline passed.
fn poll_until<T, F>(timeout: Duration, interval: Duration, mut probe: F) -> Result<Option<T>, CaseError>
where
    F: FnMut() -> Result<Option<T>, CaseError>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe()? {
            return Ok(Some(value));
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(None);
        }
        thread::sleep(interval.min(deadline - now));
    }
}
