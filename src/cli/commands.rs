use std::collections::HashSet;
use std::time::Duration;

use tracing::info;

use crate::browser::driver::Driver;
use crate::browser::session::NodeSession;
use crate::browser::webdriver::WebDriverSession;
use crate::cli::config::{AppConfig, DriverBackend, RunOverrides, merge_overrides, resolve_continue_on_failure};
use crate::error::DriverError;
use crate::report::builder::ReportBuilder;
use crate::report::console::format_console_report;
use crate::report::render::{AllureCli, NoRender, Renderer};
use crate::report::report_model::RunStatus;
use crate::spec::resolve::{resolve_locator, resolve_url};
use crate::spec::spec_model::{AssertionKind, SuiteSpec};
use crate::suite::orchestrator::SuiteRunner;

// ============================================================================
// run subcommand
// ============================================================================

/// Run a suite file and return whether the run passed.
pub fn cmd_run(
    suite_path: &str,
    execution_id: &str,
    config: AppConfig,
    overrides: &RunOverrides,
) -> Result<bool, Box<dyn std::error::Error>> {
    let suite = load_suite(suite_path)?;
    let config = merge_overrides(config, overrides);
    let continue_on_failure =
        resolve_continue_on_failure(overrides.continue_on_failure, suite.continue_on_failure, &config.runner);

    info!(
        suite = %suite.name,
        cases = suite.cases.len(),
        backend = ?config.driver.backend,
        "loaded suite"
    );

    let renderer: Box<dyn Renderer> = if config.runner.renderer.enabled {
        Box::new(AllureCli::new(&config.runner.renderer.program))
    } else {
        Box::new(NoRender)
    };

    let driver_config = config.driver.clone();
    let launcher = move || -> Result<Box<dyn Driver>, DriverError> {
        match driver_config.backend {
            DriverBackend::Webdriver => Ok(Box::new(WebDriverSession::launch(&driver_config.webdriver())?)),
            DriverBackend::Node => Ok(Box::new(NodeSession::launch(
                &driver_config.node_script,
                Duration::from_secs(driver_config.request_timeout_secs),
            )?)),
        }
    };

    let mut report = ReportBuilder::new(
        &config.runner.reports_root,
        &sanitize_filename(execution_id),
        &config.runner.framework_label,
    );
    let runner = SuiteRunner::new(&config.runner, renderer.as_ref());
    let outcome = runner.run_with(&mut report, &launcher, &suite.context(), &suite.cases, continue_on_failure)?;

    let cases: Vec<_> = report.cases().cloned().collect();
    print!("{}", format_console_report(&suite.name, &cases, &outcome.report));
    if let Some(reason) = &outcome.aborted {
        eprintln!("Run aborted: {}", reason);
    }

    Ok(outcome.status == RunStatus::Passed)
}

/// Load a suite from a YAML file.
pub fn load_suite(path: &str) -> Result<SuiteSpec, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    let suite: SuiteSpec = serde_yaml::from_str(&content)?;
    Ok(suite)
}

// ============================================================================
// validate subcommand
// ============================================================================

/// Check a suite file offline. Returns whether it is valid.
pub fn cmd_validate(suite_path: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let suite = load_suite(suite_path)?;
    let problems = validate_suite(&suite);

    if problems.is_empty() {
        println!("{}: {} cases OK", suite.name, suite.cases.len());
        return Ok(true);
    }

    println!("{}: {} problem(s)", suite.name, problems.len());
    for problem in &problems {
        println!("  - {}", problem);
    }
    Ok(false)
}

/// Everything that would make a case fail before it touches the browser.
pub fn validate_suite(suite: &SuiteSpec) -> Vec<String> {
    let context = suite.context();
    let mut problems = Vec::new();
    let mut seen = HashSet::new();

    for case in &suite.cases {
        let label = format!("case {} '{}'", case.id, case.name);

        if !seen.insert(case.id) {
            problems.push(format!("{}: duplicate id", label));
        }
        match resolve_url(case, &context) {
            Ok(None) if case.navigation_required => problems.push(format!("{}: no URL to navigate to", label)),
            Ok(_) => {}
            Err(e) => problems.push(format!("{}: {}", label, e)),
        }
        if let Err(e) = resolve_locator(case) {
            problems.push(format!("{}: {}", label, e));
        }
        if case.action.requires_value() && case.action_value.is_none() {
            problems.push(format!("{}: action '{}' needs a value", label, case.action));
        }
        match case.assert_type {
            Some(AssertionKind::Presence) | None => {}
            Some(kind) if case.assert_expression.is_none() => {
                problems.push(format!("{}: assertion '{}' needs an expression", label, kind));
            }
            Some(_) => {}
        }
    }

    problems
}

// ============================================================================
// Helpers
// ============================================================================

/// Sanitize an identifier into a safe path component.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
