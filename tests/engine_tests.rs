use pretty_assertions::assert_eq;
use tempfile::TempDir;
use web_case_runner::browser::driver::LocatorType;
use web_case_runner::report::builder::ReportBuilder;
use web_case_runner::report::report_model::{CaseResult, Status};
use web_case_runner::spec::runner::CaseRunner;
use web_case_runner::spec::spec_model::{ActionKind, AssertionKind, CaseSpec, PageObject, SuiteContext};

use crate::common::fake_driver::FakeBrowser;
use crate::common::fixtures::{fast_config, result_files, step_names};

mod common;

// ============================================================================
// Helpers
// ============================================================================

struct Executed {
    passed: bool,
    result: CaseResult,
    _tmp: TempDir,
}

fn execute(browser: &FakeBrowser, case: &CaseSpec, suite: &SuiteContext) -> Executed {
    let tmp = TempDir::new().unwrap();
    let config = fast_config(tmp.path());
    let mut report = ReportBuilder::at(tmp.path().join("execution_test"), "web-case-runner");
    let mut driver = browser.driver();

    let passed = {
        let mut runner = CaseRunner::new(driver.as_mut(), &mut report, &config);
        runner.execute_case(case, suite).unwrap()
    };

    assert_eq!(result_files(report.results_dir()).len(), 1, "case must be finalized");
    let result = report.cases().next().unwrap().clone();
    Executed {
        passed,
        result,
        _tmp: tmp,
    }
}

fn shop() -> SuiteContext {
    SuiteContext::new("Shop", Some("http://shop.test"))
}

fn search_case() -> CaseSpec {
    let mut case = CaseSpec::new(7, "Search for hello", ActionKind::Input);
    case.url = Some("http://shop.test/search".to_string());
    case.locator = Some("#q".to_string());
    case.action_value = Some("hello".to_string());
    case.assert_type = Some(AssertionKind::Text);
    case.assert_expression = Some("hello".to_string());
    case
}

fn statuses(result: &CaseResult) -> Vec<Status> {
    result.steps.iter().map(|s| s.status).collect()
}

fn step_attachment_names(result: &CaseResult, index: usize) -> Vec<&str> {
    result.steps[index]
        .attachments
        .iter()
        .map(|a| a.name.as_str())
        .collect()
}

// ============================================================================
// Passing cases
// ============================================================================

#[test]
fn passing_case_records_locate_action_and_assert() {
    let browser = FakeBrowser::new().with_element("#q", "hello");

    let run = execute(&browser, &search_case(), &shop());

    assert!(run.passed);
    assert_eq!(run.result.status, Status::Passed);
    assert_eq!(
        run.result.steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["Locate element: css=#q", "Perform action: input", "Assert: text"]
    );
    assert_eq!(step_attachment_names(&run.result, 0), vec!["Screenshot after locate"]);
    assert_eq!(step_attachment_names(&run.result, 1), vec!["Screenshot after action"]);
    assert_eq!(step_attachment_names(&run.result, 2), vec!["Assertion result"]);
    assert_eq!(browser.state().calls.iter().filter(|c| c.starts_with("send_keys")).count(), 1);
    assert!(browser.state().calls.contains(&"clear #q".to_string()));
}

#[test]
fn navigation_is_skipped_when_already_on_target() {
    let browser = FakeBrowser::new()
        .at_url("http://shop.test/search")
        .with_element("#q", "hello");

    let run = execute(&browser, &search_case(), &shop());

    assert!(run.passed);
    assert!(browser.state().navigations.is_empty());
}

#[test]
fn navigation_waits_for_document_complete() {
    let browser = FakeBrowser::new().loading_for(3).with_element("#q", "hello");

    let run = execute(&browser, &search_case(), &shop());

    assert!(run.passed);
    assert_eq!(browser.state().navigations, vec!["http://shop.test/search"]);
    assert!(browser.state().ready_states.is_empty());
}

#[test]
fn page_object_relative_url_is_joined_with_base() {
    let browser = FakeBrowser::new().with_element("#buy", "Buy");
    let mut case = CaseSpec::new(3, "Buy", ActionKind::Click);
    case.page_object = Some(PageObject {
        name: "Product page".to_string(),
        url: Some("/products/42".to_string()),
        locator: Some("buy".to_string()),
        locator_type: Some(LocatorType::Id),
    });
    case.locator = Some("#buy".to_string());

    let run = execute(&browser, &case, &shop());

    assert!(run.passed);
    assert_eq!(browser.state().navigations, vec!["http://shop.test/products/42"]);
    // The case's own locator wins, with the page object's type.
    assert_eq!(step_names_of(&run.result)[0], "Locate element: id=#buy");
}

fn step_names_of(result: &CaseResult) -> Vec<String> {
    result.steps.iter().map(|s| s.name.clone()).collect()
}

#[test]
fn case_without_assertion_passes_after_action() {
    let browser = FakeBrowser::new().with_element(".menu", "Menu");
    let mut case = CaseSpec::new(4, "Open menu", ActionKind::Hover);
    case.url = Some("/".to_string());
    case.locator = Some(".menu".to_string());

    let run = execute(&browser, &case, &shop());

    assert!(run.passed);
    assert_eq!(run.result.steps.len(), 2);
    assert!(browser.state().calls.contains(&"hover .menu".to_string()));
}

#[test]
fn attribute_and_title_assertions() {
    let browser = FakeBrowser::new()
        .with_element("#agree", "")
        .with_attribute("#agree", "aria-checked", "true")
        .with_title("Checkout");

    let mut case = CaseSpec::new(5, "Agree", ActionKind::Click);
    case.url = Some("/checkout".to_string());
    case.locator = Some("#agree".to_string());
    case.assert_type = Some(AssertionKind::Attribute);
    case.assert_expression = Some("aria-checked=true".to_string());
    assert!(execute(&browser, &case, &shop()).passed);

    case.assert_type = Some(AssertionKind::Title);
    case.assert_expression = Some("Checkout".to_string());
    assert!(execute(&browser, &case, &shop()).passed);
}

#[test]
fn screenshot_failures_do_not_fail_the_case() {
    let browser = FakeBrowser::new()
        .with_element("#q", "hello")
        .without_screenshots();

    let run = execute(&browser, &search_case(), &shop());

    assert!(run.passed);
    assert!(step_attachment_names(&run.result, 0).is_empty());
}

// ============================================================================
// Failing cases
// ============================================================================

#[test]
fn assertion_mismatch_fails_only_the_assert_step() {
    let browser = FakeBrowser::new().with_element("#q", "hello");
    let mut case = search_case();
    case.assert_expression = Some("world".to_string());

    let run = execute(&browser, &case, &shop());

    assert!(!run.passed);
    assert_eq!(run.result.status, Status::Failed);
    assert_eq!(statuses(&run.result), vec![Status::Passed, Status::Passed, Status::Failed]);

    let names = step_attachment_names(&run.result, 2);
    assert_eq!(names.iter().filter(|n| **n == "Error detail").count(), 1);
    assert!(names.contains(&"Failure screenshot"));

    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("AssertionFailure:"), "{}", message);
    assert!(message.contains("\"world\""));
    assert!(message.contains("\"hello\""));
}

#[test]
fn missing_element_is_a_locate_timeout() {
    let browser = FakeBrowser::new();

    let run = execute(&browser, &search_case(), &shop());

    assert!(!run.passed);
    assert_eq!(statuses(&run.result), vec![Status::Failed]);
    assert_eq!(run.result.steps[0].name, "Locate element: css=#q");
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("LocateTimeoutError:"), "{}", message);
    assert!(!browser.state().calls.iter().any(|c| c.starts_with("send_keys")));
}

#[test]
fn locate_timeout_reports_configured_milliseconds() {
    let browser = FakeBrowser::new();

    let run = execute(&browser, &search_case(), &shop());

    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.contains("not present after 60 ms"), "{}", message);
}

#[test]
fn driver_errors_while_locating_are_retried_then_reported() {
    let browser = FakeBrowser::new().with_element("#q", "hello").failing("find");

    let run = execute(&browser, &search_case(), &shop());

    assert!(!run.passed);
    let finds = browser.state().calls.iter().filter(|c| c.starts_with("find")).count();
    assert!(finds > 1, "expected retries, saw {}", finds);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.contains("scripted failure"), "{}", message);
}

#[test]
fn missing_locator_is_a_configuration_error() {
    let browser = FakeBrowser::new();
    let mut case = search_case();
    case.locator = None;

    let run = execute(&browser, &case, &shop());

    assert!(!run.passed);
    assert_eq!(step_names_of(&run.result), vec!["Resolve locator"]);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("ConfigurationError:"), "{}", message);
}

#[test]
fn relative_url_without_base_is_a_configuration_error() {
    let browser = FakeBrowser::new().with_element("#q", "hello");
    let mut case = search_case();
    case.url = Some("/search".to_string());

    let run = execute(&browser, &case, &SuiteContext::new("Shop", None));

    assert!(!run.passed);
    assert_eq!(step_names_of(&run.result), vec!["Resolve target URL"]);
    assert!(browser.state().navigations.is_empty());
}

#[test]
fn navigation_failure_records_navigate_step() {
    let browser = FakeBrowser::new().with_element("#q", "hello").failing("navigate");

    let run = execute(&browser, &search_case(), &shop());

    assert!(!run.passed);
    assert_eq!(step_names_of(&run.result), vec!["Navigate to http://shop.test/search"]);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("NavigationError:"), "{}", message);
}

#[test]
fn page_that_never_loads_is_a_navigation_error() {
    let browser = FakeBrowser::new().loading_for(10_000).with_element("#q", "hello");

    let run = execute(&browser, &search_case(), &shop());

    assert!(!run.passed);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.contains("not ready"), "{}", message);
}

#[test]
fn rejected_action_fails_the_action_step() {
    let browser = FakeBrowser::new().with_element("#buy", "Buy").failing("click");
    let mut case = CaseSpec::new(9, "Buy", ActionKind::Click);
    case.url = Some("/products/1".to_string());
    case.locator = Some("#buy".to_string());

    let run = execute(&browser, &case, &shop());

    assert!(!run.passed);
    assert_eq!(statuses(&run.result), vec![Status::Passed, Status::Failed]);
    assert_eq!(run.result.steps[1].name, "Perform action: click");
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("ActionExecutionError:"), "{}", message);
}

#[test]
fn input_without_value_is_a_configuration_error() {
    let browser = FakeBrowser::new().with_element("#q", "");
    let mut case = search_case();
    case.action_value = None;

    let run = execute(&browser, &case, &shop());

    assert!(!run.passed);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("ConfigurationError:"), "{}", message);
}

#[test]
fn assertion_without_expression_is_a_configuration_error() {
    let browser = FakeBrowser::new().with_element("#empty", "");
    let mut case = CaseSpec::new(11, "Empty banner", ActionKind::Click);
    case.url = Some("/".to_string());
    case.locator = Some("#empty".to_string());
    case.assert_type = Some(AssertionKind::Text);

    let run = execute(&browser, &case, &shop());

    assert!(!run.passed);
    assert_eq!(statuses(&run.result), vec![Status::Passed, Status::Passed, Status::Failed]);
    assert_eq!(run.result.steps[2].name, "Assert: text");
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("ConfigurationError:"), "{}", message);
    assert!(message.contains("needs an expression"), "{}", message);
}

#[test]
fn presence_assertion_needs_no_expression() {
    let browser = FakeBrowser::new().with_element("#banner", "Sale");
    let mut case = CaseSpec::new(12, "Banner shown", ActionKind::Hover);
    case.url = Some("/".to_string());
    case.locator = Some("#banner".to_string());
    case.assert_type = Some(AssertionKind::Presence);

    assert!(execute(&browser, &case, &shop()).passed);
}

#[test]
fn text_assertion_compares_whitespace_exactly() {
    let browser = FakeBrowser::new().with_element("#price", "  10.00\n");
    let mut case = CaseSpec::new(13, "Price", ActionKind::Hover);
    case.url = Some("/".to_string());
    case.locator = Some("#price".to_string());
    case.assert_type = Some(AssertionKind::Text);
    case.assert_expression = Some("10.00".to_string());

    let run = execute(&browser, &case, &shop());
    assert!(!run.passed);
    let message = run.result.status_details.as_ref().unwrap().message.clone().unwrap();
    assert!(message.starts_with("AssertionFailure:"), "{}", message);

    case.assert_type = Some(AssertionKind::TextContains);
    assert!(execute(&browser, &case, &shop()).passed);

    case.assert_type = Some(AssertionKind::Text);
    case.assert_expression = Some("  10.00\n".to_string());
    assert!(execute(&browser, &case, &shop()).passed);
}

#[test]
fn result_file_matches_in_memory_steps() {
    let tmp = TempDir::new().unwrap();
    let config = fast_config(tmp.path());
    let mut report = ReportBuilder::at(tmp.path().join("execution_file"), "web-case-runner");
    let browser = FakeBrowser::new().with_element("#q", "hello");
    let mut driver = browser.driver();
    let mut case = search_case();
    case.assert_expression = Some("world".to_string());

    CaseRunner::new(driver.as_mut(), &mut report, &config)
        .execute_case(&case, &shop())
        .unwrap();

    let files = result_files(report.results_dir());
    assert_eq!(files[0]["status"], "failed");
    assert_eq!(
        step_names(&files[0]),
        vec!["Locate element: css=#q", "Perform action: input", "Assert: text"]
    );
}
