use crate::report::builder::ReportOutcome;
use crate::report::report_model::{CaseResult, Status};

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format the outcome of a run for terminal output.
///
/// Produces output like:
/// ```text
/// === Suite: Checkout ===
///
/// ✓ PASS  Open cart (2 steps)
/// ✗ FAIL  Apply coupon (3 steps)
///     [FAIL] Assert text: AssertionFailure: text mismatch: expected "10%", actual "5%"
///
/// === Results: 1 passed, 1 failed, 0 broken, 0 skipped (2 total) ===
/// Report: reports/execution_7_20250101_120000/html/index.html
/// ```
pub fn format_console_report(suite_name: &str, cases: &[CaseResult], outcome: &ReportOutcome) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Suite: {} ===\n\n", suite_name));

    for case in cases {
        out.push_str(&format!(
            "{}  {} ({} steps)\n",
            status_marker(case.status),
            case.name,
            case.steps.len()
        ));

        for step in case.steps.iter().filter(|s| !s.status.is_passed()) {
            let detail = step
                .status_details
                .as_ref()
                .and_then(|d| d.message.as_deref())
                .unwrap_or("no details");
            out.push_str(&format!(
                "    [{}] {}: {}\n",
                step.status.as_str().to_uppercase(),
                step.name,
                detail
            ));
        }
    }

    let summary = &outcome.summary;
    out.push_str(&format!(
        "\n=== Results: {} passed, {} failed, {} broken, {} skipped ({} total) ===\n",
        summary.passed, summary.failed, summary.broken, summary.skipped, summary.total
    ));

    match (&outcome.entry, &outcome.render_error) {
        (Some(entry), _) => out.push_str(&format!("Report: {}\n", entry.display())),
        (None, Some(e)) => out.push_str(&format!(
            "Report not rendered ({}); raw results in {}\n",
            e,
            outcome.results_dir.display()
        )),
        (None, None) => out.push_str(&format!("Raw results in {}\n", outcome.results_dir.display())),
    }
    if let Some(archive) = &outcome.archive {
        out.push_str(&format!("Archive: {}\n", archive.display()));
    }

    out
}

fn status_marker(status: Status) -> &'static str {
    match status {
        Status::Passed => "\u{2713} PASS",
        Status::Failed => "\u{2717} FAIL",
        Status::Broken => "! BROKEN",
        Status::Skipped => "- SKIP",
    }
}
