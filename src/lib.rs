//! Browser test-case runner that records every case as an Allure result set.
//!
//! The [`suite::orchestrator::SuiteRunner`] owns one browser session per run,
//! hands each case to the [`spec::runner::CaseRunner`], and finalizes the
//! [`report::builder::ReportBuilder`] whatever happens along the way.

pub mod browser;
pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod spec;
pub mod suite;
pub mod trace;
