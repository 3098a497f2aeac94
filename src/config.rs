use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Explicit run configuration handed to every component at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Root under which each run gets its own `execution_<id>_<timestamp>` directory
    #[serde(default = "default_reports_root")]
    pub reports_root: PathBuf,

    /// Upper bound for a navigation to reach `document.readyState == "complete"`
    #[serde(default = "default_page_load_timeout_ms")]
    pub page_load_timeout_ms: u64,

    /// Upper bound for an element to become present
    #[serde(default = "default_element_timeout_ms")]
    pub element_timeout_ms: u64,

    /// Delay between two polls of a bounded wait
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_true")]
    pub continue_on_failure: bool,

    /// Value of the `framework` label on every case result
    #[serde(default = "default_framework_label")]
    pub framework_label: String,

    #[serde(default)]
    pub renderer: RendererConfig,

    /// Pack the finished report directory into `<report_dir>.zip`
    #[serde(default)]
    pub compress_reports: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_allure_program")]
    pub program: String,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: default_allure_program(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            reports_root: default_reports_root(),
            page_load_timeout_ms: default_page_load_timeout_ms(),
            element_timeout_ms: default_element_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            continue_on_failure: true,
            framework_label: default_framework_label(),
            renderer: RendererConfig::default(),
            compress_reports: false,
        }
    }
}

impl RunnerConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// Serde default helpers
fn default_reports_root() -> PathBuf { PathBuf::from("reports") }
fn default_page_load_timeout_ms() -> u64 { 10_000 }
fn default_element_timeout_ms() -> u64 { 10_000 }
fn default_poll_interval_ms() -> u64 { 250 }
fn default_true() -> bool { true }
fn default_framework_label() -> String { "web-case-runner".to_string() }
fn default_allure_program() -> String { "allure".to_string() }
