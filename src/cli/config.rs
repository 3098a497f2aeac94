use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::browser::webdriver::WebDriverConfig;
use crate::config::RunnerConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "web-case-runner",
    version,
    about = "Run browser test cases and build an Allure report"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: web-case-runner.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a suite file against a browser session
    Run {
        /// Path to the suite YAML file
        #[arg(long)]
        suite: String,

        /// Execution identifier used in the report directory name
        #[arg(long, default_value = "local")]
        execution_id: String,

        /// Keep running cases after one fails
        #[arg(long, conflicts_with = "stop_on_failure")]
        continue_on_failure: bool,

        /// Stop at the first failed case
        #[arg(long)]
        stop_on_failure: bool,

        /// Directory that receives execution_<id>_<timestamp> report directories
        #[arg(long)]
        reports_root: Option<PathBuf>,

        /// Browser backend
        #[arg(long, value_enum)]
        driver: Option<DriverBackend>,

        /// WebDriver server endpoint
        #[arg(long)]
        webdriver_url: Option<String>,

        /// Write raw results only, skip the HTML renderer
        #[arg(long)]
        no_render: bool,
    },

    /// Check a suite file without opening a browser
    Validate {
        /// Path to the suite YAML file
        #[arg(long)]
        suite: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `web-case-runner.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DriverBackend {
    Webdriver,
    Node,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_backend")]
    pub backend: DriverBackend,

    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    #[serde(default = "default_browser")]
    pub browser: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    /// Seconds before a single WebDriver request is abandoned
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Helper script for the `node` backend
    #[serde(default = "default_node_script")]
    pub node_script: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            webdriver_url: default_webdriver_url(),
            browser: default_browser(),
            headless: true,
            request_timeout_secs: default_request_timeout_secs(),
            node_script: default_node_script(),
        }
    }
}

impl DriverConfig {
    pub fn webdriver(&self) -> WebDriverConfig {
        WebDriverConfig {
            server_url: self.webdriver_url.clone(),
            browser: self.browser.clone(),
            headless: self.headless,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

// Serde default helpers
fn default_backend() -> DriverBackend { DriverBackend::Webdriver }
fn default_webdriver_url() -> String { "http://localhost:9515".to_string() }
fn default_browser() -> String { "chrome".to_string() }
fn default_true() -> bool { true }
fn default_request_timeout_secs() -> u64 { 60 }
fn default_node_script() -> String { "node/browser_server.js".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("web-case-runner.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> AppConfig {
    match serde_yaml::from_str(content) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "malformed config file, using defaults");
            AppConfig::default()
        }
    }
}

// ============================================================================
// Config merging (CLI > suite file > config file > defaults)
// ============================================================================

/// Overrides collected from `run` flags.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub continue_on_failure: Option<bool>,
    pub reports_root: Option<PathBuf>,
    pub driver: Option<DriverBackend>,
    pub webdriver_url: Option<String>,
    pub no_render: bool,
}

impl RunOverrides {
    /// Collapse the two opposing policy flags into one optional value.
    pub fn policy_flags(continue_on_failure: bool, stop_on_failure: bool) -> Option<bool> {
        match (continue_on_failure, stop_on_failure) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Apply CLI overrides to the loaded config.
pub fn merge_overrides(mut config: AppConfig, overrides: &RunOverrides) -> AppConfig {
    if let Some(root) = &overrides.reports_root {
        config.runner.reports_root = root.clone();
    }
    if let Some(backend) = overrides.driver {
        config.driver.backend = backend;
    }
    if let Some(url) = &overrides.webdriver_url {
        config.driver.webdriver_url = url.clone();
    }
    if overrides.no_render {
        config.runner.renderer.enabled = false;
    }
    config
}

/// Effective continue-on-failure policy for a run.
pub fn resolve_continue_on_failure(cli: Option<bool>, suite: Option<bool>, config: &RunnerConfig) -> bool {
    cli.or(suite).unwrap_or(config.continue_on_failure)
}
