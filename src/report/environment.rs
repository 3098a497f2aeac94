use serde_json::{json, Value};

/// Run environment written to `environment.properties`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentInfo {
    pub suite: String,
    pub browser: String,
    pub browser_version: String,
    pub executed_at: String,
    pub platform: String,
    pub runner_version: String,
}

impl EnvironmentInfo {
    pub fn new(suite: &str, browser: &str, browser_version: &str) -> Self {
        Self {
            suite: suite.to_string(),
            browser: browser.to_string(),
            browser_version: browser_version.to_string(),
            executed_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            runner_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// `key=value` lines. Newlines inside values are flattened so each
    /// entry stays on one line.
    pub fn to_properties(&self) -> String {
        let entries = [
            ("suite", &self.suite),
            ("browser", &self.browser),
            ("browser.version", &self.browser_version),
            ("executed.at", &self.executed_at),
            ("platform", &self.platform),
            ("runner.version", &self.runner_version),
        ];
        entries
            .iter()
            .map(|(k, v)| format!("{}={}\n", k, v.replace(['\r', '\n'], " ")))
            .collect()
    }
}

/// Fixed classification rules consumed by the renderer (`categories.json`).
pub fn categories() -> Value {
    json!([
        {
            "name": "Ignored tests",
            "matchedStatuses": ["skipped"]
        },
        {
            "name": "Infrastructure problems",
            "matchedStatuses": ["broken", "failed"],
            "messageRegex": "^NavigationError.*"
        },
        {
            "name": "Outdated tests",
            "matchedStatuses": ["broken", "failed"],
            "messageRegex": "^(ConfigurationError|LocateTimeoutError).*"
        },
        {
            "name": "Product defects",
            "matchedStatuses": ["failed"]
        },
        {
            "name": "Test defects",
            "matchedStatuses": ["broken"]
        }
    ])
}
