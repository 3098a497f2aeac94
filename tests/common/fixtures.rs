use std::fs;
use std::path::Path;

use serde_json::Value;
use web_case_runner::config::RunnerConfig;
use web_case_runner::error::RenderError;
use web_case_runner::report::render::{Renderer, ENTRY_FILE};

/// Renderer stand-in: writes an entry file, writes nothing, or fails.
pub enum FakeRenderer {
    Writes,
    Silent,
    Fails,
}

impl Renderer for FakeRenderer {
    fn render(&self, results_dir: &Path, output_dir: &Path) -> Result<(), RenderError> {
        assert!(results_dir.is_dir(), "results dir must exist before rendering");
        match self {
            FakeRenderer::Writes => {
                fs::create_dir_all(output_dir).unwrap();
                fs::write(output_dir.join(ENTRY_FILE), "<html></html>").unwrap();
                Ok(())
            }
            FakeRenderer::Silent => Ok(()),
            FakeRenderer::Fails => Err(RenderError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "allure: command failed".to_string(),
            }),
        }
    }
}

/// Config with tight waits so timeout paths finish quickly.
pub fn fast_config(reports_root: &Path) -> RunnerConfig {
    RunnerConfig {
        reports_root: reports_root.to_path_buf(),
        page_load_timeout_ms: 200,
        element_timeout_ms: 60,
        poll_interval_ms: 10,
        ..RunnerConfig::default()
    }
}

fn files_ending(dir: &Path, suffix: &str) -> Vec<Value> {
    let mut found = Vec::new();
    for entry in fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if name.ends_with(suffix) {
            let content = fs::read_to_string(&path).unwrap();
            found.push(serde_json::from_str(&content).unwrap());
        }
    }
    found
}

/// Every `*-result.json` under `results_dir`.
pub fn result_files(results_dir: &Path) -> Vec<Value> {
    files_ending(results_dir, "-result.json")
}

/// Every `*-container.json` under `results_dir`.
pub fn container_files(results_dir: &Path) -> Vec<Value> {
    files_ending(results_dir, "-container.json")
}

/// Names of a result's steps, in order.
pub fn step_names(result: &Value) -> Vec<String> {
    result["steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect()
}
