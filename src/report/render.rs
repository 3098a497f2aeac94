use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::RenderError;

/// Entry file a successful render leaves in the output directory.
pub const ENTRY_FILE: &str = "index.html";

/// Turns a results directory into a browsable report.
pub trait Renderer {
    fn render(&self, results_dir: &Path, output_dir: &Path) -> Result<(), RenderError>;
}

/// Runs `allure generate <results> -o <output> --clean` as a subprocess.
pub struct AllureCli {
    pub program: String,
}

impl AllureCli {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
        }
    }
}

impl Default for AllureCli {
    fn default() -> Self {
        Self::new("allure")
    }
}

impl Renderer for AllureCli {
    fn render(&self, results_dir: &Path, output_dir: &Path) -> Result<(), RenderError> {
        debug!(program = %self.program, results = %results_dir.display(), "invoking renderer");

        let output = Command::new(&self.program)
            .arg("generate")
            .arg(results_dir)
            .arg("-o")
            .arg(output_dir)
            .arg("--clean")
            .output()
            .map_err(|e| RenderError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(RenderError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        info!(output = %output_dir.display(), "report rendered");
        Ok(())
    }
}

/// Leaves the raw results alone. Used with `--no-render`.
pub struct NoRender;

impl Renderer for NoRender {
    fn render(&self, _results_dir: &Path, _output_dir: &Path) -> Result<(), RenderError> {
        Err(RenderError::Disabled)
    }
}
