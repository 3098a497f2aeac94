use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::browser::driver::{BrowserInfo, Driver, ElementRef, Locator};
use crate::error::DriverError;

/// Request sent to the browser helper over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
    },
    Find {
        cmd: &'static str,
        locator: Locator,
    },
    Element {
        cmd: &'static str,
        handle: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },
    Page {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
        }
    }

    pub fn find(locator: &Locator) -> Self {
        BrowserRequest::Find {
            cmd: "find",
            locator: locator.clone(),
        }
    }

    /// Command against a previously found element (`click`, `fill`,
    /// `select`, `attribute`, ...).
    pub fn element(cmd: &'static str, element: &ElementRef, value: Option<&str>) -> Self {
        BrowserRequest::Element {
            cmd,
            handle: element.0.clone(),
            value: value.map(|v| v.to_string()),
        }
    }

    /// Page-level command without arguments (`current_url`, `title`, ...).
    pub fn page(cmd: &'static str) -> Self {
        BrowserRequest::Page { cmd }
    }
}

/// Response received from the browser helper over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub browser: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// A persistent browser session backed by a Node.js Playwright helper.
///
/// The helper keeps one Chromium page open; commands are sent as NDJSON over
/// stdin and answered one line each on stdout. Located elements are kept on
/// the helper side and referenced by handle.
///
/// Every read waits at most `timeout`. A helper that misses the deadline is
/// killed, so later commands fail fast instead of reading a stale answer.
pub struct NodeSession {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<io::Result<String>>,
    timeout: Duration,
    info: BrowserInfo,
    closed: bool,
}

impl NodeSession {
    /// Launch `node <script>` and wait for its ready line.
    pub fn launch(script: &str, timeout: Duration) -> Result<Self, DriverError> {
        let mut command = Command::new("node");
        command.arg(script);
        Self::spawn(command, timeout)
    }

    /// Launch an arbitrary helper command speaking the same protocol.
    pub fn spawn(mut command: Command, timeout: Duration) -> Result<Self, DriverError> {
        let program = command.get_program().to_string_lossy().into_owned();
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::Spawn { program, source: e })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture helper stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::SessionIo("failed to capture helper stdout".into()))?;

        // Dropping the session on any error below reaps the helper.
        let mut session = NodeSession {
            child,
            stdin,
            lines: spawn_reader(stdout),
            timeout,
            info: BrowserInfo::default(),
            closed: false,
        };

        let ready = session.read_response("ready signal")?;
        if !ready.ok || ready.ready != Some(true) {
            return Err(DriverError::Protocol {
                command: "launch".into(),
                message: ready
                    .error
                    .unwrap_or_else(|| "helper did not report ready".into()),
            });
        }

        session.info = BrowserInfo {
            name: ready.browser.unwrap_or_else(|| "chromium".into()),
            version: ready.version.unwrap_or_else(|| "unknown".into()),
        };
        Ok(session)
    }

    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        let json = serde_json::to_string(request).map_err(|e| DriverError::Json {
            context: "browser request".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .and_then(|()| self.stdin.flush())
            .map_err(|e| DriverError::SessionIo(format!("failed to write to helper: {}", e)))?;

        self.read_response("browser response")
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest, command: &str) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(DriverError::Protocol {
                command: command.into(),
                message: response.error.unwrap_or_else(|| "unknown error".into()),
            });
        }
        Ok(response)
    }

    fn element_cmd(&mut self, cmd: &'static str, element: &ElementRef, value: Option<&str>) -> Result<BrowserResponse, DriverError> {
        self.send_ok(&BrowserRequest::element(cmd, element, value), cmd)
    }

    fn page_text(&mut self, cmd: &'static str) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::page(cmd), cmd)?;
        response.text.ok_or_else(|| DriverError::Protocol {
            command: cmd.into(),
            message: "no text in response".into(),
        })
    }

    fn read_response(&mut self, context: &str) -> Result<BrowserResponse, DriverError> {
        let line = match self.lines.recv_timeout(self.timeout) {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                return Err(DriverError::SessionIo(format!("failed to read {}: {}", context, e)));
            }
            Err(RecvTimeoutError::Timeout) => {
                self.kill();
                return Err(DriverError::SessionIo(format!(
                    "no {} within {} ms, helper killed",
                    context,
                    self.timeout.as_millis()
                )));
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(DriverError::SessionIo(format!(
                    "helper closed its output before {} (process may have died)",
                    context
                )));
            }
        };

        if line.trim().is_empty() {
            return Err(DriverError::SessionIo(format!("empty {}", context)));
        }

        serde_json::from_str(line.trim()).map_err(|e| DriverError::Json {
            context: context.to_string(),
            source: e,
        })
    }

    /// Wait up to the session timeout for the helper to exit, then kill it.
    fn reap(&mut self) -> Result<(), DriverError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.child.try_wait() {
                Ok(Some(_)) => return Ok(()),
                Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
                Ok(None) => {
                    warn!("helper did not exit in time, killing it");
                    self.kill();
                    return Ok(());
                }
                Err(e) => {
                    return Err(DriverError::SessionIo(format!("failed to reap helper: {}", e)));
                }
            }
        }
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "failed to kill helper");
        }
        let _ = self.child.wait();
    }
}

const REAP_POLL: Duration = Duration::from_millis(20);

/// Forward stdout lines to a channel so reads can carry a deadline.
fn spawn_reader(stdout: ChildStdout) -> Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut reader = BufReader::new(stdout);
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(Ok(line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                    break;
                }
            }
        }
    });
    rx
}

impl Driver for NodeSession {
    fn current_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::page("current_url"), "current_url")?;
        response.url.ok_or_else(|| DriverError::Protocol {
            command: "current_url".into(),
            message: "no URL in response".into(),
        })
    }

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::navigate(url), "navigate")?;
        Ok(())
    }

    fn ready_state(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::page("ready_state"), "ready_state")?;
        Ok(response.state.unwrap_or_else(|| "loading".into()))
    }

    fn find_element(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        let response = self.send_ok(&BrowserRequest::find(locator), "find")?;
        Ok(response.handle.map(ElementRef))
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.element_cmd("click", element, None).map(|_| ())
    }

    fn double_click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.element_cmd("dblclick", element, None).map(|_| ())
    }

    fn hover(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.element_cmd("hover", element, None).map(|_| ())
    }

    fn clear(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.element_cmd("fill", element, Some("")).map(|_| ())
    }

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.element_cmd("type", element, Some(text)).map(|_| ())
    }

    fn select_option(&mut self, element: &ElementRef, option: &str) -> Result<(), DriverError> {
        self.element_cmd("select", element, Some(option)).map(|_| ())
    }

    fn element_text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let response = self.element_cmd("text", element, None)?;
        Ok(response.text.unwrap_or_default())
    }

    fn element_attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        let response = self.element_cmd("attribute", element, Some(name))?;
        Ok(response.text)
    }

    fn title(&mut self) -> Result<String, DriverError> {
        self.page_text("title")
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let response = self.send_ok(&BrowserRequest::page("screenshot"), "screenshot")?;
        let encoded = response.data.ok_or_else(|| DriverError::Protocol {
            command: "screenshot".into(),
            message: "no image data in response".into(),
        })?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded)?)
    }

    fn browser_info(&mut self) -> BrowserInfo {
        self.info.clone()
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort quit; the process may already be gone
        let _ = self.send(&BrowserRequest::page("quit"));
        self.reap()
    }
}

impl Drop for NodeSession {
    fn drop(&mut self) {
        let _ = self.quit();
    }
}
