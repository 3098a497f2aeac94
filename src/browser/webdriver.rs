use std::time::Duration;

use base64::Engine;
use reqwest::blocking::Client;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::browser::driver::{BrowserInfo, Driver, ElementRef, Locator};
use crate::error::DriverError;

/// W3C element identifier key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const SELECT_OPTION_SCRIPT: &str = r#"
const select = arguments[0];
for (const option of select.options) {
    if (option.text.trim() === arguments[1] || option.value === arguments[1]) {
        select.value = option.value;
        select.dispatchEvent(new Event('change', { bubbles: true }));
        return true;
    }
}
return false;
"#;

/// Where and how to open a WebDriver session.
#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// chromedriver / geckodriver endpoint, e.g. `http://localhost:9515`
    pub server_url: String,
    pub browser: String,
    pub headless: bool,
    pub request_timeout: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:9515".to_string(),
            browser: "chrome".to_string(),
            headless: true,
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl WebDriverConfig {
    fn capabilities(&self) -> Value {
        let mut always = json!({ "browserName": self.browser });
        if self.headless {
            match self.browser.as_str() {
                "chrome" | "chromium" => {
                    always["goog:chromeOptions"] = json!({ "args": ["--headless=new", "--no-sandbox"] });
                }
                "firefox" => {
                    always["moz:firefoxOptions"] = json!({ "args": ["-headless"] });
                }
                _ => {}
            }
        }
        json!({ "capabilities": { "alwaysMatch": always } })
    }
}

/// Every WebDriver response wraps its payload in `value`.
#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    value: Value,
}

/// A browser session driven over the W3C WebDriver HTTP protocol.
pub struct WebDriverSession {
    client: Client,
    session_url: String,
    info: BrowserInfo,
    closed: bool,
}

impl WebDriverSession {
    /// Open a new session on the driver server.
    pub fn launch(config: &WebDriverConfig) -> Result<Self, DriverError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let server = config.server_url.trim_end_matches('/').to_string();

        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", server),
            Some(config.capabilities()),
            "new session",
        )?;

        let session_id = value["sessionId"]
            .as_str()
            .ok_or_else(|| DriverError::Protocol {
                command: "new session".into(),
                message: "no sessionId in response".into(),
            })?
            .to_string();

        let caps = &value["capabilities"];
        let info = BrowserInfo {
            name: caps["browserName"].as_str().unwrap_or(&config.browser).to_string(),
            version: caps["browserVersion"].as_str().unwrap_or("unknown").to_string(),
        };

        debug!(session = %session_id, browser = %info.name, "webdriver session opened");

        Ok(Self {
            client,
            session_url: format!("{}/session/{}", server, session_id),
            info,
            closed: false,
        })
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>, name: &str) -> Result<Value, DriverError> {
        let url = format!("{}{}", self.session_url, path);
        send(&self.client, method, &url, body, name)
    }

    fn element_path(element: &ElementRef, suffix: &str) -> String {
        format!("/element/{}{}", element.0, suffix)
    }

    fn pointer_actions(element: &ElementRef, clicks: usize) -> Value {
        let mut steps = vec![json!({
            "type": "pointerMove",
            "duration": 0,
            "origin": { ELEMENT_KEY: element.0 },
            "x": 0,
            "y": 0
        })];
        for _ in 0..clicks {
            steps.push(json!({ "type": "pointerDown", "button": 0 }));
            steps.push(json!({ "type": "pointerUp", "button": 0 }));
        }
        json!({
            "actions": [{
                "type": "pointer",
                "id": "mouse",
                "parameters": { "pointerType": "mouse" },
                "actions": steps
            }]
        })
    }
}

fn send(client: &Client, method: Method, url: &str, body: Option<Value>, name: &str) -> Result<Value, DriverError> {
    let request = client.request(method, url);
    let request = match body {
        Some(body) => request.json(&body),
        None => request,
    };
    let response = request.send()?;
    let status = response.status();
    let text = response.text()?;

    let wire: WireResponse = serde_json::from_str(&text).map_err(|e| DriverError::Json {
        context: format!("{} response", name),
        source: e,
    })?;

    if !status.is_success() {
        let error = wire.value["error"].as_str().unwrap_or("unknown error");
        let message = wire.value["message"].as_str().unwrap_or("");
        return Err(DriverError::Protocol {
            command: name.to_string(),
            message: format!("{} ({}): {}", error, status.as_u16(), message),
        });
    }

    Ok(wire.value)
}

fn is_no_such_element(err: &DriverError) -> bool {
    matches!(err, DriverError::Protocol { message, .. } if message.starts_with("no such element"))
}

fn as_string(value: Value, command: &str) -> Result<String, DriverError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(DriverError::Protocol {
            command: command.to_string(),
            message: format!("expected a string, got {}", other),
        }),
    }
}

impl Driver for WebDriverSession {
    fn current_url(&mut self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/url", None, "current_url")?;
        as_string(value, "current_url")
    }

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })), "navigate")?;
        Ok(())
    }

    fn ready_state(&mut self) -> Result<String, DriverError> {
        let body = json!({ "script": "return document.readyState", "args": [] });
        let value = self.command(Method::POST, "/execute/sync", Some(body), "ready_state")?;
        as_string(value, "ready_state")
    }

    fn find_element(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        let (using, value) = locator.to_webdriver();
        let body = json!({ "using": using, "value": value });
        match self.command(Method::POST, "/element", Some(body), "find_element") {
            Ok(found) => {
                let id = found[ELEMENT_KEY].as_str().ok_or_else(|| DriverError::Protocol {
                    command: "find_element".into(),
                    message: "response carries no element reference".into(),
                })?;
                Ok(Some(ElementRef(id.to_string())))
            }
            Err(e) if is_no_such_element(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(Method::POST, &Self::element_path(element, "/click"), Some(json!({})), "click")?;
        Ok(())
    }

    fn double_click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(Method::POST, "/actions", Some(Self::pointer_actions(element, 2)), "double_click")?;
        Ok(())
    }

    fn hover(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(Method::POST, "/actions", Some(Self::pointer_actions(element, 0)), "hover")?;
        Ok(())
    }

    fn clear(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.command(Method::POST, &Self::element_path(element, "/clear"), Some(json!({})), "clear")?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.command(
            Method::POST,
            &Self::element_path(element, "/value"),
            Some(json!({ "text": text })),
            "send_keys",
        )?;
        Ok(())
    }

    fn select_option(&mut self, element: &ElementRef, option: &str) -> Result<(), DriverError> {
        let body = json!({
            "script": SELECT_OPTION_SCRIPT,
            "args": [{ ELEMENT_KEY: element.0 }, option]
        });
        let selected = self.command(Method::POST, "/execute/sync", Some(body), "select_option")?;
        if selected.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(DriverError::Protocol {
                command: "select_option".into(),
                message: format!("no option matching '{}'", option),
            })
        }
    }

    fn element_text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self.command(Method::GET, &Self::element_path(element, "/text"), None, "element_text")?;
        as_string(value, "element_text")
    }

    fn element_attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        let path = Self::element_path(element, &format!("/attribute/{}", name));
        match self.command(Method::GET, &path, None, "element_attribute")? {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s)),
            other => Ok(Some(other.to_string())),
        }
    }

    fn title(&mut self) -> Result<String, DriverError> {
        let value = self.command(Method::GET, "/title", None, "title")?;
        as_string(value, "title")
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let value = self.command(Method::GET, "/screenshot", None, "screenshot")?;
        let encoded = as_string(value, "screenshot")?;
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
        self.command(Method::DELETE, "", None, "quit")?;
        Ok(())
    }
}
