use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// How a locator expression is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorType {
    Id,
    Name,
    #[serde(alias = "css_selector", alias = "css selector")]
    Css,
    Xpath,
    #[serde(alias = "class")]
    ClassName,
    #[serde(alias = "tag")]
    TagName,
    LinkText,
    PartialLinkText,
}

impl LocatorType {
    pub fn as_str(self) -> &'static str {
        match self {
            LocatorType::Id => "id",
            LocatorType::Name => "name",
            LocatorType::Css => "css",
            LocatorType::Xpath => "xpath",
            LocatorType::ClassName => "class_name",
            LocatorType::TagName => "tag_name",
            LocatorType::LinkText => "link_text",
            LocatorType::PartialLinkText => "partial_link_text",
        }
    }
}

/// A fully resolved element locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    #[serde(rename = "type")]
    pub kind: LocatorType,
    pub expression: String,
}

impl Locator {
    pub fn new(kind: LocatorType, expression: &str) -> Self {
        Self {
            kind,
            expression: expression.to_string(),
        }
    }

    pub fn css(expression: &str) -> Self {
        Self::new(LocatorType::Css, expression)
    }

    /// W3C WebDriver `(using, value)` pair. Strategies the protocol lacks
    /// (id, name, class name) are rewritten as CSS selectors.
    pub fn to_webdriver(&self) -> (&'static str, String) {
        match self.kind {
            LocatorType::Id => ("css selector", format!("[id=\"{}\"]", escape_css_string(&self.expression))),
            LocatorType::Name => ("css selector", format!("[name=\"{}\"]", escape_css_string(&self.expression))),
            LocatorType::ClassName => ("css selector", format!(".{}", self.expression.trim())),
            LocatorType::Css => ("css selector", self.expression.clone()),
            LocatorType::Xpath => ("xpath", self.expression.clone()),
            LocatorType::TagName => ("tag name", self.expression.clone()),
            LocatorType::LinkText => ("link text", self.expression.clone()),
            LocatorType::PartialLinkText => ("partial link text", self.expression.clone()),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.as_str(), self.expression)
    }
}

fn escape_css_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Backend-specific handle of a located element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

/// Browser identity, written into the run environment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
}

/// A live browser session.
///
/// Calls are synchronous and return as soon as the browser answers; any
/// waiting (page readiness, element presence) is done by the caller with
/// bounded polling.
pub trait Driver {
    fn current_url(&mut self) -> Result<String, DriverError>;

    fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// `document.readyState` of the current page.
    fn ready_state(&mut self) -> Result<String, DriverError>;

    /// `Ok(None)` when nothing matches yet.
    fn find_element(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError>;

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    fn double_click(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    fn hover(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    fn clear(&mut self, element: &ElementRef) -> Result<(), DriverError>;

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), DriverError>;

    /// Select the `<option>` whose visible text or value equals `option`.
    fn select_option(&mut self, element: &ElementRef, option: &str) -> Result<(), DriverError>;

    fn element_text(&mut self, element: &ElementRef) -> Result<String, DriverError>;

    fn element_attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError>;

    fn title(&mut self) -> Result<String, DriverError>;

    /// PNG bytes of the current viewport.
    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError>;

    fn browser_info(&mut self) -> BrowserInfo;

    fn quit(&mut self) -> Result<(), DriverError>;
}
