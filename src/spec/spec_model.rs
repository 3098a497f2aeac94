use std::fmt;

use serde::{Deserialize, Serialize};

use crate::browser::driver::LocatorType;
use crate::report::report_model::CaseMeta;

/// A reusable locator/URL definition shared by several cases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageObject {
    pub name: String,

    /// Absolute URL, or a path joined against the suite base URL
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub locator: Option<String>,

    #[serde(default)]
    pub locator_type: Option<LocatorType>,
}

/// One navigate-locate-act-assert unit of work, as supplied by the
/// scheduling layer. Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseSpec {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub url: Option<String>,

    /// When set, the case's own URL wins over the page object's
    #[serde(default)]
    pub url_override: bool,

    #[serde(default)]
    pub page_object: Option<PageObject>,

    #[serde(default)]
    pub locator: Option<String>,

    #[serde(default)]
    pub locator_type: Option<LocatorType>,

    pub action: ActionKind,

    #[serde(default)]
    pub action_value: Option<String>,

    #[serde(default)]
    pub assert_type: Option<AssertionKind>,

    #[serde(default)]
    pub assert_expression: Option<String>,

    /// Execution order inside the suite (ascending)
    #[serde(default)]
    pub order: i32,

    /// A case without any resolvable URL fails unless this is false, in
    /// which case it acts on whatever page the session is showing.
    #[serde(default = "default_true")]
    pub navigation_required: bool,

    #[serde(default)]
    pub meta: CaseMeta,
}

fn default_true() -> bool {
    true
}

impl CaseSpec {
    /// Case with only an action; URL, locator and assertion are unset.
    pub fn new(id: u64, name: &str, action: ActionKind) -> Self {
        Self {
            id,
            name: name.to_string(),
            url: None,
            url_override: false,
            page_object: None,
            locator: None,
            locator_type: None,
            action,
            action_value: None,
            assert_type: None,
            assert_expression: None,
            order: 0,
            navigation_required: true,
            meta: CaseMeta::default(),
        }
    }

    /// Report metadata including the `case_id:<id>` tag.
    pub fn report_meta(&self) -> CaseMeta {
        self.meta.clone().with_tag(format!("case_id:{}", self.id))
    }
}

/// The closed set of actions a case can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    #[serde(alias = "type", alias = "fill")]
    Input,
    #[serde(alias = "dropdown")]
    Select,
    Hover,
    #[serde(alias = "dblclick")]
    DoubleClick,
    Clear,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Click => "click",
            ActionKind::Input => "input",
            ActionKind::Select => "select",
            ActionKind::Hover => "hover",
            ActionKind::DoubleClick => "double_click",
            ActionKind::Clear => "clear",
        }
    }

    pub fn requires_value(self) -> bool {
        matches!(self, ActionKind::Input | ActionKind::Select)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The closed set of checks a case can make after its action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssertionKind {
    /// Element text equals the expression exactly, whitespace included
    Text,
    /// Element text contains the expression
    TextContains,
    /// `name=value`: attribute `name` of the element equals `value`
    #[serde(alias = "attr")]
    Attribute,
    /// Current URL equals the expression
    Url,
    UrlContains,
    /// Page title equals the expression
    Title,
    /// The located element (or the CSS selector in the expression) is present
    Presence,
}

impl AssertionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AssertionKind::Text => "text",
            AssertionKind::TextContains => "text_contains",
            AssertionKind::Attribute => "attribute",
            AssertionKind::Url => "url",
            AssertionKind::UrlContains => "url_contains",
            AssertionKind::Title => "title",
            AssertionKind::Presence => "presence",
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Suite name and environment base URL the cases run under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteContext {
    pub name: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl SuiteContext {
    pub fn new(name: &str, base_url: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            base_url: base_url.map(|u| u.to_string()),
        }
    }
}

/// A suite file: context plus its cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub name: String,

    #[serde(default)]
    pub base_url: Option<String>,

    /// Overrides the configured continue-on-failure policy for this suite
    #[serde(default)]
    pub continue_on_failure: Option<bool>,

    pub cases: Vec<CaseSpec>,
}

impl SuiteSpec {
    pub fn context(&self) -> SuiteContext {
        SuiteContext::new(&self.name, self.base_url.as_deref())
    }
}
