use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use web_case_runner::browser::driver::{BrowserInfo, Driver, ElementRef, Locator};
use web_case_runner::error::DriverError;

/// Fake PNG payload returned by `screenshot`.
pub const SCREENSHOT_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Default)]
pub struct FakeState {
    pub current_url: String,
    pub title: String,
    /// Successive `ready_state` answers; `complete` once drained
    pub ready_states: VecDeque<String>,
    /// Locator expressions that resolve to an element
    pub present: HashSet<String>,
    pub texts: HashMap<String, String>,
    pub attributes: HashMap<(String, String), String>,
    /// Commands that fail, e.g. `click`, `navigate`, `find`
    pub failing: HashSet<&'static str>,
    /// Recorded calls (`"click #buy"`) that panic inside the driver
    pub panicking: HashSet<String>,
    pub screenshots_fail: bool,

    pub calls: Vec<String>,
    pub navigations: Vec<String>,
    pub screenshots_taken: usize,
    pub quit_count: usize,
}

/// Scripted in-memory browser. Clones share state, so a test keeps one
/// handle for setup and inspection while the runner owns the driver.
#[derive(Clone, Default)]
pub struct FakeBrowser {
    state: Rc<RefCell<FakeState>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        let browser = Self::default();
        browser.state.borrow_mut().current_url = "about:blank".to_string();
        browser
    }

    pub fn at_url(self, url: &str) -> Self {
        self.state.borrow_mut().current_url = url.to_string();
        self
    }

    pub fn with_element(self, expression: &str, text: &str) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.present.insert(expression.to_string());
            state.texts.insert(expression.to_string(), text.to_string());
        }
        self
    }

    pub fn with_attribute(self, expression: &str, name: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .attributes
            .insert((expression.to_string(), name.to_string()), value.to_string());
        self
    }

    pub fn with_title(self, title: &str) -> Self {
        self.state.borrow_mut().title = title.to_string();
        self
    }

    pub fn loading_for(self, polls: usize) -> Self {
        {
            let mut state = self.state.borrow_mut();
            for _ in 0..polls {
                state.ready_states.push_back("loading".to_string());
            }
        }
        self
    }

    pub fn failing(self, command: &'static str) -> Self {
        self.state.borrow_mut().failing.insert(command);
        self
    }

    pub fn panicking_on(self, call: &str) -> Self {
        self.state.borrow_mut().panicking.insert(call.to_string());
        self
    }

    pub fn without_screenshots(self) -> Self {
        self.state.borrow_mut().screenshots_fail = true;
        self
    }

    pub fn driver(&self) -> Box<dyn Driver> {
        Box::new(FakeDriver {
            state: Rc::clone(&self.state),
        })
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }
}

pub struct FakeDriver {
    state: Rc<RefCell<FakeState>>,
}

impl FakeDriver {
    fn record(&self, command: &'static str, detail: String) -> Result<(), DriverError> {
        let mut state = self.state.borrow_mut();
        let call = format!("{} {}", command, detail).trim_end().to_string();
        state.calls.push(call.clone());
        if state.panicking.contains(&call) {
            drop(state);
            panic!("driver crashed on '{}'", call);
        }
        if state.failing.contains(command) {
            return Err(DriverError::Protocol {
                command: command.to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(())
    }
}

impl Driver for FakeDriver {
    fn current_url(&mut self) -> Result<String, DriverError> {
        Ok(self.state.borrow().current_url.clone())
    }

    fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.record("navigate", url.to_string())?;
        let mut state = self.state.borrow_mut();
        state.navigations.push(url.to_string());
        state.current_url = url.to_string();
        Ok(())
    }

    fn ready_state(&mut self) -> Result<String, DriverError> {
        let mut state = self.state.borrow_mut();
        Ok(state
            .ready_states
            .pop_front()
            .unwrap_or_else(|| "complete".to_string()))
    }

    fn find_element(&mut self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        self.record("find", locator.expression.clone())?;
        let state = self.state.borrow();
        Ok(state
            .present
            .contains(&locator.expression)
            .then(|| ElementRef(locator.expression.clone())))
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.record("click", element.0.clone())
    }

    fn double_click(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.record("double_click", element.0.clone())
    }

    fn hover(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.record("hover", element.0.clone())
    }

    fn clear(&mut self, element: &ElementRef) -> Result<(), DriverError> {
        self.record("clear", element.0.clone())
    }

    fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<(), DriverError> {
        self.record("send_keys", format!("{}={}", element.0, text))
    }

    fn select_option(&mut self, element: &ElementRef, option: &str) -> Result<(), DriverError> {
        self.record("select", format!("{}={}", element.0, option))
    }

    fn element_text(&mut self, element: &ElementRef) -> Result<String, DriverError> {
        Ok(self
            .state
            .borrow()
            .texts
            .get(&element.0)
            .cloned()
            .unwrap_or_default())
    }

    fn element_attribute(&mut self, element: &ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self
            .state
            .borrow()
            .attributes
            .get(&(element.0.clone(), name.to_string()))
            .cloned())
    }

    fn title(&mut self) -> Result<String, DriverError> {
        Ok(self.state.borrow().title.clone())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DriverError> {
        let mut state = self.state.borrow_mut();
        if state.screenshots_fail {
            return Err(DriverError::SessionIo("screenshot unavailable".to_string()));
        }
        state.screenshots_taken += 1;
        Ok(SCREENSHOT_BYTES.to_vec())
    }

    fn browser_info(&mut self) -> BrowserInfo {
        BrowserInfo {
            name: "fakefox".to_string(),
            version: "1.0".to_string(),
        }
    }

    fn quit(&mut self) -> Result<(), DriverError> {
        self.state.borrow_mut().quit_count += 1;
        Ok(())
    }
}
