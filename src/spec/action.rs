use crate::browser::driver::{Driver, ElementRef};
use crate::error::{CaseError, DriverError};
use crate::spec::spec_model::ActionKind;

impl ActionKind {
    /// Perform this action on a located element.
    ///
    /// Each kind maps to exactly one handler; a missing value for `input` or
    /// `select` is a configuration problem, anything the driver rejects is an
    /// action execution failure.
    pub fn perform(self, driver: &mut dyn Driver, element: &ElementRef, value: Option<&str>) -> Result<(), CaseError> {
        let value = match (self.requires_value(), value) {
            (true, None) => {
                return Err(CaseError::Configuration(format!(
                    "action '{}' needs an action value",
                    self
                )))
            }
            (_, value) => value.unwrap_or_default(),
        };

        let outcome = match self {
            ActionKind::Click => driver.click(element),
            ActionKind::Input => input(driver, element, value),
            ActionKind::Select => driver.select_option(element, value),
            ActionKind::Hover => driver.hover(element),
            ActionKind::DoubleClick => driver.double_click(element),
            ActionKind::Clear => driver.clear(element),
        };

        outcome.map_err(|e| CaseError::ActionExecution(format!("{} failed: {}", self, e)))
    }
}

fn input(driver: &mut dyn Driver, element: &ElementRef, value: &str) -> Result<(), DriverError> {
    driver.clear(element)?;
    driver.send_keys(element, value)
}
