use crate::browser::driver::{Driver, ElementRef, Locator};
use crate::error::{CaseError, DriverError};
use crate::spec::spec_model::AssertionKind;

/// Result of evaluating one assertion. A mismatch is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssertionOutcome {
    Passed { expected: String, actual: String },
    Failed { expected: String, actual: String },
}

impl AssertionOutcome {
    fn compare(expected: &str, actual: String, matched: bool) -> Self {
        let expected = expected.to_string();
        if matched {
            AssertionOutcome::Passed { expected, actual }
        } else {
            AssertionOutcome::Failed { expected, actual }
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, AssertionOutcome::Passed { .. })
    }

    /// Text stored as the assertion-result attachment.
    pub fn summary(&self) -> String {
        match self {
            AssertionOutcome::Passed { expected, actual } => {
                format!("Expected: {}\nActual: {}\nResult: passed\n", expected, actual)
            }
            AssertionOutcome::Failed { expected, actual } => {
                format!("Expected: {}\nActual: {}\nResult: failed\n", expected, actual)
            }
        }
    }
}

/// The element the case located, and how it was located.
pub struct AssertionTarget<'a> {
    pub element: &'a ElementRef,
    pub locator: &'a Locator,
}

impl AssertionKind {
    /// Evaluate against the current page. Driver failures and malformed
    /// expressions are errors; a mismatch is a `Failed` outcome.
    pub fn evaluate(
        self,
        expression: &str,
        driver: &mut dyn Driver,
        target: &AssertionTarget<'_>,
    ) -> Result<AssertionOutcome, CaseError> {
        let driver_err = |e: DriverError| {
            CaseError::ActionExecution(format!("evaluating {} assertion failed: {}", self, e))
        };

        let outcome = match self {
            AssertionKind::Text => {
                let actual = driver.element_text(target.element).map_err(driver_err)?;
                let matched = actual == expression;
                AssertionOutcome::compare(expression, actual, matched)
            }
            AssertionKind::TextContains => {
                let actual = driver.element_text(target.element).map_err(driver_err)?;
                let matched = actual.contains(expression);
                AssertionOutcome::compare(expression, actual, matched)
            }
            AssertionKind::Attribute => {
                let (name, expected) = expression.split_once('=').ok_or_else(|| {
                    CaseError::Configuration(format!(
                        "attribute assertion expects 'name=value', got '{}'",
                        expression
                    ))
                })?;
                let (name, expected) = (name.trim(), expected.trim());
                let actual = driver
                    .element_attribute(target.element, name)
                    .map_err(driver_err)?;
                let matched = actual.as_deref() == Some(expected);
                let actual = match actual {
                    Some(value) => format!("{}={}", name, value),
                    None => format!("{} (absent)", name),
                };
                AssertionOutcome::compare(&format!("{}={}", name, expected), actual, matched)
            }
            AssertionKind::Url => {
                let actual = driver.current_url().map_err(driver_err)?;
                let matched = actual == expression;
                AssertionOutcome::compare(expression, actual, matched)
            }
            AssertionKind::UrlContains => {
                let actual = driver.current_url().map_err(driver_err)?;
                let matched = actual.contains(expression);
                AssertionOutcome::compare(expression, actual, matched)
            }
            AssertionKind::Title => {
                let actual = driver.title().map_err(driver_err)?;
                let matched = actual == expression;
                AssertionOutcome::compare(expression, actual, matched)
            }
            AssertionKind::Presence => {
                let locator = if expression.trim().is_empty() {
                    target.locator.clone()
                } else {
                    Locator::css(expression.trim())
                };
                let present = driver.find_element(&locator).map_err(driver_err)?.is_some();
                let actual = if present { "present" } else { "absent" };
                AssertionOutcome::compare(&format!("{} present", locator), format!("{} {}", locator, actual), present)
            }
        };

        Ok(outcome)
    }
}
