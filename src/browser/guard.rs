use tracing::{info, warn};

use crate::browser::driver::Driver;
use crate::error::DriverError;

/// Starts a browser session for one run.
pub trait SessionLauncher {
    fn launch(&self) -> Result<Box<dyn Driver>, DriverError>;
}

impl<F> SessionLauncher for F
where
    F: Fn() -> Result<Box<dyn Driver>, DriverError>,
{
    fn launch(&self) -> Result<Box<dyn Driver>, DriverError> {
        self()
    }
}

/// Scoped ownership of a browser session.
///
/// The session is quit exactly once: by an explicit [`SessionGuard::release`]
/// or, failing that, when the guard is dropped (early return, `?`, panic).
/// Quit errors are logged and never propagated.
pub struct SessionGuard {
    driver: Box<dyn Driver>,
    released: bool,
}

impl SessionGuard {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            driver,
            released: false,
        }
    }

    pub fn driver(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.driver.quit() {
            Ok(()) => info!("browser session closed"),
            Err(e) => warn!(error = %e, "browser session teardown failed"),
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.release();
    }
}
