pub mod driver;
pub mod guard;
pub mod session;
pub mod webdriver;
