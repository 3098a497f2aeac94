pub mod fake_driver;
pub mod fixtures;
