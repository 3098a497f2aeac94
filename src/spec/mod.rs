pub mod action;
pub mod assertion;
pub mod resolve;
pub mod runner;
pub mod spec_model;
