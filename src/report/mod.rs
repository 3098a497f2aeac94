pub mod archive;
pub mod attachment;
pub mod builder;
pub mod console;
pub mod environment;
pub mod render;
pub mod report_model;
