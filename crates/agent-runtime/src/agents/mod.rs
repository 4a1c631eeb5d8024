//! Agent implementations built on the executor

pub mod tool;

pub use tool::ToolAgent;
