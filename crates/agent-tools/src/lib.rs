//! Tool management and dispatch for the investor assistant
//!
//! A [`Tool`] is a named async function with a JSON schema the model can see.
//! The [`ToolRegistry`] maps names to tools and is the single entry point
//! (`dispatch`) the executor uses to run a model's tool call.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::Tool;
