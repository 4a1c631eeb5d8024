//! Agent runtime for the investor assistant
//!
//! [`AgentExecutor`] runs the model/tool loop; [`ToolAgent`] wraps it in the
//! [`agent_core::Agent`] interface and keeps the conversation in the caller's
//! [`agent_core::Context`].

pub mod agents;
pub mod executor;

pub use agents::ToolAgent;
pub use executor::{AgentExecutor, AgentExecutorBuilder, ExecutorConfig, ExecutorEventHandler};
