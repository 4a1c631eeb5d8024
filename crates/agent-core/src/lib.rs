//! Core abstractions shared by the investor assistant crates
//!
//! Defines the [`Agent`] trait every conversational front-end drives, the
//! per-conversation [`Context`] it carries between turns, and the common
//! [`Error`] type tools and agents report through.

pub mod agent;
pub mod context;
pub mod error;

pub use agent::Agent;
pub use context::Context;
pub use error::{Error, Result};
