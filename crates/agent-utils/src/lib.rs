//! Shared utilities for the investor assistant
//!
//! Logging setup and environment loading used by every binary in the
//! workspace.

pub mod config;
pub mod logging;

pub use config::{env_or, env_var, load_dotenv};
pub use logging::init_tracing;
