//! Prompt template management for the investor assistant
//!
//! Prompts are Jinja2 templates (rendered with MiniJinja) registered by name
//! in a [`PromptRegistry`] and rendered with JSON variables.
//!
//! # Quick Start
//!
//! ```
//! use agent_prompt::{JinjaTemplate, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::new();
//! registry.register(JinjaTemplate::new("persona", "You are {{ name }}. Today is {{ date }}.")?);
//!
//! let prompt = registry.render("persona", &json!({ "name": "Avi", "date": "2025-01-01" }))?;
//! assert_eq!(prompt, "You are Avi. Today is 2025-01-01.");
//! # Ok::<(), agent_prompt::PromptError>(())
//! ```

pub mod error;
pub mod jinja;
pub mod registry;
pub mod template;

pub use error::{PromptError, Result};
pub use jinja::JinjaTemplate;
pub use registry::PromptRegistry;
pub use template::PromptTemplate;
