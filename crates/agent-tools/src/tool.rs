//! Tool trait definition

use agent_core::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for tools that agents can execute
///
/// Each tool provides a name, a description the model reads to decide when
/// to call it, and a JSON schema for its input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with given parameters
    ///
    /// `params` should match [`Tool::input_schema`]. Implementations return
    /// [`agent_core::Error::InvalidInput`] when it does not.
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique name within a [`ToolRegistry`](crate::ToolRegistry)
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Input schema (JSON Schema)
    ///
    /// ```
    /// use serde_json::json;
    ///
    /// let schema = json!({
    ///     "type": "object",
    ///     "properties": {
    ///         "portfolio_id": { "type": "string", "description": "Investor portfolio id" }
    ///     },
    ///     "required": ["portfolio_id"]
    /// });
    /// # assert!(schema["required"].is_array());
    /// ```
    fn input_schema(&self) -> Value;
}
