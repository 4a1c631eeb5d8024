//! MiniJinja-based template implementation

use crate::{PromptError, PromptTemplate, Result};
use minijinja::Environment;

/// A prompt template backed by MiniJinja
///
/// The source is syntax-checked when the template is created, so a broken
/// prompt fails at start-up rather than on the first chat turn.
///
/// Standard Jinja2 syntax applies: `{{ variable }}`, `{{ name | upper }}`,
/// `{% if %}` and `{% for %}` blocks. Undefined variables render empty.
///
/// ```
/// use agent_prompt::{JinjaTemplate, PromptTemplate};
/// use serde_json::json;
///
/// let template = JinjaTemplate::new(
///     "categories",
///     "{% for c in categories %}- {{ c }}\n{% endfor %}",
/// )?;
/// let out = template.render(&json!({ "categories": ["individual_investors", "fii_investors"] }))?;
/// assert_eq!(out, "- individual_investors\n- fii_investors\n");
/// # Ok::<(), agent_prompt::PromptError>(())
/// ```
pub struct JinjaTemplate {
    name: String,
    source: String,
}

impl JinjaTemplate {
    /// Create a template, checking its syntax
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let template = Self {
            name: name.into(),
            source: source.into(),
        };

        Environment::new()
            .template_from_str(&template.source)
            .map_err(|e| PromptError::TemplateParseFailed {
                name: template.name.clone(),
                detail: e.to_string(),
            })?;

        Ok(template)
    }

    fn environment() -> Environment<'static> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env
    }
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn render(&self, vars: &serde_json::Value) -> Result<String> {
        let value = minijinja::Value::from_serialize(vars);

        Self::environment()
            .render_str(&self.source, value)
            .map_err(|e| PromptError::RenderError {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }

    fn raw_template(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
