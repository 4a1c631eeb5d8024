//! Environment configuration helpers

use tracing::debug;

/// Load a `.env` file from the working directory (or a parent) if present
///
/// Variables already set in the process environment win.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!(path = %path.display(), "Loaded .env file"),
        Err(e) if e.not_found() => debug!("No .env file found"),
        Err(e) => debug!(error = %e, "Ignoring unreadable .env file"),
    }
}

/// Read an environment variable, treating empty values as unset
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Read an environment variable or fall back to `default`
pub fn env_or(name: &str, default: &str) -> String {
    env_var(name).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values_are_unset() {
        unsafe {
            std::env::set_var("AGENT_UTILS_TEST_EMPTY", "   ");
        }
        assert_eq!(env_var("AGENT_UTILS_TEST_EMPTY"), None);
        assert_eq!(env_or("AGENT_UTILS_TEST_EMPTY", "fallback"), "fallback");
        unsafe {
            std::env::remove_var("AGENT_UTILS_TEST_EMPTY");
        }
    }

    #[test]
    fn test_value_is_trimmed() {
        unsafe {
            std::env::set_var("AGENT_UTILS_TEST_SET", " token ");
        }
        assert_eq!(env_var("AGENT_UTILS_TEST_SET").as_deref(), Some("token"));
        unsafe {
            std::env::remove_var("AGENT_UTILS_TEST_SET");
        }
    }
}
