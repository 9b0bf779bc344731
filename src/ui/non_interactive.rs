//! Non-interactive UI for CI/headless environments.

use std::collections::HashMap;

use crate::error::{DotstrapError, Result};

use super::{answer_from_text, NoopSpinner, Prompt, PromptResult, SpinnerHandle, UserInterface};

/// Prefix of environment variables that answer prompts by key.
pub const PROMPT_ENV_PREFIX: &str = "DOTSTRAP_PROMPT_";

/// UI implementation for non-interactive mode.
///
/// Prompts are answered from `DOTSTRAP_PROMPT_<KEY>` variables, then from
/// the prompt default; a prompt with neither is an error.
pub struct NonInteractiveUI {
    env_overrides: HashMap<String, String>,
}

impl NonInteractiveUI {
    pub fn new() -> Self {
        let env_overrides: HashMap<String, String> = std::env::vars()
            .filter(|(k, _)| k.starts_with(PROMPT_ENV_PREFIX))
            .collect();
        Self { env_overrides }
    }

    /// Create with explicit overrides (for testing).
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self {
            env_overrides: overrides,
        }
    }
}

impl Default for NonInteractiveUI {
    fn default() -> Self {
        Self::new()
    }
}

impl UserInterface for NonInteractiveUI {
    fn message(&mut self, msg: &str) {
        println!("{}", msg);
    }

    fn success(&mut self, msg: &str) {
        println!("✓ {}", msg);
    }

    fn warning(&mut self, msg: &str) {
        eprintln!("⚠ {}", msg);
    }

    fn error(&mut self, msg: &str) {
        eprintln!("✗ {}", msg);
    }

    fn hint(&mut self, hint: &str) {
        eprintln!("  → {}", hint);
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let env_key = format!("{}{}", PROMPT_ENV_PREFIX, prompt.key.to_uppercase());
        if let Some(value) = self.env_overrides.get(&env_key) {
            return Ok(answer_from_text(&prompt.prompt_type, value));
        }

        if let Some(default) = &prompt.default {
            return Ok(answer_from_text(&prompt.prompt_type, default));
        }

        Err(DotstrapError::PromptUnavailable {
            key: prompt.key.clone(),
        })
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        println!("{}", message);
        Box::new(NoopSpinner::new())
    }

    fn show_header(&mut self, title: &str) {
        println!("\n{}\n", title);
    }

    fn is_interactive(&self) -> bool {
        false
    }
}
