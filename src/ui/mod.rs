//! Interactive user interface components.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for interactive terminal usage
//! - [`NonInteractiveUI`] for CI/headless environments
//! - [`MockUI`] for tests
//! - Prompts and spinners
//!
//! # Example
//!
//! ```
//! use dotstrap::shell::DisplayMode;
//! use dotstrap::ui::{create_ui, UserInterface};
//!
//! // Non-interactive mode never blocks on input
//! let mut ui = create_ui(false, DisplayMode::Plain);
//! ui.show_header("dotstrap");
//! ui.success("Setup complete!");
//! ```

pub mod mock;
pub mod non_interactive;
pub mod prompts;
pub mod spinner;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use non_interactive::NonInteractiveUI;
pub use prompts::prompt_user;
pub use spinner::{NoopSpinner, ProgressSpinner};
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, DotstrapTheme};

use crate::error::Result;

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Display a recovery hint under an error.
    fn hint(&mut self, hint: &str);

    /// Show a prompt and get user input.
    ///
    /// Any spinner started by this UI is paused while the prompt is visible.
    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult>;

    /// Start a spinner for an operation.
    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle>;

    /// Show a header/banner.
    fn show_header(&mut self, title: &str);

    /// Check if running in interactive mode.
    fn is_interactive(&self) -> bool;
}

/// Handle for controlling a spinner.
pub trait SpinnerHandle {
    /// Update the spinner message.
    fn set_message(&mut self, msg: &str);

    /// Mark the operation as successful.
    fn finish_success(&mut self, msg: &str);

    /// Mark the operation as failed.
    fn finish_error(&mut self, msg: &str);

    /// Stop drawing without finishing, e.g. while the terminal is borrowed.
    fn pause(&mut self);

    /// Resume drawing after [`pause`](SpinnerHandle::pause).
    fn resume(&mut self);

    /// Whether the spinner is running and not paused.
    fn is_active(&self) -> bool;
}

/// A prompt to show to the user.
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Unique key for the prompt (used for env overrides and mocks).
    pub key: String,
    /// The question to display.
    pub question: String,
    /// The type of prompt.
    pub prompt_type: PromptType,
    /// Default value if user just presses enter.
    pub default: Option<String>,
}

impl Prompt {
    pub fn new(key: &str, question: &str, prompt_type: PromptType) -> Self {
        Self {
            key: key.to_string(),
            question: question.to_string(),
            prompt_type,
            default: None,
        }
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// The type of prompt.
#[derive(Debug, Clone)]
pub enum PromptType {
    /// Yes/no confirmation.
    Confirm,
    /// Free-form text input.
    Input,
    /// Select one from a list of options.
    Select { options: Vec<PromptOption> },
    /// Select multiple from a list of options.
    MultiSelect { options: Vec<PromptOption> },
}

/// An option in a select prompt.
#[derive(Debug, Clone)]
pub struct PromptOption {
    /// Display label.
    pub label: String,
    /// Value returned when selected.
    pub value: String,
}

impl PromptOption {
    pub fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Result of a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptResult {
    /// Boolean result from confirm.
    Bool(bool),
    /// String result from input or select.
    String(String),
    /// Multiple string results from multi-select.
    Strings(Vec<String>),
}

impl PromptResult {
    /// Get as string.
    pub fn as_string(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::String(s) => s.clone(),
            Self::Strings(v) => v.join(","),
        }
    }

    /// Get as bool if this is a Bool result.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Selected values; a single string becomes a one-element list.
    pub fn into_strings(self) -> Vec<String> {
        match self {
            Self::Strings(v) => v,
            Self::String(s) if s.is_empty() => Vec::new(),
            Self::String(s) => vec![s],
            Self::Bool(b) => vec![b.to_string()],
        }
    }
}

/// Parse a textual answer into a result shaped for `prompt_type`.
///
/// Shared by the non-interactive and mock UIs, which answer from strings.
pub(crate) fn answer_from_text(prompt_type: &PromptType, text: &str) -> PromptResult {
    match prompt_type {
        PromptType::Confirm => PromptResult::Bool(matches!(
            text.trim().to_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        )),
        PromptType::MultiSelect { .. } => PromptResult::Strings(
            text.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        ),
        PromptType::Input | PromptType::Select { .. } => PromptResult::String(text.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_result_as_string() {
        assert_eq!(PromptResult::Bool(true).as_string(), "true");
        assert_eq!(PromptResult::String("hello".into()).as_string(), "hello");
        assert_eq!(
            PromptResult::Strings(vec!["a".into(), "b".into()]).as_string(),
            "a,b"
        );
    }

    #[test]
    fn prompt_result_as_bool() {
        assert_eq!(PromptResult::Bool(true).as_bool(), Some(true));
        assert_eq!(PromptResult::String("test".into()).as_bool(), None);
    }

    #[test]
    fn into_strings_normalizes() {
        assert!(PromptResult::String(String::new()).into_strings().is_empty());
        assert_eq!(PromptResult::String("git".into()).into_strings(), ["git"]);
    }

    #[test]
    fn answers_are_shaped_by_prompt_type() {
        assert_eq!(
            answer_from_text(&PromptType::Confirm, "Yes"),
            PromptResult::Bool(true)
        );
        assert_eq!(
            answer_from_text(&PromptType::MultiSelect { options: vec![] }, "curl, git,"),
            PromptResult::Strings(vec!["curl".into(), "git".into()])
        );
        assert_eq!(
            answer_from_text(&PromptType::Input, "Jane"),
            PromptResult::String("Jane".into())
        );
    }

    #[test]
    fn prompt_builder_sets_default() {
        let prompt = Prompt::new("shell", "Which shell?", PromptType::Input).with_default("zsh");
        assert_eq!(prompt.default.as_deref(), Some("zsh"));
        assert_eq!(prompt.key, "shell");
    }
}
