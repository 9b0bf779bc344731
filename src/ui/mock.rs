//! Mock UI implementation for testing.
//!
//! `MockUI` implements the `UserInterface` trait and captures all
//! interactions for later assertion. It can be configured with
//! pre-determined prompt responses.
//!
//! # Example
//!
//! ```
//! use dotstrap::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.set_prompt_response("gpg_key", "ABCDEF0123456789");
//!
//! ui.message("Starting setup");
//! ui.success("Done!");
//!
//! assert!(ui.has_message("Starting setup"));
//! assert!(ui.has_success("Done!"));
//! ```

use std::collections::{HashMap, VecDeque};

use crate::error::Result;

use super::{answer_from_text, NoopSpinner, Prompt, PromptResult, SpinnerHandle, UserInterface};

/// Mock UI implementation for testing.
///
/// Unanswered prompts fall back to the prompt default, then to an empty
/// answer of the right shape.
#[derive(Debug, Default)]
pub struct MockUI {
    interactive: bool,
    messages: Vec<String>,
    successes: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    hints: Vec<String>,
    headers: Vec<String>,
    spinners: Vec<String>,
    prompt_responses: HashMap<String, String>,
    prompt_queues: HashMap<String, VecDeque<String>>,
    prompts_shown: Vec<String>,
}

impl MockUI {
    /// A non-interactive mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that reports itself as interactive.
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            ..Self::default()
        }
    }

    /// Set a response for a prompt key.
    pub fn set_prompt_response(&mut self, key: &str, response: &str) {
        self.prompt_responses
            .insert(key.to_string(), response.to_string());
    }

    /// Queue responses for a key prompted more than once.
    pub fn queue_prompt_responses(&mut self, key: &str, responses: Vec<&str>) {
        let queue = responses.into_iter().map(|s| s.to_string()).collect();
        self.prompt_queues.insert(key.to_string(), queue);
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn successes(&self) -> &[String] {
        &self.successes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Messages of every spinner started.
    pub fn spinners(&self) -> &[String] {
        &self.spinners
    }

    /// Keys of every prompt shown.
    pub fn prompts_shown(&self) -> &[String] {
        &self.prompts_shown
    }

    pub fn has_message(&self, msg: &str) -> bool {
        self.messages.iter().any(|m| m.contains(msg))
    }

    pub fn has_success(&self, msg: &str) -> bool {
        self.successes.iter().any(|m| m.contains(msg))
    }

    pub fn has_warning(&self, msg: &str) -> bool {
        self.warnings.iter().any(|m| m.contains(msg))
    }

    pub fn has_error(&self, msg: &str) -> bool {
        self.errors.iter().any(|m| m.contains(msg))
    }
}

impl UserInterface for MockUI {
    fn message(&mut self, msg: &str) {
        self.messages.push(msg.to_string());
    }

    fn success(&mut self, msg: &str) {
        self.successes.push(msg.to_string());
    }

    fn warning(&mut self, msg: &str) {
        self.warnings.push(msg.to_string());
    }

    fn error(&mut self, msg: &str) {
        self.errors.push(msg.to_string());
    }

    fn hint(&mut self, hint: &str) {
        self.hints.push(hint.to_string());
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        self.prompts_shown.push(prompt.key.clone());

        let queued = self
            .prompt_queues
            .get_mut(&prompt.key)
            .and_then(VecDeque::pop_front);
        let response = queued
            .or_else(|| self.prompt_responses.get(&prompt.key).cloned())
            .or_else(|| prompt.default.clone())
            .unwrap_or_default();

        Ok(answer_from_text(&prompt.prompt_type, &response))
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        self.spinners.push(message.to_string());
        Box::new(NoopSpinner::silent())
    }

    fn show_header(&mut self, title: &str) {
        self.headers.push(title.to_string());
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::PromptType;

    #[test]
    fn captures_output() {
        let mut ui = MockUI::new();
        ui.message("hello");
        ui.warning("careful");
        ui.error("boom");
        ui.hint("retry");
        assert!(ui.has_message("hello"));
        assert!(ui.has_warning("careful"));
        assert!(ui.has_error("boom"));
        assert_eq!(ui.hints(), ["retry"]);
    }

    #[test]
    fn queued_responses_come_first() {
        let mut ui = MockUI::interactive();
        ui.queue_prompt_responses("name", vec!["first"]);
        ui.set_prompt_response("name", "fallback");
        let prompt = Prompt::new("name", "Name?", PromptType::Input);
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "first");
        assert_eq!(ui.prompt(&prompt).unwrap().as_string(), "fallback");
        assert_eq!(ui.prompts_shown(), ["name", "name"]);
    }

    #[test]
    fn unanswered_prompt_uses_default() {
        let mut ui = MockUI::new();
        let prompt = Prompt::new("ok", "Continue?", PromptType::Confirm).with_default("yes");
        assert_eq!(ui.prompt(&prompt).unwrap(), PromptResult::Bool(true));
    }

    #[test]
    fn records_spinners() {
        let mut ui = MockUI::new();
        let mut spinner = ui.start_spinner("Installing gpg");
        spinner.finish_success("gpg installed");
        assert_eq!(ui.spinners(), ["Installing gpg"]);
    }
}
