//! Interactive terminal UI.

use console::Term;
use std::io::Write;

use crate::error::Result;
use crate::shell::DisplayMode;

use super::spinner::SpinnerControl;
use super::{
    prompt_user, should_use_colors, DotstrapTheme, NoopSpinner, NonInteractiveUI,
    ProgressSpinner, Prompt, PromptResult, SpinnerHandle, UserInterface,
};

/// Interactive terminal UI implementation.
pub struct TerminalUI {
    term: Term,
    err: Term,
    theme: DotstrapTheme,
    spinners: bool,
    /// The most recent spinner, paused while a prompt owns the terminal.
    active: Option<SpinnerControl>,
}

impl TerminalUI {
    /// Create a terminal UI. Spinners draw only when `spinners` is set.
    pub fn new(spinners: bool) -> Self {
        let theme = if should_use_colors() {
            DotstrapTheme::new()
        } else {
            DotstrapTheme::plain()
        };

        Self {
            term: Term::stdout(),
            err: Term::stderr(),
            theme,
            spinners,
            active: None,
        }
    }
}

impl UserInterface for TerminalUI {
    fn message(&mut self, msg: &str) {
        writeln!(self.term, "{}", msg).ok();
    }

    fn success(&mut self, msg: &str) {
        writeln!(self.term, "{}", self.theme.format_success(msg)).ok();
    }

    fn warning(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_warning(msg)).ok();
    }

    fn error(&mut self, msg: &str) {
        writeln!(self.err, "{}", self.theme.format_error(msg)).ok();
    }

    fn hint(&mut self, hint: &str) {
        writeln!(self.err, "{}", self.theme.format_hint(hint)).ok();
    }

    fn prompt(&mut self, prompt: &Prompt) -> Result<PromptResult> {
        let paused = self.active.as_ref().filter(|c| c.is_active()).cloned();
        if let Some(control) = &paused {
            control.pause();
        }
        let result = prompt_user(prompt, &self.term);
        if let Some(control) = &paused {
            control.resume();
        }
        result
    }

    fn start_spinner(&mut self, message: &str) -> Box<dyn SpinnerHandle> {
        if !self.spinners {
            writeln!(self.term, "{}", self.theme.info.apply_to(message)).ok();
            return Box::new(NoopSpinner::new());
        }
        let spinner = ProgressSpinner::new(message, self.theme.clone());
        self.active = Some(spinner.control());
        Box::new(spinner)
    }

    fn show_header(&mut self, title: &str) {
        writeln!(self.term, "\n{}\n", self.theme.format_header(title)).ok();
    }

    fn is_interactive(&self) -> bool {
        self.term.is_term()
    }
}

/// Create the UI for this run.
///
/// Interactive runs on a TTY get [`TerminalUI`]; everything else gets
/// [`NonInteractiveUI`]. Spinners are drawn only in
/// [`DisplayMode::Progress`].
pub fn create_ui(interactive: bool, display: DisplayMode) -> Box<dyn UserInterface> {
    let spinners = display == DisplayMode::Progress;
    if interactive && Term::stdout().is_term() {
        Box::new(TerminalUI::new(spinners))
    } else {
        Box::new(NonInteractiveUI::new())
    }
}
