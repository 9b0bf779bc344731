//! Progress spinners.
//!
//! The tick runs on indicatif's background thread. The only state shared
//! with the caller is the `paused` flag, so a prompt can borrow the
//! terminal without finishing the spinner.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::theme::DotstrapTheme;
use super::SpinnerHandle;

const TICK: Duration = Duration::from_millis(80);

/// Shared control over a running spinner.
#[derive(Clone)]
pub struct SpinnerControl {
    bar: ProgressBar,
    paused: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

impl SpinnerControl {
    fn new(bar: ProgressBar) -> Self {
        Self {
            bar,
            paused: Arc::new(AtomicBool::new(false)),
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Hide the spinner and stop ticking. No-op once finished.
    pub fn pause(&self) {
        if self.finished.load(Ordering::SeqCst) || self.paused.swap(true, Ordering::SeqCst) {
            return;
        }
        self.bar.disable_steady_tick();
        self.bar.set_draw_target(ProgressDrawTarget::hidden());
    }

    /// Redraw and restart ticking.
    pub fn resume(&self) {
        if self.finished.load(Ordering::SeqCst) || !self.paused.swap(false, Ordering::SeqCst) {
            return;
        }
        self.bar.set_draw_target(ProgressDrawTarget::stderr());
        self.bar.enable_steady_tick(TICK);
    }

    pub fn is_active(&self) -> bool {
        !self.finished.load(Ordering::SeqCst) && !self.paused.load(Ordering::SeqCst)
    }

    fn finish(&self, line: String) {
        if self.finished.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.paused.load(Ordering::SeqCst) {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
        }
        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            self.bar.set_style(style);
        }
        self.bar.finish_with_message(line);
    }
}

/// A progress spinner for long-running operations.
pub struct ProgressSpinner {
    control: SpinnerControl,
    theme: DotstrapTheme,
}

impl ProgressSpinner {
    /// Create and start a spinner with a message.
    pub fn new(message: &str, theme: DotstrapTheme) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK);

        Self {
            control: SpinnerControl::new(bar),
            theme,
        }
    }

    /// A spinner that never draws.
    pub fn hidden() -> Self {
        Self {
            control: SpinnerControl::new(ProgressBar::hidden()),
            theme: DotstrapTheme::plain(),
        }
    }

    /// Control handle shared with the owning UI.
    pub fn control(&self) -> SpinnerControl {
        self.control.clone()
    }
}

impl SpinnerHandle for ProgressSpinner {
    fn set_message(&mut self, msg: &str) {
        self.control.bar.set_message(msg.to_string());
    }

    fn finish_success(&mut self, msg: &str) {
        self.control.finish(self.theme.format_success(msg));
    }

    fn finish_error(&mut self, msg: &str) {
        self.control.finish(self.theme.format_error(msg));
    }

    fn pause(&mut self) {
        self.control.pause();
    }

    fn resume(&mut self) {
        self.control.resume();
    }

    fn is_active(&self) -> bool {
        self.control.is_active()
    }
}

/// Spinner used when spinners are off: prints finish lines only.
#[derive(Debug, Default)]
pub struct NoopSpinner {
    active: bool,
    paused: bool,
    quiet: bool,
}

impl NoopSpinner {
    /// A spinner that prints its finish line.
    pub fn new() -> Self {
        Self {
            active: true,
            paused: false,
            quiet: false,
        }
    }

    /// A spinner that prints nothing.
    pub fn silent() -> Self {
        Self {
            quiet: true,
            ..Self::new()
        }
    }
}

impl SpinnerHandle for NoopSpinner {
    fn set_message(&mut self, _msg: &str) {}

    fn finish_success(&mut self, msg: &str) {
        if self.active && !self.quiet {
            println!("✓ {}", msg);
        }
        self.active = false;
    }

    fn finish_error(&mut self, msg: &str) {
        if self.active && !self.quiet {
            eprintln!("✗ {}", msg);
        }
        self.active = false;
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }

    fn is_active(&self) -> bool {
        self.active && !self.paused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_spinner_pauses_and_resumes() {
        let mut spinner = ProgressSpinner::hidden();
        assert!(spinner.is_active());
        spinner.pause();
        assert!(!spinner.is_active());
        spinner.resume();
        assert!(spinner.is_active());
    }

    #[test]
    fn finished_spinner_is_inactive() {
        let mut spinner = ProgressSpinner::hidden();
        spinner.finish_success("Done");
        assert!(!spinner.is_active());
        spinner.resume();
        assert!(!spinner.is_active());
    }

    #[test]
    fn shared_control_sees_pause() {
        let mut spinner = ProgressSpinner::hidden();
        let control = spinner.control();
        control.pause();
        assert!(!spinner.is_active());
        spinner.resume();
        assert!(control.is_active());
    }

    #[test]
    fn noop_spinner_tracks_state() {
        let mut spinner = NoopSpinner::silent();
        assert!(spinner.is_active());
        spinner.pause();
        assert!(!spinner.is_active());
        spinner.resume();
        spinner.finish_error("Failed");
        assert!(!spinner.is_active());
    }
}
