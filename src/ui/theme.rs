//! Visual theme and styling.

use console::Style;

/// dotstrap's visual theme.
#[derive(Debug, Clone)]
pub struct DotstrapTheme {
    /// Style for success messages (green).
    pub success: Style,
    /// Style for warning messages (orange).
    pub warning: Style,
    /// Style for error messages (red bold).
    pub error: Style,
    /// Style for running elements (cyan).
    pub info: Style,
    /// Style for dim/secondary text.
    pub dim: Style,
    /// Style for highlighted text (bold).
    pub highlight: Style,
    /// Style for headers (cyan bold).
    pub header: Style,
    /// Style for recovery hints (cyan dim).
    pub hint: Style,
}

impl Default for DotstrapTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl DotstrapTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            info: Style::new().cyan(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().cyan(),
            hint: Style::new().cyan().dim(),
        }
    }

    /// A theme without colors (for non-TTY or `NO_COLOR`).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            hint: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_hint(&self, hint: &str) -> String {
        format!("  {}", self.hint.apply_to(format!("→ {}", hint)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{} {}", self.header.apply_to("◆"), self.highlight.apply_to(title))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_formats_icons() {
        let theme = DotstrapTheme::plain();
        assert_eq!(theme.format_success("Complete"), "✓ Complete");
        assert_eq!(theme.format_warning("Caution"), "⚠ Caution");
        assert_eq!(theme.format_error("Failed"), "✗ Failed");
        assert_eq!(theme.format_hint("retry"), "  → retry");
    }

    #[test]
    fn header_contains_title() {
        let msg = DotstrapTheme::plain().format_header("dotstrap");
        assert!(msg.contains("dotstrap"));
        assert!(msg.contains("◆"));
    }

    #[test]
    fn default_impl_matches_new() {
        assert_eq!(
            DotstrapTheme::default().format_success("test"),
            DotstrapTheme::new().format_success("test")
        );
    }
}
