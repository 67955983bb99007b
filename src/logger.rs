use colored::{Color, Colorize};

/// Colorized status lines on stdout, prefixed with a fixed label.
///
/// This is the human-facing progress log. Internal diagnostics go through
/// the `log` facade instead.
#[derive(Debug, Clone)]
pub struct Logger {
    label: String,
}

impl Logger {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn format(&self, level: &str, color: Color, message: &str) -> String {
        format!(
            "{}{} {}",
            format!("{} - ", self.label).bright_black(),
            format!("{level}:").color(color).bold(),
            message
        )
    }

    fn log(&self, level: &str, color: Color, message: &str) {
        println!("{}", self.format(level, color, message));
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log("info", Color::Cyan, message.as_ref());
    }

    pub fn success(&self, message: impl AsRef<str>) {
        self.log("success", Color::Green, &format!("{} ✓", message.as_ref()));
    }

    pub fn failure(&self, message: impl AsRef<str>) {
        self.log("failure", Color::Red, &format!("{} ✘", message.as_ref()));
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log("error", Color::Red, message.as_ref());
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log("debug", Color::White, message.as_ref());
    }

    /// Blank line between phases.
    pub fn gap(&self) {
        println!();
    }
}
