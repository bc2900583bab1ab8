//! `[•ok]`, `[•--]` and `[•!!]` status lines.

use console::style;

/// Status indicator states.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Success - green `[•ok]`
    Ok,
    /// Optional component absent, not a failure - dim `[•--]`
    Skip,
    /// Failure - red `[•!!]`
    Error,
}

impl Status {
    /// Render the indicator as a styled string.
    #[must_use]
    pub fn render(self) -> String {
        match self {
            Self::Ok => format!("[{}]", style("•ok").green()),
            Self::Skip => format!("[{}]", style("•--").dim()),
            Self::Error => format!("[{}]", style("•!!").red()),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// An indented status line: indicator, then message.
pub struct StatusLine {
    status: Status,
    message: String,
}

impl StatusLine {
    /// Create a status line with an explicit status.
    #[must_use]
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Create a success line.
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Status::Ok, message)
    }

    /// Create a line for an optional check that did not apply.
    #[must_use]
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(Status::Skip, message)
    }

    /// Create an error line.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Whether this line should fail the command.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, Status::Error)
    }

    /// Print with two-space indentation.
    pub fn print(&self) {
        println!("  {} {}", self.status, self.message);
    }
}

/// Print an error line followed by indented help.
pub fn print_error(message: &str, help: Option<&str>) {
    println!();
    StatusLine::error(message).print();

    if let Some(help_text) = help {
        println!();
        for line in help_text.lines() {
            println!("  {line}");
        }
    }
    println!();
}

/// Dimmed, indented hint.
pub fn hint(message: &str) {
    println!("  {}", style(message).dim());
}
