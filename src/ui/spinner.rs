//! "Typing" indicator shown while a turn is in flight.

use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

const FRAMES: usize = 4;

/// Spinner cycling `   `, `.  `, `.. `, `...` after a label.
pub struct TypingSpinner {
    bar: ProgressBar,
}

impl TypingSpinner {
    #[must_use]
    pub fn new(label: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let ticks = Self::tick_strings();
        let ticks: Vec<&str> = ticks.iter().map(String::as_str).collect();

        // The template is a literal; it only fails on a malformed placeholder.
        if let Ok(spinner_style) = ProgressStyle::default_spinner()
            .tick_strings(&ticks)
            .template("{msg}{spinner}")
        {
            bar.set_style(spinner_style);
        }

        bar.enable_steady_tick(Duration::from_millis(300));
        bar.set_message(format!("{}", style(label).dim()));

        Self { bar }
    }

    /// Each frame is padded to the same width so the line never jitters.
    fn tick_strings() -> Vec<String> {
        (0..FRAMES)
            .map(|dots| format!("{}{}", ".".repeat(dots), " ".repeat(FRAMES - 1 - dots)))
            .collect()
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for TypingSpinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_grow_one_dot_at_a_time() {
        assert_eq!(TypingSpinner::tick_strings(), vec!["   ", ".  ", ".. ", "..."]);
    }
}
