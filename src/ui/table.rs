//! Plain column tables for lead output.

use console::style;

/// Placeholder shown for unset values.
pub const MISSING: &str = "-";

/// Left-aligned columns sized to their widest cell.
///
/// ```text
/// Field           Value
/// ──────────────────────────────────
/// last_name       Dupont
/// phone           06 12 34 56 78
/// goals           -
/// ```
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    col_widths: Vec<usize>,
}

impl Table {
    #[must_use]
    pub fn new(headers: &[&str]) -> Self {
        let headers: Vec<String> = headers.iter().map(|&s| s.to_string()).collect();
        let col_widths = headers.iter().map(|h| width(h)).collect();

        Self {
            headers,
            rows: Vec::new(),
            col_widths,
        }
    }

    pub fn add_row(&mut self, cells: &[&str]) {
        let row: Vec<String> = cells.iter().map(|&s| s.to_string()).collect();
        for (slot, cell) in self.col_widths.iter_mut().zip(&row) {
            *slot = (*slot).max(width(cell));
        }
        self.rows.push(row);
    }

    /// Unstyled lines: header, rule, then rows.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![self.pad(&self.headers), "─".repeat(self.total_width())];
        lines.extend(self.rows.iter().map(|row| self.pad(row)));
        lines
    }

    pub fn print(&self) {
        let lines = self.lines();
        let mut lines = lines.into_iter();
        if let Some(header) = lines.next() {
            println!("{}", style(header).bold());
        }
        for (n, line) in lines.enumerate() {
            let unset = n > 0 && self.rows[n - 1].last().is_some_and(|c| c == MISSING);
            if unset {
                println!("{}", style(line).dim());
            } else {
                println!("{line}");
            }
        }
    }

    fn total_width(&self) -> usize {
        self.col_widths.iter().sum::<usize>() + self.col_widths.len().saturating_sub(1) * 2
    }

    fn pad(&self, cells: &[String]) -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let fill = self
                    .col_widths
                    .get(i)
                    .map_or(0, |w| w.saturating_sub(width(cell)));
                format!("{cell}{}", " ".repeat(fill))
            })
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    }
}

/// Display width in characters; accented French text is multi-byte.
fn width(text: &str) -> usize {
    text.chars().count()
}
