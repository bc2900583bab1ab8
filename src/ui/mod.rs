//! Terminal styling for the `patty` commands.

mod spinner;
pub mod status;
mod table;

pub use spinner::TypingSpinner;
pub use status::StatusLine;
pub use table::{MISSING, Table};
