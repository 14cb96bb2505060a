//! Colored terminal output helpers.
//!
//! User-facing lines are built here so every command gets the same
//! styling. The `format_*` helpers return the line; `error` prints
//! straight to stderr for fatal exits from `main`.

use comfy_table::{ContentArrangement, Table};
use console::style;

/// Green success line: "check_mark {msg}"
pub fn format_success(msg: &str) -> String {
    format!("{} {}", style("\u{2713}").green().bold(), msg)
}

/// Red error line: "x_mark {msg}"
pub fn format_error(msg: &str) -> String {
    format!("{} {}", style("\u{2717}").red().bold(), msg)
}

/// Yellow warning line: "warning_sign {msg}"
pub fn format_warning(msg: &str) -> String {
    format!("{} {}", style("\u{26a0}").yellow().bold(), msg)
}

/// Blue info line: "info_sign {msg}"
pub fn format_info(msg: &str) -> String {
    format!("{} {}", style("\u{2139}").blue().bold(), msg)
}

/// Print a red error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{}", format_error(msg));
}

/// Table of the interactive commands, for `help`.
pub fn commands_table(commands: &[(&str, &str)]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Command", "Description"]);

    for (name, description) in commands {
        table.add_row(vec![name.to_string(), description.to_string()]);
    }

    table
}
