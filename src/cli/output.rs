//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling.  Status lines go to stderr; only the account
//! table is written to stdout.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::account::AccountSession;

/// Shown in place of password values unless `--reveal` is given.
const MASK: &str = "********";

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Build the Field/Value table for a resolved account.
pub fn account_table(session: &AccountSession, reveal: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);

    for (field, value) in session.fields() {
        let shown = if field.is_password() && !reveal {
            MASK
        } else {
            value
        };
        table.add_row(vec![field.key.as_str(), shown]);
    }

    table
}

/// Print the resolved account to stdout.
pub fn print_account(session: &AccountSession, reveal: bool) {
    println!("{}", account_table(session, reveal));
}
