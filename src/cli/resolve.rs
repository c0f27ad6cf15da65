//! `supass`: resolve one account and print its fields.

use crate::account::{AccountSession, Origin};
use crate::cli::output;
use crate::cli::{load_schema, prompter, session_options, vault_dir, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the resolve command.
pub fn execute(cli: &Cli) -> Result<()> {
    let dir = vault_dir(cli)?;
    let schema = load_schema(cli)?;
    let settings = Settings::load(&dir)?;
    let options = session_options(cli, &settings, dir);

    let mut prompter = prompter();
    let session = AccountSession::open(&schema, &options, prompter.as_mut())?;

    match (session.origin(), session.persisted()) {
        (Origin::Loaded, _) => {}
        (Origin::Collected, true) => {
            output::success(&format!("Account '{}' saved", session.account_id()));
        }
        (Origin::Collected, false) => {
            output::warning(&format!(
                "Account '{}' could not be saved — you will be asked again next time",
                session.account_id()
            ));
        }
    }

    output::print_account(&session, cli.reveal);

    if !cli.reveal && session.schema().fields().iter().any(|f| f.is_password()) {
        output::tip("Pass --reveal to print password values.");
    }

    Ok(())
}
