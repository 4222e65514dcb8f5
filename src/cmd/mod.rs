use std::io::{self, Write};

use secrecy::ExposeSecret as _;

use crate::{config::Config, pb, prelude::*};


pub(crate) mod check;
pub(crate) mod fix_permissions;


/// Authenticates the client as admin, taking the credentials from the
/// config/environment or, where missing, from interactive prompts.
pub(crate) async fn authenticate_admin(client: &mut pb::Client, config: &Config) -> Result<()> {
    let email = match &config.pocketbase.admin_email {
        Some(email) => email.clone(),
        None => prompt("Admin email")?,
    };
    let password = match &config.pocketbase.admin_password {
        Some(password) => password.expose_secret().to_owned(),
        None => prompt("Admin password")?,
    };

    client.auth_as_admin(&email, &password).await
}

/// Prints the label and reads one line from stdin. Errors on empty input.
pub(crate) fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush().context("could not flush stdout")?;

    let mut line = String::new();
    io::stdin().read_line(&mut line).context("could not read from stdin")?;
    let line = line.trim();
    if line.is_empty() {
        bail!("no input given for '{label}': aborting");
    }

    Ok(line.to_owned())
}
