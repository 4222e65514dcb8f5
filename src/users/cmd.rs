use secrecy::SecretString;

use crate::{
    config::Config,
    model::{Page, RecordId, User},
    pb::{self, Filter, ListOptions},
    prelude::*,
};


#[derive(Debug, clap::Subcommand)]
pub(crate) enum UsersCommand {
    /// Lists accounts, newest first.
    List {
        /// Only show suspended accounts.
        #[arg(long)]
        suspended: bool,

        /// Page of results to show.
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Shows a single account.
    Show {
        /// ID of the account.
        id: RecordId,
    },

    /// Suspends an account. The account can no longer be used until it is
    /// unbanned again.
    Ban {
        /// ID of the account.
        id: RecordId,
    },

    /// Lifts the suspension of an account.
    Unban {
        /// ID of the account.
        id: RecordId,
    },

    /// Changes the password of an account. Asks for the current password
    /// first and refuses if it doesn't match.
    ChangePassword {
        /// Email of the account.
        email: String,
    },
}

/// Entry point for `users` commands.
pub(crate) async fn run(cmd: &UsersCommand, config: &Config) -> Result<()> {
    let mut client = pb::Client::new(&config.pocketbase)?;

    match cmd {
        UsersCommand::List { suspended, page } => {
            crate::cmd::authenticate_admin(&mut client, config).await?;
            let options = ListOptions {
                page: *page,
                filter: suspended.then_some(Filter::Suspended(true)),
                ..ListOptions::default()
            };
            let users = super::list(&client, &options).await?;
            print_user_list(&users);
        }
        UsersCommand::Show { id } => {
            crate::cmd::authenticate_admin(&mut client, config).await?;
            let user = super::get(&client, id).await?;
            print_user(&user);
        }
        UsersCommand::Ban { id } => {
            crate::cmd::authenticate_admin(&mut client, config).await?;
            let user = super::set_suspended(&client, id, true).await?;
            bunt::println!("Suspended account {[bold]} ('{}')", user.id.as_str(), user.email);
        }
        UsersCommand::Unban { id } => {
            crate::cmd::authenticate_admin(&mut client, config).await?;
            let user = super::set_suspended(&client, id, false).await?;
            bunt::println!("Lifted suspension of account {[bold]} ('{}')", user.id.as_str(), user.email);
        }
        UsersCommand::ChangePassword { email } => {
            let current = SecretString::from(crate::cmd::prompt("Current password")?);
            let new = SecretString::from(crate::cmd::prompt("New password")?);
            super::change_password(&mut client, email, &current, &new).await?;
            println!("Password updated.");
        }
    }

    Ok(())
}

fn print_user_list(users: &Page<User>) {
    for user in &users.items {
        let mut flags = Vec::new();
        if user.verified {
            flags.push("verified");
        }
        if user.suspended {
            flags.push("suspended");
        }

        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("[{}]", flags.join(", "))
        };
        bunt::println!(
            " ▸ {[bold]}  {}  {} {[dimmed]}",
            user.id.as_str(),
            user.email,
            user.name,
            flags,
        );
    }

    println!();
    bunt::println!(
        "{$dimmed}Page {}/{} ({} accounts in total){/$}",
        users.page,
        users.total_pages,
        users.total_items,
    );
}

fn print_user(user: &User) {
    bunt::println!("{$bold}ID:{/$}        {}", user.id.as_str());
    bunt::println!("{$bold}Name:{/$}      {}", user.name);
    bunt::println!("{$bold}Email:{/$}     {}", user.email);
    bunt::println!("{$bold}Verified:{/$}  {}", user.verified);
    bunt::println!("{$bold}Suspended:{/$} {}", user.suspended);
    bunt::println!("{$bold}Created:{/$}   {}", user.created);
    bunt::println!("{$bold}Updated:{/$}   {}", user.updated);
}
