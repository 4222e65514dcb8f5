//! This module defines the command line arguments Minaret accepts.

use std::{io::IsTerminal, path::PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use termcolor::ColorChoice;

use crate::{submissions::cmd::SubmissionsCommand, users::cmd::UsersCommand};


#[derive(Debug, Parser)]
#[command(about = "Moderation & administration tool for the Minaret mosque directory.", version)]
pub(crate) struct Args {
    #[command(subcommand)]
    pub(crate) cmd: Command,

    /// Whether to use colors in the output.
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorOption,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Checks config and the connection to PocketBase to find problems in
    /// Minaret's environment.
    ///
    /// Exits with 0 if everything is Ok, and with 1 otherwise.
    Check {
        #[command(flatten)]
        shared: Shared,
    },

    /// Overwrites the create rule of the `submissions` collection so that any
    /// authenticated account may hand in submissions. All other rules of the
    /// collection are left untouched.
    ///
    /// This is a one-shot repair tool: run it once against an instance whose
    /// rule set got misconfigured. Requires admin credentials, either from
    /// the config/environment or entered interactively.
    FixPermissions {
        #[command(flatten)]
        shared: Shared,
    },

    /// Operations on the accounts in the `users` collection.
    Users {
        #[command(subcommand)]
        cmd: UsersCommand,

        #[command(flatten)]
        shared: Shared,
    },

    /// Listing and review of mosque submissions.
    Submissions {
        #[command(subcommand)]
        cmd: SubmissionsCommand,

        #[command(flatten)]
        shared: Shared,
    },

    /// Outputs a template for the configuration file (which includes
    /// descriptions of all options).
    WriteConfig {
        /// Target file. If not specified, the template is written to stdout.
        target: Option<PathBuf>,
    },
}

#[derive(Debug, clap::Args)]
pub(crate) struct Shared {
    /// Path to the configuration file. If this is not specified, Minaret will
    /// try opening `config.toml` or `/etc/minaret/config.toml`.
    #[arg(short, long)]
    pub(crate) config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ColorOption {
    Auto,
    Always,
    Never,
}

impl Args {
    pub(crate) fn stdout_color(&self) -> ColorChoice {
        self.color_choice(std::io::stdout().is_terminal())
    }

    pub(crate) fn stderr_color(&self) -> ColorChoice {
        self.color_choice(std::io::stderr().is_terminal())
    }

    fn color_choice(&self, is_terminal: bool) -> ColorChoice {
        match self.color {
            ColorOption::Always => ColorChoice::Always,
            ColorOption::Never => ColorChoice::Never,
            ColorOption::Auto if is_terminal => ColorChoice::Auto,
            ColorOption::Auto => ColorChoice::Never,
        }
    }
}
