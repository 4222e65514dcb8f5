//! The Minaret moderation & administration tool.

use std::env;

use clap::Parser;

use crate::{
    args::{Args, Command},
    config::Config,
    prelude::*,
};

mod args;
mod cmd;
mod config;
mod logger;
mod model;
mod pb;
mod prelude;
mod submissions;
mod users;


#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        // Log error in case stdout is not connected and it is logged into a file.
        error!("{:?}", e);

        // Show a somewhat nice representation of the error
        eprintln!();
        eprintln!();
        bunt::eprintln!("{$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
        eprintln!();
        if e.chain().len() > 1 {
            bunt::eprintln!("{$red+italic}Caused by:{/$}");
        }

        for (i, cause) in e.chain().skip(1).enumerate() {
            eprint!(" {: >1$}", "", i * 2);
            eprintln!("‣ {cause}");
        }

        std::process::exit(1);
    }
}

/// Main entry point.
async fn run() -> Result<()> {
    // If `RUST_BACKTRACE` wasn't already set, we default to `1`. Backtraces
    // are almost always useful for debugging and this is a short-lived CLI
    // process, so the cost of generating one doesn't matter.
    if env::var("RUST_BACKTRACE") == Err(env::VarError::NotPresent) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    let args = Args::parse();

    // Configure output via `bunt`
    bunt::set_stdout_color_choice(args.stdout_color());
    bunt::set_stderr_color_choice(args.stderr_color());

    // Dispatch subcommand.
    match &args.cmd {
        Command::Check { shared } => cmd::check::run(shared).await?,
        Command::FixPermissions { shared } => {
            let config = load_config_and_init_logger(shared)?;
            cmd::fix_permissions::run(&config).await?;
        }
        Command::Users { cmd, shared } => {
            let config = load_config_and_init_logger(shared)?;
            users::cmd::run(cmd, &config).await?;
        }
        Command::Submissions { cmd, shared } => {
            let config = load_config_and_init_logger(shared)?;
            submissions::cmd::run(cmd, &config).await?;
        }
        Command::WriteConfig { target } => config::write_template(target.as_ref())?,
    }

    Ok(())
}

fn load_config_and_init_logger(shared: &args::Shared) -> Result<Config> {
    // Load configuration.
    let (config, path) = match &shared.config {
        Some(path) => {
            let config = Config::load_from(path)
                .context(format!("failed to load config from '{}'", path.display()))?;
            (config, Some(path.clone()))
        }
        None => Config::from_env_or_default_locations()?,
    };

    // Initialize logger. Unfortunately, we can only do this here
    // after reading the config.
    logger::init(&config.log)?;
    match &path {
        Some(path) => info!("Loaded config from '{}'", path.display()),
        None => info!("No config file found: using environment variables only"),
    }

    Ok(config)
}
