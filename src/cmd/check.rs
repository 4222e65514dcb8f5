//! A subcommand making sure various things are working. Useful before
//! running the admin tools against a freshly configured instance.

use secrecy::ExposeSecret as _;

use crate::{
    args,
    config::Config,
    load_config_and_init_logger,
    pb,
    prelude::*,
};


pub(crate) async fn run(shared: &args::Shared) -> Result<()> {
    let config = load_config_and_init_logger(shared)
        .context("failed to load config: cannot proceed with `check` command")?;

    // Perform main checks
    info!("Starting to verify the environment...");
    let connection = check_connection(&config).await;
    let admin_auth = check_admin_auth(&config).await;
    info!("Done verifying the environment");

    // Print summary after all log output
    let mut any_errors = false;
    println!();
    bunt::println!("{$bold+blue+intense}Summary{/$}");
    println!();
    print_outcome(&mut any_errors, "Load configuration", &Ok(()));
    print_outcome(&mut any_errors, "Connection to PocketBase", &connection);
    print_outcome(&mut any_errors, "Admin authentication", &admin_auth);

    println!();
    if any_errors {
        bunt::println!("{$red+intense}➡  Errors occurred!{/$}");
        std::process::exit(1);
    } else {
        bunt::println!("{$green+intense}➡  Everything OK{/$} \
            {$dimmed}(Minaret probably works in this environment){/$}");
        println!();
        Ok(())
    }
}

fn print_outcome<T>(any_errors: &mut bool, label: &str, result: &Result<T>) {
    match result {
        Ok(_) => {
            bunt::println!(" ▸ {[bold+intense]}  {$green+bold}✔ ok{/$}", label);
        }
        Err(e) => {
            *any_errors = true;
            bunt::println!(" ▸ {[bold+intense]}  {$red+bold}✘ error{/$}", label);
            bunt::println!("      {$red}▶▶▶ {$bold}Error:{/$}{/$} {[yellow+intense]}", e);
            println!();
            bunt::println!("      {$red+italic}Caused by:{/$}");

            for (i, cause) in e.chain().skip(1).enumerate() {
                print!("       {: >1$}", "", i * 2);
                println!("‣ {cause}");
            }
            println!();
        }
    }
}

async fn check_connection(config: &Config) -> Result<()> {
    pb::Client::new(&config.pocketbase)?.check_connection().await
}

async fn check_admin_auth(config: &Config) -> Result<()> {
    let (Some(email), Some(password)) =
        (&config.pocketbase.admin_email, &config.pocketbase.admin_password)
    else {
        info!("No admin credentials configured: skipping admin authentication check");
        return Ok(());
    };

    let mut client = pb::Client::new(&config.pocketbase)?;
    client.auth_as_admin(email, password.expose_secret()).await
}
