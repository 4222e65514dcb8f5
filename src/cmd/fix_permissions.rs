//! CLI command `fix-permissions`: one-shot repair tool for the access rules
//! of the `submissions` collection.
//!
//! Some instances were set up with a create rule that locked regular
//! accounts out of handing in submissions. This overwrites exactly that one
//! rule; everything else about the collection is left as is.

use crate::{config::Config, pb::{self, CollectionRules}, prelude::*};


const SUBMISSIONS_COLLECTION: &str = "submissions";

/// Any authenticated account may create a submission.
const SUBMISSIONS_CREATE_RULE: &str = r#"@request.auth.id != """#;


pub(crate) async fn run(config: &Config) -> Result<()> {
    let mut client = pb::Client::new(&config.pocketbase)?;
    crate::cmd::authenticate_admin(&mut client, config).await
        .context("failed to authenticate as admin")?;

    let before = client.collection_rules(SUBMISSIONS_COLLECTION).await
        .context("failed to fetch current rules of the 'submissions' collection")?;

    println!();
    bunt::println!("{$bold}Current rules of '{}':{/$}", SUBMISSIONS_COLLECTION);
    print_rules(&before);

    if before.create_rule.as_deref() == Some(SUBMISSIONS_CREATE_RULE) {
        println!();
        info!("Create rule is already set correctly: nothing to do");
        return Ok(());
    }

    let after = client.set_create_rule(SUBMISSIONS_COLLECTION, SUBMISSIONS_CREATE_RULE).await
        .context("failed to update the create rule")?;
    info!("Updated create rule of collection '{SUBMISSIONS_COLLECTION}'");

    println!();
    bunt::println!("{$bold}New rules of '{}':{/$}", SUBMISSIONS_COLLECTION);
    print_rules(&after);

    Ok(())
}

fn print_rules(rules: &CollectionRules) {
    let print = |label: &str, rule: &Option<String>| {
        match rule {
            Some(rule) => bunt::println!(" ▸ {[bold]}: {}", label, rule),
            None => bunt::println!(" ▸ {[bold]}: {$dimmed}(admins only){/$}", label),
        }
    };

    print("list  ", &rules.list_rule);
    print("view  ", &rules.view_rule);
    print("create", &rules.create_rule);
    print("update", &rules.update_rule);
    print("delete", &rules.delete_rule);
}
