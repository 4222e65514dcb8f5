//! Typed access to the `users` collection.

use secrecy::{ExposeSecret as _, SecretString};

use crate::{
    model::{Page, RecordId, User},
    pb::{self, AuthOutcome, ListOptions},
    prelude::*,
};


pub(crate) mod cmd;

const COLLECTION: &str = "users";


pub(crate) async fn list(client: &pb::Client, options: &ListOptions) -> Result<Page<User>> {
    client.list_records(COLLECTION, options).await
        .context("failed to list users")
}

pub(crate) async fn get(client: &pb::Client, id: &RecordId) -> Result<User> {
    client.get_record(COLLECTION, id).await
        .with_context(|| format!("failed to fetch user {id}"))
}

/// Suspends or unsuspends an account.
///
/// Suspension is its own boolean field on the record. `verified` keeps
/// meaning "email verified" and is never touched by this.
pub(crate) async fn set_suspended(
    client: &pb::Client,
    id: &RecordId,
    suspended: bool,
) -> Result<User> {
    let body = serde_json::json!({ "suspended": suspended });
    client.update_record(COLLECTION, id, &body).await
        .with_context(|| format!(
            "failed to {} user {id}",
            if suspended { "suspend" } else { "unsuspend" },
        ))
}

/// Changes the password of an account.
///
/// The current password is verified first by authenticating with it; if that
/// fails, no password change request is sent at all.
pub(crate) async fn change_password(
    client: &mut pb::Client,
    email: &str,
    current: &SecretString,
    new: &SecretString,
) -> Result<()> {
    let user = match client.auth_with_password(email, current.expose_secret()).await? {
        AuthOutcome::Authenticated(user) => user,
        AuthOutcome::BadCredentials => bail!("Current password is incorrect"),
    };

    let body = serde_json::json!({
        "oldPassword": current.expose_secret(),
        "password": new.expose_secret(),
        "passwordConfirm": new.expose_secret(),
    });
    let _: User = client.update_record(COLLECTION, &user.id, &body).await
        .context("failed to update password")?;

    info!("Changed password of user {} ('{email}')", user.id);
    Ok(())
}
