//! Everything for talking to the PocketBase instance that stores the
//! directory's data.

use std::fmt;

use secrecy::SecretString;

use crate::{
    config::HttpHost,
    model::{RecordId, SubmissionStatus},
};


mod client;

pub(crate) use self::client::{AuthOutcome, Client, CollectionRules, FileUpload};


#[derive(Debug, confique::Config)]
pub(crate) struct PocketBaseConfig {
    /// URL of the PocketBase instance backing the directory.
    ///
    /// Admin requests carry credentials, so using HTTPS is strongly
    /// encouraged. In fact, HTTP is only allowed if the host resolves to a
    /// loopback address.
    ///
    /// Example: "http://localhost:8090" or "https://pb.minaret-map.org".
    #[config(env = "MINARET_POCKETBASE_URL")]
    pub(crate) url: HttpHost,

    /// Email of the admin account used by administrative commands
    /// (`fix-permissions`, `users ban`, `submissions approve`, ...). If this
    /// is not set, those commands ask for it on the terminal.
    #[config(env = "MINARET_ADMIN_EMAIL")]
    pub(crate) admin_email: Option<String>,

    /// Password of the admin account. If this is not set, administrative
    /// commands ask for it on the terminal.
    #[config(env = "MINARET_ADMIN_PASSWORD")]
    pub(crate) admin_password: Option<SecretString>,
}


/// A filter expression for record listings.
///
/// PocketBase evaluates filters as a small query language, so naively
/// interpolating user input would allow filter injection. This type can only
/// be built from already validated values ([`SubmissionStatus`], [`RecordId`],
/// booleans), which makes the rendered expression safe by construction.
#[derive(Debug, Clone)]
pub(crate) enum Filter {
    Status(SubmissionStatus),
    SubmittedBy(RecordId),
    Suspended(bool),
    And(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub(crate) fn and(self, other: Filter) -> Filter {
        Filter::And(Box::new(self), Box::new(other))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "status = '{}'", status.as_str()),
            Self::SubmittedBy(id) => write!(f, "submitted_by = '{}'", id.as_str()),
            Self::Suspended(suspended) => write!(f, "suspended = {suspended}"),
            Self::And(a, b) => write!(f, "({a} && {b})"),
        }
    }
}


/// Options for record listings. The defaults fetch the first page, newest
/// records first.
#[derive(Debug, Clone)]
pub(crate) struct ListOptions {
    pub(crate) page: u32,
    pub(crate) per_page: u32,
    pub(crate) filter: Option<Filter>,
    pub(crate) sort: Option<&'static str>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 30,
            filter: None,
            sort: Some("-created"),
        }
    }
}


#[cfg(test)]
mod tests {
    use crate::model::SubmissionStatus;
    use super::Filter;

    #[test]
    fn filter_rendering() {
        assert_eq!(
            Filter::Status(SubmissionStatus::Pending).to_string(),
            "status = 'pending'",
        );
        assert_eq!(
            Filter::SubmittedBy("abc123def456ghi".parse().unwrap()).to_string(),
            "submitted_by = 'abc123def456ghi'",
        );
        assert_eq!(Filter::Suspended(true).to_string(), "suspended = true");
        assert_eq!(
            Filter::Status(SubmissionStatus::Rejected)
                .and(Filter::Suspended(false))
                .to_string(),
            "(status = 'rejected' && suspended = false)",
        );
    }
}
