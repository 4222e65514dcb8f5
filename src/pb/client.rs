use std::time::Duration;

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::{
    header::{self, HeaderValue},
    multipart, StatusCode, Url,
};
use secrecy::{ExposeSecret as _, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::Value;

use crate::{
    config::HttpHost,
    model::{Page, RecordId, User},
    prelude::*,
};

use super::{ListOptions, PocketBaseConfig};


const USER_AGENT: &str = concat!("minaret/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Used to send requests to the PocketBase API.
///
/// All operations are plain sequential HTTP calls; the only state is the auth
/// token obtained by one of the `auth_*` methods and sent along with every
/// subsequent request.
pub(crate) struct Client {
    http: reqwest::Client,
    base: HttpHost,
    token: Option<SecretString>,
}

/// Outcome of an authentication attempt. Wrong credentials are a normal
/// outcome for some flows (password verification), not an error.
pub(crate) enum AuthOutcome {
    Authenticated(User),
    BadCredentials,
}

impl Client {
    const USERS_AUTH_PATH: &'static str = "/api/collections/users/auth-with-password";
    const ADMIN_AUTH_PATH: &'static str = "/api/admins/auth-with-password";
    const HEALTH_PATH: &'static str = "/api/health";

    pub(crate) fn new(config: &PocketBaseConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base: config.url.clone(),
            token: None,
        })
    }

    /// Checks that the PocketBase instance is reachable and healthy.
    pub(crate) async fn check_connection(&self) -> Result<()> {
        let url = self.base.with_path(Self::HEALTH_PATH);
        trace!("Sending request to '{url}'");
        let response = self.http.get(url.clone()).send().await
            .with_context(|| format!("health request to '{url}' failed \
                (is PocketBase running?)"))?;
        check_status(response, &url).await?;
        Ok(())
    }

    /// Authenticates against the `users` collection. On success, the obtained
    /// token is used for all subsequent requests.
    pub(crate) async fn auth_with_password(
        &mut self,
        identity: &str,
        password: &str,
    ) -> Result<AuthOutcome> {
        #[derive(Deserialize)]
        struct AuthResponse {
            token: String,
            record: User,
        }

        let url = self.base.with_path(Self::USERS_AUTH_PATH);
        debug!("Authenticating as user '{identity}'");

        let body = serde_json::json!({ "identity": identity, "password": password });
        let response = self.http.post(url.clone()).json(&body).send().await
            .with_context(|| format!("authentication request to '{url}' failed"))?;

        // PocketBase answers failed password auth with 400.
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Ok(AuthOutcome::BadCredentials);
        }

        let response = check_status(response, &url).await?;
        let out: AuthResponse = response.json().await
            .with_context(|| format!("failed to deserialize auth response from '{url}'"))?;

        self.token = Some(SecretString::from(out.token));
        Ok(AuthOutcome::Authenticated(out.record))
    }

    /// Authenticates as an admin (superuser). Unlike user accounts, admins
    /// are not records of any collection.
    pub(crate) async fn auth_as_admin(&mut self, email: &str, password: &str) -> Result<()> {
        #[derive(Deserialize)]
        struct AdminAuthResponse {
            token: String,
        }

        let url = self.base.with_path(Self::ADMIN_AUTH_PATH);
        debug!("Authenticating as admin '{email}'");

        let body = serde_json::json!({ "identity": email, "password": password });
        let response = self.http.post(url.clone()).json(&body).send().await
            .with_context(|| format!("admin authentication request to '{url}' failed"))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            bail!("admin authentication as '{email}' was rejected: \
                check email and password");
        }

        let response = check_status(response, &url).await?;
        let out: AdminAuthResponse = response.json().await
            .with_context(|| format!("failed to deserialize auth response from '{url}'"))?;

        self.token = Some(SecretString::from(out.token));
        Ok(())
    }

    /// Fetches one page of records from the given collection.
    pub(crate) async fn list_records<T: DeserializeOwned>(
        &self,
        collection: &str,
        options: &ListOptions,
    ) -> Result<Page<T>> {
        let url = self.base.with_path(&format!("/api/collections/{collection}/records"));

        let mut request = self.authed(self.http.get(url.clone()))?
            .query(&[("page", options.page), ("perPage", options.per_page)]);
        if let Some(filter) = &options.filter {
            request = request.query(&[("filter", filter.to_string())]);
        }
        if let Some(sort) = options.sort {
            request = request.query(&[("sort", sort)]);
        }

        trace!("Listing records: GET '{url}' (filter: {:?})", options.filter);
        let response = request.send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize record list from '{url}'"))
    }

    /// Fetches a single record by ID.
    pub(crate) async fn get_record<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<T> {
        let url = self.record_url(collection, id);

        trace!("Fetching record: GET '{url}'");
        let response = self.authed(self.http.get(url.clone()))?.send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize record from '{url}'"))
    }

    /// Creates a record with a JSON body.
    pub(crate) async fn create_record<T, B>(&self, collection: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.base.with_path(&format!("/api/collections/{collection}/records"));

        trace!("Creating record: POST '{url}'");
        let response = self.authed(self.http.post(url.clone()))?.json(body).send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize created record from '{url}'"))
    }

    /// Updates a record with a JSON body. Only the fields present in the body
    /// are changed.
    pub(crate) async fn update_record<T, B>(
        &self,
        collection: &str,
        id: &RecordId,
        body: &B,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.record_url(collection, id);

        trace!("Updating record: PATCH '{url}'");
        let response = self.authed(self.http.patch(url.clone()))?.json(body).send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize updated record from '{url}'"))
    }

    /// Creates a record from a multipart form: all `fields` as text parts
    /// plus one file part.
    pub(crate) async fn create_record_with_file<T: DeserializeOwned>(
        &self,
        collection: &str,
        fields: &serde_json::Map<String, Value>,
        file: FileUpload,
    ) -> Result<T> {
        let url = self.base.with_path(&format!("/api/collections/{collection}/records"));

        trace!("Creating record with file: POST '{url}' (multipart)");
        let form = multipart_form(fields, file)?;
        let response = self.authed(self.http.post(url.clone()))?.multipart(form).send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize created record from '{url}'"))
    }

    /// Like [`Self::update_record`], but as a multipart form with a file part.
    pub(crate) async fn update_record_with_file<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &RecordId,
        fields: &serde_json::Map<String, Value>,
        file: FileUpload,
    ) -> Result<T> {
        let url = self.record_url(collection, id);

        trace!("Updating record with file: PATCH '{url}' (multipart)");
        let form = multipart_form(fields, file)?;
        let response = self.authed(self.http.patch(url.clone()))?.multipart(form).send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize updated record from '{url}'"))
    }

    /// Downloads a file stored for the given record.
    pub(crate) async fn download_file(
        &self,
        collection: &str,
        record: &RecordId,
        file_name: &str,
    ) -> Result<Bytes> {
        let encoded = utf8_percent_encode(file_name, NON_ALPHANUMERIC);
        let url = self.base.with_path(
            &format!("/api/files/{collection}/{}/{encoded}", record.as_str()),
        );

        trace!("Downloading file: GET '{url}'");
        let response = self.authed(self.http.get(url.clone()))?.send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.bytes().await
            .with_context(|| format!("failed to download body from '{url}'"))
    }

    /// Fetches the access rules of a collection. Requires admin auth.
    pub(crate) async fn collection_rules(&self, collection: &str) -> Result<CollectionRules> {
        let url = self.base.with_path(&format!("/api/collections/{collection}"));

        trace!("Fetching collection: GET '{url}'");
        let response = self.authed(self.http.get(url.clone()))?.send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize collection from '{url}'"))
    }

    /// Sets the create rule of a collection. The request body carries only
    /// `createRule`, so PocketBase leaves all other rules unchanged. Requires
    /// admin auth.
    pub(crate) async fn set_create_rule(
        &self,
        collection: &str,
        rule: &str,
    ) -> Result<CollectionRules> {
        let url = self.base.with_path(&format!("/api/collections/{collection}"));

        debug!("Setting create rule of collection '{collection}' to {rule:?}");
        let body = serde_json::json!({ "createRule": rule });
        let response = self.authed(self.http.patch(url.clone()))?.json(&body).send().await
            .with_context(|| format!("request to '{url}' failed"))?;
        let response = check_status(response, &url).await?;

        response.json().await
            .with_context(|| format!("failed to deserialize collection from '{url}'"))
    }

    fn record_url(&self, collection: &str, id: &RecordId) -> Url {
        self.base.with_path(
            &format!("/api/collections/{collection}/records/{}", id.as_str()),
        )
    }

    /// Attaches the stored auth token, if any.
    fn authed(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        match &self.token {
            Some(token) => {
                let mut value = HeaderValue::from_str(token.expose_secret())
                    .context("stored auth token is not a valid header value")?;
                value.set_sensitive(true);
                Ok(builder.header(header::AUTHORIZATION, value))
            }
            None => Ok(builder),
        }
    }
}


/// A file to be attached to a record as part of a multipart request.
pub(crate) struct FileUpload {
    /// Name of the record field the file belongs to, e.g. `image`.
    pub(crate) field: String,
    pub(crate) file_name: String,
    pub(crate) data: Vec<u8>,
}

/// The access rules of a collection. `None` means "admins only" in
/// PocketBase.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CollectionRules {
    pub(crate) list_rule: Option<String>,
    pub(crate) view_rule: Option<String>,
    pub(crate) create_rule: Option<String>,
    pub(crate) update_rule: Option<String>,
    pub(crate) delete_rule: Option<String>,
}


fn multipart_form(
    fields: &serde_json::Map<String, Value>,
    file: FileUpload,
) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for (name, value) in fields {
        // Text parts are sent verbatim; everything else in its JSON
        // serialization (PocketBase parses numbers/bools from form values).
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        form = form.text(name.clone(), value);
    }

    let mime = mime_guess::from_path(&file.file_name).first_or_octet_stream();
    let part = multipart::Part::bytes(file.data)
        .file_name(file.file_name)
        .mime_str(mime.as_ref())
        .context("failed to build file part")?;

    Ok(form.part(file.field, part))
}

/// Checks the HTTP status of a response, turning error responses into
/// readable errors (including the message PocketBase sent, if any).
async fn check_status(response: reqwest::Response, url: &Url) -> Result<reqwest::Response> {
    #[derive(Deserialize)]
    struct ApiError {
        message: String,
    }

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        bail!("request to '{url}' was denied ({status}): \
            not authenticated or missing permissions");
    }

    let message = response.bytes().await.ok()
        .and_then(|body| serde_json::from_slice::<ApiError>(&body).ok());
    match message {
        Some(e) => bail!("PocketBase returned {status} for '{url}': {}", e.message),
        None => bail!("PocketBase returned unexpected HTTP code {status} for '{url}'"),
    }
}
