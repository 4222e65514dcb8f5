//! Typed access to the `submissions` collection and the review workflow.

use chrono::Utc;
use serde_json::Value;

use crate::{
    model::{pbtime, Mosque, Page, RecordId, Submission, SubmissionKind, SubmissionStatus},
    pb::{self, FileUpload, ListOptions},
    prelude::*,
};


pub(crate) mod cmd;

const COLLECTION: &str = "submissions";
const MOSQUES_COLLECTION: &str = "mosques";

/// The fields that may be copied from a submission's embedded data into a
/// mosque record. The embedded object is controlled by the submitter, so
/// everything outside this list is dropped on approval.
const MOSQUE_FIELDS: &[&str] = &["name", "address", "latitude", "longitude"];

/// Status a mosque record gets when created through an approval.
const NEW_MOSQUE_STATUS: &str = "active";


pub(crate) async fn list(client: &pb::Client, options: &ListOptions) -> Result<Page<Submission>> {
    client.list_records(COLLECTION, options).await
        .context("failed to list submissions")
}

pub(crate) async fn get(client: &pb::Client, id: &RecordId) -> Result<Submission> {
    client.get_record(COLLECTION, id).await
        .with_context(|| format!("failed to fetch submission {id}"))
}

/// Approves a pending submission, creating or updating the corresponding
/// mosque record.
///
/// If the submission has an image attached, it is re-fetched and attached to
/// the mosque record. A failure to fetch the image does not fail the
/// approval: the mosque is then created/updated without image.
pub(crate) async fn approve(
    client: &pb::Client,
    id: &RecordId,
    reviewer: &RecordId,
) -> Result<Mosque> {
    let submission = get(client, id).await?;
    if submission.status != SubmissionStatus::Pending {
        bail!("submission {id} was already {}", submission.status);
    }

    let mut fields = approved_fields(&submission.data);

    let image = match &submission.image {
        Some(file_name) => {
            match client.download_file(COLLECTION, id, file_name).await {
                Ok(data) => Some(FileUpload {
                    field: "image".into(),
                    file_name: file_name.clone(),
                    data: data.to_vec(),
                }),
                Err(e) => {
                    warn!(
                        "Could not fetch image '{file_name}' of submission {id}: {e:#}. \
                            Proceeding without image.",
                    );
                    None
                }
            }
        }
        None => None,
    };

    let mosque: Mosque = match submission.kind {
        SubmissionKind::NewMosque => {
            fields.insert("status".into(), NEW_MOSQUE_STATUS.into());
            fields.insert("created_by".into(), submission.submitted_by.as_str().into());

            match image {
                Some(file) => {
                    client.create_record_with_file(MOSQUES_COLLECTION, &fields, file).await
                }
                None => client.create_record(MOSQUES_COLLECTION, &fields).await,
            }.context("failed to create mosque record")?
        }
        SubmissionKind::EditMosque => {
            let mosque_id = submission.mosque.as_ref()
                .ok_or_else(|| anyhow!("edit submission {id} has no mosque reference"))?;

            match image {
                Some(file) => {
                    client.update_record_with_file(MOSQUES_COLLECTION, mosque_id, &fields, file).await
                }
                None => client.update_record(MOSQUES_COLLECTION, mosque_id, &fields).await,
            }.context("failed to update mosque record")?
        }
    };

    let body = serde_json::json!({
        "status": SubmissionStatus::Approved,
        "reviewed_by": reviewer.as_str(),
        "reviewed_at": pbtime::to_string(&Utc::now()),
    });
    let _: Submission = client.update_record(COLLECTION, id, &body).await
        .context("failed to mark submission as approved")?;

    info!(
        "Approved submission {id} ({}): mosque {}",
        submission.kind.as_str(),
        mosque.id,
    );
    Ok(mosque)
}

/// Rejects a pending submission with the given reason.
pub(crate) async fn reject(
    client: &pb::Client,
    id: &RecordId,
    reviewer: &RecordId,
    reason: &str,
) -> Result<Submission> {
    let submission = get(client, id).await?;
    if submission.status != SubmissionStatus::Pending {
        bail!("submission {id} was already {}", submission.status);
    }

    let body = serde_json::json!({
        "status": SubmissionStatus::Rejected,
        "reviewed_by": reviewer.as_str(),
        "reviewed_at": pbtime::to_string(&Utc::now()),
        "rejection_reason": reason,
    });
    let submission = client.update_record(COLLECTION, id, &body).await
        .context("failed to mark submission as rejected")?;

    info!("Rejected submission {id}");
    Ok(submission)
}

/// Copies only the allow-listed mosque fields out of a submission's embedded
/// data object.
fn approved_fields(data: &serde_json::Map<String, Value>) -> serde_json::Map<String, Value> {
    MOSQUE_FIELDS.iter()
        .filter_map(|&field| {
            data.get(field).map(|value| (field.to_owned(), value.clone()))
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::approved_fields;

    fn data(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test data is not an object"),
        }
    }

    #[test]
    fn approved_fields_keeps_allow_listed() {
        let fields = approved_fields(&data(json!({
            "name": "Al-Noor Mosque",
            "address": "12 Hill Road",
            "latitude": 52.52,
            "longitude": 13.405,
        })));

        assert_eq!(fields.len(), 4);
        assert_eq!(fields["name"], json!("Al-Noor Mosque"));
        assert_eq!(fields["address"], json!("12 Hill Road"));
        assert_eq!(fields["latitude"], json!(52.52));
        assert_eq!(fields["longitude"], json!(13.405));
    }

    #[test]
    fn approved_fields_drops_everything_else() {
        let fields = approved_fields(&data(json!({
            "name": "Al-Noor Mosque",
            // Attempts to smuggle fields into the mosque record.
            "status": "active",
            "created_by": "attacker0123456",
            "id": "forged1234567ab",
            "admin": true,
            "data": { "nested": "object" },
        })));

        assert_eq!(fields.len(), 1);
        assert_eq!(fields["name"], json!("Al-Noor Mosque"));
        assert!(fields.get("status").is_none());
        assert!(fields.get("created_by").is_none());
        assert!(fields.get("id").is_none());
        assert!(fields.get("admin").is_none());
    }

    #[test]
    fn approved_fields_ignores_missing() {
        let fields = approved_fields(&data(json!({
            "latitude": 1.0,
        })));

        assert_eq!(fields.len(), 1);
        assert!(fields.get("name").is_none());
    }
}
