use crate::{
    config::Config,
    model::{Page, RecordId, Submission, SubmissionStatus},
    pb::{self, Filter, ListOptions},
    prelude::*,
};


#[derive(Debug, clap::Subcommand)]
pub(crate) enum SubmissionsCommand {
    /// Lists submissions, newest first.
    List {
        /// Only show submissions with this status ('pending', 'approved' or
        /// 'rejected').
        #[arg(long)]
        status: Option<SubmissionStatus>,

        /// Only show submissions handed in by this account.
        #[arg(long)]
        by: Option<RecordId>,

        /// Page of results to show.
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Shows a single submission, including its proposed data.
    Show {
        /// ID of the submission.
        id: RecordId,
    },

    /// Approves a pending submission: creates or updates the mosque record
    /// from the proposed data and marks the submission as approved.
    Approve {
        /// ID of the submission.
        id: RecordId,

        /// ID of the reviewing account, recorded on the submission.
        #[arg(long)]
        reviewer: RecordId,
    },

    /// Rejects a pending submission.
    Reject {
        /// ID of the submission.
        id: RecordId,

        /// ID of the reviewing account, recorded on the submission.
        #[arg(long)]
        reviewer: RecordId,

        /// Reason shown to the submitter.
        #[arg(long)]
        reason: String,
    },
}

/// Entry point for `submissions` commands.
pub(crate) async fn run(cmd: &SubmissionsCommand, config: &Config) -> Result<()> {
    let mut client = pb::Client::new(&config.pocketbase)?;
    crate::cmd::authenticate_admin(&mut client, config).await?;

    match cmd {
        SubmissionsCommand::List { status, by, page } => {
            let filter = match (status.map(Filter::Status), by.clone().map(Filter::SubmittedBy)) {
                (Some(a), Some(b)) => Some(a.and(b)),
                (a, b) => a.or(b),
            };
            let options = ListOptions {
                page: *page,
                filter,
                ..ListOptions::default()
            };
            let submissions = super::list(&client, &options).await?;
            print_submission_list(&submissions);
        }
        SubmissionsCommand::Show { id } => {
            let submission = super::get(&client, id).await?;
            print_submission(&submission);
        }
        SubmissionsCommand::Approve { id, reviewer } => {
            let mosque = super::approve(&client, id, reviewer).await?;
            bunt::println!("Approved submission {[bold]}. The directory now holds:", id.as_str());
            println!();
            print_mosque(&mosque);
        }
        SubmissionsCommand::Reject { id, reviewer, reason } => {
            super::reject(&client, id, reviewer, reason).await?;
            bunt::println!("Rejected submission {[bold]}", id.as_str());
        }
    }

    Ok(())
}

fn print_mosque(mosque: &crate::model::Mosque) {
    bunt::println!("{$bold}Mosque:{/$}      {}", mosque.id.as_str());
    bunt::println!("{$bold}Name:{/$}        {}", mosque.name);
    bunt::println!("{$bold}Address:{/$}     {}", mosque.address);
    bunt::println!("{$bold}Coordinates:{/$} {}, {}", mosque.latitude, mosque.longitude);
    bunt::println!("{$bold}Status:{/$}      {}", mosque.status);
    if let Some(created_by) = &mosque.created_by {
        bunt::println!("{$bold}Created by:{/$}  {}", created_by.as_str());
    }
    if let Some(image) = &mosque.image {
        bunt::println!("{$bold}Image:{/$}       {}", image);
    }
}

fn print_submission_list(submissions: &Page<Submission>) {
    for submission in &submissions.items {
        let name = submission.data.get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("<unnamed>");
        bunt::println!(
            " ▸ {[bold]}  {}  {}  {}",
            submission.id.as_str(),
            submission.status,
            submission.kind.as_str(),
            name,
        );
    }

    println!();
    bunt::println!(
        "{$dimmed}Page {}/{} ({} submissions in total){/$}",
        submissions.page,
        submissions.total_pages,
        submissions.total_items,
    );
}

fn print_submission(submission: &Submission) {
    bunt::println!("{$bold}ID:{/$}           {}", submission.id.as_str());
    bunt::println!("{$bold}Type:{/$}         {}", submission.kind.as_str());
    bunt::println!("{$bold}Status:{/$}       {}", submission.status);
    bunt::println!("{$bold}Submitted by:{/$} {}", submission.submitted_by.as_str());
    bunt::println!("{$bold}Created:{/$}      {}", submission.created);
    if let Some(mosque) = &submission.mosque {
        bunt::println!("{$bold}Mosque:{/$}       {}", mosque.as_str());
    }
    if let Some(image) = &submission.image {
        bunt::println!("{$bold}Image:{/$}        {}", image);
    }
    if let Some(reviewer) = &submission.reviewed_by {
        bunt::println!("{$bold}Reviewed by:{/$}  {}", reviewer.as_str());
    }
    if let Some(reviewed_at) = &submission.reviewed_at {
        bunt::println!("{$bold}Reviewed at:{/$}  {}", reviewed_at);
    }
    if let Some(reason) = &submission.rejection_reason {
        bunt::println!("{$bold}Reason:{/$}       {}", reason);
    }

    println!();
    bunt::println!("{$bold}Proposed data:{/$}");
    let data = serde_json::Value::Object(submission.data.clone());
    match serde_json::to_string_pretty(&data) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{data}"),
    }
}
