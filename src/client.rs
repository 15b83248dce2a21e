use reqwest::multipart::{Form, Part};
use tracing::{debug, info, warn};

use crate::config::SolverSettings;
use crate::error::{Result, SchedulaError};
use crate::schedule::{AssignmentRecord, SolverResponse};
use crate::session::Submission;

/// Talks to the remote scheduling service.
///
/// One request per call, no retries. The service receives the two input
/// files as multipart fields `file1` and `file2` and answers with
/// `{"schedule": [{room, time, course}, ...]}`.
#[derive(Debug, Clone)]
pub struct SolverClient {
    http: reqwest::Client,
    url: String,
}

impl SolverClient {
    pub fn new(settings: &SolverSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            http: builder.build()?,
            url: settings.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn form(submission: &Submission) -> Form {
        submission.parts().fold(Form::new(), |form, (slot, file)| {
            form.part(
                slot.field_name(),
                Part::bytes(file.bytes.clone()).file_name(file.name.clone()),
            )
        })
    }

    /// Sends both files and returns the assignment list.
    ///
    /// `Ok(None)` means the service answered 2xx without a `schedule` field.
    pub async fn submit(&self, submission: &Submission) -> Result<Option<Vec<AssignmentRecord>>> {
        info!(url = %self.url, "Submitting files to solver");

        let response = self
            .http
            .post(&self.url)
            .multipart(Self::form(submission))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Solver rejected submission");
            return Err(SchedulaError::SolverStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        debug!(bytes = body.len(), "Solver response received");
        let parsed: SolverResponse = serde_json::from_slice(&body)?;
        Ok(parsed.schedule)
    }
}
