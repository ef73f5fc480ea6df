//! Case Notes API client

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::{ensure_success, trim_base_url, CaseNote, CaseNotesApi, NewCaseNote, UpstreamError};

/// reqwest-backed `CaseNotesApi`
#[derive(Debug, Clone)]
pub struct CaseNotesClient {
    http: Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct CaseNoteAmendment<'a> {
    text: &'a str,
}

impl CaseNotesClient {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: trim_base_url(base_url),
        }
    }
}

#[async_trait]
impl CaseNotesApi for CaseNotesClient {
    async fn post_case_note(
        &self,
        token: &str,
        offender_no: &str,
        case_note: &NewCaseNote,
    ) -> Result<CaseNote, UpstreamError> {
        debug!(
            offender_no,
            case_note_type = %case_note.case_note_type,
            sub_type = %case_note.sub_type,
            "Creating case note"
        );

        let response = self
            .http
            .post(format!("{}/case-notes/{}", self.base_url, offender_no))
            .bearer_auth(token)
            .json(case_note)
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn put_case_note_amendment(
        &self,
        token: &str,
        offender_no: &str,
        case_note_id: i64,
        text: &str,
    ) -> Result<(), UpstreamError> {
        debug!(offender_no, case_note_id, "Amending case note");

        let response = self
            .http
            .put(format!(
                "{}/case-notes/{}/{}",
                self.base_url, offender_no, case_note_id
            ))
            .bearer_auth(token)
            .json(&CaseNoteAmendment { text })
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), UpstreamError> {
        let response = self
            .http
            .get(format!("{}/health/ping", self.base_url))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
