//! Exchange with the spreadsheet-backed store.

use crate::errors::SurveyError;
use crate::models::{Record, WriteAck};
use crate::record::records_from_response;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const GENERIC_REJECTION: &str = "Saving to the survey sheet failed.";

/// Remote persistence for survey records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn submit_record(&self, record: &Record) -> Result<(), SurveyError>;

    async fn fetch_all_records(&self) -> Result<Vec<Record>, SurveyError>;
}

/// How a record is encoded on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteEncoding {
    /// `application/x-www-form-urlencoded`, one `genre` pair per genre.
    #[default]
    Form,
    Json,
}

impl std::str::FromStr for WriteEncoding {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "form" => Ok(Self::Form),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown write encoding '{other}', expected 'form' or 'json'")),
        }
    }
}

/// Plain request/response client. Both directions hit the same endpoint:
/// POST writes a record, GET returns every row.
pub struct HttpRecordStore {
    client: Client,
    endpoint: String,
    encoding: WriteEncoding,
}

impl HttpRecordStore {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        encoding: WriteEncoding,
    ) -> Result<Self, SurveyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            encoding,
        })
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn submit_record(&self, record: &Record) -> Result<(), SurveyError> {
        let request = self.client.post(&self.endpoint);
        let request = match self.encoding {
            WriteEncoding::Form => request.form(&record.to_form_fields()),
            WriteEncoding::Json => request.json(&record.to_payload()),
        };

        debug!(encoding = ?self.encoding, "posting survey record");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurveyError::transport(format!(
                "remote store returned HTTP {status}"
            )));
        }

        let body: Value = response.json().await.map_err(|err| {
            SurveyError::transport(format!("unreadable write acknowledgment: {err}"))
        })?;
        acknowledge(WriteAck::from_value(&body))
    }

    async fn fetch_all_records(&self) -> Result<Vec<Record>, SurveyError> {
        let response = self.client.get(&self.endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SurveyError::transport(format!(
                "remote store returned HTTP {status}"
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| SurveyError::transport(format!("unreadable survey rows: {err}")))?;
        let records = records_from_response(&body)?;
        debug!(count = records.len(), "fetched survey records");
        Ok(records)
    }
}

fn acknowledge(ack: WriteAck) -> Result<(), SurveyError> {
    if ack.is_success() {
        return Ok(());
    }
    let message = ack
        .message
        .or(ack.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| GENERIC_REJECTION.to_string());
    Err(SurveyError::RemoteRejection(message))
}

/// Stand-in used when no endpoint is configured: reads come back empty so the
/// page still draws its charts, writes fail.
pub struct UnconfiguredStore;

#[async_trait]
impl RecordStore for UnconfiguredStore {
    async fn submit_record(&self, _record: &Record) -> Result<(), SurveyError> {
        Err(SurveyError::transport("no survey endpoint is configured"))
    }

    async fn fetch_all_records(&self) -> Result<Vec<Record>, SurveyError> {
        debug!("no survey endpoint, nothing to fetch");
        Ok(Vec::new())
    }
}
