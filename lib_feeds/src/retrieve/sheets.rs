//! # Spreadsheet Values Source
//!
//! `TableSource` is the seam between the ingestors and whatever serves the
//! raw tables. `SheetsSource` implements it over the spreadsheet values
//! endpoint: `GET {base}/spreadsheets/{id}/values/{range}`, which answers with
//! `{"values": [[...], ...]}` (the key is absent for an empty range).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::ky_http::{ApiClient, HttpError};
use crate::processors::ProcessorError;
use crate::tabular::RawTable;

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Where one source's table lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub spreadsheet_id: String,
    /// A1 notation, e.g. `Sheet1!A1:Z`.
    pub range: String,
}

impl SourceLocation {
    pub fn new(spreadsheet_id: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        }
    }
}

/// Why one source could not be refreshed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("source returned no data")]
    EmptySource,

    #[error("upstream request failed: {0}")]
    Upstream(#[from] HttpError),

    #[error("upstream answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("processing failed: {0}")]
    Processor(#[from] ProcessorError),
}

/// Anything that can hand over a raw table for a location.
#[async_trait]
pub trait TableSource: Send + Sync {
    async fn fetch_table(&self, location: &SourceLocation) -> Result<RawTable, FetchError>;
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `TableSource` backed by the spreadsheet values API.
#[derive(Clone)]
pub struct SheetsSource {
    client: ApiClient,
    api_key: Option<String>,
}

impl SheetsSource {
    /// # Arguments
    /// * `base_url` - API root, normally [`DEFAULT_SHEETS_BASE_URL`].
    /// * `api_key` - Sent as the `key` query parameter when present.
    /// * `bearer_token` - Sent as `Authorization: Bearer` when present.
    pub fn new(base_url: &str, api_key: Option<String>, bearer_token: Option<String>) -> Result<Self, HttpError> {
        Ok(Self {
            client: ApiClient::new(base_url, bearer_token)?,
            api_key,
        })
    }

    fn values_url(&self, location: &SourceLocation) -> Result<url::Url, HttpError> {
        let mut url = self.client.endpoint(&[
            "spreadsheets",
            &location.spreadsheet_id,
            "values",
            &location.range,
        ])?;
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("key", key);
        }
        Ok(url)
    }
}

#[async_trait]
impl TableSource for SheetsSource {
    async fn fetch_table(&self, location: &SourceLocation) -> Result<RawTable, FetchError> {
        let url = self.values_url(location)?;
        tracing::debug!(spreadsheet = %location.spreadsheet_id, range = %location.range, "Fetching sheet values");

        let response = self.client.get::<ValueRange>(url).await?;
        if !response.success {
            return Err(FetchError::Status {
                status: response.status,
                body: response.error_body.unwrap_or_default(),
            });
        }

        let table = RawTable::from_json_grid(response.data.unwrap_or_default().values);
        if table.is_empty() {
            return Err(FetchError::EmptySource);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_url_carries_range_and_key() {
        let source = SheetsSource::new("https://sheets.example.com/v4", Some("k3y".into()), None).unwrap();
        let url = source.values_url(&SourceLocation::new("sheet-1", "AllGames!A1:Z")).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.example.com/v4/spreadsheets/sheet-1/values/AllGames!A1:Z?key=k3y"
        );
    }

    #[test]
    fn values_url_without_key_has_no_query() {
        let source = SheetsSource::new("https://sheets.example.com/v4", None, Some("token".into())).unwrap();
        let url = source.values_url(&SourceLocation::new("id", "60!A1:Z")).unwrap();
        assert_eq!(url.query(), None);
    }

    #[test]
    fn missing_values_key_decodes_as_empty() {
        let range: ValueRange = serde_json::from_str(r#"{"range":"A1:Z","majorDimension":"ROWS"}"#).unwrap();
        assert!(range.values.is_empty());
    }

    #[test]
    fn source_location_uses_camel_case() {
        let loc: SourceLocation = serde_json::from_str(r#"{"spreadsheetId":"x","range":"A1:B"}"#).unwrap();
        assert_eq!(loc, SourceLocation::new("x", "A1:B"));
    }
}
