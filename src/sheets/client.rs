use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::rows::Row;
use super::token::TokenSource;
use crate::store::{StoreError, StoreResult};

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// One range/values pair of a batch update.
#[derive(Debug, Clone, Serialize)]
pub struct RangeUpdate {
    pub range: String,
    pub values: Vec<Row>,
}

/// Minimal client for the `spreadsheets.values` resource of the Sheets v4 API.
pub struct SheetsClient {
    http: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    tokens: TokenSource,
}

impl SheetsClient {
    pub fn new(api_base: &str, spreadsheet_id: impl Into<String>, tokens: TokenSource) -> StoreResult<Self> {
        let api_base = Url::parse(api_base)
            .map_err(|e| StoreError::ConfigMissing(format!("invalid SHEETS_API_BASE '{}': {}", api_base, e)))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_base,
            spreadsheet_id: spreadsheet_id.into(),
            tokens,
        })
    }

    /// `{base}/v4/spreadsheets/{id}/{tail...}`
    fn spreadsheet_url(&self, tail: &[&str]) -> StoreResult<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::ConfigMissing("SHEETS_API_BASE cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", self.spreadsheet_id.as_str()])
            .extend(tail);
        Ok(url)
    }

    fn values_url(&self, segment: &str) -> StoreResult<Url> {
        self.spreadsheet_url(&["values", segment])
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StoreResult<reqwest::Response> {
        let token = self.tokens.bearer(&self.http).await?;
        let response = request.bearer_auth(token).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(StoreError::Sheets(format!("Sheets API returned {}: {}", status, text)));
        }
        Ok(response)
    }

    /// Read a range. Missing trailing cells and rows come back shorter or absent.
    pub async fn get(&self, range: &str) -> StoreResult<Vec<Row>> {
        let url = self.values_url(range)?;
        debug!("Sheets GET {}", range);
        let body: ValueRange = self.send(self.http.get(url)).await?.json().await?;
        Ok(body
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Overwrite a range with raw (unparsed) values.
    pub async fn update(&self, range: &str, values: Vec<Row>) -> StoreResult<()> {
        let mut url = self.values_url(range)?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        debug!("Sheets PUT {}", range);
        self.send(self.http.put(url).json(&json!({ "range": range, "values": values })))
            .await?;
        Ok(())
    }

    /// Append rows after the last non-empty row of the range's table.
    pub async fn append(&self, range: &str, values: Vec<Row>) -> StoreResult<()> {
        let mut url = self.values_url(&format!("{}:append", range))?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        debug!("Sheets APPEND {}", range);
        self.send(self.http.post(url).json(&json!({ "values": values })))
            .await?;
        Ok(())
    }

    pub async fn batch_update(&self, updates: Vec<RangeUpdate>) -> StoreResult<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let url = self.spreadsheet_url(&["values:batchUpdate"])?;
        debug!("Sheets BATCH UPDATE {} range(s)", updates.len());
        self.send(self.http.post(url).json(&json!({
            "valueInputOption": "RAW",
            "data": updates,
        })))
        .await?;
        Ok(())
    }

    pub async fn clear(&self, range: &str) -> StoreResult<()> {
        let url = self.values_url(&format!("{}:clear", range))?;
        debug!("Sheets CLEAR {}", range);
        self.send(self.http.post(url).json(&json!({}))).await?;
        Ok(())
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
