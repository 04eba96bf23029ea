//! Google Sheets API v4 worksheet.
//!
//! The spreadsheet is located by name through the Drive API; the first tab is
//! the one synchronised. Values are written with `valueInputOption=RAW` so
//! timestamps come back exactly as they were written.

use super::auth::{ServiceAccountAuth, ServiceAccountKey};
use super::worksheet::{row_range, SheetsError, Worksheet};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// Map a non-success response to a [`SheetsError`].
async fn check(response: Response) -> Result<Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs);
    let body = response.text().await.unwrap_or_default();

    Err(classify(status.as_u16(), retry_after, body))
}

fn classify(status: u16, retry_after: Option<Duration>, body: String) -> SheetsError {
    match status {
        429 => SheetsError::RateLimited { retry_after },
        // Quota errors can also arrive as 403
        403 if body.contains("rateLimitExceeded") || body.contains("RATE_LIMIT_EXCEEDED") => {
            SheetsError::RateLimited { retry_after }
        }
        401 | 403 => SheetsError::Unauthorized(body),
        404 => SheetsError::NotFound(body),
        _ => SheetsError::Api {
            status,
            message: body,
        },
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The first tab of a spreadsheet, reached through the Sheets REST API.
pub struct GoogleWorksheet {
    http: Client,
    auth: ServiceAccountAuth,
    spreadsheet_id: String,
    sheet_id: i64,
    title: String,
}

impl GoogleWorksheet {
    /// Sign in with the service account key at `credential_path` and open the
    /// spreadsheet called `sheet_name`.
    pub async fn open(credential_path: &Path, sheet_name: &str) -> Result<Self, SheetsError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;
        let key = ServiceAccountKey::from_file(credential_path)?;
        let auth = ServiceAccountAuth::new(key, http.clone())?;

        let token = auth.access_token().await?;
        let query = format!(
            "name = '{}' and mimeType = 'application/vnd.google-apps.spreadsheet' and trashed = false",
            sheet_name.replace('\'', "\\'")
        );
        let files: DriveFileList = check(
            http.get(DRIVE_FILES_API)
                .bearer_auth(&token)
                .query(&[("q", query.as_str()), ("fields", "files(id,name)")])
                .send()
                .await
                .map_err(|e| SheetsError::Transport(e.to_string()))?,
        )
        .await?
        .json()
        .await
        .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let spreadsheet_id = files
            .files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::NotFound(format!("No spreadsheet named '{}'", sheet_name)))?;

        let meta: SpreadsheetMeta = check(
            http.get(format!("{}/{}", SHEETS_API, spreadsheet_id))
                .bearer_auth(&token)
                .query(&[("fields", "sheets.properties(sheetId,title,index)")])
                .send()
                .await
                .map_err(|e| SheetsError::Transport(e.to_string()))?,
        )
        .await?
        .json()
        .await
        .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let first = meta
            .sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .ok_or_else(|| {
                SheetsError::NotFound(format!("Spreadsheet '{}' has no worksheets", sheet_name))
            })?;

        info!(
            "Opened spreadsheet '{}' ({}), worksheet '{}'",
            sheet_name, spreadsheet_id, first.title
        );

        Ok(Self {
            http,
            auth,
            spreadsheet_id,
            sheet_id: first.sheet_id,
            title: first.title,
        })
    }

    /// Sheet-qualified, percent-encoded A1 range for use in a URL path.
    fn encoded_range(&self, range: &str) -> String {
        let qualified = format!("'{}'!{}", self.title.replace('\'', "''"), range);
        urlencoding::encode(&qualified).into_owned()
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;
        check(response).await
    }

    async fn write_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError> {
        let range = row_range(row_number, values.len());
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API,
            self.spreadsheet_id,
            self.encoded_range(&range)
        );
        debug!("Writing range {}", range);
        self.send(
            self.http
                .put(url)
                .query(&[("valueInputOption", "RAW")])
                .json(&json!({ "majorDimension": "ROWS", "values": [values] })),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Worksheet for GoogleWorksheet {
    async fn read_all(&self) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API,
            self.spreadsheet_id,
            urlencoding::encode(&format!("'{}'", self.title.replace('\'', "''")))
        );
        let range: ValueRange = self
            .send(self.http.get(url).query(&[("majorDimension", "ROWS")]))
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        Ok(range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    async fn insert_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError> {
        let start = row_number.saturating_sub(1);
        let url = format!("{}/{}:batchUpdate", SHEETS_API, self.spreadsheet_id);
        let body = json!({
            "requests": [{
                "insertDimension": {
                    "range": {
                        "sheetId": self.sheet_id,
                        "dimension": "ROWS",
                        "startIndex": start,
                        "endIndex": start + 1
                    },
                    "inheritFromBefore": false
                }
            }]
        });
        self.send(self.http.post(url).json(&body)).await?;
        self.write_row(row_number, values).await
    }

    async fn append_row(&self, values: &[String]) -> Result<(), SheetsError> {
        let url = format!(
            "{}/{}/values/{}:append",
            SHEETS_API,
            self.spreadsheet_id,
            self.encoded_range("A1")
        );
        self.send(
            self.http
                .post(url)
                .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
                .json(&json!({ "majorDimension": "ROWS", "values": [values] })),
        )
        .await?;
        Ok(())
    }

    async fn update_row(&self, row_number: usize, values: &[String]) -> Result<(), SheetsError> {
        self.write_row(row_number, values).await
    }
}
