//! Google Sheets v4 client reading and writing the round score sheets.

use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SheetsSettings;

use super::error::{ClientError, ClientResult};

const SERVICE: &str = "sheets";

/// Raw content of a round sheet: the name column and the score block, row-aligned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetSnapshot {
    pub sheet_name: String,
    pub names: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetSnapshot {
    /// Non-blank player names in sheet order.
    pub fn players(&self) -> Vec<String> {
        self.names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Rows to write back, aligned on the sheet's name column.
    ///
    /// Blank names (and names missing from `rows`) produce an empty row, which leaves the
    /// sheet row untouched.
    pub fn aligned_rows(&self, rows: &IndexMap<String, Vec<String>>) -> Vec<Vec<String>> {
        self.names
            .iter()
            .map(|name| rows.get(name.trim()).cloned().unwrap_or_default())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    major_dimension: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Thin client over the `spreadsheets.values` endpoints.
#[derive(Clone)]
pub struct SheetsClient {
    client: Client,
    settings: Arc<SheetsSettings>,
}

impl SheetsClient {
    pub fn new(settings: SheetsSettings) -> ClientResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| ClientError::ClientBuilder {
                service: SERVICE,
                source,
            })?;
        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }

    /// Tab holding the scores of `round_number`.
    pub fn sheet_name(&self, round_number: u32) -> String {
        self.settings
            .sheet_name
            .clone()
            .unwrap_or_else(|| format!("Round {round_number}"))
    }

    /// Whether write-back is possible (an access token is configured).
    pub fn can_write(&self) -> bool {
        self.settings.access_token.is_some()
    }

    fn spreadsheet_id(&self) -> ClientResult<&str> {
        self.settings
            .spreadsheet_id
            .as_deref()
            .ok_or(ClientError::MissingSetting {
                service: SERVICE,
                setting: "spreadsheet id",
            })
    }

    fn url(&self, segments: &[&str]) -> ClientResult<Url> {
        let invalid = |reason: String| ClientError::InvalidUrl {
            service: SERVICE,
            url: self.settings.base_url.clone(),
            reason,
        };
        let mut url = Url::parse(&self.settings.base_url).map_err(|err| invalid(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid("cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match (&self.settings.access_token, &self.settings.api_key) {
            (Some(token), _) => builder.bearer_auth(token),
            (None, Some(key)) => builder.query(&[("key", key)]),
            (None, None) => builder,
        }
    }

    /// Read the name column and the score block of the round's sheet in one call.
    pub async fn fetch_round(&self, round_number: u32) -> ClientResult<SheetSnapshot> {
        let sheet_name = self.sheet_name(round_number);
        let name_range = format!("{sheet_name}!{}", self.settings.user_range);
        let score_range = format!("{sheet_name}!{}", self.settings.score_range);
        let url = self.url(&["spreadsheets", self.spreadsheet_id()?, "values:batchGet"])?;
        let path = url.path().to_owned();

        debug!(sheet = %sheet_name, "fetching sheet values");
        let response = self
            .authorize(self.client.get(url))
            .query(&[("ranges", &name_range), ("ranges", &score_range)])
            .send()
            .await
            .map_err(|source| ClientError::RequestSend {
                service: SERVICE,
                path: path.clone(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::RequestStatus {
                service: SERVICE,
                path,
                status: response.status(),
            });
        }

        let body = response
            .json::<BatchGetResponse>()
            .await
            .map_err(|source| ClientError::DecodeResponse {
                service: SERVICE,
                path,
                source,
            })?;

        let mut ranges = body.value_ranges.into_iter();
        let names = ranges
            .next()
            .unwrap_or_default()
            .values
            .into_iter()
            .map(|row| row.into_iter().next().unwrap_or_default())
            .collect();
        let rows = ranges.next().unwrap_or_default().values;

        Ok(SheetSnapshot {
            sheet_name,
            names,
            rows,
        })
    }

    /// Overwrite the score block with `rows`, aligned on `snapshot`'s name column.
    pub async fn write_round(
        &self,
        snapshot: &SheetSnapshot,
        rows: &IndexMap<String, Vec<String>>,
    ) -> ClientResult<()> {
        if !self.can_write() {
            return Err(ClientError::MissingSetting {
                service: SERVICE,
                setting: "access token",
            });
        }

        let range = format!("{}!{}", snapshot.sheet_name, self.settings.score_range);
        let url = self.url(&["spreadsheets", self.spreadsheet_id()?, "values", &range])?;
        let path = url.path().to_owned();
        let body = ValueRange {
            range: Some(range),
            major_dimension: Some("ROWS".into()),
            values: snapshot.aligned_rows(rows),
        };

        let response = self
            .authorize(self.client.put(url))
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&body)
            .send()
            .await
            .map_err(|source| ClientError::RequestSend {
                service: SERVICE,
                path: path.clone(),
                source,
            })?;

        if !response.status().is_success() {
            return Err(ClientError::RequestStatus {
                service: SERVICE,
                path,
                status: response.status(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(names: &[&str]) -> SheetSnapshot {
        SheetSnapshot {
            sheet_name: "Round 2".into(),
            names: names.iter().map(|name| name.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    #[test]
    fn sheet_name_defaults_to_round_number() {
        let client = SheetsClient::new(SheetsSettings::default()).unwrap();
        assert_eq!(client.sheet_name(3), "Round 3");

        let fixed = SheetsClient::new(SheetsSettings {
            sheet_name: Some("Finals".into()),
            ..SheetsSettings::default()
        })
        .unwrap();
        assert_eq!(fixed.sheet_name(3), "Finals");
        assert!(!fixed.can_write());
    }

    #[test]
    fn range_names_are_escaped_into_one_path_segment() {
        let client = SheetsClient::new(SheetsSettings::default()).unwrap();
        let url = client
            .url(&["spreadsheets", "abc", "values", "Round 1!C2:T1000"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc/values/Round%201!C2:T1000"
        );
    }

    #[test]
    fn players_skip_blank_names() {
        assert_eq!(snapshot(&["alice", " ", "bob "]).players(), vec!["alice", "bob"]);
    }

    #[test]
    fn write_back_rows_follow_the_name_column() {
        let rows: IndexMap<String, Vec<String>> = [
            ("bob".to_string(), vec!["4".to_string()]),
            ("alice".to_string(), vec!["3".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(
            snapshot(&["alice", "", "bob"]).aligned_rows(&rows),
            vec![vec!["3".to_string()], Vec::new(), vec!["4".to_string()]]
        );
    }

    #[tokio::test]
    async fn fetching_without_spreadsheet_id_is_a_configuration_error() {
        let client = SheetsClient::new(SheetsSettings::default()).unwrap();
        assert!(matches!(
            client.fetch_round(1).await,
            Err(ClientError::MissingSetting { .. })
        ));
    }
}
