//! Social platform client searching players' shared puzzle results.

use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::{config::SocialSettings, scoring::FAIL_SCORE};

use super::error::{ClientError, ClientResult};

const SERVICE: &str = "social";
const SEARCH_PAGE_SIZE: &str = "100";

static POST_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Wordle(\w+)? (?P<number>[\d,]+) (?P<score>[X\d])/6")
        .expect("post pattern is a valid regex")
});

/// A shared result found on the social platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialPost {
    /// Identifier of the post, stored as the score's social reference.
    pub post_id: String,
    /// Handle of the author.
    pub author: String,
    pub puzzle_number: i64,
    /// 1..=6, or 7 for a failed ("X") puzzle.
    pub raw_score: u8,
}

/// Extract `(puzzle_number, raw_score)` from the text of a post.
///
/// Thousands separators in the puzzle number are accepted ("Wordle 1,024 3/6").
pub fn parse_post(text: &str) -> Option<(i64, u8)> {
    let captures = POST_PATTERN.captures(text)?;
    let number = captures
        .name("number")?
        .as_str()
        .replace(',', "")
        .parse::<i64>()
        .ok()?;
    let score = match captures.name("score")?.as_str() {
        "X" | "x" => FAIL_SCORE,
        digit => digit.parse::<u8>().ok().filter(|value| (1..=6).contains(value))?,
    };
    Some((number, score))
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<PostData>,
    #[serde(default)]
    includes: Includes,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: String,
    text: String,
    #[serde(default)]
    author_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct UserLookupResponse {
    data: Option<UserData>,
}

/// Client over the platform's v2 search and user lookup endpoints.
#[derive(Clone)]
pub struct SocialClient {
    client: Client,
    settings: Arc<SocialSettings>,
}

impl SocialClient {
    pub fn new(settings: SocialSettings) -> ClientResult<Self> {
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

    /// Pause to respect between two per-user searches.
    pub fn request_delay(&self) -> Duration {
        self.settings.request_delay
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

    fn authorize(&self, builder: RequestBuilder) -> ClientResult<RequestBuilder> {
        let token = self
            .settings
            .bearer_token
            .as_deref()
            .ok_or(ClientError::MissingSetting {
                service: SERVICE,
                setting: "bearer token",
            })?;
        Ok(builder.bearer_auth(token))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> ClientResult<Option<T>> {
        let path = url.path().to_owned();
        let response = self
            .authorize(self.client.get(url))?
            .query(query)
            .send()
            .await
            .map_err(|source| ClientError::RequestSend {
                service: SERVICE,
                path: path.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response
                    .json::<T>()
                    .await
                    .map(Some)
                    .map_err(|source| ClientError::DecodeResponse {
                        service: SERVICE,
                        path,
                        source,
                    })
            }
            other => Err(ClientError::RequestStatus {
                service: SERVICE,
                path,
                status: other,
            }),
        }
    }

    /// Recent puzzle results posted by `username`.
    pub async fn user_posts(&self, username: &str) -> ClientResult<Vec<SocialPost>> {
        let url = self.url(&["tweets", "search", "recent"])?;
        let query = format!("from:{username} (wordle OR #WordleGolf)");
        debug!(user = %username, "searching social posts");

        let Some(response) = self
            .get_json::<SearchResponse>(
                url,
                &[
                    ("query", query.as_str()),
                    ("expansions", "author_id"),
                    ("max_results", SEARCH_PAGE_SIZE),
                ],
            )
            .await?
        else {
            return Ok(Vec::new());
        };

        Ok(collect_posts(response, username))
    }

    /// Platform identifier of `username`, or `None` when the handle is unknown.
    pub async fn lookup_user_id(&self, username: &str) -> ClientResult<Option<String>> {
        let url = self.url(&["users", "by", "username", username])?;
        let response = self.get_json::<UserLookupResponse>(url, &[]).await?;
        Ok(response.and_then(|body| body.data).map(|user| user.id))
    }
}

fn collect_posts(response: SearchResponse, fallback_author: &str) -> Vec<SocialPost> {
    let authors: HashMap<String, String> = response
        .includes
        .users
        .into_iter()
        .map(|user| (user.id, user.username))
        .collect();

    response
        .data
        .into_iter()
        .filter_map(|post| {
            let (puzzle_number, raw_score) = parse_post(&post.text)?;
            let author = post
                .author_id
                .and_then(|id| authors.get(&id).cloned())
                .unwrap_or_else(|| fallback_author.to_owned());
            Some(SocialPost {
                post_id: post.id,
                author,
                puzzle_number,
                raw_score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_shared_results() {
        assert_eq!(parse_post("Wordle 324 3/6\n\n⬛🟨⬛"), Some((324, 3)));
        assert_eq!(parse_post("wordle 1,024 X/6 #WordleGolf"), Some((1024, 7)));
        assert_eq!(parse_post("WordleBot 300 6/6"), Some((300, 6)));
    }

    #[test]
    fn ignores_unrelated_or_impossible_results() {
        assert_eq!(parse_post("Playing golf today"), None);
        assert_eq!(parse_post("Wordle 300 8/6"), None);
        assert_eq!(parse_post("Wordle 300 0/6"), None);
    }

    #[test]
    fn posts_are_attributed_through_includes() {
        let response: SearchResponse = serde_json::from_str(
            r#"{
                "data": [
                    {"id": "10", "text": "Wordle 330 4/6", "author_id": "u1"},
                    {"id": "11", "text": "no score here", "author_id": "u1"},
                    {"id": "12", "text": "Wordle 331 X/6"}
                ],
                "includes": {"users": [{"id": "u1", "username": "alice"}]}
            }"#,
        )
        .unwrap();

        let posts = collect_posts(response, "fallback");
        assert_eq!(
            posts,
            vec![
                SocialPost {
                    post_id: "10".into(),
                    author: "alice".into(),
                    puzzle_number: 330,
                    raw_score: 4,
                },
                SocialPost {
                    post_id: "12".into(),
                    author: "fallback".into(),
                    puzzle_number: 331,
                    raw_score: 7,
                },
            ]
        );
    }

    #[test]
    fn empty_searches_decode() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"meta": {"result_count": 0}}"#).unwrap();
        assert!(collect_posts(response, "alice").is_empty());
    }

    #[tokio::test]
    async fn searching_requires_a_token() {
        let client = SocialClient::new(SocialSettings::default()).unwrap();
        assert!(matches!(
            client.user_posts("alice").await,
            Err(ClientError::MissingSetting { .. })
        ));
    }
}
