use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::types::{PageRequest, Platform, Record, ResourceType, ResultTable};

/// Retries after the first failed attempt for one page.
const MAX_RETRIES: u32 = 2;
/// Retry attempts run on a short leash.
const RETRY_TIMEOUT: Duration = Duration::from_secs(5);

/// API errors
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request timeout")]
    TimeoutError,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {status} - {message}")]
    HttpError { status: u16, message: String },

    #[error("Malformed response for page {page}: {reason}")]
    MalformedResponse { page: u32, reason: String },

    #[error("Fetching page {page} failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        page: u32,
        attempts: u32,
        last: String,
    },
}

/// One parsed page payload: the page-count header plus the record array
/// named after the resource type.
#[derive(Debug)]
pub struct PageEnvelope {
    pub total_pages: u32,
    pub records: Vec<Record>,
}

impl PageEnvelope {
    fn from_body(body: &Value, resource: ResourceType, page: u32) -> Result<Self> {
        // Some endpoints omit total_pages on single-page responses; others
        // report it as a numeric string.
        let total_pages = match body.get("total_pages") {
            None => 1,
            Some(v) => v
                .as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse().ok()))
                .ok_or_else(|| ApiError::MalformedResponse {
                    page,
                    reason: "`total_pages` is not an integer".to_string(),
                })? as u32,
        };

        let field = resource.field_name();
        let items = body
            .get(field)
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::MalformedResponse {
                page,
                reason: format!("missing `{field}` array"),
            })?;

        let records = items
            .iter()
            .map(|v| {
                v.as_object().cloned().ok_or_else(|| {
                    ApiError::MalformedResponse {
                        page,
                        reason: format!("`{field}` entry is not an object"),
                    }
                    .into()
                })
            })
            .collect::<Result<Vec<Record>>>()?;

        Ok(Self {
            total_pages,
            records,
        })
    }
}

/// Community market API client
pub struct ShowClient {
    client: Client,
    host: String,
    verbose: bool,
}

impl ShowClient {
    /// Create a new client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            host: config.host.clone(),
            verbose: config.verbose,
        })
    }

    /// Fetch one page, retrying bounded times on any failure. Exhausting the
    /// retry budget is a terminal error, never an empty page.
    pub async fn fetch_page(&self, request: &PageRequest<'_>) -> Result<PageEnvelope> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_fetch(request, attempt > 1).await {
                Ok(envelope) => return Ok(envelope),
                Err(err) => {
                    if attempt > MAX_RETRIES {
                        return Err(ApiError::RetriesExhausted {
                            page: request.page(),
                            attempts: attempt,
                            last: format!("{err:#}"),
                        }
                        .into());
                    }
                    eprintln!(
                        "~ Attempting to fetch page {} again (retries left: {})",
                        request.page(),
                        MAX_RETRIES + 1 - attempt
                    );
                }
            }
        }
    }

    async fn try_fetch(&self, request: &PageRequest<'_>, retry: bool) -> Result<PageEnvelope> {
        let url = format!("{}{}", self.host, request.resource().api_path());

        let mut params: Vec<(&str, String)> = Vec::new();
        if request.resource().is_card_collection() {
            params.push(("type", "mlb_card".to_string()));
        }
        if request.resource() == ResourceType::GameHistory {
            if let Some(username) = request.username() {
                params.push(("username", username.to_string()));
            }
            if let Some(platform) = request.platform() {
                params.push(("platform", platform.as_str().to_string()));
            }
            params.push(("mode", "arena".to_string()));
        }
        params.push(("page", request.page().to_string()));

        let mut builder = self.client.get(&url).query(&params);
        if retry {
            builder = builder.timeout(RETRY_TIMEOUT);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::TimeoutError
            } else {
                ApiError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse response body as JSON")?;

        PageEnvelope::from_body(&body, request.resource(), request.page())
    }

    /// Fetch every page of one resource type into a single table. Page 1 is
    /// fetched once to learn the page count and its records are kept, so N
    /// pages cost exactly N requests.
    pub async fn fetch_all(
        &self,
        resource: ResourceType,
        platform: Option<Platform>,
        username: Option<&str>,
    ) -> Result<ResultTable> {
        if resource == ResourceType::GameHistory && username.is_none() {
            bail!("Downloading game history requires a username (-u/--username)");
        }

        let first = self
            .fetch_page(&PageRequest::new(resource, 1, platform, username))
            .await?;
        let total_pages = first.total_pages.max(1);

        println!(
            "~ Downloading MLB The Show data ({} pages found, type: {})",
            total_pages, resource
        );

        let mut table = ResultTable::default();
        for record in first.records {
            table.insert(record)?;
        }

        for page in 2..=total_pages {
            let envelope = self
                .fetch_page(&PageRequest::new(resource, page, platform, username))
                .await?;
            for record in envelope.records {
                table.insert(record)?;
            }
            if self.verbose {
                eprintln!("~ Fetched page {page}/{total_pages} ({} records so far)", table.len());
            }
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TableError;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(host: &str) -> ShowClient {
        let config = Config {
            host: host.to_string(),
            ..Config::default()
        };
        ShowClient::new(&config).unwrap()
    }

    fn items_page(total_pages: u32, uuids: &[&str]) -> serde_json::Value {
        let items: Vec<_> = uuids
            .iter()
            .map(|u| json!({ "uuid": u, "name": format!("Card {u}") }))
            .collect();
        json!({ "total_pages": total_pages, "items": items })
    }

    #[tokio::test]
    async fn fetch_all_issues_one_request_per_page_and_merges_records() {
        let server = MockServer::start().await;

        for (page, uuids) in [(1, ["a1", "a2"]), (2, ["b1", "b2"]), (3, ["c1", "c2"])] {
            Mock::given(method("GET"))
                .and(path("/apis/items.json"))
                .and(query_param("type", "mlb_card"))
                .and(query_param("page", page.to_string()))
                .respond_with(ResponseTemplate::new(200).set_body_json(items_page(3, &uuids)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let client = test_client(&server.uri());
        let table = client
            .fetch_all(ResourceType::Items, None, None)
            .await
            .unwrap();

        let order: Vec<&str> = table
            .records()
            .iter()
            .map(|r| r.get("uuid").unwrap().as_str().unwrap())
            .collect();
        assert_eq!(order, vec!["a1", "a2", "b1", "b2", "c1", "c2"]);
    }

    #[tokio::test]
    async fn fetch_page_recovers_within_retry_budget() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/captains.json"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/apis/captains.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total_pages": 1, "captains": [{ "uuid": "k1" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = PageRequest::new(ResourceType::Captains, 1, None, None);
        let envelope = client.fetch_page(&request).await.unwrap();
        assert_eq!(envelope.total_pages, 1);
        assert_eq!(envelope.records.len(), 1);
    }

    #[tokio::test]
    async fn fetch_page_surfaces_terminal_error_after_exhausting_retries() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/items.json"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = PageRequest::new(ResourceType::Items, 1, None, None);
        let err = client.fetch_page(&request).await.unwrap_err();

        match err.downcast_ref::<ApiError>() {
            Some(ApiError::RetriesExhausted { page, attempts, .. }) => {
                assert_eq!(*page, 1);
                assert_eq!(*attempts, 3);
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn game_history_carries_username_platform_and_mode() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/apis/game_history.json"))
            .and(query_param("username", "slugger"))
            .and(query_param("platform", "psn"))
            .and(query_param("mode", "arena"))
            .and(query_param("page", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "total_pages": 1, "game_history": [{ "uuid": "g1" }] })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let table = client
            .fetch_all(ResourceType::GameHistory, Some(Platform::Psn), Some("slugger"))
            .await
            .unwrap();
        assert_eq!(table.len(), 1);
    }

    #[tokio::test]
    async fn game_history_without_username_is_rejected_before_any_request() {
        let server = MockServer::start().await;
        let client = test_client(&server.uri());

        let err = client
            .fetch_all(ResourceType::GameHistory, Some(Platform::Psn), None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("username"));
    }

    #[tokio::test]
    async fn duplicate_identifier_across_pages_aborts_the_download() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items_page(2, &["dup"])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(items_page(2, &["dup"])))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let err = client
            .fetch_all(ResourceType::Items, None, None)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TableError>(),
            Some(&TableError::DuplicateKey("dup".to_string()))
        );
    }

    #[tokio::test]
    async fn missing_payload_field_is_a_malformed_response() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "total_pages": 1 })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = PageRequest::new(ResourceType::Listings, 1, None, None);
        let err = client.fetch_page(&request).await.unwrap_err();
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::RetriesExhausted { last, .. }) => {
                assert!(last.contains("listings"), "unexpected error: {last}");
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn total_pages_as_numeric_string_is_accepted() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({ "total_pages": "1", "roster_updates": [{ "uuid": "r1" }] }),
            ))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let request = PageRequest::new(ResourceType::RosterUpdates, 1, None, None);
        let envelope = client.fetch_page(&request).await.unwrap();
        assert_eq!(envelope.total_pages, 1);
    }
}
