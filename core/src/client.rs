use async_trait::async_trait;
use protocol::{DecodeError, ResultItem};

use crate::settings::Settings;

#[derive(thiserror::Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Network(String),
    #[error("search endpoint answered with status {0}")]
    Status(u16),
    #[error("malformed search response: {0}")]
    Malformed(#[from] DecodeError),
    #[error("invalid search endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => SearchError::Status(status.as_u16()),
            None => SearchError::Network(e.to_string()),
        }
    }
}

/// The remote service that turns a query into ranked results.
///
/// Callers never pass an empty or whitespace-only query. One call is one
/// attempt, there are no retries.
#[async_trait]
pub trait SearchClient: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<ResultItem>, SearchError>;
}

/// Searches with `GET <endpoint>?<query_param>=<query>`.
pub struct HttpSearchClient {
    http: reqwest::Client,
    endpoint: reqwest::Url,
    query_param: String,
    results_key: String,
}

impl HttpSearchClient {
    pub fn new(settings: &Settings) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(settings.request_timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SearchError::Network(format!("failed to build HTTP client: {e}")))?;
        Self::with_client(http, settings)
    }

    /// Like [`HttpSearchClient::new`] but with a preconfigured HTTP client.
    pub fn with_client(http: reqwest::Client, settings: &Settings) -> Result<Self, SearchError> {
        let endpoint = reqwest::Url::parse(&settings.endpoint).map_err(|e| {
            SearchError::InvalidEndpoint {
                endpoint: settings.endpoint.clone(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            http,
            endpoint,
            query_param: settings.query_param.clone(),
            results_key: settings.results_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl SearchClient for HttpSearchClient {
    async fn search(&self, query: &str) -> Result<Vec<ResultItem>, SearchError> {
        log::info!("API call for '{}'", query);
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[(self.query_param.as_str(), query)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let items = protocol::decode_results(&body, &self.results_key)?;
        log::debug!("Endpoint returned {} results for '{}'", items.len(), query);
        Ok(items)
    }
}
