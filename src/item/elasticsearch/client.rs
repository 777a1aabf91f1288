use std::time::Duration;

use log::{debug, info};
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use serde::Deserialize;

use crate::BatchError;

use super::response::BulkResponse;

/// Destination of bulk requests.
#[cfg_attr(test, mockall::automock)]
pub trait BulkClient {
    /// Checks that the destination answers.
    fn info(&self) -> Result<(), BatchError>;

    /// Sends an NDJSON bulk payload and decodes the reply.
    fn bulk(&self, payload: &[u8]) -> Result<BulkResponse, BatchError>;
}

#[derive(Debug, Clone)]
enum Credentials {
    Anonymous,
    Basic {
        username: String,
        password: Option<String>,
    },
    ApiKey(String),
}

/// Blocking HTTP client for an Elasticsearch or OpenSearch cluster.
pub struct ElasticsearchClient {
    http: Client,
    url: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
struct ClusterInfo {
    #[serde(default)]
    cluster_name: Option<String>,
    #[serde(default)]
    version: Option<ClusterVersion>,
}

#[derive(Debug, Deserialize)]
struct ClusterVersion {
    number: String,
}

impl ElasticsearchClient {
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), path)
    }

    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::Anonymous => request,
            Credentials::Basic { username, password } => {
                request.basic_auth(username, password.as_ref())
            }
            Credentials::ApiKey(key) => request.header(AUTHORIZATION, format!("ApiKey {key}")),
        }
    }

    /// Returns the body of a successful response, or the status and body as an error.
    fn read_body(response: Response) -> Result<Vec<u8>, String> {
        let status = response.status();
        let body = response
            .bytes()
            .map_err(|err| format!("unable to read response body: {err}"))?;

        if !status.is_success() {
            return Err(format!(
                "status {status}: {}",
                String::from_utf8_lossy(&body)
            ));
        }

        Ok(body.to_vec())
    }
}

impl BulkClient for ElasticsearchClient {
    fn info(&self) -> Result<(), BatchError> {
        let response = self
            .authenticate(self.http.get(self.endpoint("")))
            .send()
            .map_err(|err| BatchError::Connection(format!("{}: {err}", self.url)))?;

        let body = Self::read_body(response)
            .map_err(|err| BatchError::Connection(format!("{}: {err}", self.url)))?;

        match serde_json::from_slice::<ClusterInfo>(&body) {
            Ok(ClusterInfo {
                cluster_name,
                version,
            }) => info!(
                "Connected to Elasticsearch cluster {} (version {})",
                cluster_name.as_deref().unwrap_or("unknown"),
                version.map(|v| v.number).as_deref().unwrap_or("unknown")
            ),
            Err(err) => info!("Connected to Elasticsearch at {} ({err})", self.url),
        }

        Ok(())
    }

    fn bulk(&self, payload: &[u8]) -> Result<BulkResponse, BatchError> {
        debug!("POST {} ({} bytes)", self.endpoint("_bulk"), payload.len());

        let response = self
            .authenticate(self.http.post(self.endpoint("_bulk")))
            .header(CONTENT_TYPE, "application/x-ndjson")
            .body(payload.to_vec())
            .send()
            .map_err(|err| BatchError::BulkRequest(err.to_string()))?;

        let body = Self::read_body(response).map_err(BatchError::BulkRequest)?;

        serde_json::from_slice(&body).map_err(|err| BatchError::BulkResponse(err.to_string()))
    }
}

#[derive(Default)]
pub struct ElasticsearchClientBuilder {
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    api_key: Option<String>,
    connect_timeout: Option<Duration>,
}

impl ElasticsearchClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base URL of the cluster, for example `http://localhost:9200`.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }

    pub fn api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    /// Bounds the TCP handshake only; requests themselves never time out.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ElasticsearchClient, BatchError> {
        let url = self.url.ok_or_else(|| {
            BatchError::Configuration("ElasticsearchClient needs a url".to_string())
        })?;

        let credentials = match (self.api_key, self.username) {
            (Some(_), Some(_)) => {
                return Err(BatchError::Configuration(
                    "use either an API key or a username, not both".to_string(),
                ));
            }
            (Some(key), None) => Credentials::ApiKey(key),
            (None, Some(username)) => Credentials::Basic {
                username,
                password: self.password,
            },
            (None, None) => Credentials::Anonymous,
        };

        let mut builder = Client::builder().timeout(None::<Duration>);
        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|err| BatchError::Connection(format!("unable to build HTTP client: {err}")))?;

        Ok(ElasticsearchClient {
            http,
            url,
            credentials,
        })
    }
}
