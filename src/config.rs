use std::time::Duration;

use crate::{item::elasticsearch::DEFAULT_FLUSH_THRESHOLD, BatchError};

pub const DEFAULT_MONGODB_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "test";
pub const DEFAULT_ELASTICSEARCH_URL: &str = "http://localhost:9200";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything a reindex run needs: where to read, where to write, and how
/// to batch.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    pub mongodb_uri: String,
    pub database: String,
    pub collection: String,
    pub elasticsearch_url: String,
    pub index: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    /// Buffer size in bytes that triggers a bulk request.
    pub flush_threshold: usize,
    /// Cursor batch size hint for the MongoDB server.
    pub batch_size: Option<u32>,
    /// Read and encode failures tolerated before the run fails; unlimited when `None`.
    pub skip_limit: Option<usize>,
    /// Bounds connection handshakes. Iteration and bulk requests are unbounded.
    pub connect_timeout: Duration,
    /// Log fragments instead of sending them.
    pub dry_run: bool,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            mongodb_uri: DEFAULT_MONGODB_URI.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            collection: String::new(),
            elasticsearch_url: DEFAULT_ELASTICSEARCH_URL.to_string(),
            index: String::new(),
            username: None,
            password: None,
            api_key: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            batch_size: None,
            skip_limit: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            dry_run: false,
        }
    }
}

impl ReindexConfig {
    pub fn new(collection: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            index: index.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), BatchError> {
        let invalid = |message: &str| Err(BatchError::Configuration(message.to_string()));

        if self.collection.is_empty() {
            return invalid("collection name is empty");
        }
        if self.database.is_empty() {
            return invalid("database name is empty");
        }
        if self.index.is_empty() {
            return invalid("index name is empty");
        }
        if self.index.chars().any(|c| c.is_ascii_uppercase()) {
            return invalid("index name must be lowercase");
        }
        if self.flush_threshold == 0 {
            return invalid("flush threshold must be greater than zero");
        }
        if self.batch_size == Some(0) {
            return invalid("batch size must be greater than zero");
        }
        if self.api_key.is_some() && self.username.is_some() {
            return invalid("use either an API key or a username, not both");
        }
        if self.password.is_some() && self.username.is_none() {
            return invalid("a password needs a username");
        }

        Ok(())
    }
}
