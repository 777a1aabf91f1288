//! Elasticsearch side of a reindex: encoding documents into the bulk format,
//! accumulating them, and submitting size-bounded `_bulk` requests.
//!
//! A bulk payload is newline-delimited JSON where each document takes two
//! lines:
//!
//! ```text
//! {"index":{"_id":"65a1f0c2e4b0a1b2c3d4e5f6","_index":"books"}}
//! {"title":"Dune","year":1965}
//! ```

/// Action line + body line encoding of a MongoDB document.
pub mod fragment;

/// Blocking HTTP client for the `_bulk` endpoint.
pub mod client;

/// `_bulk` reply and per-item outcomes.
pub mod response;

/// Threshold-driven accumulation and submission of fragments.
pub mod bulk_writer;

pub use bulk_writer::{BulkItemWriter, BulkItemWriterBuilder, BulkStats, DEFAULT_FLUSH_THRESHOLD};
pub use client::{BulkClient, ElasticsearchClient, ElasticsearchClientBuilder};
pub use fragment::{BulkFragment, BulkFragmentProcessor};
pub use response::{BulkFailure, BulkItem, BulkItemStatus, BulkResponse};
