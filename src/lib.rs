#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # mongo-reindex

 Copies every document of a MongoDB collection into an Elasticsearch (or
 OpenSearch) index through the `_bulk` API.

 Each document becomes a two-line bulk fragment: an action line carrying the
 index name and the document identifier (the hex form of its `ObjectId`),
 followed by the document body without `_id`. Fragments are accumulated in a
 byte buffer which is submitted as one bulk request as soon as it reaches the
 flush threshold, and once more when the collection is exhausted.

 ## Core Concepts

- **ItemReader:** returns the input of a step one item at a time
  ([`MongodbItemReader`](item::mongodb::MongodbItemReader)).
- **ItemProcessor:** turns a read item into the written item
  ([`BulkFragmentProcessor`](item::elasticsearch::BulkFragmentProcessor)).
- **ItemWriter:** receives chunks of processed items
  ([`BulkItemWriter`](item::elasticsearch::BulkItemWriter),
  [`LoggerWriter`](item::logger::LoggerWriter) for dry runs).
- **Step:** drives reader, processor and writer, counts successes and
  failures, and applies the skip limit.

 ## Failure handling

 | Failure                             | Effect                                   |
 |-------------------------------------|------------------------------------------|
 | MongoDB or Elasticsearch unreachable | the run aborts before reading            |
 | cursor failure                      | iteration ends, counted as a read error  |
 | document cannot be encoded          | document skipped, counted                |
 | skip limit exceeded                 | the step fails                           |
 | bulk request or reply unusable      | the step fails after that request        |
 | document rejected by the index      | logged with its id, counted, run goes on |

 ## Getting Started

```rust,no_run
use mongo_reindex::{config::ReindexConfig, reindex::reindex, BatchError};

fn main() -> Result<(), BatchError> {
    let config = ReindexConfig {
        mongodb_uri: "mongodb://localhost:27017".to_string(),
        database: "library".to_string(),
        ..ReindexConfig::new("books", "books")
    };

    let report = reindex(&config)?;
    report.log_summary();

    assert!(report.is_complete());
    Ok(())
}
```

 ## License
 Licensed under either of

 -   Apache License, Version 2.0
     ([LICENSE-APACHE](LICENSE-APACHE) or <http://www.apache.org/licenses/LICENSE-2.0>)
 -   MIT license
     ([LICENSE-MIT](LICENSE-MIT) or <http://opensource.org/licenses/MIT>)

 at your option.
 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers / writers (MongoDB reader, Elasticsearch bulk writer)
pub mod item;

/// Settings of a reindex run
pub mod config;

/// Bootstrap and execution of a reindex run
pub mod reindex;
