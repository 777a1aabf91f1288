use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("Unable to encode document: {0}")]
    Encode(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("Bulk request failed: {0}")]
    BulkRequest(String),

    #[error("Unable to decode bulk response: {0}")]
    BulkResponse(String),
}
