//! Mock version of the Elasticsearch bulk client.
use mockall::mock;

use mongo_reindex::{
    item::elasticsearch::{BulkClient, BulkResponse},
    BatchError,
};

mock! {
    pub Client {}
    impl BulkClient for Client {
        fn info(&self) -> Result<(), BatchError>;
        fn bulk(&self, payload: &[u8]) -> Result<BulkResponse, BatchError>;
    }
}
