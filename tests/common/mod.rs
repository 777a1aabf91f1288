#![allow(dead_code)]

pub mod mocks;

use std::{
    cell::RefCell,
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use mongo_reindex::{
    core::item::{ItemReader, ItemReaderResult},
    item::elasticsearch::BulkResponse,
    BatchError,
};
use mongodb::bson::{Bson, Document};

/// Shared log of what happened, in order.
pub type Events = Arc<Mutex<Vec<String>>>;

/// Reader over an in-memory list of documents, recording each read.
pub struct DocumentReader {
    documents: RefCell<VecDeque<Result<Document, BatchError>>>,
    events: Events,
}

impl DocumentReader {
    pub fn new(documents: Vec<Document>) -> Self {
        Self::with_results(documents.into_iter().map(Ok).collect())
    }

    pub fn with_results(documents: Vec<Result<Document, BatchError>>) -> Self {
        Self {
            documents: RefCell::new(documents.into()),
            events: Events::default(),
        }
    }

    pub fn events(&self) -> Events {
        self.events.clone()
    }
}

impl ItemReader<Document> for DocumentReader {
    fn read(&self) -> ItemReaderResult<Document> {
        let next = self.documents.borrow_mut().pop_front();
        if let Some(Ok(document)) = &next {
            let id = match document.get("_id") {
                Some(Bson::String(id)) => id.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            self.events.lock().unwrap().push(format!("read {id}"));
        }
        next.transpose()
    }
}

pub fn bulk_response(json: &str) -> BulkResponse {
    serde_json::from_str(json).unwrap()
}

pub fn ok_response() -> BulkResponse {
    bulk_response(r#"{"took":1,"errors":false,"items":[]}"#)
}

/// Splits a bulk payload into its NDJSON lines.
pub fn payload_lines(payload: &[u8]) -> Vec<String> {
    String::from_utf8(payload.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
