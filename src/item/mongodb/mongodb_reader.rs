use std::cell::{Cell, RefCell};

use log::{debug, error};
use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
    sync::{Collection, Cursor},
};

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    BatchError,
};

/// Reads every document matching `filter` through a single forward cursor.
///
/// The cursor is opened on the first call to `read`; the driver fetches
/// further batches from the server transparently. Once the cursor fails to
/// advance, the reader reports the error a single time and then behaves as
/// exhausted.
pub struct MongodbItemReader<'a> {
    collection: &'a Collection<Document>,
    filter: Document,
    options: FindOptions,
    cursor: RefCell<Option<Cursor<Document>>>,
    exhausted: Cell<bool>,
}

impl MongodbItemReader<'_> {
    fn open_cursor(&self) -> Result<Cursor<Document>, BatchError> {
        debug!(
            "Opening cursor on {} with filter {}",
            self.collection.namespace(),
            self.filter
        );

        self.collection
            .find(self.filter.clone())
            .with_options(self.options.clone())
            .run()
            .map_err(|err| BatchError::ItemReader(format!("unable to open cursor: {err}")))
    }
}

impl ItemReader<Document> for MongodbItemReader<'_> {
    fn read(&self) -> ItemReaderResult<Document> {
        if self.exhausted.get() {
            return Ok(None);
        }

        let mut cursor = self.cursor.borrow_mut();

        if cursor.is_none() {
            match self.open_cursor() {
                Ok(opened) => *cursor = Some(opened),
                Err(err) => {
                    self.exhausted.set(true);
                    return Err(err);
                }
            }
        }

        let Some(cursor) = cursor.as_mut() else {
            return Ok(None);
        };

        match cursor.advance() {
            Ok(true) => cursor
                .deserialize_current()
                .map(Some)
                .map_err(|err| BatchError::ItemReader(format!("unable to decode document: {err}"))),
            Ok(false) => {
                debug!("Cursor on {} exhausted", self.collection.namespace());
                self.exhausted.set(true);
                Ok(None)
            }
            Err(err) => {
                error!("Cursor on {} failed: {}", self.collection.namespace(), err);
                self.exhausted.set(true);
                Err(BatchError::ItemReader(format!("cursor failed: {err}")))
            }
        }
    }
}

#[derive(Default)]
pub struct MongodbItemReaderBuilder<'a> {
    collection: Option<&'a Collection<Document>>,
    filter: Option<Document>,
    batch_size: Option<u32>,
}

impl<'a> MongodbItemReaderBuilder<'a> {
    pub fn new() -> Self {
        Self {
            collection: None,
            filter: None,
            batch_size: None,
        }
    }

    /// Sets the MongoDB collection to read from.
    pub fn collection(mut self, collection: &'a Collection<Document>) -> MongodbItemReaderBuilder<'a> {
        self.collection = Some(collection);
        self
    }

    /// Restricts the documents read. Every document is read when unset.
    pub fn filter(mut self, filter: Document) -> MongodbItemReaderBuilder<'a> {
        self.filter = Some(filter);
        self
    }

    /// Number of documents the server returns per cursor batch.
    pub fn batch_size(mut self, batch_size: u32) -> MongodbItemReaderBuilder<'a> {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn build(self) -> Result<MongodbItemReader<'a>, BatchError> {
        let collection = self.collection.ok_or_else(|| {
            BatchError::Configuration("MongodbItemReader needs a collection".to_string())
        })?;

        let options = FindOptions::builder().batch_size(self.batch_size).build();

        Ok(MongodbItemReader {
            collection,
            filter: self.filter.unwrap_or_else(|| doc! {}),
            options,
            cursor: RefCell::new(None),
            exhausted: Cell::new(false),
        })
    }
}
