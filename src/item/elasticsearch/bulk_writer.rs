use std::cell::{Cell, RefCell};

use log::{debug, error, info, warn};

use crate::{
    core::item::{ItemWriter, ItemWriterResult},
    BatchError,
};

use super::{client::BulkClient, fragment::BulkFragment};

/// Default flush threshold: 10 MB of NDJSON per request.
pub const DEFAULT_FLUSH_THRESHOLD: usize = 10_000_000;

/// Counters of a bulk writer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkStats {
    /// Bulk requests attempted.
    pub requests: usize,
    /// Documents sent in requests the destination answered.
    pub submitted: usize,
    /// Documents the destination answered with an item error.
    pub rejected: usize,
    /// Documents sent in requests that failed as a whole, or still buffered
    /// when the writer was closed.
    pub lost: usize,
}

/// Accumulates bulk fragments and submits them once the buffer holds at
/// least `flush_threshold` bytes.
///
/// The threshold is checked after each appended fragment, so a request can
/// exceed it by at most one fragment. The buffer is emptied whenever a
/// request is attempted, whether or not it succeeds.
pub struct BulkItemWriter<'a> {
    client: &'a dyn BulkClient,
    flush_threshold: usize,
    buffer: RefCell<Vec<u8>>,
    pending: Cell<usize>,
    stats: Cell<BulkStats>,
}

impl BulkItemWriter<'_> {
    pub fn stats(&self) -> BulkStats {
        self.stats.get()
    }

    /// Bytes waiting for the next request.
    pub fn buffered_len(&self) -> usize {
        self.buffer.borrow().len()
    }

    fn submit(&self) -> ItemWriterResult {
        let mut buffer = self.buffer.borrow_mut();
        let documents = self.pending.replace(0);
        let mut stats = self.stats.get();
        stats.requests += 1;

        debug!(
            "Submitting bulk request #{}: {} documents, {} bytes",
            stats.requests,
            documents,
            buffer.len()
        );

        let result = self.client.bulk(&buffer);
        buffer.clear();

        match result {
            Ok(response) => {
                stats.submitted += documents;

                if response.errors {
                    let failures = response.failures();
                    for failure in &failures {
                        warn!(
                            "Error indexing document ID {}: {}",
                            failure.id, failure.reason
                        );
                    }
                    stats.rejected += failures.len();
                    warn!(
                        "Bulk request #{}: {} of {} documents rejected",
                        stats.requests,
                        failures.len(),
                        documents
                    );
                } else {
                    info!(
                        "Bulk request #{}: {} documents indexed in {} ms",
                        stats.requests, documents, response.took
                    );
                }

                self.stats.set(stats);
                Ok(())
            }
            Err(err) => {
                stats.lost += documents;
                self.stats.set(stats);
                error!(
                    "Bulk request #{} carrying {} documents failed: {}",
                    stats.requests, documents, err
                );
                Err(err)
            }
        }
    }
}

impl ItemWriter<BulkFragment> for BulkItemWriter<'_> {
    fn write(&self, items: &[BulkFragment]) -> ItemWriterResult {
        for fragment in items {
            let len = {
                let mut buffer = self.buffer.borrow_mut();
                buffer.extend_from_slice(fragment.as_bytes());
                buffer.len()
            };
            self.pending.set(self.pending.get() + 1);

            if len >= self.flush_threshold {
                self.submit()?;
            }
        }
        Ok(())
    }

    fn flush(&self) -> ItemWriterResult {
        if self.buffer.borrow().is_empty() {
            return Ok(());
        }
        self.submit()
    }

    fn pending(&self) -> usize {
        self.pending.get()
    }

    /// Drops whatever the step left unsent, e.g. after it stopped on the
    /// skip limit, and counts it as lost.
    fn close(&self) -> ItemWriterResult {
        let documents = self.pending.replace(0);
        if documents > 0 {
            self.buffer.borrow_mut().clear();
            let mut stats = self.stats.get();
            stats.lost += documents;
            self.stats.set(stats);
            warn!("Closing with {} unsent documents, counted as lost", documents);
        }
        Ok(())
    }
}

pub struct BulkItemWriterBuilder<'a> {
    client: Option<&'a dyn BulkClient>,
    flush_threshold: usize,
}

impl Default for BulkItemWriterBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> BulkItemWriterBuilder<'a> {
    pub fn new() -> Self {
        Self {
            client: None,
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
        }
    }

    pub fn client(mut self, client: &'a dyn BulkClient) -> BulkItemWriterBuilder<'a> {
        self.client = Some(client);
        self
    }

    /// Buffer size in bytes that triggers a bulk request.
    pub fn flush_threshold(mut self, flush_threshold: usize) -> BulkItemWriterBuilder<'a> {
        self.flush_threshold = flush_threshold;
        self
    }

    pub fn build(self) -> Result<BulkItemWriter<'a>, BatchError> {
        let client = self.client.ok_or_else(|| {
            BatchError::Configuration("BulkItemWriter needs a client".to_string())
        })?;

        if self.flush_threshold == 0 {
            return Err(BatchError::Configuration(
                "flush threshold must be greater than zero".to_string(),
            ));
        }

        Ok(BulkItemWriter {
            client,
            flush_threshold: self.flush_threshold,
            buffer: RefCell::new(Vec::new()),
            pending: Cell::new(0),
            stats: Cell::new(BulkStats::default()),
        })
    }
}
