use crate::error::BatchError;

/// Result of a single read: `Ok(None)` once the source is exhausted.
pub type ItemReaderResult<R> = Result<Option<R>, BatchError>;

/// Result of processing a single item.
pub type ItemProcessorResult<W> = Result<W, BatchError>;

/// Result of writing a chunk of items.
pub type ItemWriterResult = Result<(), BatchError>;

/// Retrieves the input of a step, one item at a time.
pub trait ItemReader<R> {
    /// Reads the next item.
    ///
    /// An `Err` reports a failure for the current item only; the step keeps
    /// calling `read` until it gets `Ok(None)` or its skip limit is reached.
    fn read(&self) -> ItemReaderResult<R>;
}

/// Transforms a read item into the item handed to the writer.
pub trait ItemProcessor<R, W> {
    fn process(&self, item: &R) -> ItemProcessorResult<W>;
}

/// Output of a step, receiving one chunk of items at a time.
pub trait ItemWriter<W> {
    fn write(&self, items: &[W]) -> ItemWriterResult;

    /// Pushes anything the writer still holds to its destination.
    ///
    /// Called once, after the reader is exhausted.
    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    /// Items accepted by `write` and not yet pushed to the destination.
    fn pending(&self) -> usize {
        0
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}
