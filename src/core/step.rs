use std::{
    cell::Cell,
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use uuid::Uuid;

use crate::BatchError;

use super::{
    build_name,
    item::{ItemProcessor, ItemReader, ItemWriter},
};

#[derive(Debug, PartialEq)]
enum ChunkStatus {
    Error,
    Finished,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Every item was read and handed to the writer, and the writer drained.
    Success,
    /// The skip limit was exceeded or the writer failed.
    Error,
}

/// Timings and counters of one step run.
#[derive(Debug)]
pub struct StepExecution {
    pub id: Uuid,
    pub name: String,
    pub status: StepStatus,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
    /// Items returned by the reader.
    pub read_count: usize,
    /// Reader failures (cursor or decode).
    pub read_error_count: usize,
    /// Items the processor rejected.
    pub process_error_count: usize,
    /// Items accepted by the writer.
    pub write_count: usize,
    /// Items handed to a failing `write` call or pending in a failing drain.
    pub write_error_count: usize,
}

pub trait Step {
    fn execute(&self) -> StepExecution;

    fn get_name(&self) -> &str;
}

/// A step that reads items one by one, processes them, and hands them to
/// the writer in chunks of `chunk_size`.
///
/// Read and process failures are skipped until their total exceeds
/// `skip_limit`. Writer failures end the step.
pub struct ChunkOrientedStep<'a, R, W> {
    id: Uuid,
    name: String,
    reader: &'a dyn ItemReader<R>,
    processor: &'a dyn ItemProcessor<R, W>,
    writer: &'a dyn ItemWriter<W>,
    chunk_size: usize,
    skip_limit: usize,
    read_count: Cell<usize>,
    read_error_count: Cell<usize>,
    process_error_count: Cell<usize>,
    write_count: Cell<usize>,
    write_error_count: Cell<usize>,
}

impl<R, W> Step for ChunkOrientedStep<'_, R, W> {
    fn execute(&self) -> StepExecution {
        let start = Instant::now();

        info!("Start of step: {}, id: {}", self.name, self.id);

        let mut status = match self.writer.open() {
            Ok(()) => self.run_chunks(),
            Err(err) => {
                error!("Unable to open writer: {}", err);
                StepStatus::Error
            }
        };

        if status == StepStatus::Success {
            let pending = self.writer.pending();
            debug!("Draining writer ({} pending items)", pending);
            if let Err(err) = self.writer.flush() {
                error!("ItemWriter error during drain: {}", err);
                self.write_error_count
                    .set(self.write_error_count.get() + pending);
                status = StepStatus::Error;
            }
        }

        if let Err(err) = self.writer.close() {
            error!("Unable to close writer: {}", err);
            status = StepStatus::Error;
        }

        info!(
            "End of step: {}, id: {}, status: {:?}",
            self.name, self.id, status
        );

        StepExecution {
            id: self.id,
            name: self.name.clone(),
            status,
            start,
            end: Instant::now(),
            duration: start.elapsed(),
            read_count: self.read_count.get(),
            read_error_count: self.read_error_count.get(),
            process_error_count: self.process_error_count.get(),
            write_count: self.write_count.get(),
            write_error_count: self.write_error_count.get(),
        }
    }

    fn get_name(&self) -> &str {
        &self.name
    }
}

impl<R, W> ChunkOrientedStep<'_, R, W> {
    fn run_chunks(&self) -> StepStatus {
        let mut read_items: Vec<R> = Vec::with_capacity(self.chunk_size);

        loop {
            let read_chunk_status = self.read_chunk(&mut read_items);

            if read_chunk_status == ChunkStatus::Error {
                return StepStatus::Error;
            }

            let processed_items = match self.process_chunk(&read_items) {
                Some(items) => items,
                None => return StepStatus::Error,
            };

            if !processed_items.is_empty()
                && self.write_chunk(&processed_items) == ChunkStatus::Error
            {
                return StepStatus::Error;
            }

            if read_chunk_status == ChunkStatus::Finished {
                return StepStatus::Success;
            }
        }
    }

    fn is_skip_limit_reached(&self) -> bool {
        self.read_error_count.get() + self.process_error_count.get() > self.skip_limit
    }

    fn read_chunk(&self, read_items: &mut Vec<R>) -> ChunkStatus {
        debug!("Start reading chunk");
        read_items.clear();

        loop {
            match self.reader.read() {
                Ok(Some(item)) => {
                    read_items.push(item);
                    self.read_count.set(self.read_count.get() + 1);
                }
                Ok(None) => {
                    debug!("End reading chunk: FINISHED");
                    return ChunkStatus::Finished;
                }
                Err(err) => {
                    self.read_error_count.set(self.read_error_count.get() + 1);
                    warn!("Error occurred during read item: {}", err);

                    if self.is_skip_limit_reached() {
                        error!("Skip limit ({}) exceeded while reading", self.skip_limit);
                        return ChunkStatus::Error;
                    }
                }
            }

            if read_items.len() == self.chunk_size {
                debug!("End reading chunk: FULL");
                return ChunkStatus::Full;
            }
        }
    }

    /// Returns `None` when the skip limit is exceeded.
    fn process_chunk(&self, read_items: &[R]) -> Option<Vec<W>> {
        let mut processed_items = Vec::with_capacity(read_items.len());

        for item in read_items {
            match self.processor.process(item) {
                Ok(processed) => processed_items.push(processed),
                Err(err) => {
                    self.process_error_count
                        .set(self.process_error_count.get() + 1);
                    warn!("Skipping item: {}", err);

                    if self.is_skip_limit_reached() {
                        error!("Skip limit ({}) exceeded while processing", self.skip_limit);
                        return None;
                    }
                }
            }
        }

        Some(processed_items)
    }

    fn write_chunk(&self, processed_items: &[W]) -> ChunkStatus {
        debug!("Start writing chunk of {} items", processed_items.len());

        match self.writer.write(processed_items) {
            Ok(()) => {
                self.write_count
                    .set(self.write_count.get() + processed_items.len());
                ChunkStatus::Full
            }
            Err(err) => {
                self.write_error_count
                    .set(self.write_error_count.get() + processed_items.len());
                error!("ItemWriter error: {}", err);
                ChunkStatus::Error
            }
        }
    }
}

pub struct StepBuilder<'a, R, W> {
    name: Option<String>,
    reader: Option<&'a dyn ItemReader<R>>,
    processor: Option<&'a dyn ItemProcessor<R, W>>,
    writer: Option<&'a dyn ItemWriter<W>>,
    chunk_size: usize,
    skip_limit: usize,
}

impl<R, W> Default for StepBuilder<'_, R, W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, R, W> StepBuilder<'a, R, W> {
    pub fn new() -> StepBuilder<'a, R, W> {
        Self {
            name: None,
            reader: None,
            processor: None,
            writer: None,
            chunk_size: 1,
            skip_limit: 0,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> StepBuilder<'a, R, W> {
        self.name = Some(name.into());
        self
    }

    pub fn reader(mut self, reader: &'a impl ItemReader<R>) -> StepBuilder<'a, R, W> {
        self.reader = Some(reader);
        self
    }

    pub fn processor(mut self, processor: &'a impl ItemProcessor<R, W>) -> StepBuilder<'a, R, W> {
        self.processor = Some(processor);
        self
    }

    pub fn writer(mut self, writer: &'a impl ItemWriter<W>) -> StepBuilder<'a, R, W> {
        self.writer = Some(writer);
        self
    }

    /// Number of items read and processed before they are handed to the writer.
    pub fn chunk(mut self, chunk_size: usize) -> StepBuilder<'a, R, W> {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Number of read or process failures tolerated before the step fails.
    pub fn skip_limit(mut self, skip_limit: usize) -> StepBuilder<'a, R, W> {
        self.skip_limit = skip_limit;
        self
    }

    pub fn build(self) -> Result<ChunkOrientedStep<'a, R, W>, BatchError> {
        let (Some(reader), Some(processor), Some(writer)) =
            (self.reader, self.processor, self.writer)
        else {
            return Err(BatchError::Configuration(
                "a step needs a reader, a processor and a writer".to_string(),
            ));
        };

        Ok(ChunkOrientedStep {
            id: Uuid::new_v4(),
            name: self.name.unwrap_or_else(build_name),
            reader,
            processor,
            writer,
            chunk_size: self.chunk_size,
            skip_limit: self.skip_limit,
            read_count: Cell::new(0),
            read_error_count: Cell::new(0),
            process_error_count: Cell::new(0),
            write_count: Cell::new(0),
            write_error_count: Cell::new(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::VecDeque};

    use super::*;
    use crate::core::item::{ItemProcessorResult, ItemReaderResult, ItemWriterResult};

    struct VecReader {
        items: RefCell<VecDeque<Result<i32, BatchError>>>,
    }

    impl VecReader {
        fn new(items: Vec<Result<i32, BatchError>>) -> Self {
            Self {
                items: RefCell::new(items.into()),
            }
        }
    }

    impl ItemReader<i32> for VecReader {
        fn read(&self) -> ItemReaderResult<i32> {
            self.items.borrow_mut().pop_front().transpose()
        }
    }

    /// Rejects negative numbers.
    struct PositiveProcessor;

    impl ItemProcessor<i32, String> for PositiveProcessor {
        fn process(&self, item: &i32) -> ItemProcessorResult<String> {
            if *item < 0 {
                return Err(BatchError::Encode(format!("negative: {item}")));
            }
            Ok(item.to_string())
        }
    }

    #[derive(Default)]
    struct RecordingWriter {
        chunks: RefCell<Vec<Vec<String>>>,
        flushes: Cell<usize>,
        held: Cell<usize>,
        fail_write: bool,
        fail_flush: bool,
    }

    impl ItemWriter<String> for RecordingWriter {
        fn write(&self, items: &[String]) -> ItemWriterResult {
            if self.fail_write {
                return Err(BatchError::ItemWriter("boom".to_string()));
            }
            self.chunks.borrow_mut().push(items.to_vec());
            self.held.set(self.held.get() + items.len());
            Ok(())
        }

        fn flush(&self) -> ItemWriterResult {
            self.flushes.set(self.flushes.get() + 1);
            if self.fail_flush {
                return Err(BatchError::BulkRequest("unreachable".to_string()));
            }
            self.held.set(0);
            Ok(())
        }

        fn pending(&self) -> usize {
            self.held.get()
        }
    }

    #[test]
    fn writes_every_item_in_chunks_and_drains_once() -> Result<(), BatchError> {
        let reader = VecReader::new((1..=5).map(Ok).collect());
        let writer = RecordingWriter::default();

        let step = StepBuilder::new()
            .name("numbers")
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .chunk(2)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.name, "numbers");
        assert_eq!(execution.read_count, 5);
        assert_eq!(execution.write_count, 5);
        assert_eq!(
            *writer.chunks.borrow(),
            vec![
                vec!["1".to_string(), "2".to_string()],
                vec!["3".to_string(), "4".to_string()],
                vec!["5".to_string()],
            ]
        );
        assert_eq!(writer.flushes.get(), 1);
        assert!(execution.start <= execution.end);
        Ok(())
    }

    #[test]
    fn empty_reader_never_writes() -> Result<(), BatchError> {
        let reader = VecReader::new(vec![]);
        let writer = RecordingWriter::default();

        let step = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Success);
        assert!(writer.chunks.borrow().is_empty());
        assert_eq!(step.get_name().len(), 8);
        Ok(())
    }

    #[test]
    fn skips_failures_within_limit() -> Result<(), BatchError> {
        let reader = VecReader::new(vec![
            Ok(1),
            Err(BatchError::ItemReader("bad document".to_string())),
            Ok(-2),
            Ok(3),
        ]);
        let writer = RecordingWriter::default();

        let step = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .skip_limit(2)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Success);
        assert_eq!(execution.read_count, 3);
        assert_eq!(execution.read_error_count, 1);
        assert_eq!(execution.process_error_count, 1);
        assert_eq!(execution.write_count, 2);
        Ok(())
    }

    #[test]
    fn fails_when_skip_limit_exceeded() -> Result<(), BatchError> {
        let reader = VecReader::new(vec![Ok(-1), Ok(2)]);
        let writer = RecordingWriter::default();

        let step = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Error);
        assert_eq!(execution.process_error_count, 1);
        assert_eq!(writer.flushes.get(), 0);
        Ok(())
    }

    #[test]
    fn writer_failure_ends_step() -> Result<(), BatchError> {
        let reader = VecReader::new((1..=4).map(Ok).collect());
        let writer = RecordingWriter {
            fail_write: true,
            ..Default::default()
        };

        let step = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .skip_limit(usize::MAX)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Error);
        assert_eq!(execution.read_count, 1);
        assert_eq!(execution.write_error_count, 1);
        Ok(())
    }

    #[test]
    fn drain_failure_counts_every_pending_item() -> Result<(), BatchError> {
        let reader = VecReader::new(vec![Ok(1), Ok(2), Ok(3)]);
        let writer = RecordingWriter {
            fail_flush: true,
            ..Default::default()
        };

        let step = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .writer(&writer)
            .build()?;

        let execution = step.execute();

        assert_eq!(execution.status, StepStatus::Error);
        assert_eq!(execution.write_count, 3);
        assert_eq!(execution.write_error_count, 3);
        Ok(())
    }

    #[test]
    fn build_without_writer_is_rejected() {
        let reader = VecReader::new(vec![]);

        let result: Result<ChunkOrientedStep<i32, String>, BatchError> = StepBuilder::new()
            .reader(&reader)
            .processor(&PositiveProcessor)
            .build();

        assert!(matches!(result, Err(BatchError::Configuration(_))));
    }
}
