//! Wiring of a full reindex: bootstrap both connections, then run one
//! chunk-oriented step reading MongoDB documents, encoding them into bulk
//! fragments and handing them to the bulk writer.

use std::time::Duration;

use log::{info, warn};
use mongodb::{
    bson::{doc, Document},
    options::ClientOptions,
    sync::{Client, Collection},
};

use crate::{
    config::ReindexConfig,
    core::{
        item::ItemReader,
        step::{Step, StepBuilder, StepExecution, StepStatus},
    },
    item::{
        elasticsearch::{
            BulkClient, BulkFragmentProcessor, BulkItemWriterBuilder, BulkStats,
            ElasticsearchClient, ElasticsearchClientBuilder,
        },
        logger::LoggerWriter,
        mongodb::MongodbItemReaderBuilder,
    },
    BatchError,
};

/// Outcome of a reindex run.
#[derive(Debug)]
pub struct ReindexReport {
    pub step: StepExecution,
    pub bulk: BulkStats,
    pub dry_run: bool,
}

impl ReindexReport {
    /// True when every document read was accepted by the index.
    pub fn is_complete(&self) -> bool {
        self.step.status == StepStatus::Success
            && self.step.read_error_count == 0
            && self.step.process_error_count == 0
            && self.bulk.rejected == 0
            && self.bulk.lost == 0
    }

    pub fn duration(&self) -> Duration {
        self.step.duration
    }

    pub fn log_summary(&self) {
        let step = &self.step;
        let summary = format!(
            "read: {}, read errors: {}, skipped: {}, bulk requests: {}, submitted: {}, rejected: {}, lost: {}, duration: {:?}",
            step.read_count,
            step.read_error_count,
            step.process_error_count,
            self.bulk.requests,
            self.bulk.submitted,
            self.bulk.rejected,
            self.bulk.lost,
            step.duration
        );

        if self.is_complete() {
            info!("Reindex finished ({summary})");
        } else {
            warn!("Reindex finished with failures ({summary})");
        }
    }
}

/// Connects to MongoDB, pings the database and returns the source collection.
pub fn connect_source(config: &ReindexConfig) -> Result<Collection<Document>, BatchError> {
    let mut options = ClientOptions::parse(config.mongodb_uri.as_str())
        .run()
        .map_err(|err| BatchError::Connection(format!("invalid MongoDB URI: {err}")))?;
    options.connect_timeout = Some(config.connect_timeout);
    options.server_selection_timeout = Some(config.connect_timeout);

    let client = Client::with_options(options)
        .map_err(|err| BatchError::Connection(format!("MongoDB: {err}")))?;

    let database = client.database(&config.database);
    database
        .run_command(doc! { "ping": 1 })
        .run()
        .map_err(|err| BatchError::Connection(format!("MongoDB ping failed: {err}")))?;

    info!("Connected to MongoDB database {}", config.database);

    Ok(database.collection::<Document>(&config.collection))
}

/// Builds the Elasticsearch client and checks the cluster answers.
pub fn connect_destination(config: &ReindexConfig) -> Result<ElasticsearchClient, BatchError> {
    let client = ElasticsearchClientBuilder::new()
        .url(config.elasticsearch_url.as_str())
        .username(config.username.clone())
        .password(config.password.clone())
        .api_key(config.api_key.clone())
        .connect_timeout(config.connect_timeout)
        .build()?;

    client.info()?;

    Ok(client)
}

/// Copies `config.collection` into `config.index`.
///
/// Connection failures abort before any document is read. Everything after
/// that is reported through the returned [`ReindexReport`].
pub fn reindex(config: &ReindexConfig) -> Result<ReindexReport, BatchError> {
    config.validate()?;

    let collection = connect_source(config)?;

    let mut reader = MongodbItemReaderBuilder::new().collection(&collection);
    if let Some(batch_size) = config.batch_size {
        reader = reader.batch_size(batch_size);
    }
    let reader = reader.build()?;

    if config.dry_run {
        return dry_run_from(config, &reader);
    }

    let client = connect_destination(config)?;

    reindex_from(config, &reader, &client)
}

/// Runs the reindex step over any document reader and bulk client.
pub fn reindex_from<R: ItemReader<Document>>(
    config: &ReindexConfig,
    reader: &R,
    client: &dyn BulkClient,
) -> Result<ReindexReport, BatchError> {
    let processor = BulkFragmentProcessor::new(config.index.as_str());
    let writer = BulkItemWriterBuilder::new()
        .client(client)
        .flush_threshold(config.flush_threshold)
        .build()?;

    let step = StepBuilder::new()
        .name(step_name(config))
        .reader(reader)
        .processor(&processor)
        .writer(&writer)
        .skip_limit(config.skip_limit.unwrap_or(usize::MAX))
        .build()?;

    let execution = step.execute();

    Ok(ReindexReport {
        step: execution,
        bulk: writer.stats(),
        dry_run: false,
    })
}

/// Runs the reindex step with a [`LoggerWriter`] in place of the bulk writer.
pub fn dry_run_from<R: ItemReader<Document>>(
    config: &ReindexConfig,
    reader: &R,
) -> Result<ReindexReport, BatchError> {
    let processor = BulkFragmentProcessor::new(config.index.as_str());
    let writer = LoggerWriter::default();

    let step = StepBuilder::new()
        .name(step_name(config))
        .reader(reader)
        .processor(&processor)
        .writer(&writer)
        .skip_limit(config.skip_limit.unwrap_or(usize::MAX))
        .build()?;

    let execution = step.execute();

    Ok(ReindexReport {
        step: execution,
        bulk: BulkStats::default(),
        dry_run: true,
    })
}

fn step_name(config: &ReindexConfig) -> String {
    format!("{}.{} -> {}", config.database, config.collection, config.index)
}
