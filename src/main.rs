use std::{process::ExitCode, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::error;

use mongo_reindex::{
    config::{
        ReindexConfig, DEFAULT_DATABASE, DEFAULT_ELASTICSEARCH_URL, DEFAULT_MONGODB_URI,
    },
    item::elasticsearch::DEFAULT_FLUSH_THRESHOLD,
    reindex::reindex,
};

#[derive(Parser, Debug)]
#[command(name = "mongo-reindex")]
#[command(version)]
#[command(about = "Copy a MongoDB collection into an Elasticsearch index", long_about = None)]
struct Cli {
    /// Source collection
    collection: String,

    /// Destination index
    index: String,

    /// MongoDB connection string
    #[arg(long, env = "MONGODB_URI", default_value = DEFAULT_MONGODB_URI)]
    mongodb_uri: String,

    /// MongoDB database holding the collection
    #[arg(long, env = "MONGODB_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Elasticsearch base URL
    #[arg(long, env = "ELASTICSEARCH_URL", default_value = DEFAULT_ELASTICSEARCH_URL)]
    elasticsearch_url: String,

    /// Elasticsearch user for basic auth
    #[arg(long, env = "ELASTICSEARCH_USERNAME")]
    username: Option<String>,

    /// Elasticsearch password for basic auth
    #[arg(long, env = "ELASTICSEARCH_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Elasticsearch API key
    #[arg(long, env = "ELASTICSEARCH_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Buffer size in bytes that triggers a bulk request
    #[arg(long, default_value_t = DEFAULT_FLUSH_THRESHOLD)]
    flush_threshold: usize,

    /// Cursor batch size hint for MongoDB
    #[arg(long)]
    batch_size: Option<u32>,

    /// Unreadable or unencodable documents tolerated before giving up (unlimited by default)
    #[arg(long)]
    skip_limit: Option<usize>,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 10)]
    connect_timeout: u64,

    /// Log bulk fragments instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for ReindexConfig {
    fn from(cli: Cli) -> Self {
        ReindexConfig {
            mongodb_uri: cli.mongodb_uri,
            database: cli.database,
            collection: cli.collection,
            elasticsearch_url: cli.elasticsearch_url,
            index: cli.index,
            username: cli.username,
            password: cli.password,
            api_key: cli.api_key,
            flush_threshold: cli.flush_threshold,
            batch_size: cli.batch_size,
            skip_limit: cli.skip_limit,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            dry_run: cli.dry_run,
        }
    }
}

fn run(config: ReindexConfig) -> Result<bool> {
    let report = reindex(&config).with_context(|| {
        format!(
            "unable to reindex {}.{} into {}",
            config.database, config.collection, config.index
        )
    })?;

    report.log_summary();

    Ok(report.is_complete())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    match run(cli.into()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
