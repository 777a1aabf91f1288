/// Cursor-based reader over a MongoDB collection.
pub mod mongodb_reader;

pub use mongodb_reader::{MongodbItemReader, MongodbItemReaderBuilder};
