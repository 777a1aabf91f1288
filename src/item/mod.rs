/// This module provides a logger writer that prints bulk fragments instead of sending them.
pub mod logger;

/// This module provides the MongoDB cursor reader.
pub mod mongodb;

/// This module provides bulk encoding and the bulk writer for Elasticsearch.
pub mod elasticsearch;
