//! Global constants and tunable defaults for shelfdb.

use std::sync::atomic::AtomicBool;

/// Set to true when a graceful shutdown has been requested (first CTRL-C).
pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Default port for the HTTP server
pub const DEFAULT_PORT: u16 = 8000;

/// Default bind address for the HTTP server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default YAML configuration file, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "shelfdb.yaml";

/// Default number of hyperplanes per LSH table
pub const DEFAULT_LSH_NUM_BITS: usize = 8;

/// Default number of LSH hash tables
pub const DEFAULT_LSH_NUM_TABLES: usize = 3;

/// Cohere embed API endpoint
pub const COHERE_EMBED_URL: &str = "https://api.cohere.ai/v1/embed";

/// Cohere embed model used when none is configured
pub const DEFAULT_COHERE_MODEL: &str = "embed-english-v3.0";

/// Batch limit imposed by the Cohere embed API
pub const COHERE_BATCH_SIZE: usize = 96;

/// Dimension of vectors produced by the deterministic embedding provider
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;

/// Default memory budget for the embedding cache
pub const DEFAULT_CACHE_MAX_MEMORY_MB: usize = 64;

/// Directory name for log files inside the data directory
pub const LOG_DIR_NAME: &str = "logs";

/// Base name of the rolling log file
pub const LOG_FILE_NAME: &str = "shelfdb";

/// Days to keep rotated log files around
pub const DEFAULT_LOG_RETENTION_DAYS: u64 = 7;
