pub mod cli;
pub mod config;
pub mod constants;
pub mod embed;
pub mod error;
pub mod index;
pub mod logger;
pub mod model;
pub mod rwlock;
pub mod server;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use config::{EmbeddingProviderKind, ServerConfig};
pub use embed::{EmbeddingProvider, InputType};
pub use error::{Result as DbResult, ShelfDbError};
pub use index::{AvlIndex, IndexConfig, IndexKind, IndexMetadata, LshIndex, Metric, VectorIndex};
pub use model::{Chunk, Document, Library, Metadata};
pub use rwlock::RwLock;
pub use store::{IndexSet, LibraryStore};
