//! Sales knowledge: from CSV rows to searchable entity profiles.
//!
//! - [`ingest`] loads the sales CSV into typed records
//! - [`normalizer`] aggregates records into customer, product and territory profiles
//! - [`embeddings`] turns profile texts and queries into vectors
//! - [`vector_index`] stores and searches vectors (Qdrant or in-memory)
//! - [`indexer`] keeps the index in step with the profiles
//! - [`rag`] retrieves ranked context for a query
//! - [`catalog`] answers aggregate questions without the index

pub mod catalog;
pub mod embeddings;
pub mod indexer;
pub mod ingest;
pub mod memory_index;
pub mod normalizer;
pub mod qdrant_index;
pub mod rag;
pub mod records;
pub mod types;
pub mod vector_index;

pub use catalog::{Catalog, DatasetSummary, TerritoryInsights};
pub use embeddings::{create_provider, EmbeddingClient, EmbeddingProvider};
pub use indexer::{IndexReport, Indexer};
pub use ingest::{load_csv, parse_csv, IngestReport, SalesDataset};
pub use memory_index::MemoryIndex;
pub use normalizer::{normalize, SalesProfiles};
pub use qdrant_index::QdrantIndex;
pub use rag::{ContextRetriever, RetrievalScope, SearchFilter};
pub use records::{RawRow, SalesRecord};
pub use types::{
    entity_id, EntityProfile, EntityType, IndexEntry, IndexHealth, IndexStats, RetrievalResult,
    RetrievedEntity,
};
pub use vector_index::{create_index, VectorIndex};
