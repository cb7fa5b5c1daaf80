//! Retrieval for the answering pipeline.

pub mod retriever;
pub mod search;

pub use retriever::{ContextRetriever, RetrievalScope};
pub use search::SearchFilter;
