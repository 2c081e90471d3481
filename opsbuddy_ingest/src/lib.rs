//! gRPC ingestion service.
//!
//! One RPC: `IngestionService.IngestLogBatch`. Batches are authenticated
//! against the product registry through a Redis token cache (the
//! relational store is the authority on a miss), then published to the
//! `logs` bus topic keyed by product id.

pub mod cache;
pub mod error;
pub mod pb;
pub mod service;

pub use cache::{CacheOptions, TokenCache};
pub use error::{IngestError, Result, ingest_error_to_status};
pub use service::{IngestionProcessor, IngestionServer, ProductDirectory, StoreProductDirectory};
