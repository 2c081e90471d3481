//! Relational store for the OpsBuddy platform.
//!
//! The store is plain Postgres with the Timescale extension; the `logs`
//! table is a hypertable partitioned on `timestamp`. This crate owns the
//! connection configuration, the idempotent schema/hypertable bootstrap,
//! and the query modules used by the services:
//!
//! - `products` - read-only product catalogue (owned by the CRUD collaborator)
//! - `logs` - batched time-series inserts, retention, analysis reads
//! - `downtimes` - outage rows driven by the health-check state machine
//! - `quick_fixes` - write surface for the analysis collaborator

pub mod config;
pub mod downtimes;
pub mod error;
pub mod hypertable;
pub mod logs;
pub mod models;
pub mod products;
pub mod quick_fixes;
pub mod schema;

pub use config::DatabaseOptions;
pub use error::{Result, StoreError};
pub use models::{Downtime, DowntimeStatus, Log, NewLog, Product, QuickFixPriority, User};
