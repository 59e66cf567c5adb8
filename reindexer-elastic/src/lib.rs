//! Elasticsearch backend for the reindexer orchestrator
//!
//! - [`ElasticEngine`]: the [`reindexer::SearchEngine`] operations as REST calls
//! - [`ElasticMigrationRegistry`]: pending migrations from a migrations index

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;

pub use client::ElasticClient;
pub use config::ElasticConfig;
pub use engine::ElasticEngine;
pub use error::ElasticError;
pub use migrations::ElasticMigrationRegistry;
