//! Rechtsinfo Harvester - Ingest German federal law from gesetze-im-internet.de.
//!
//! This crate parses laws published in the gii-norm XML format into a
//! typed document model with a nested content tree, keeps a local copy of
//! the published law archives in sync with the catalog, and stores the
//! parsed laws as YAML files.
//!
//! # Example
//!
//! ```
//! use rechtsinfo_harvester::config;
//!
//! // Catalog slugs end up as file names
//! assert!(config::validate_slug("skaufg").is_ok());
//! assert!(config::validate_slug("../etc").is_err());
//! ```
//!
//! # Architecture
//!
//! The harvester is organized into several modules:
//!
//! - [`config`]: Configuration constants and validation
//! - [`types`]: Core data types (Law, ContentItem, HeaderNorm, etc.)
//! - [`error`]: Error types and Result aliases
//! - [`xml`]: XML utilities
//! - [`gii`]: gii-norm parser and content tree builder
//! - [`api`]: Read API JSON projection
//! - [`http`]: HTTP client for downloading from gesetze-im-internet.de
//! - [`catalog`]: Table of contents and archive downloads
//! - [`location`]: Downloaded archives in a local directory or an S3 bucket
//! - [`store`]: Persistence sink for parsed laws
//! - [`sync`]: Download and ingestion pipeline
//! - [`cli`]: Command-line interface

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod gii;
pub mod http;
pub mod location;
pub mod store;
pub mod sync;
pub mod types;
pub mod xml;

// Re-export main functions
pub use gii::{parse_law_file, parse_law_reader, parse_law_str};
pub use sync::{ingest_law, ingest_location, sync_laws, sync_location};

// Re-export commonly used items
pub use config::validate_slug;
pub use error::{HarvesterError, ParseError, ParseResult, Result};
pub use types::{ContentItem, HeaderNorm, ItemType, Law, StoredLaw};
