//! Socialstyrelsen Statistics Database Client
//!
//! A Rust HTTP client for the statistics database REST API of the Swedish
//! National Board of Health and Welfare, returning raw results or tables
//! enriched with human-readable labels.
//!
//! # Features
//!
//! - **Meta API**: versions, languages, subjects, distribution variables and their values
//! - **Transparent Pagination**: follows `nasta_sida` links, with an optional page cap
//! - **Filter Normalization**: integers, strings, lists and ranges become path segments
//! - **Label Enrichment**: `konId` columns gain `kon_label` columns from cached metadata
//! - **Automatic Retries**: fixed-interval retries for transport failures
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use socstats_client::{ClientConfig, DataQuery, StatsClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = StatsClient::new(ClientConfig::default())?;
//!
//!     for subject in client.list_subjects().await? {
//!         println!(
//!             "{}: {}",
//!             subject.name.unwrap_or_default(),
//!             subject.text.unwrap_or_default()
//!         );
//!     }
//!
//!     let query = DataQuery::new("dodsorsaker")
//!         .measure(1)
//!         .filter("ar", 2018..2021)
//!         .filter("kon", [1, 2]);
//!
//!     let table = client.get_data_table(&query, true).await?;
//!     println!("{} rows, columns: {:?}", table.len(), table.columns);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Caching
//!
//! Subject metadata used for enrichment is fetched once per subject and kept
//! until `clear_metadata_cache()` or `invalidate_metadata()` is called.
//! Set `metadata_cache_capacity` to bound the number of cached subjects.
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`. Errors include:
//!
//! - `Validation`: conflicting or malformed arguments, raised before any request
//! - `NotFound`: unknown subject, variable or value (404)
//! - `RateLimited`: too many requests (429)
//! - `RequestFailed`: any other error status, or transport failure after retries
//!
//! Only transport failures are retried. Metadata failures never fail a data
//! fetch; affected columns are simply left without labels.

pub mod cache;
pub mod client;
pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod http;
pub mod metadata;
pub mod pagination;
pub mod query;
pub mod table;
pub mod types;

// Re-exports for convenience
pub use cache::{CacheStats, MetadataCache};
pub use client::{SharedClient, StatsClient};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use enrich::{enrich, label_column_for, LabelColumn};
pub use error::{ClientError, Result};
pub use filter::{normalize, parse_year_range, FilterItem, FilterValue, Filters};
pub use metadata::{MetadataResolver, MetadataSource, SubjectMetadata, VariableTable};
pub use pagination::{collect_pages, PageSource, PaginationOptions};
pub use query::{DataQuery, ValueQuery};
pub use table::{Table, TableAttrs};
pub use types::{CodeText, DataPage, Row, Subject, Variable, VariableValue};
