//! Data collaborators: provider trait, CSV import, JSON cache.

pub mod cache;
pub mod csv_provider;
pub mod provider;

pub use cache::{CacheKey, CacheMeta, JsonCache};
pub use csv_provider::CsvProvider;
pub use provider::{DataError, DataKind, DataProvider, DataSource};
