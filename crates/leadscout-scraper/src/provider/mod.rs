//! Phone network provider lookups.

pub mod batcher;
pub mod lookup;

pub use batcher::{BatchSettings, BatchStats, LookupBatcher, LookupReport};
pub use lookup::ProviderLookup;
