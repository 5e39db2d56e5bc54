//! Google Maps search: URL building, result parsing and listing dedupe.

pub mod dedupe;
pub mod parser;
pub mod url_builder;

pub use dedupe::ListingDeduper;
pub use parser::{BusinessListing, MapsParser, MapsSelectors};
pub use url_builder::build_search_url;
