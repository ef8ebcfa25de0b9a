//! Services that talk to the listing site.
//!
//! - `source`: fetch the markup of a listing page
//! - `extract`: turn that markup into raw posting records

pub mod extract;
pub mod source;

pub use extract::PostingExtractor;
pub use source::{HttpListingSource, ListingSource};
