//! Quotedeck client — remote quote store, duplicate detection, listing
//! and search coordination.

pub mod error;
pub mod http;
pub mod text;
pub mod similarity;
pub mod dedup;
pub mod store;
pub mod listing;
pub mod search;
pub mod batch;

pub use error::{Result, StoreError};
pub use dedup::{DuplicateGroup, MatchReason, find_duplicate_groups};
pub use store::{DuplicateReport, ListParams, QuotePage, QuoteSource, QuoteStore, StoreAuth};
pub use listing::{ListPhase, ListingSnapshot, QuoteListing};
pub use search::{SearchDebouncer, SearchEvent};
