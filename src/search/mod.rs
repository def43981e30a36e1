//! Search Module
//!
//! The external literature-indexing API behind a trait:
//! - `backend`: the `SearchBackend` seam, raw result sets and fetch modes
//! - `scopus`: the Elsevier Scopus Search API client used in production

pub mod backend;
pub mod scopus;

pub use backend::{FetchMode, RawEntry, RawResultSet, SearchBackend, SearchError, EMPTY_RESULT_SENTINEL};
pub use scopus::ScopusClient;
