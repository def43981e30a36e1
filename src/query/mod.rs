//! Query Module
//!
//! Turns three sub-keyword lists and a filter set into Scopus search strings.
//!
//! ```text
//! ["lighting control"] x ["machine learning"] x ["buildings"]
//!     -> TITLE-ABS-KEY(lighting control AND machine learning AND buildings)
//! ```
//!
//! Building never fails. A malformed filter produces a malformed query which
//! the API rejects at execution time.

pub mod builder;
pub mod filters;

pub use builder::{build_query, combinations, parse_terms, SearchCombination};
pub use filters::{DocumentType, PublicationYear, QueryFilterSet};
