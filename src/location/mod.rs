//! Location records and their storage.
//!
//! A [`Location`] carries a geohash derived from its coordinates; a
//! [`LocationStore`] persists records and answers exact-match cell lookups.

pub mod store;
pub mod types;

pub use store::{LocationStore, MemoryStore, INDEXED_PRECISIONS};
pub use types::{Location, NewLocation, QueryParameters};
