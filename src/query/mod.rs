// Keyword search and keyed lookups over an index

pub mod engine;

pub use engine::{FileOverview, Lookup, QueryEngine, SearchHit};
