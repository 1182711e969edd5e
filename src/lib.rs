//! Structural index of Python, SQL and Markdown sources with keyword search,
//! exposed to tool-calling agents over MCP.

pub mod config;
pub mod error;
pub mod index;
pub mod indexer;
pub mod mcp;
pub mod query;
pub mod workspace;

pub use error::{IndexError, Result};
pub use index::{Component, ComponentKind, Index, Stats};
pub use indexer::{BuildReport, Indexer};
pub use query::QueryEngine;
pub use workspace::Workspace;
