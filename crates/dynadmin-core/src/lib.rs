//! Pagination and query engine for the dynadmin table browser.
//!
//! The leaves are pure: [`key_codec`] turns items into cursors and back,
//! [`filter`] turns user filters into DynamoDB expressions, [`paginator`]
//! drives a call loop. [`page`] combines them into fixed-size pages over any
//! [`store::TableStore`], and [`provider`] exposes the browser operations.
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod filter;
pub mod key_codec;
pub mod memory;
pub mod page;
pub mod paginator;
pub mod provider;
pub mod schema;
pub mod store;

pub use config::AdminConfig;
pub use error::AdminError;
pub use provider::AdminProvider;
pub use store::TableStore;
