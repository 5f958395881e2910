//! DynamoDB model types for dynadmin.
//!
//! Only the slice of the DynamoDB API a table browser needs is modelled here:
//! table metadata, single-item reads and writes, and paginated `Scan` /
//! `Query`. The types serialize to the `awsJson1_0` wire format, so the same
//! structs are sent to a remote endpoint and handed to the in-memory store.
// "DynamoDB" appears in virtually every doc comment in this crate.
#![allow(clippy::doc_markdown)]
#![allow(clippy::module_name_repetitions)]
#![allow(missing_docs)]

pub mod attribute_value;
pub mod document;
pub mod error;
pub mod input;
pub mod operations;
pub mod output;
pub mod types;

pub use attribute_value::{AttributeValue, Item};
pub use error::{DynamoDBError, DynamoDBErrorCode};
pub use operations::DynamoDBOperation;
