//! A [`TableStore`](dynadmin_core::TableStore) that talks to DynamoDB, or
//! anything speaking its JSON 1.0 protocol, over HTTP.
//!
//! Requests are signed with AWS Signature Version 4 ([`sigv4`]) and response
//! bodies are checked against the `x-amz-crc32` header when the server sends
//! one.
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod sigv4;

pub use client::DynamoDbClient;
pub use config::ClientConfig;
