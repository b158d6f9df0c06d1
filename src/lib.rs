//! An async client for the Riak HTTP interface
//!
//! Riak keeps object annotations in HTTP headers: the vector clock, tagged
//! links, user metadata and secondary-index bindings. This crate decodes
//! them into [`ObjectMetadata`] on every read and encodes them back on
//! writes, and runs multi-key batches with a bounded number of requests in
//! flight.
//!
//! # Features
//! - Header codec for `X-Riak-Vclock`, `Link`, `X-Riak-Meta-*`, `X-Riak-Index-*`
//! - JSON or raw text bodies
//! - Secondary-index queries
//! - Batch get/put/delete with ordered results
//! - Pluggable [`Transport`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use riak_http::Client;
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), riak_http::Error> {
//!     let client = Client::new("users")?;
//!
//!     // Store a document; `links` travel as a Link header
//!     let stored = client
//!         .put("alice", json!({"name": "Alice", "links": [{"link": "/buckets/users/keys/bob", "tag": "friend"}]}), None)
//!         .await?;
//!     println!("vclock: {}", stored.value.metadata.vclock);
//!
//!     // Fan out reads, 20 at a time by default
//!     let results = client.batch_get(&["alice", "bob"]).await?;
//!     println!("{:?}", results[0].value.to_json());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, rust_2018_idioms)]

mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod headers;
pub mod transport;
pub mod types;

pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use transport::{HyperTransport, Transport};
pub use types::*;
