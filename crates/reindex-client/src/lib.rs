//! Resilient request client for the search index service.
//!
//! Every logical request gets a bounded-time attempt, up to
//! `max_attempts` tries, and exponential backoff between them.
//! Paged reads stream `limit`/`offset` pages into a caller-supplied sink.
//!
//! ## Example
//!
//! ```ignore
//! use reindex_client::{RequestClient, RequestSpec};
//!
//! let client = RequestClient::from_settings(&settings)?;
//! client.send(&RequestSpec::post("/indexes/messages_temp", json!({}))).await?;
//! ```

mod client;
mod delay;
mod error;
mod request;
mod retry;

pub use client::RequestClient;
pub use delay::{Delay, RecordingDelay, TokioDelay};
pub use error::RequestError;
pub use request::{Method, RequestSpec};
pub use retry::AttemptBackoff;
