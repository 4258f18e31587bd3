//! # Data Retrieval Module
//!
//! HTTP plumbing shared by the components that talk to the telemetry server
//! over REST. Keeping request building, timeouts and retry policy here lets
//! the snapshot fetcher concern itself only with what it fetches.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: A generic `ApiClient` built on `reqwest` and
//!   `reqwest-middleware`, with an optional transient-retry policy.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with optional retry middleware.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse};
