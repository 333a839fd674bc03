//! # Data Retrieval Module
//!
//! HTTP access to the external holiday provider.
//!
//! - **`ky_http`**: a generic JSON `ApiClient` over `reqwest` with `reqwest-middleware`
//!   exponential-backoff retries for transient failures.
//! - **`nager_date`**: the Nager.Date v3 client implementing [`crate::HolidaySource`].

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Generic HTTP API client with retry middleware.
pub mod ky_http;
/// Nager.Date public holiday API client.
pub mod nager_date;
