//! Extension contracts for resource-provider clients (request signing).
//!
//! Retry, backoff, or caching policies belong in decorators around
//! [`TokenCredential`](crate::credential::TokenCredential); the adapter itself stays a
//! single-attempt, stateless exchange.

pub mod request_signer;

pub use request_signer::*;
