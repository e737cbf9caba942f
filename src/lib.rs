//! Workload identity federation for OAuth 2.0: trade an OIDC identity token issued by one
//! provider for a scoped access token issued by another, behind a single token-provider trait.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod adapter;
pub mod auth;
pub mod config;
pub mod credential;
pub mod error;
pub mod exchange;
pub mod ext;
pub mod http;
pub mod identity;
pub mod obs;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		adapter::ReqwestFederatedCredential,
		config::{AdapterConfig, ExpiryMode},
		exchange::ReqwestTransportErrorMapper,
		http::ReqwestHttpClient,
		identity::IdentitySourceFactory,
	};

	/// Client identifier used across integration tests.
	pub const TEST_CLIENT_ID: &str = "cffeaee2-5617-4784-8a4b-b647efd676d2";
	/// Tenant identifier used across integration tests.
	pub const TEST_TENANT_ID: &str = "45243fbe-b73f-4f7d-8213-a104a99e228e";
	/// Audience used across integration tests.
	pub const TEST_AUDIENCE: &str = "api://AzureADTokenExchange";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Adapter configuration pointing at a local authority (typically an `httpmock` server).
	pub fn test_config(authority: &str, expiry_mode: ExpiryMode) -> AdapterConfig {
		AdapterConfig::builder(TEST_CLIENT_ID, TEST_TENANT_ID, TEST_AUDIENCE)
			.authority_host(Url::parse(authority).expect("Failed to parse test authority URL."))
			.expiry_mode(expiry_mode)
			.build()
	}

	/// Token endpoint path served by the test authority for [`TEST_TENANT_ID`].
	pub fn test_token_path() -> String {
		format!("/{TEST_TENANT_ID}/oauth2/v2.0/token")
	}

	/// Constructs a reqwest-backed adapter against `authority` using `identity_factory`.
	pub fn build_reqwest_test_credential<F>(
		authority: &str,
		expiry_mode: ExpiryMode,
		identity_factory: &F,
	) -> ReqwestFederatedCredential
	where
		F: ?Sized + IdentitySourceFactory,
	{
		ReqwestFederatedCredential::with_http_client(
			test_config(authority, expiry_mode),
			identity_factory,
			test_reqwest_http_client(),
			Arc::new(ReqwestTransportErrorMapper),
		)
		.expect("Failed to build reqwest test credential.")
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
