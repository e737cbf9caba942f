//! Identity source backed by the compute metadata server.
//!
//! Instances running with an attached service account can mint audience-bound OIDC tokens from
//! `/computeMetadata/v1/instance/service-accounts/default/identity`. The host honors the
//! `GCE_METADATA_HOST` override so emulators and tests can stand in for the real server.

// crates.io
use reqwest::header::HeaderValue;
// self
use crate::{
	_prelude::*,
	auth::{Audience, IdentityToken},
	identity::{IdentityError, IdentityFuture, IdentitySourceFactory, IdentityTokenSource},
};

/// Environment variable overriding the metadata server host.
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";
const IDENTITY_PATH: &str = "computeMetadata/v1/instance/service-accounts/default/identity";
const METADATA_FLAVOR: &str = "Metadata-Flavor";

/// Factory binding [`MetadataIdentitySource`] values to an audience.
#[derive(Clone, Debug)]
pub struct MetadataIdentityFactory {
	client: ReqwestClient,
	base: Url,
}
impl MetadataIdentityFactory {
	/// Targets the metadata host from `GCE_METADATA_HOST`, falling back to
	/// `metadata.google.internal`.
	pub fn from_env() -> Result<Self, IdentityError> {
		let host = std::env::var(METADATA_HOST_ENV)
			.ok()
			.filter(|value| !value.trim().is_empty())
			.unwrap_or_else(|| DEFAULT_METADATA_HOST.into());
		let base = Url::parse(&format!("http://{}/", host.trim())).map_err(|e| {
			IdentityError::unavailable(format!("invalid metadata host {host}: {e}"), false)
		})?;

		Ok(Self::with_base_url(ReqwestClient::new(), base))
	}

	/// Targets an explicit metadata base URL with a caller-provided client.
	pub fn with_base_url(client: ReqwestClient, base: Url) -> Self {
		Self { client, base }
	}
}
impl IdentitySourceFactory for MetadataIdentityFactory {
	fn bind(&self, audience: &Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError> {
		let url = identity_url(&self.base, audience)?;

		Ok(Arc::new(MetadataIdentitySource { client: self.client.clone(), url }))
	}
}

/// Fetches a fresh identity token from the metadata server on every call.
#[derive(Clone, Debug)]
pub struct MetadataIdentitySource {
	client: ReqwestClient,
	url: Url,
}
impl MetadataIdentitySource {
	/// Fully qualified identity endpoint, including the audience query.
	pub fn url(&self) -> &Url {
		&self.url
	}
}
impl IdentityTokenSource for MetadataIdentitySource {
	fn identity_token(&self) -> IdentityFuture<'_> {
		Box::pin(async move {
			let response = self
				.client
				.get(self.url.clone())
				.header(METADATA_FLAVOR, HeaderValue::from_static("Google"))
				.send()
				.await
				.map_err(IdentityError::http)?;
			let status = response.status();
			let body = response.text().await.map_err(IdentityError::http)?;

			if !status.is_success() {
				return Err(IdentityError::Status { status: status.as_u16(), body });
			}

			let token = body.trim();

			if token.is_empty() {
				return Err(IdentityError::EmptyToken);
			}

			Ok(IdentityToken::from_jwt(token))
		})
	}
}

fn identity_url(base: &Url, audience: &Audience) -> Result<Url, IdentityError> {
	let mut url = base.join(IDENTITY_PATH).map_err(|e| {
		IdentityError::unavailable(format!("invalid metadata identity URL: {e}"), false)
	})?;

	url.query_pairs_mut().append_pair("audience", audience).append_pair("format", "full");

	Ok(url)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn identity_url_encodes_audience_into_query() {
		let base = Url::parse("http://127.0.0.1:8080/").expect("Base URL should parse.");
		let audience = Audience::new("api://AzureADTokenExchange").expect("Audience should parse.");
		let url = identity_url(&base, &audience).expect("Identity URL should build.");

		assert_eq!(
			url.as_str(),
			"http://127.0.0.1:8080/computeMetadata/v1/instance/service-accounts/default/identity?audience=api%3A%2F%2FAzureADTokenExchange&format=full"
		);
	}

	#[test]
	fn bind_does_not_touch_the_network() {
		let base = Url::parse("http://192.0.2.1/").expect("Base URL should parse.");
		let factory = MetadataIdentityFactory::with_base_url(ReqwestClient::new(), base);
		let audience = Audience::new("api://AzureADTokenExchange").expect("Audience should parse.");

		assert!(factory.bind(&audience).is_ok());
	}
}
