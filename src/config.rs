//! Adapter configuration and its validated, frozen form.
//!
//! [`AdapterConfig`] is the plain (de)serializable surface an embedding application fills in.
//! [`FederatedCredential::create`](crate::adapter::FederatedCredential::create) validates it once
//! into a [`ResolvedConfig`], which is what the adapter keeps for its whole lifetime.

// self
use crate::{
	_prelude::*,
	auth::{Audience, ClientId, TenantId},
	error::ConfigError,
};

/// Default authority host of the target provider.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

/// How the `expires_in` field of a token response is turned into an expiry instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryMode {
	/// `expires_at = now + expires_in`, the meaning documented by OAuth 2.0.
	#[default]
	Relative,
	/// `expires_at = unix(expires_in)`.
	///
	/// Compatibility mode for consumers that depended on the legacy mapping, which read the
	/// relative lifetime as an absolute Unix timestamp.
	AbsoluteUnix,
}

/// Caller-supplied adapter configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
	/// Application (client) identifier registered with the target provider.
	pub client_id: String,
	/// Audience the upstream identity token must be minted for.
	pub audience: String,
	/// Tenant holding the federated trust relationship.
	pub tenant_id: String,
	/// Authority host serving `/<tenant>/oauth2/v2.0/token`.
	#[serde(default = "default_authority_host")]
	pub authority_host: Url,
	/// Interpretation of `expires_in`.
	#[serde(default)]
	pub expiry_mode: ExpiryMode,
}
impl AdapterConfig {
	/// Creates a configuration with the default authority host and expiry mode.
	pub fn new(
		client_id: impl Into<String>,
		tenant_id: impl Into<String>,
		audience: impl Into<String>,
	) -> Self {
		Self {
			client_id: client_id.into(),
			audience: audience.into(),
			tenant_id: tenant_id.into(),
			authority_host: default_authority_host(),
			expiry_mode: ExpiryMode::default(),
		}
	}

	/// Returns a builder seeded with the three required fields.
	pub fn builder(
		client_id: impl Into<String>,
		tenant_id: impl Into<String>,
		audience: impl Into<String>,
	) -> AdapterConfigBuilder {
		AdapterConfigBuilder { config: Self::new(client_id, tenant_id, audience) }
	}

	/// Validates the configuration and derives the token endpoint.
	pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
		let client_id = ClientId::new(&self.client_id)?;
		let audience = Audience::new(&self.audience)?;
		let tenant_id = TenantId::new(&self.tenant_id)?;

		validate_authority(&self.authority_host)?;

		let token_endpoint = token_endpoint(&self.authority_host, &tenant_id)?;

		Ok(ResolvedConfig {
			client_id,
			audience,
			tenant_id,
			token_endpoint,
			expiry_mode: self.expiry_mode,
		})
	}
}

/// Builder for [`AdapterConfig`] values.
#[derive(Clone, Debug)]
pub struct AdapterConfigBuilder {
	config: AdapterConfig,
}
impl AdapterConfigBuilder {
	/// Overrides the authority host (sovereign clouds, local test endpoints).
	pub fn authority_host(mut self, url: Url) -> Self {
		self.config.authority_host = url;

		self
	}

	/// Overrides the `expires_in` interpretation.
	pub fn expiry_mode(mut self, mode: ExpiryMode) -> Self {
		self.config.expiry_mode = mode;

		self
	}

	/// Returns the assembled configuration. Validation happens at adapter construction.
	pub fn build(self) -> AdapterConfig {
		self.config
	}
}

/// Validated configuration frozen inside an adapter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfig {
	/// Client identifier sent as `client_id`.
	pub client_id: ClientId,
	/// Audience the identity source is bound to.
	pub audience: Audience,
	/// Tenant whose token endpoint is called.
	pub tenant_id: TenantId,
	/// Fully qualified token endpoint.
	pub token_endpoint: Url,
	/// Interpretation of `expires_in`.
	pub expiry_mode: ExpiryMode,
}

fn default_authority_host() -> Url {
	Url::parse(DEFAULT_AUTHORITY_HOST).unwrap_or_else(|_| unreachable!("constant URL parses"))
}

fn validate_authority(url: &Url) -> Result<(), ConfigError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(ConfigError::InsecureAuthority { url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(url::Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(url::Host::Ipv4(ip)) => ip.is_loopback(),
		Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
		None => false,
	}
}

fn token_endpoint(authority: &Url, tenant: &TenantId) -> Result<Url, ConfigError> {
	let mut endpoint = authority.clone();

	endpoint.set_query(None);
	endpoint.set_fragment(None);
	endpoint
		.path_segments_mut()
		.map_err(|_| ConfigError::InvalidAuthority { url: authority.to_string() })?
		.pop_if_empty()
		.extend([tenant.as_ref(), "oauth2", "v2.0", "token"]);

	Ok(endpoint)
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::auth::IdentifierError;

	fn url(value: &str) -> Url {
		Url::parse(value).expect("Failed to parse test URL.")
	}

	#[test]
	fn resolve_derives_per_tenant_token_endpoint() {
		let resolved = AdapterConfig::new(
			"cffeaee2-5617-4784-8a4b-b647efd676d2",
			"45243fbe-b73f-4f7d-8213-a104a99e228e",
			"api://AzureADTokenExchange",
		)
		.resolve()
		.expect("Complete configuration should resolve.");

		assert_eq!(
			resolved.token_endpoint.as_str(),
			"https://login.microsoftonline.com/45243fbe-b73f-4f7d-8213-a104a99e228e/oauth2/v2.0/token"
		);
		assert_eq!(resolved.expiry_mode, ExpiryMode::Relative);
	}

	#[test]
	fn resolve_keeps_authority_path_prefix() {
		let resolved = AdapterConfig::builder("client", "tenant", "aud")
			.authority_host(url("https://login.example.com/prefix/"))
			.build()
			.resolve()
			.expect("Prefixed authority should resolve.");

		assert_eq!(
			resolved.token_endpoint.as_str(),
			"https://login.example.com/prefix/tenant/oauth2/v2.0/token"
		);
	}

	#[test]
	fn resolve_rejects_each_missing_field() {
		let cases = [
			(AdapterConfig::new("", "tenant", "aud"), "Client"),
			(AdapterConfig::new("client", "", "aud"), "Tenant"),
			(AdapterConfig::new("client", "tenant", ""), "Audience"),
		];

		for (config, kind) in cases {
			let err = config.resolve().expect_err("Missing fields must be rejected.");

			assert!(
				matches!(err, ConfigError::InvalidIdentifier(IdentifierError::Empty { kind: k }) if k == kind),
				"Unexpected error for {kind}: {err:?}."
			);
		}
	}

	#[test]
	fn resolve_rejects_plain_http_authorities_except_loopback() {
		let err = AdapterConfig::builder("client", "tenant", "aud")
			.authority_host(url("http://login.example.com/"))
			.build()
			.resolve()
			.expect_err("Plain HTTP authorities must be rejected.");

		assert!(matches!(err, ConfigError::InsecureAuthority { .. }));

		for local in ["http://127.0.0.1:8080/", "http://localhost:9000/", "http://[::1]:80/"] {
			AdapterConfig::builder("client", "tenant", "aud")
				.authority_host(url(local))
				.build()
				.resolve()
				.expect("Loopback authorities should be accepted.");
		}
	}

	#[test]
	fn config_deserializes_with_defaults() {
		let config: AdapterConfig = serde_json::from_str(
			r#"{"client_id":"client","audience":"api://AzureADTokenExchange","tenant_id":"tenant"}"#,
		)
		.expect("Minimal configuration should deserialize.");

		assert_eq!(config.authority_host.as_str(), DEFAULT_AUTHORITY_HOST);
		assert_eq!(config.expiry_mode, ExpiryMode::Relative);

		let config: AdapterConfig = serde_json::from_str(
			r#"{"client_id":"c","audience":"a","tenant_id":"t","expiry_mode":"absolute_unix"}"#,
		)
		.expect("Expiry mode should deserialize from snake_case.");

		assert_eq!(config.expiry_mode, ExpiryMode::AbsoluteUnix);
	}
}
