//! Token models: upstream identity tokens and the access tokens the adapter hands out.

pub mod secret;

pub use secret::*;

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
// self
use crate::_prelude::*;

/// OIDC identity token issued by the upstream provider.
///
/// The token is used verbatim as the client assertion of the exchange. Its expiry belongs to the
/// issuing source; the adapter never caches tokens, so the value is informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityToken {
	/// Signed JWT presented as `client_assertion`.
	pub token: TokenSecret,
	/// Expiry reported by the source or decoded from the `exp` claim, if known.
	pub expires_at: Option<OffsetDateTime>,
}
impl IdentityToken {
	/// Wraps a raw token without expiry metadata.
	pub fn new(token: impl Into<String>) -> Self {
		Self { token: TokenSecret::new(token), expires_at: None }
	}

	/// Wraps a compact JWT and reads its `exp` claim when the payload is decodable.
	///
	/// The signature is not verified; the target provider does that. Tokens whose payload cannot
	/// be decoded are still accepted so opaque assertions keep working.
	pub fn from_jwt(token: impl Into<String>) -> Self {
		let token = token.into();
		let expires_at = decode_exp_claim(&token);

		Self { token: TokenSecret::new(token), expires_at }
	}

	/// Overrides the expiry metadata.
	pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}
}

/// Bearer access token minted by the target provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
	/// Access token secret; callers must avoid logging it.
	pub token: TokenSecret,
	/// Instant after which the token must no longer be presented.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token from its parts.
	pub fn new(token: impl Into<String>, expires_at: OffsetDateTime) -> Self {
		Self { token: TokenSecret::new(token), expires_at }
	}

	/// Returns `true` when the token is expired at `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		instant >= self.expires_at
	}

	/// Returns `true` when the token is expired now.
	pub fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}

#[derive(Deserialize)]
struct ExpClaim {
	exp: Option<i64>,
}

fn decode_exp_claim(token: &str) -> Option<OffsetDateTime> {
	let payload = token.split('.').nth(1)?;
	let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
	let claims: ExpClaim = serde_json::from_slice(&bytes).ok()?;

	OffsetDateTime::from_unix_timestamp(claims.exp?).ok()
}
