//! Wire-level token exchange: request encoding, response validation, and expiry mapping.
//!
//! The exchange is the OAuth 2.0 client-credentials grant authenticated with a JWT-bearer client
//! assertion. The upstream identity token *is* the assertion; the target provider accepts it
//! because a federated credential on the client trusts that issuer/audience pair.

pub use oauth2;

// crates.io
use oauth2::{
	HttpClientError, HttpRequest, HttpResponse,
	http::{
		HeaderMap, HeaderValue, Method, StatusCode,
		header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER},
	},
};
use time::format_description::well_known::Rfc2822;
use url::form_urlencoded;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ClientId, IdentityToken},
	config::ExpiryMode,
	error::{ConfigError, TransportError},
};

/// `grant_type` sent with every exchange.
pub const GRANT_TYPE: &str = "client_credentials";
/// `client_assertion_type` identifying a JWT-bearer assertion.
pub const CLIENT_ASSERTION_TYPE: &str = "urn:ietf:params:oauth:client-assertion-type:jwt-bearer";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(&self, error: HttpClientError<E>) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(&self, err: HttpClientError<ReqwestError>) -> Error {
		match err {
			HttpClientError::Reqwest(inner) if inner.is_builder() =>
				ConfigError::from(*inner).into(),
			HttpClientError::Reqwest(inner) => TransportError::from(*inner).into(),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			other => TransportError::Other { message: format!("{other:?}") }.into(),
		}
	}
}

/// Success body returned by the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchangeResponse {
	/// Issued access token.
	pub access_token: String,
	/// Token type, normally `Bearer`.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Token lifetime in seconds.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "seconds")]
	pub expires_in: Option<i64>,
	/// Extended lifetime in seconds, honored by the provider during outages.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "seconds")]
	pub ext_expires_in: Option<i64>,
}

/// Non-success answer from the token endpoint.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
#[error("Token endpoint returned HTTP {status}: {body}")]
pub struct TokenExchangeError {
	/// HTTP status code.
	pub status: u16,
	/// Raw response body, verbatim.
	pub body: String,
	/// OAuth `error` code, when the body is a JSON error document.
	pub oauth_error: Option<String>,
	/// `Retry-After` hint, when the endpoint supplied one.
	pub retry_after: Option<Duration>,
}
impl TokenExchangeError {
	/// Creates an error from a status and raw body, extracting the OAuth `error` code.
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		let body = body.into();
		let oauth_error = parse_oauth_error(&body);

		Self { status, body, oauth_error, retry_after: None }
	}

	/// Attaches a `Retry-After` hint.
	pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
		self.retry_after = retry_after;

		self
	}

	/// Server-side and throttling failures may succeed later; 4xx rejections signal trust
	/// misconfiguration and will not.
	pub fn is_retryable(&self) -> bool {
		self.status >= 500 || self.status == 429 || self.status == 408
	}
}

/// 200 responses whose body violates the token response contract.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// The body is not a JSON token response.
	#[error("Token endpoint returned malformed JSON.")]
	Json {
		/// Structured parsing failure including the offending field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// `access_token` is empty.
	#[error("Token endpoint returned an empty access token.")]
	EmptyAccessToken,
	/// `expires_in` is absent.
	#[error("Token endpoint response is missing expires_in.")]
	MissingExpiresIn,
	/// `expires_in` cannot be turned into an expiry instant.
	#[error("The expires_in value {expires_in} cannot be mapped to an expiry instant.")]
	ExpiresInOutOfRange {
		/// Value returned by the endpoint.
		expires_in: i64,
	},
	/// `expires_in` is zero or negative under relative interpretation.
	#[error("The expires_in value must be positive, got {expires_in}.")]
	NonPositiveExpiresIn {
		/// Value returned by the endpoint.
		expires_in: i64,
	},
}

/// Encodes the exchange form in a stable field order.
pub fn exchange_form(client_id: &ClientId, scope: &str, assertion: &IdentityToken) -> String {
	form_urlencoded::Serializer::new(String::new())
		.append_pair("grant_type", GRANT_TYPE)
		.append_pair("scope", scope)
		.append_pair("client_id", client_id)
		.append_pair("client_assertion", assertion.token.expose())
		.append_pair("client_assertion_type", CLIENT_ASSERTION_TYPE)
		.finish()
}

/// Builds the POST request sent to the token endpoint.
pub fn build_request(
	endpoint: &Url,
	client_id: &ClientId,
	scope: &str,
	assertion: &IdentityToken,
) -> Result<HttpRequest> {
	let body = exchange_form(client_id, scope, assertion);

	oauth2::http::Request::builder()
		.method(Method::POST)
		.uri(endpoint.as_str())
		.header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
		.header(ACCEPT, HeaderValue::from_static("application/json"))
		.body(body.into_bytes())
		.map_err(|e| ConfigError::from(e).into())
}

/// Validates the HTTP response and maps it into an [`AccessToken`].
///
/// `issued_at` anchors relative lifetimes; pass the instant observed right after the response.
pub fn map_response(
	response: HttpResponse,
	expiry_mode: ExpiryMode,
	issued_at: OffsetDateTime,
) -> Result<AccessToken> {
	let status = response.status();

	if status != StatusCode::OK {
		let retry_after = parse_retry_after(response.headers(), issued_at);
		let body = String::from_utf8_lossy(response.body()).into_owned();

		return Err(
			TokenExchangeError::new(status.as_u16(), body).with_retry_after(retry_after).into()
		);
	}

	let parsed = parse_body(response.body())?;

	if parsed.access_token.is_empty() {
		return Err(MalformedResponseError::EmptyAccessToken.into());
	}

	let expires_in = parsed.expires_in.ok_or(MalformedResponseError::MissingExpiresIn)?;
	let expires_at = expiry_instant(expiry_mode, expires_in, issued_at)?;

	Ok(AccessToken::new(parsed.access_token, expires_at))
}

/// Turns `expires_in` into an expiry instant according to `mode`.
pub fn expiry_instant(
	mode: ExpiryMode,
	expires_in: i64,
	issued_at: OffsetDateTime,
) -> Result<OffsetDateTime, MalformedResponseError> {
	match mode {
		ExpiryMode::Relative => {
			if expires_in <= 0 {
				return Err(MalformedResponseError::NonPositiveExpiresIn { expires_in });
			}

			issued_at
				.checked_add(Duration::seconds(expires_in))
				.ok_or(MalformedResponseError::ExpiresInOutOfRange { expires_in })
		},
		ExpiryMode::AbsoluteUnix => OffsetDateTime::from_unix_timestamp(expires_in)
			.map_err(|_| MalformedResponseError::ExpiresInOutOfRange { expires_in }),
	}
}

fn parse_body(body: &[u8]) -> Result<TokenExchangeResponse, MalformedResponseError> {
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| MalformedResponseError::Json { source })
}

fn parse_oauth_error(body: &str) -> Option<String> {
	#[derive(Deserialize)]
	struct OAuthErrorBody {
		error: Option<String>,
	}

	serde_json::from_str::<OAuthErrorBody>(body).ok()?.error
}

fn parse_retry_after(headers: &HeaderMap, now: OffsetDateTime) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - now;

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// Accepts lifetimes encoded either as JSON numbers or as numeric strings.
mod seconds {
	// crates.io
	use serde::{Deserializer, Serializer, de::Error as DeError};
	// self
	use crate::_prelude::*;

	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Raw {
		Number(i64),
		Text(String),
	}

	pub fn serialize<S>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match value {
			Some(secs) => serializer.serialize_i64(*secs),
			None => serializer.serialize_none(),
		}
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
	where
		D: Deserializer<'de>,
	{
		match Option::<Raw>::deserialize(deserializer)? {
			None => Ok(None),
			Some(Raw::Number(secs)) => Ok(Some(secs)),
			Some(Raw::Text(text)) => text
				.trim()
				.parse()
				.map(Some)
				.map_err(|_| D::Error::custom(format!("invalid lifetime `{text}`"))),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;

	const ISSUED_AT: OffsetDateTime = datetime!(2025-06-01 12:00 UTC);

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() =
			StatusCode::from_u16(status).expect("Test status codes should be valid.");

		response
	}

	#[test]
	fn form_carries_jwt_bearer_assertion() {
		let client_id = ClientId::new("cffeaee2").expect("Client id should parse.");
		let form = exchange_form(
			&client_id,
			"https://management.core.windows.net/.default",
			&IdentityToken::new("header.payload.sig"),
		);
		let pairs: Vec<(String, String)> =
			form_urlencoded::parse(form.as_bytes()).into_owned().collect();

		assert_eq!(
			pairs,
			vec![
				("grant_type".into(), "client_credentials".into()),
				("scope".into(), "https://management.core.windows.net/.default".into()),
				("client_id".into(), "cffeaee2".into()),
				("client_assertion".into(), "header.payload.sig".into()),
				("client_assertion_type".into(), CLIENT_ASSERTION_TYPE.into()),
			]
		);
	}

	#[test]
	fn build_request_posts_form_to_endpoint() {
		let endpoint = Url::parse("https://login.microsoftonline.com/tenant/oauth2/v2.0/token")
			.expect("Endpoint should parse.");
		let client_id = ClientId::new("client").expect("Client id should parse.");
		let request =
			build_request(&endpoint, &client_id, "scope/.default", &IdentityToken::new("jwt"))
				.expect("Request should build.");

		assert_eq!(request.method(), Method::POST);
		assert_eq!(request.uri().to_string(), endpoint.as_str());
		assert_eq!(
			request.headers().get(CONTENT_TYPE).and_then(|value| value.to_str().ok()),
			Some(FORM_CONTENT_TYPE)
		);
	}

	#[test]
	fn relative_mode_adds_lifetime_to_issue_instant() {
		let token = map_response(
			response(200, r#"{"access_token":"abc","token_type":"Bearer","expires_in":3599}"#),
			ExpiryMode::Relative,
			ISSUED_AT,
		)
		.expect("Valid responses should map.");

		assert_eq!(token.token.expose(), "abc");
		assert_eq!(token.expires_at, datetime!(2025-06-01 12:59:59 UTC));
	}

	#[test]
	fn absolute_mode_reads_lifetime_as_unix_timestamp() {
		let token = map_response(
			response(200, r#"{"access_token":"abc","expires_in":1700000000}"#),
			ExpiryMode::AbsoluteUnix,
			ISSUED_AT,
		)
		.expect("Valid responses should map.");

		assert_eq!(token.expires_at, datetime!(2023-11-14 22:13:20 UTC));
	}

	#[test]
	fn string_lifetimes_are_accepted() {
		let token = map_response(
			response(200, r#"{"access_token":"abc","expires_in":"60","ext_expires_in":"120"}"#),
			ExpiryMode::Relative,
			ISSUED_AT,
		)
		.expect("String lifetimes should map.");

		assert_eq!(token.expires_at, datetime!(2025-06-01 12:01 UTC));
	}

	#[test]
	fn non_success_status_keeps_raw_body() {
		let mut throttled = response(429, "slow down");

		throttled.headers_mut().insert(RETRY_AFTER, HeaderValue::from_static("30"));

		let err = map_response(throttled, ExpiryMode::Relative, ISSUED_AT)
			.expect_err("429 responses must fail.");

		match err {
			Error::TokenExchange(e) => {
				assert_eq!(e.status, 429);
				assert_eq!(e.body, "slow down");
				assert_eq!(e.oauth_error, None);
				assert_eq!(e.retry_after, Some(Duration::seconds(30)));
				assert!(e.is_retryable());
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn malformed_bodies_are_rejected() {
		let err = map_response(response(200, "<html>"), ExpiryMode::Relative, ISSUED_AT)
			.expect_err("Non-JSON bodies must fail.");

		assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::Json { .. })));

		let err = map_response(
			response(200, r#"{"token_type":"Bearer","expires_in":60}"#),
			ExpiryMode::Relative,
			ISSUED_AT,
		)
		.expect_err("Missing access tokens must fail.");

		match err {
			Error::MalformedResponse(MalformedResponseError::Json { source }) =>
				assert!(source.to_string().contains("access_token")),
			other => panic!("Unexpected error variant: {other:?}."),
		}

		let err = map_response(
			response(200, r#"{"access_token":"","expires_in":60}"#),
			ExpiryMode::Relative,
			ISSUED_AT,
		)
		.expect_err("Empty access tokens must fail.");

		assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::EmptyAccessToken)));

		let err =
			map_response(response(200, r#"{"access_token":"abc"}"#), ExpiryMode::Relative, ISSUED_AT)
				.expect_err("Missing lifetimes must fail.");

		assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::MissingExpiresIn)));
	}

	#[test]
	fn relative_mode_rejects_non_positive_lifetimes() {
		assert!(matches!(
			expiry_instant(ExpiryMode::Relative, 0, ISSUED_AT),
			Err(MalformedResponseError::NonPositiveExpiresIn { expires_in: 0 })
		));
		assert!(matches!(
			expiry_instant(ExpiryMode::AbsoluteUnix, i64::MAX, ISSUED_AT),
			Err(MalformedResponseError::ExpiresInOutOfRange { .. })
		));
	}
}
