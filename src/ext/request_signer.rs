//! Request signing contracts that attach credential-issued tokens to arbitrary HTTP requests.

// std
#[cfg(feature = "reqwest")] use std::convert::Infallible;
// crates.io
use oauth2::http::{
	self, HeaderValue,
	header::{AUTHORIZATION, InvalidHeaderValue},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenRequestOptions},
	credential::TokenCredential,
};

/// Describes how to attach an [`AccessToken`] to an outbound request without constraining the
/// HTTP client type.
pub trait RequestSigner<Request>
where
	Self: Send + Sync,
{
	/// Failure raised while attaching the token.
	type Error: 'static + Send + Sync + StdError;

	/// Consumes the request and injects authorization state derived from `token`.
	fn attach_token(&self, request: Request, token: &AccessToken) -> Result<Request, Self::Error>;
}

/// Failure of [`authorize`].
#[derive(Debug, ThisError)]
pub enum SignError<E>
where
	E: 'static + StdError,
{
	/// The credential could not produce a token.
	#[error(transparent)]
	Token(Error),
	/// The signer rejected the token or request.
	#[error("Failed to attach the access token to the request.")]
	Attach(#[source] E),
}

/// Signs requests with `Authorization: Bearer <token>`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerSigner;
impl<B> RequestSigner<http::Request<B>> for BearerSigner
where
	B: Send,
{
	type Error = InvalidHeaderValue;

	fn attach_token(
		&self,
		mut request: http::Request<B>,
		token: &AccessToken,
	) -> Result<http::Request<B>, Self::Error> {
		let mut value = HeaderValue::from_str(&format!("Bearer {}", token.token.expose()))?;

		value.set_sensitive(true);
		request.headers_mut().insert(AUTHORIZATION, value);

		Ok(request)
	}
}
#[cfg(feature = "reqwest")]
impl RequestSigner<reqwest::RequestBuilder> for BearerSigner {
	type Error = Infallible;

	fn attach_token(
		&self,
		request: reqwest::RequestBuilder,
		token: &AccessToken,
	) -> Result<reqwest::RequestBuilder, Self::Error> {
		Ok(request.bearer_auth(token.token.expose()))
	}
}

/// Fetches a token from `credential` and attaches it to `request` with `signer`.
pub async fn authorize<T, S, R>(
	credential: &T,
	options: &TokenRequestOptions,
	signer: &S,
	request: R,
) -> Result<R, SignError<S::Error>>
where
	T: ?Sized + TokenCredential,
	S: ?Sized + RequestSigner<R>,
{
	let token = credential.get_token(options).await.map_err(SignError::Token)?;

	signer.attach_token(request, &token).map_err(SignError::Attach)
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::credential::TokenFuture;

	struct FixedCredential;
	impl TokenCredential for FixedCredential {
		fn get_token<'a>(&'a self, options: &'a TokenRequestOptions) -> TokenFuture<'a> {
			Box::pin(async move {
				let scope = options.single_scope()?;

				Ok(AccessToken::new(format!("token-for-{scope}"), datetime!(2030-01-01 0:00 UTC)))
			})
		}
	}

	#[tokio::test]
	async fn authorize_attaches_sensitive_bearer_header() {
		let request = http::Request::get("https://management.azure.com/subscriptions")
			.body(())
			.expect("Request should build.");
		let signed = authorize(
			&FixedCredential,
			&TokenRequestOptions::for_scope("mgmt"),
			&BearerSigner,
			request,
		)
		.await
		.expect("Signing should succeed.");
		let header =
			signed.headers().get(AUTHORIZATION).expect("Authorization header should be set.");

		assert_eq!(header.to_str().ok(), Some("Bearer token-for-mgmt"));
		assert!(header.is_sensitive());
	}

	#[tokio::test]
	async fn authorize_propagates_credential_failures() {
		let request = http::Request::get("https://management.azure.com/")
			.body(())
			.expect("Request should build.");
		let err =
			authorize(&FixedCredential, &TokenRequestOptions::default(), &BearerSigner, request)
				.await
				.expect_err("Credential failures must surface.");

		assert!(matches!(err, SignError::Token(Error::InvalidScopeRequest(_))));
	}

	#[test]
	fn bearer_signer_rejects_header_breaking_tokens() {
		let request =
			http::Request::get("https://example.com/").body(()).expect("Request should build.");
		let token = AccessToken::new("bad\ntoken", datetime!(2030-01-01 0:00 UTC));

		assert!(BearerSigner.attach_token(request, &token).is_err());
	}
}
