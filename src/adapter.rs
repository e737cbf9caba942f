//! Federated credential adapter: trades upstream identity tokens for target-provider access
//! tokens on every request.
//!
//! The adapter is stateless per call. It holds its frozen [`ResolvedConfig`], a shared handle to
//! the identity source, and the transport; [`FederatedCredential::get_token`] performs exactly
//! one identity fetch and one token exchange, with no caching and no retries. Dropping the
//! returned future cancels whichever network call is in flight.

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenRequestOptions},
	config::{AdapterConfig, ResolvedConfig},
	credential::{TokenCredential, TokenFuture},
	exchange::{self, TransportErrorMapper},
	http::TokenHttpClient,
	identity::{IdentitySourceFactory, IdentityTokenSource},
	obs::{self, Stage, TokenOutcome, TokenSpan},
};
#[cfg(feature = "reqwest")]
use crate::{exchange::ReqwestTransportErrorMapper, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Adapter specialized for the crate's default reqwest transport stack.
pub type ReqwestFederatedCredential =
	FederatedCredential<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Credential that satisfies [`TokenCredential`] through workload identity federation.
pub struct FederatedCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	config: ResolvedConfig,
	identity: Arc<dyn IdentityTokenSource>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
}
impl<C, M> FederatedCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validates `config`, binds an identity source to its audience, and reuses the
	/// caller-provided transport + mapper pair.
	///
	/// No network call happens here.
	pub fn with_http_client<F>(
		config: AdapterConfig,
		identity_factory: &F,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self>
	where
		F: ?Sized + IdentitySourceFactory,
	{
		let config = config.resolve()?;
		let identity = identity_factory
			.bind(&config.audience)
			.map_err(|source| Error::TokenSourceInit { source })?;

		Ok(Self {
			config,
			identity,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
		})
	}

	/// Frozen configuration the adapter was built with.
	pub fn config(&self) -> &ResolvedConfig {
		&self.config
	}

	/// Obtains an access token for exactly one scope.
	///
	/// Every call fetches a fresh identity token and performs a fresh exchange. Errors surface
	/// unchanged; no default or partial token is ever returned.
	pub async fn get_token(&self, options: &TokenRequestOptions) -> Result<AccessToken> {
		let scope = options.single_scope()?;
		let span = TokenSpan::new(&self.config.tenant_id, &self.config.client_id, scope);

		obs::record_token_outcome(TokenOutcome::Attempt, "none");

		let result = span.instrument(self.exchange(scope)).await;

		match &result {
			Ok(_) => obs::record_token_outcome(TokenOutcome::Success, "none"),
			Err(e) => {
				obs::record_failure(e);
				obs::record_token_outcome(TokenOutcome::Failure, e.kind());
			},
		}

		result
	}

	async fn exchange(&self, scope: &str) -> Result<AccessToken> {
		let assertion = self
			.identity
			.identity_token()
			.await
			.map_err(|source| Error::IdentitySource { source })?;

		obs::record_stage(Stage::IdentityFetched, None);

		let request = exchange::build_request(
			&self.config.token_endpoint,
			&self.config.client_id,
			scope,
			&assertion,
		)?;
		let handle = self.http_client.handle();
		let response = handle
			.call(request)
			.await
			.map_err(|e| self.transport_mapper.map_transport_error(e))?;

		obs::record_stage(Stage::ExchangeResponded, Some(response.status().as_u16()));

		exchange::map_response(response, self.config.expiry_mode, OffsetDateTime::now_utc())
	}
}
#[cfg(feature = "reqwest")]
impl FederatedCredential<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates an adapter backed by the default reqwest transport.
	///
	/// Fails with [`Error::Config`] when a required field is empty and with
	/// [`Error::TokenSourceInit`] when the identity source cannot be bound.
	pub fn create<F>(config: AdapterConfig, identity_factory: &F) -> Result<Self>
	where
		F: ?Sized + IdentitySourceFactory,
	{
		// Validate before touching the transport so bad configs never build a client.
		config.resolve()?;

		Self::with_http_client(
			config,
			identity_factory,
			ReqwestHttpClient::new()?,
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> TokenCredential for FederatedCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn get_token<'a>(&'a self, options: &'a TokenRequestOptions) -> TokenFuture<'a> {
		Box::pin(FederatedCredential::get_token(self, options))
	}
}
impl<C, M> Debug for FederatedCredential<C, M>
where
	C: ?Sized + TokenHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FederatedCredential")
			.field("client_id", &self.config.client_id)
			.field("tenant_id", &self.config.tenant_id)
			.field("audience", &self.config.audience)
			.field("token_endpoint", &self.config.token_endpoint.as_str())
			.field("expiry_mode", &self.config.expiry_mode)
			.finish()
	}
}
