//! Token-provider capability contract consumed by resource-provider clients.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenRequestOptions},
};

/// Boxed future returned by [`TokenCredential::get_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Anything that can hand out bearer tokens for outgoing requests.
///
/// Clients bind to `dyn TokenCredential` rather than a concrete credential, so federated,
/// static, or decorated credentials (retry, caching) are interchangeable.
pub trait TokenCredential
where
	Self: Send + Sync,
{
	/// Obtains an access token for the requested parameters.
	fn get_token<'a>(&'a self, options: &'a TokenRequestOptions) -> TokenFuture<'a>;
}
impl<T> TokenCredential for Arc<T>
where
	T: ?Sized + TokenCredential,
{
	fn get_token<'a>(&'a self, options: &'a TokenRequestOptions) -> TokenFuture<'a> {
		(**self).get_token(options)
	}
}
