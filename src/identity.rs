//! Identity token source contracts and built-in sources.
//!
//! The adapter never resolves ambient identity on its own. Callers hand it an
//! [`IdentitySourceFactory`] which binds an [`IdentityTokenSource`] to the configured audience;
//! the adapter then asks that source for a fresh token on every exchange. Any
//! `Fn(&Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError>` closure is a factory,
//! so tests and embedding applications can substitute deterministic sources.

pub mod file;
#[cfg(feature = "reqwest")] pub mod metadata;

pub use file::*;
#[cfg(feature = "reqwest")] pub use metadata::*;

// std
use std::{io::ErrorKind, path::PathBuf};
// self
use crate::{
	_prelude::*,
	auth::{Audience, IdentityToken},
	error::BoxError,
};

/// Boxed future returned by [`IdentityTokenSource::identity_token`].
pub type IdentityFuture<'a> =
	Pin<Box<dyn Future<Output = Result<IdentityToken, IdentityError>> + 'a + Send>>;

/// Produces OIDC identity tokens for a fixed audience.
///
/// Implementations must tolerate concurrent calls; the adapter shares one source across every
/// in-flight token request.
pub trait IdentityTokenSource
where
	Self: Send + Sync,
{
	/// Fetches an identity token. The adapter calls this once per exchange.
	fn identity_token(&self) -> IdentityFuture<'_>;
}

/// Binds an [`IdentityTokenSource`] to an audience at adapter construction time.
pub trait IdentitySourceFactory {
	/// Creates a source issuing tokens for `audience`. Must not perform network I/O.
	fn bind(&self, audience: &Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError>;
}
impl<F> IdentitySourceFactory for F
where
	F: Fn(&Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError>,
{
	fn bind(&self, audience: &Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError> {
		self(audience)
	}
}

/// Failures reported by identity token sources.
#[derive(Debug, ThisError)]
pub enum IdentityError {
	/// No identity is available in the current environment.
	#[error("Identity token is unavailable: {message}.")]
	Unavailable {
		/// Human-readable reason.
		message: String,
		/// Whether the condition is expected to clear on its own.
		transient: bool,
	},
	/// Reading a token file failed.
	#[error("Failed to read identity token from {}.", path.display())]
	Io {
		/// File the source tried to read.
		path: PathBuf,
		/// Underlying I/O failure.
		#[source]
		source: std::io::Error,
	},
	/// The identity endpoint could not be reached.
	#[error("Identity endpoint request failed.")]
	Http {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
	/// The identity endpoint answered with a non-success status.
	#[error("Identity endpoint returned HTTP {status}: {body}")]
	Status {
		/// HTTP status code.
		status: u16,
		/// Raw response body.
		body: String,
	},
	/// The source produced an empty token.
	#[error("Identity token source returned an empty token.")]
	EmptyToken,
	/// Failure raised by a custom source.
	#[error("{source}")]
	Other {
		/// Source-specific failure.
		source: BoxError,
		/// Whether retrying may succeed.
		transient: bool,
	},
}
impl IdentityError {
	/// Builds an [`IdentityError::Unavailable`] value.
	pub fn unavailable(message: impl Into<String>, transient: bool) -> Self {
		Self::Unavailable { message: message.into(), transient }
	}

	/// Wraps a custom source failure.
	pub fn other(src: impl 'static + Send + Sync + std::error::Error, transient: bool) -> Self {
		Self::Other { source: Box::new(src), transient }
	}

	/// Wraps a transport failure from an HTTP-backed source.
	pub fn http(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Http { source: Box::new(src) }
	}

	/// Returns `true` when the failure may clear without human action.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Unavailable { transient, .. } | Self::Other { transient, .. } => *transient,
			Self::Io { source, .. } =>
				!matches!(source.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied),
			Self::Http { .. } => true,
			Self::Status { status, .. } => *status >= 500 || *status == 429,
			Self::EmptyToken => false,
		}
	}
}

/// Source that always returns the same pre-minted token.
///
/// Useful for tests and for callers that obtain assertions out of band. The source binds to any
/// audience; the caller is responsible for minting the token for the configured one.
#[derive(Clone, Debug)]
pub struct StaticIdentitySource {
	token: IdentityToken,
}
impl StaticIdentitySource {
	/// Wraps a raw assertion, decoding its `exp` claim when possible.
	pub fn new(token: impl Into<String>) -> Self {
		Self { token: IdentityToken::from_jwt(token) }
	}

	/// Wraps an already constructed [`IdentityToken`].
	pub fn from_token(token: IdentityToken) -> Self {
		Self { token }
	}
}
impl IdentityTokenSource for StaticIdentitySource {
	fn identity_token(&self) -> IdentityFuture<'_> {
		Box::pin(async move {
			if self.token.token.is_empty() {
				return Err(IdentityError::EmptyToken);
			}

			Ok(self.token.clone())
		})
	}
}
impl IdentitySourceFactory for StaticIdentitySource {
	fn bind(&self, _audience: &Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError> {
		Ok(Arc::new(self.clone()))
	}
}
