//! Crate-level error taxonomy shared by configuration, identity, transport, and exchange layers.

// self
use crate::{
	_prelude::*,
	auth::{IdentifierError, ScopeRequestError},
	exchange::{MalformedResponseError, TokenExchangeError},
	identity::IdentityError,
};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error returned by adapter construction and token acquisition.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Adapter configuration is invalid.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// The identity token source could not be bound to the configured audience.
	#[error("Identity token source could not be initialized.")]
	TokenSourceInit {
		/// Failure reported by the identity source factory.
		#[source]
		source: IdentityError,
	},
	/// The caller asked for an unsupported scope combination.
	#[error("Invalid token request.")]
	InvalidScopeRequest(#[from] ScopeRequestError),
	/// The identity token source failed to produce an assertion.
	#[error("Identity token source failed to produce a token.")]
	IdentitySource {
		/// Failure reported by the identity source.
		#[source]
		source: IdentityError,
	},
	/// Network failure while reaching the token endpoint.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token endpoint answered with a non-success status.
	#[error(transparent)]
	TokenExchange(#[from] TokenExchangeError),
	/// Token endpoint answered 200 with a body that does not match the contract.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
}
impl Error {
	/// Returns `true` when repeating the same call may succeed without reconfiguration.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Config(_) | Self::TokenSourceInit { .. } | Self::InvalidScopeRequest(_) => false,
			Self::IdentitySource { source } => source.is_transient(),
			Self::Transport(_) => true,
			Self::TokenExchange(e) => e.is_retryable(),
			Self::MalformedResponse(_) => false,
		}
	}

	/// Stable label suitable for span or metric fields.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Config(_) => "configuration",
			Self::TokenSourceInit { .. } => "token_source_init",
			Self::InvalidScopeRequest(_) => "invalid_scope_request",
			Self::IdentitySource { .. } => "identity_source",
			Self::Transport(_) => "transport",
			Self::TokenExchange(_) => "token_exchange",
			Self::MalformedResponse(_) => "malformed_response",
		}
	}
}
impl From<IdentifierError> for Error {
	fn from(e: IdentifierError) -> Self {
		ConfigError::from(e).into()
	}
}

/// Configuration and request-construction failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required identifier is missing or malformed.
	#[error("Adapter configuration is invalid: {0}")]
	InvalidIdentifier(#[from] IdentifierError),
	/// The authority host cannot carry a tenant path.
	#[error("Authority host cannot be used as a base URL: {url}.")]
	InvalidAuthority {
		/// Offending authority URL.
		url: String,
	},
	/// The authority host does not use HTTPS and is not a loopback address.
	#[error("Authority host must use HTTPS: {url}.")]
	InsecureAuthority {
		/// Offending authority URL.
		url: String,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the token endpoint.")]
	Io(#[from] std::io::Error),
	/// Transport reported a failure without a structured cause.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Other {
		/// Transport-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
