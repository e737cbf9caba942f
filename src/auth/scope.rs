//! Token request parameters and the single-scope contract of the exchange.

// self
use crate::_prelude::*;

/// Reasons a token request is rejected before any network call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeRequestError {
	/// Zero or several scopes were requested.
	#[error("Exactly one scope must be requested, got {count}.")]
	Count {
		/// Number of scopes supplied by the caller.
		count: usize,
	},
	/// The single scope was empty.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// The scope embeds whitespace, which the token endpoint would split into several scopes.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Parameters a resource-provider client passes when it needs a token.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRequestOptions {
	/// Requested scopes, in caller order.
	pub scopes: Vec<String>,
}
impl TokenRequestOptions {
	/// Creates options from any list of scopes.
	pub fn new<I, S>(scopes: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self { scopes: scopes.into_iter().map(Into::into).collect() }
	}

	/// Convenience constructor for the common single-scope case.
	pub fn for_scope(scope: impl Into<String>) -> Self {
		Self { scopes: vec![scope.into()] }
	}

	/// Returns the only requested scope.
	///
	/// The token endpoint accepts one scope value per call, so zero or multiple scopes are
	/// rejected instead of being truncated or joined.
	pub fn single_scope(&self) -> Result<&str, ScopeRequestError> {
		let [scope] = self.scopes.as_slice() else {
			return Err(ScopeRequestError::Count { count: self.scopes.len() });
		};

		if scope.is_empty() {
			return Err(ScopeRequestError::Empty);
		}
		if scope.chars().any(char::is_whitespace) {
			return Err(ScopeRequestError::ContainsWhitespace { scope: scope.clone() });
		}

		Ok(scope.as_str())
	}
}
