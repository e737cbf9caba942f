//! Identity source backed by a projected token file (Kubernetes service account tokens,
//! CI-provided OIDC tokens, sidecar-refreshed assertions).

// std
use std::{
	fs,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Audience, IdentityToken},
	identity::{IdentityError, IdentityFuture, IdentitySourceFactory, IdentityTokenSource},
};

/// Re-reads a token file on every request so rotated tokens are picked up immediately.
#[derive(Clone, Debug)]
pub struct FileIdentitySource {
	path: PathBuf,
}
impl FileIdentitySource {
	/// Creates a source reading from `path`.
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	/// Path the source reads from.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn read_token(&self) -> Result<IdentityToken, IdentityError> {
		let raw = fs::read_to_string(&self.path)
			.map_err(|source| IdentityError::Io { path: self.path.clone(), source })?;
		let token = raw.trim();

		if token.is_empty() {
			return Err(IdentityError::EmptyToken);
		}

		Ok(IdentityToken::from_jwt(token))
	}
}
impl IdentityTokenSource for FileIdentitySource {
	fn identity_token(&self) -> IdentityFuture<'_> {
		Box::pin(async move { self.read_token() })
	}
}
impl IdentitySourceFactory for FileIdentitySource {
	/// Binds only when the token file exists; the token itself is read per request.
	fn bind(&self, _audience: &Audience) -> Result<Arc<dyn IdentityTokenSource>, IdentityError> {
		if !self.path.is_file() {
			return Err(IdentityError::unavailable(
				format!("token file {} does not exist", self.path.display()),
				false,
			));
		}

		Ok(Arc::new(self.clone()))
	}
}
