//! Optional observability helpers for token acquisition.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run every acquisition inside a `federated_credential.get_token` span
//!   (fields `tenant`, `client_id`, `scope`) and to emit `debug` events per stage.
//! - Enable `metrics` to increment the `federated_credential_token_total` counter for every
//!   attempt/success/failure, labeled by `outcome` + `kind`.
//!
//! Secrets never reach either sink.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Stages of a single token acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Identity token obtained from the upstream source.
	IdentityFetched,
	/// Token endpoint answered (any status).
	ExchangeResponded,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::IdentityFetched => "identity_fetched",
			Stage::ExchangeResponded => "exchange_responded",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenOutcome {
	/// Entry to `get_token`.
	Attempt,
	/// Token handed back to the caller.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl TokenOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenOutcome::Attempt => "attempt",
			TokenOutcome::Success => "success",
			TokenOutcome::Failure => "failure",
		}
	}
}
impl Display for TokenOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
