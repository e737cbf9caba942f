// self
use crate::obs::TokenOutcome;

/// Records an acquisition outcome via the global metrics recorder (when enabled).
///
/// `kind` is the [`Error::kind`](crate::error::Error::kind) label for failures and `"none"`
/// otherwise.
pub fn record_token_outcome(outcome: TokenOutcome, kind: &'static str) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"federated_credential_token_total",
			"outcome" => outcome.as_str(),
			"kind" => kind
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (outcome, kind);
	}
}
