// self
use crate::{_prelude::*, obs::Stage};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedFuture<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFuture<F> = F;

/// Span wrapping one token acquisition.
#[derive(Clone, Debug)]
pub struct TokenSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl TokenSpan {
	/// Creates a span tagged with the tenant, client, and requested scope.
	pub fn new(tenant: &str, client_id: &str, scope: &str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span =
				tracing::info_span!("federated_credential.get_token", tenant, client_id, scope);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (tenant, client_id, scope);

			Self {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFuture<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `debug` event for a completed stage. `status` is the HTTP status when relevant.
pub fn record_stage(stage: Stage, status: Option<u16>) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(stage = stage.as_str(), status, "token acquisition stage completed");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, status);
	}
}

/// Emits a `warn` event describing a failed acquisition.
pub fn record_failure(error: &Error) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(
			kind = error.kind(),
			retryable = error.is_retryable(),
			error = %error,
			"token acquisition failed"
		);
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = error;
	}
}
