// self
use crate::obs::{CallKind, CallOutcome};

/// Records a call outcome via the global metrics recorder (when enabled).
pub fn record_call_outcome(kind: CallKind, outcome: CallOutcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"policy_broker_call_total",
			"op" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}

/// Records [`CallOutcome::Success`] or [`CallOutcome::Failure`] for a finished call.
pub fn record_result<T, E>(kind: CallKind, result: &Result<T, E>) {
	let outcome = if result.is_ok() { CallOutcome::Success } else { CallOutcome::Failure };

	record_call_outcome(kind, outcome);
}
