//! Optional observability helpers for token exchanges and policy calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `policy_broker.call` with the `op`
//!   (operation), `stage` (call site), and `subject` (credential fingerprint or resource path)
//!   fields.
//! - Enable `metrics` to increment the `policy_broker_call_total` counter for every
//!   attempt/success/failure/auth retry, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Operations observed by the crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallKind {
	/// Refresh-token exchange against the authorization endpoint.
	TokenExchange,
	/// Upsert of a rule.
	PutRule,
	/// Read of a rule.
	GetRule,
	/// Removal of a rule.
	DeleteRule,
	/// SDDC lookup resolving the policy endpoint.
	DiscoverEndpoint,
}
impl CallKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallKind::TokenExchange => "token_exchange",
			CallKind::PutRule => "put_rule",
			CallKind::GetRule => "get_rule",
			CallKind::DeleteRule => "delete_rule",
			CallKind::DiscoverEndpoint => "discover_endpoint",
		}
	}
}
impl Display for CallKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallOutcome {
	/// Entry to an operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// Token invalidated after a 401/403 and the request re-sent.
	AuthRetry,
}
impl CallOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			CallOutcome::Attempt => "attempt",
			CallOutcome::Success => "success",
			CallOutcome::Failure => "failure",
			CallOutcome::AuthRetry => "auth_retry",
		}
	}
}
impl Display for CallOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
