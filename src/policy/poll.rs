//! Bounded polling until an eventually-consistent write becomes visible.

// self
use crate::{
	_prelude::*,
	http::{PolicyHttpClient, TransportErrorMapper},
	policy::{PolicyResourceClient, RuleRef, RuleSpec},
};

/// How often and how many times a rule is re-read while waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
	/// Pause between two reads.
	pub interval: std::time::Duration,
	/// Reads performed before giving up; zero is treated as one.
	pub max_attempts: u32,
}
impl PollPolicy {
	/// Two seconds between reads.
	pub const DEFAULT_INTERVAL: std::time::Duration = std::time::Duration::from_secs(2);
	/// Ten reads.
	pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

	/// Creates a policy.
	pub const fn new(interval: std::time::Duration, max_attempts: u32) -> Self {
		Self { interval, max_attempts }
	}

	fn attempts(&self) -> u32 {
		self.max_attempts.max(1)
	}
}
impl Default for PollPolicy {
	fn default() -> Self {
		Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
	}
}

impl<C, M> PolicyResourceClient<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Re-reads the rule until `predicate` accepts it and returns that observation.
	///
	/// A missing rule counts as "not yet"; any other error ends the wait immediately.
	pub async fn wait_for_rule<P>(&self, reference: &RuleRef, mut predicate: P) -> Result<RuleSpec>
	where
		P: FnMut(&RuleSpec) -> bool,
	{
		let policy = self.poll_policy;
		let attempts = policy.attempts();

		for attempt in 1..=attempts {
			match self.get_rule(reference).await {
				Ok(rule) if predicate(&rule) => return Ok(rule),
				Ok(_) | Err(ClientError::NotFound { .. }) => {},
				Err(err) => return Err(err),
			}

			if attempt < attempts {
				tokio::time::sleep(policy.interval).await;
			}
		}

		Err(ClientError::ConsistencyTimeout { attempts })
	}

	/// Re-reads the rule until the service reports it missing.
	pub async fn wait_for_absence(&self, reference: &RuleRef) -> Result<()> {
		let policy = self.poll_policy;
		let attempts = policy.attempts();

		for attempt in 1..=attempts {
			match self.get_rule(reference).await {
				Err(ClientError::NotFound { .. }) => return Ok(()),
				Ok(_) => {},
				Err(err) => return Err(err),
			}

			if attempt < attempts {
				tokio::time::sleep(policy.interval).await;
			}
		}

		Err(ClientError::ConsistencyTimeout { attempts })
	}
}
