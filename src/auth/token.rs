//! Short-lived bearer tokens issued by the authorization endpoint.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Bearer token with an absolute expiry.
///
/// Tokens are replaced wholesale on renewal and never edited in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
	/// Bearer value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Instant the exchange completed.
	pub issued_at: OffsetDateTime,
	/// First instant at which the token is no longer usable.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Creates a token issued at `issued_at` that lives for `ttl`.
	pub fn issue(value: impl Into<String>, issued_at: OffsetDateTime, ttl: Duration) -> Self {
		Self { value: TokenSecret::new(value), issued_at, expires_at: issued_at + ttl }
	}

	/// Returns `true` while `instant < expires_at`.
	pub fn is_usable_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}

	/// Returns `true` when the token stays usable for at least the effective skew past
	/// `instant`.
	///
	/// The effective skew is `skew` capped at half the token's lifetime, so a token whose
	/// lifetime is shorter than the skew is still fresh right after it was issued.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		let half_lifetime = (self.expires_at - self.issued_at) / 2;

		self.is_usable_at(instant + skew.min(half_lifetime))
	}

	/// Renders the `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.value.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
