//! Object-safe token supply contract consumed by policy clients.

// self
use crate::{_prelude::*, auth::AccessToken};

/// Boxed future returned by [`TokenSource::ensure_valid_token`].
pub type TokenFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken, AuthError>> + 'a + Send>>;

/// Supplies currently-valid access tokens to HTTP callers.
///
/// Several clients may share one source so they also share its cache and its renewal
/// guard.
pub trait TokenSource
where
	Self: Send + Sync,
{
	/// Returns a token that is valid now, renewing it first if needed.
	fn ensure_valid_token(&self) -> TokenFuture<'_>;

	/// Drops the cached token if it is still `rejected`, forcing the next call to renew.
	fn invalidate_token(&self, rejected: &AccessToken);
}
