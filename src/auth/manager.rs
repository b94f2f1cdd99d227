//! Refresh-token exchange with caching, skewed renewal, and a singleflight guard.
//!
//! [`TokenManager::ensure_valid_token`] answers from the cache while the current token
//! stays valid for longer than the renewal skew, capped at half the token's lifetime.
//! Otherwise the caller takes the manager's exchange guard, re-checks the cache (another
//! caller may have renewed it while it waited), and only then posts the refresh token to
//! the authorization endpoint. At most one exchange per credential is in flight at any time.

mod metrics;

pub use metrics::ExchangeMetrics;

// crates.io
use oauth2::AsyncHttpClient;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, Credential, ExchangeSchema, TokenFuture, TokenSource},
	http::{PolicyHttpClient, ResponseMetadataSlot, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome, CallSpan},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper, TlsPolicy},
};

#[cfg(feature = "reqwest")]
/// Token manager specialized for the crate's default reqwest transport stack.
pub type ReqwestTokenManager = TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Owns a [`Credential`] and hands out currently-valid [`AccessToken`]s.
pub struct TokenManager<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	credential: Credential,
	fingerprint: String,
	schema: ExchangeSchema,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
	renewal_skew: Duration,
	cached: RwLock<Option<AccessToken>>,
	exchange_guard: AsyncMutex<()>,
	exchange_metrics: ExchangeMetrics,
}
impl<C, M> TokenManager<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Safety margin subtracted from the expiry before a token counts as stale.
	pub const DEFAULT_RENEWAL_SKEW: Duration = Duration::seconds(30);

	/// Validates `credential` and creates a manager over the caller-provided transport.
	///
	/// No network call is made; the first exchange happens on the first
	/// [`ensure_valid_token`](Self::ensure_valid_token).
	pub fn with_http_client(
		credential: Credential,
		schema: ExchangeSchema,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Result<Self, AuthError> {
		credential.validate()?;

		let fingerprint = credential.fingerprint();

		Ok(Self {
			credential,
			fingerprint,
			schema,
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			renewal_skew: Self::DEFAULT_RENEWAL_SKEW,
			cached: RwLock::new(None),
			exchange_guard: AsyncMutex::new(()),
			exchange_metrics: ExchangeMetrics::default(),
		})
	}

	/// Overrides the renewal skew (defaults to 30 seconds); negative values clamp to zero.
	pub fn with_renewal_skew(mut self, skew: Duration) -> Self {
		self.renewal_skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Credential this manager exchanges.
	pub fn credential(&self) -> &Credential {
		&self.credential
	}

	/// Counters describing exchanges and cache hits so far.
	pub fn exchange_metrics(&self) -> &ExchangeMetrics {
		&self.exchange_metrics
	}

	/// Currently cached token, whether or not it is still fresh.
	pub fn cached_token(&self) -> Option<AccessToken> {
		self.cached.read().clone()
	}

	/// Returns a token valid now, exchanging the refresh token first when needed.
	pub async fn ensure_valid_token(&self) -> Result<AccessToken, AuthError> {
		self.ensure_valid_token_at(OffsetDateTime::now_utc()).await
	}

	/// Same as [`ensure_valid_token`](Self::ensure_valid_token) with an explicit notion of
	/// "now"; a renewed token expires at `now + expires_in`.
	pub async fn ensure_valid_token_at(
		&self,
		now: OffsetDateTime,
	) -> Result<AccessToken, AuthError> {
		const KIND: CallKind = CallKind::TokenExchange;

		if let Some(token) = self.fresh_token_at(now) {
			self.exchange_metrics.record_cache_hit();

			return Ok(token);
		}

		let span = CallSpan::new(KIND, "ensure_valid_token", &self.fingerprint);

		span.instrument(async {
			let _singleflight = self.exchange_guard.lock().await;

			if let Some(token) = self.fresh_token_at(now) {
				span.note("token renewed by a concurrent caller");
				self.exchange_metrics.record_cache_hit();

				return Ok(token);
			}

			obs::record_call_outcome(KIND, CallOutcome::Attempt);
			self.exchange_metrics.record_attempt();

			match self.exchange(now).await {
				Ok(token) => {
					*self.cached.write() = Some(token.clone());

					self.exchange_metrics.record_success();
					obs::record_call_outcome(KIND, CallOutcome::Success);

					Ok(token)
				},
				Err(err) => {
					self.exchange_metrics.record_failure();
					obs::record_call_outcome(KIND, CallOutcome::Failure);

					Err(err)
				},
			}
		})
		.await
	}

	/// Clears the cached token so the next call exchanges the refresh token again.
	pub fn invalidate(&self) {
		*self.cached.write() = None;
	}

	/// Clears the cached token only if it is still `rejected`.
	///
	/// A token renewed by a concurrent caller after `rejected` was handed out stays cached.
	pub fn invalidate_token(&self, rejected: &AccessToken) {
		let mut cached = self.cached.write();

		if cached.as_ref() == Some(rejected) {
			*cached = None;
		}
	}

	fn fresh_token_at(&self, now: OffsetDateTime) -> Option<AccessToken> {
		self.cached
			.read()
			.as_ref()
			.filter(|token| token.is_fresh_at(now, self.renewal_skew))
			.cloned()
	}

	async fn exchange(&self, now: OffsetDateTime) -> Result<AccessToken, AuthError> {
		let request = self.schema.build_request(&self.credential)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(request).await.map_err(|err| {
			AuthError::Network(self.transport_mapper.map_transport_error(meta.take().as_ref(), err))
		})?;
		let status = response.status();

		if !status.is_success() {
			return Err(AuthError::RejectedCredential {
				status: status.as_u16(),
				body: String::from_utf8_lossy(response.body()).into_owned(),
			});
		}

		let grant = self.schema.parse_response(response.body())?;

		Ok(AccessToken::issue(grant.access_token, now, grant.expires_in))
	}
}
#[cfg(feature = "reqwest")]
impl TokenManager<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a manager with its own reqwest transport and the CSP exchange schema.
	///
	/// `tls` applies to the authorization endpoint only; see [`TlsPolicy::DangerAcceptInvalid`]
	/// before disabling verification.
	pub fn new(credential: Credential, tls: TlsPolicy) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::from_policy(tls, None)?;

		Ok(Self::with_http_client(
			credential,
			ExchangeSchema::csp(),
			http_client,
			ReqwestTransportErrorMapper,
		)?)
	}
}
impl<C, M> TokenSource for TokenManager<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn ensure_valid_token(&self) -> TokenFuture<'_> {
		Box::pin(TokenManager::ensure_valid_token(self))
	}

	fn invalidate_token(&self, rejected: &AccessToken) {
		TokenManager::invalidate_token(self, rejected);
	}
}
impl<C, M> Debug for TokenManager<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("credential", &self.credential)
			.field("renewal_skew", &self.renewal_skew)
			.field("token_cached", &self.cached.read().is_some())
			.finish()
	}
}
