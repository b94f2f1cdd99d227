//! Authenticated create/patch, read, and delete of firewall rules.
//!
//! Every call obtains a bearer token from the shared [`TokenSource`], sends the request,
//! and on a 401/403 invalidates exactly that token and tries once more with a renewed
//! one. A second rejection surfaces as [`ClientError::Unauthorized`].

pub(crate) mod authorized;

// crates.io
use oauth2::http::{Method, StatusCode};
// self
use crate::{
	_prelude::*,
	auth::TokenSource,
	http::{PolicyHttpClient, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome, CallSpan},
	policy::{PolicyEndpoint, PollPolicy, RuleRef, RuleSpec, client::authorized::AuthorizedCaller},
};
#[cfg(feature = "reqwest")]
use crate::{
	error::ConfigError,
	http::{ReqwestHttpClient, ReqwestTransportErrorMapper},
};

#[cfg(feature = "reqwest")]
/// Policy client specialized for the crate's default reqwest transport stack.
pub type ReqwestPolicyClient = PolicyResourceClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Typed client for rules addressed by [`RuleRef`] below a [`PolicyEndpoint`].
pub struct PolicyResourceClient<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	endpoint: PolicyEndpoint,
	caller: AuthorizedCaller<C, M>,
	pub(crate) poll_policy: PollPolicy,
}
impl<C, M> PolicyResourceClient<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client over the caller-provided transport.
	///
	/// The endpoint's TLS policy and request timeout are the transport's responsibility
	/// here; only [`PolicyResourceClient::reqwest`] applies them automatically.
	pub fn with_http_client(
		endpoint: PolicyEndpoint,
		tokens: Arc<dyn TokenSource>,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			endpoint,
			caller: AuthorizedCaller {
				tokens,
				http_client: http_client.into(),
				transport_mapper: mapper.into(),
				call_deadline: None,
			},
			poll_policy: PollPolicy::default(),
		}
	}

	/// Bounds each whole call, token renewal and auth retry included.
	pub fn with_call_deadline(mut self, deadline: std::time::Duration) -> Self {
		self.caller.call_deadline = Some(deadline);

		self
	}

	/// Overrides how [`wait_for_rule`](Self::wait_for_rule) and
	/// [`wait_for_absence`](Self::wait_for_absence) poll.
	pub fn with_poll_policy(mut self, policy: PollPolicy) -> Self {
		self.poll_policy = policy;

		self
	}

	/// Endpoint this client talks to.
	pub fn endpoint(&self) -> &PolicyEndpoint {
		&self.endpoint
	}

	/// Absolute URL of `reference`.
	pub fn rule_url(&self, reference: &RuleRef) -> Result<Url> {
		self.endpoint.rule_url(reference)
	}

	/// Creates or partially updates the rule with a JSON PATCH of `spec`.
	pub async fn put_rule(&self, reference: &RuleRef, spec: &RuleSpec) -> Result<()> {
		const KIND: CallKind = CallKind::PutRule;

		let url = self.rule_url(reference)?;
		let body = serde_json::to_vec(spec)?;

		self.observe(KIND, "put_rule", &url, async {
			let response = self.caller.send(KIND, Method::PATCH, &url, Some(body)).await?;

			if response.status().is_success() {
				Ok(())
			} else {
				Err(authorized::classify_failure(&response))
			}
		})
		.await
	}

	/// Reads the rule; a missing rule yields [`ClientError::NotFound`].
	pub async fn get_rule(&self, reference: &RuleRef) -> Result<RuleSpec> {
		const KIND: CallKind = CallKind::GetRule;

		let url = self.rule_url(reference)?;

		self.observe(KIND, "get_rule", &url, async {
			let response = self.caller.send(KIND, Method::GET, &url, None).await?;
			let status = response.status();

			if status.is_success() {
				authorized::parse_json(response.body())
			} else if status == StatusCode::NOT_FOUND {
				Err(ClientError::NotFound { path: url.path().into() })
			} else {
				Err(authorized::classify_failure(&response))
			}
		})
		.await
	}

	/// Deletes the rule.
	///
	/// Deleting a rule that does not exist succeeds, so repeated deletes are harmless.
	pub async fn delete_rule(&self, reference: &RuleRef) -> Result<()> {
		const KIND: CallKind = CallKind::DeleteRule;

		let url = self.rule_url(reference)?;

		self.observe(KIND, "delete_rule", &url, async {
			let response = self.caller.send(KIND, Method::DELETE, &url, None).await?;
			let status = response.status();

			if status.is_success() || status == StatusCode::NOT_FOUND {
				Ok(())
			} else {
				Err(authorized::classify_failure(&response))
			}
		})
		.await
	}

	async fn observe<T, F>(
		&self,
		kind: CallKind,
		stage: &'static str,
		url: &Url,
		call: F,
	) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let span = CallSpan::new(kind, stage, url.path());

		obs::record_call_outcome(kind, CallOutcome::Attempt);

		let result = span.instrument(call).await;

		obs::record_result(kind, &result);

		result
	}
}
#[cfg(feature = "reqwest")]
impl PolicyResourceClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a client whose reqwest transport honors the endpoint's TLS policy and
	/// request timeout.
	pub fn reqwest(
		endpoint: PolicyEndpoint,
		tokens: Arc<dyn TokenSource>,
	) -> Result<Self, ConfigError> {
		let http_client =
			ReqwestHttpClient::from_policy(endpoint.tls(), endpoint.request_timeout())?;

		Ok(Self::with_http_client(endpoint, tokens, http_client, ReqwestTransportErrorMapper))
	}

	/// Shorthand for a default-layout endpoint at `base_url`.
	///
	/// `verify_tls = false` disables certificate and hostname checks; see
	/// [`TlsPolicy::DangerAcceptInvalid`](crate::http::TlsPolicy::DangerAcceptInvalid).
	pub fn configure(
		base_url: Url,
		verify_tls: bool,
		tokens: Arc<dyn TokenSource>,
	) -> Result<Self, ConfigError> {
		let endpoint = PolicyEndpoint::builder(base_url).verify_tls(verify_tls).build()?;

		Self::reqwest(endpoint, tokens)
	}
}
impl<C, M> Debug for PolicyResourceClient<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PolicyResourceClient")
			.field("endpoint", &self.endpoint)
			.field("call_deadline", &self.caller.call_deadline)
			.field("poll_policy", &self.poll_policy)
			.finish()
	}
}
