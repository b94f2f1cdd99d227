//! Transport primitives shared by token exchanges and policy resource calls.
//!
//! The module exposes [`PolicyHttpClient`] alongside [`ResponseMetadata`] and
//! [`ResponseMetadataSlot`] so downstream crates can plug in custom HTTP clients
//! without losing the crate's error classification. Implementations call
//! [`ResponseMetadataSlot::take`] before dispatching a request and
//! [`ResponseMetadataSlot::store`] once an HTTP status or retry hint is known, so a
//! [`TransportErrorMapper`] can classify failures with consistent metadata.

mod mapper;

pub use mapper::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError,
	http::{HeaderMap, header::RETRY_AFTER},
};
#[cfg(feature = "reqwest")] use oauth2::{HttpRequest, HttpResponse};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Abstraction over HTTP transports used for both the authorization endpoint and the
/// policy API.
///
/// The trait is the crate's only dependency on an HTTP stack. Callers provide an
/// implementation (typically behind `Arc<T>`) and the token manager or policy client
/// requests short-lived [`AsyncHttpClient`] handles that each carry a clone of a
/// [`ResponseMetadataSlot`]. Implementations must be `Send + Sync + 'static` so one
/// transport can back several clients, and the request futures of their handles must be
/// `Send` so calls can hop executors.
pub trait PolicyHttpClient
where
	Self: 'static + Send + Sync,
{
	/// Concrete error emitted by the underlying transport.
	type TransportError: 'static + Send + Sync + StdError;

	/// [`AsyncHttpClient`] handle tied to a [`ResponseMetadataSlot`].
	type Handle: for<'c> AsyncHttpClient<
			'c,
			Error = HttpClientError<Self::TransportError>,
			Future: 'c + Send,
		>
		+ 'static
		+ Send
		+ Sync;

	/// Builds an [`AsyncHttpClient`] handle that records outcomes in `slot`.
	///
	/// # Metadata Contract
	///
	/// - Call [`ResponseMetadataSlot::take`] before submitting the HTTP request so stale
	///   information never leaks across the auth retry.
	/// - Once a response provides a status line, save it with [`ResponseMetadataSlot::store`].
	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle;
}

/// Captures metadata from the most recent HTTP response for downstream error mapping.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadata {
	/// HTTP status code returned by the endpoint, if available.
	pub status: Option<u16>,
	/// Retry-After hint expressed as a relative duration.
	pub retry_after: Option<Duration>,
}

/// Thread-safe slot for sharing [`ResponseMetadata`] between transport and error layers.
#[derive(Clone, Debug, Default)]
pub struct ResponseMetadataSlot(Arc<Mutex<Option<ResponseMetadata>>>);
impl ResponseMetadataSlot {
	/// Stores new metadata for the current request.
	pub fn store(&self, meta: ResponseMetadata) {
		*self.0.lock() = Some(meta);
	}

	/// Returns the captured metadata, if any, consuming it from the slot.
	pub fn take(&self) -> Option<ResponseMetadata> {
		self.0.lock().take()
	}
}

/// Certificate and hostname verification policy for a transport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsPolicy {
	/// Verify the certificate chain and the hostname.
	#[default]
	Verify,
	/// Skip certificate-chain **and** hostname validation.
	///
	/// Any peer on the path can impersonate the endpoint and read bearer tokens. Only use
	/// this against lab or sandbox endpoints with self-signed certificates, never in
	/// production.
	DangerAcceptInvalid,
}
impl TlsPolicy {
	/// Maps the boolean `verify_tls` switch onto a policy.
	pub const fn from_verify(verify_tls: bool) -> Self {
		if verify_tls { Self::Verify } else { Self::DangerAcceptInvalid }
	}

	/// Returns `true` when verification is enabled.
	pub const fn verifies(self) -> bool {
		matches!(self, Self::Verify)
	}
}

/// Reqwest transport for both the authorization endpoint and the policy API.
///
/// Redirects are not followed: both endpoints answer directly, and following a redirect
/// would forward the bearer token to another origin.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Builds a client honoring `tls` and an optional per-request timeout.
	pub fn from_policy(
		tls: TlsPolicy,
		request_timeout: Option<std::time::Duration>,
	) -> Result<Self, ConfigError> {
		let mut builder = ReqwestClient::builder().redirect(reqwest::redirect::Policy::none());

		if !tls.verifies() {
			builder = builder.danger_accept_invalid_certs(true).danger_accept_invalid_hostnames(true);
		}
		if let Some(timeout) = request_timeout {
			builder = builder.timeout(timeout);
		}

		Ok(Self(builder.build()?))
	}
}
#[cfg(feature = "reqwest")]
impl PolicyHttpClient for ReqwestHttpClient {
	type Handle = ReqwestHandle;
	type TransportError = ReqwestError;

	fn with_metadata(&self, slot: ResponseMetadataSlot) -> Self::Handle {
		ReqwestHandle { client: self.0.clone(), slot }
	}
}

/// Per-call reqwest handle that records the status and `Retry-After` hint of each response.
#[cfg(feature = "reqwest")]
#[derive(Clone)]
pub struct ReqwestHandle {
	client: ReqwestClient,
	slot: ResponseMetadataSlot,
}
#[cfg(feature = "reqwest")]
impl<'c> AsyncHttpClient<'c> for ReqwestHandle {
	type Error = HttpClientError<ReqwestError>;
	type Future =
		Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

	fn call(&'c self, request: HttpRequest) -> Self::Future {
		Box::pin(async move {
			self.slot.take();

			let response =
				self.client.execute(request.try_into().map_err(Box::new)?).await.map_err(Box::new)?;
			let status = response.status();
			let headers = response.headers().to_owned();

			self.slot.store(ResponseMetadata {
				status: Some(status.as_u16()),
				retry_after: retry_after(&headers),
			});

			let mut converted = HttpResponse::new(response.bytes().await.map_err(Box::new)?.to_vec());

			*converted.status_mut() = status;
			*converted.headers_mut() = headers;

			Ok(converted)
		})
	}
}

/// Reads a `Retry-After` header given either as delta-seconds or as an HTTP date.
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<u32>() {
		return Some(Duration::seconds(i64::from(secs)));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::HeaderValue;
	// self
	use super::*;

	#[test]
	fn retry_after_reads_delta_seconds() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static(" 120 "));

		assert_eq!(retry_after(&headers), Some(Duration::seconds(120)));
	}

	#[test]
	fn retry_after_ignores_past_dates_and_garbage() {
		let mut headers = HeaderMap::new();

		headers.insert(RETRY_AFTER, HeaderValue::from_static("Tue, 01 Jan 2019 00:00:00 +0000"));

		assert_eq!(retry_after(&headers), None);

		headers.insert(RETRY_AFTER, HeaderValue::from_static("soon"));

		assert_eq!(retry_after(&headers), None);
		assert_eq!(retry_after(&HeaderMap::new()), None);
	}

	#[test]
	fn tls_policy_maps_verify_flag() {
		assert_eq!(TlsPolicy::from_verify(true), TlsPolicy::Verify);
		assert_eq!(TlsPolicy::from_verify(false), TlsPolicy::DangerAcceptInvalid);
		assert!(!TlsPolicy::DangerAcceptInvalid.verifies());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_client_builds_for_both_policies() {
		assert!(ReqwestHttpClient::from_policy(TlsPolicy::Verify, None).is_ok());
		assert!(
			ReqwestHttpClient::from_policy(
				TlsPolicy::DangerAcceptInvalid,
				Some(std::time::Duration::from_secs(5)),
			)
			.is_ok()
		);
	}
}
