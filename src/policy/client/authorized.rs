//! Bearer-authenticated request dispatch with a single renewal on 401/403.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSource},
	http::{self, PolicyHttpClient, ResponseMetadataSlot, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome},
};

const JSON: &str = "application/json";

/// Transport, mapper, and token source shared by every authenticated call site.
pub(crate) struct AuthorizedCaller<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) tokens: Arc<dyn TokenSource>,
	pub(crate) http_client: Arc<C>,
	pub(crate) transport_mapper: Arc<M>,
	pub(crate) call_deadline: Option<std::time::Duration>,
}
impl<C, M> AuthorizedCaller<C, M>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Sends one logical call, bounded by the call deadline when one is set.
	///
	/// The returned response may carry any status except 401/403, which are consumed by the
	/// renewal loop.
	pub(crate) async fn send(
		&self,
		kind: CallKind,
		method: Method,
		url: &Url,
		body: Option<Vec<u8>>,
	) -> Result<HttpResponse> {
		let call = self.send_with_renewal(kind, method, url, body);

		match self.call_deadline {
			Some(deadline) =>
				tokio::time::timeout(deadline, call).await.map_err(|_| ClientError::Timeout)?,
			None => call.await,
		}
	}

	async fn send_with_renewal(
		&self,
		kind: CallKind,
		method: Method,
		url: &Url,
		body: Option<Vec<u8>>,
	) -> Result<HttpResponse> {
		let mut renewed = false;

		loop {
			let token = self.tokens.ensure_valid_token().await?;
			let request = build_request(&token, method.clone(), url, body.clone())?;
			let response = self.dispatch(request).await?;
			let status = response.status();

			if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
				return Ok(response);
			}
			if renewed {
				return Err(ClientError::Unauthorized { status: status.as_u16() });
			}

			self.tokens.invalidate_token(&token);
			obs::record_call_outcome(kind, CallOutcome::AuthRetry);

			renewed = true;
		}
	}

	async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse> {
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());

		handle.call(request).await.map_err(|err| {
			ClientError::from(self.transport_mapper.map_transport_error(meta.take().as_ref(), err))
		})
	}
}

fn build_request(
	token: &AccessToken,
	method: Method,
	url: &Url,
	body: Option<Vec<u8>>,
) -> Result<HttpRequest> {
	let builder = Request::builder()
		.method(method)
		.uri(url.as_str())
		.header(AUTHORIZATION, token.bearer())
		.header(ACCEPT, JSON);
	let request = match body {
		Some(body) => builder.header(CONTENT_TYPE, JSON).body(body)?,
		None => builder.body(Vec::new())?,
	};

	Ok(request)
}

/// Maps a non-2xx response that the caller does not handle itself.
pub(crate) fn classify_failure(response: &HttpResponse) -> ClientError {
	let status = response.status();
	let body = String::from_utf8_lossy(response.body()).into_owned();

	if status.is_client_error() {
		ClientError::RejectedRequest { status: status.as_u16(), body }
	} else {
		ClientError::ServerError {
			status: status.as_u16(),
			body,
			retry_after: http::retry_after(response.headers()),
		}
	}
}

/// Deserializes a 2xx body, keeping the JSON path of the first mismatch.
pub(crate) fn parse_json<T>(body: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut de).map_err(|source| ClientError::MalformedResponse { source })
}
