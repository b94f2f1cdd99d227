//! Error taxonomy shared by the token manager, the transport seam, and policy clients.

// self
use crate::{_prelude::*, policy::EndpointError};

/// Crate-wide result type alias returning [`ClientError`] by default.
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures raised while obtaining an access token.
#[derive(Debug, ThisError)]
pub enum AuthError {
	/// A required credential field is empty; fix the input before retrying.
	#[error("Credential field `{field}` must not be empty.")]
	InvalidCredential {
		/// Name of the offending credential field.
		field: &'static str,
	},
	/// The authorization endpoint could not be reached.
	#[error("Network error occurred while exchanging the refresh token.")]
	Network(#[source] TransportError),
	/// The authorization endpoint refused the refresh token (invalid, revoked, or expired).
	#[error("Authorization endpoint rejected the refresh token with HTTP {status}.")]
	RejectedCredential {
		/// HTTP status returned by the authorization endpoint.
		status: u16,
		/// Response body, kept for diagnostics.
		body: String,
	},
	/// The authorization endpoint answered 2xx with a body the exchange schema cannot read.
	#[error("Authorization endpoint returned a malformed token response.")]
	MalformedTokenResponse(#[from] TokenResponseError),
	/// The token exchange request could not be assembled.
	#[error(transparent)]
	Request(#[from] oauth2::http::Error),
}
impl AuthError {
	/// Returns `true` when retrying later with the same credential may succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Network(_))
	}
}

/// Token endpoint bodies that do not match the configured exchange schema.
#[derive(Debug, ThisError)]
pub enum TokenResponseError {
	/// The body is not a JSON object.
	#[error("Token response is not a JSON object.")]
	NotJson(#[from] serde_json::Error),
	/// A field named by the schema is absent.
	#[error("Token response is missing `{field}`.")]
	MissingField {
		/// Field name from the exchange schema.
		field: String,
	},
	/// A field named by the schema has the wrong JSON type.
	#[error("Token response field `{field}` has an unexpected type.")]
	WrongType {
		/// Field name from the exchange schema.
		field: String,
	},
	/// The lifetime is zero or negative.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// The lifetime does not fit the supported range.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}

/// Failures raised by typed policy resource operations.
#[derive(Debug, ThisError)]
pub enum ClientError {
	/// The request was rejected as unauthorized even after one token renewal.
	#[error("Request was rejected as unauthorized with HTTP {status} after a token renewal.")]
	Unauthorized {
		/// Status of the final rejection (401 or 403).
		status: u16,
	},
	/// The addressed resource does not exist.
	#[error("Resource `{path}` was not found.")]
	NotFound {
		/// Request path that returned 404.
		path: String,
	},
	/// The service rejected the request as malformed or conflicting.
	#[error("Request was rejected with HTTP {status}: {body}.")]
	RejectedRequest {
		/// HTTP status code (4xx other than 401/403).
		status: u16,
		/// Response body returned by the service.
		body: String,
	},
	/// The service failed while processing the request.
	#[error("Service returned HTTP {status}: {body}.")]
	ServerError {
		/// HTTP status code.
		status: u16,
		/// Response body returned by the service.
		body: String,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// The service could not be reached.
	#[error(transparent)]
	Network(TransportError),
	/// A 2xx response body did not match the expected model.
	#[error("Response body is malformed.")]
	MalformedResponse {
		/// Structured parsing failure including the JSON path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The request or the whole call exceeded its deadline.
	#[error("Request timed out.")]
	Timeout,
	/// An access token could not be obtained.
	#[error(transparent)]
	Auth(#[from] AuthError),
	/// The outbound request could not be assembled.
	#[error("Request could not be built.")]
	Request {
		/// Underlying builder failure.
		#[source]
		source: BoxError,
	},
	/// A polled resource never reached the awaited state.
	#[error("Resource did not reach the awaited state after {attempts} attempts.")]
	ConsistencyTimeout {
		/// Number of reads performed before giving up.
		attempts: u32,
	},
}
impl ClientError {
	/// Wraps a request construction failure.
	pub fn request(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Request { source: Box::new(src) }
	}

	/// Returns `true` when the caller may retry the same call later.
	pub fn is_retryable(&self) -> bool {
		match self {
			Self::Network(_) | Self::ServerError { .. } | Self::Timeout => true,
			Self::Auth(err) => err.is_retryable(),
			_ => false,
		}
	}
}
impl From<TransportError> for ClientError {
	fn from(e: TransportError) -> Self {
		match e {
			TransportError::Timeout { .. } => Self::Timeout,
			other => Self::Network(other),
		}
	}
}
impl From<oauth2::http::Error> for ClientError {
	fn from(e: oauth2::http::Error) -> Self {
		Self::request(e)
	}
}
impl From<serde_json::Error> for ClientError {
	fn from(e: serde_json::Error) -> Self {
		Self::request(e)
	}
}

/// Local configuration problems detected before any request is sent.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Credential validation failed.
	#[error(transparent)]
	Credential(#[from] AuthError),
	/// Endpoint settings are invalid.
	#[error(transparent)]
	Endpoint(#[from] EndpointError),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO, deadlines).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// The transport gave up waiting for the peer.
	#[error("Request timed out before the peer responded.")]
	Timeout {
		/// HTTP status code, when one was observed before the timeout.
		status: Option<u16>,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the endpoint.")]
	Io(#[from] std::io::Error),
	/// The transport reported a failure it could not classify.
	#[error("HTTP client error occurred while calling the endpoint: {message}.")]
	Other {
		/// Transport-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
