//! Classification of transport failures into [`TransportError`].

// crates.io
use oauth2::HttpClientError;
// self
use crate::{_prelude::*, error::TransportError, http::ResponseMetadata};

/// Maps HTTP transport failures into [`TransportError`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport.
	fn map_transport_error(
		&self,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> TransportError;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Copy, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> TransportError {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(meta, *inner),
			HttpClientError::Http(inner) => TransportError::network(inner),
			HttpClientError::Io(inner) => TransportError::Io(inner),
			HttpClientError::Other(message) =>
				TransportError::Other { message, status: meta_status(meta) },
			_ => TransportError::Other {
				message: "Unclassified transport failure".into(),
				status: meta_status(meta),
			},
		}
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(meta: Option<&ResponseMetadata>, err: ReqwestError) -> TransportError {
	if err.is_timeout() {
		return TransportError::Timeout {
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
		};
	}

	TransportError::from(err)
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;

	#[test]
	fn other_errors_keep_the_observed_status() {
		let meta = ResponseMetadata { status: Some(502), retry_after: None };
		let err = ReqwestTransportErrorMapper
			.map_transport_error(Some(&meta), HttpClientError::Other("body truncated".into()));

		assert!(matches!(err, TransportError::Other { status: Some(502), .. }));
	}

	#[test]
	fn io_errors_stay_io() {
		let err = ReqwestTransportErrorMapper
			.map_transport_error(None, HttpClientError::Io(std::io::Error::other("reset")));

		assert!(matches!(err, TransportError::Io(_)));
	}
}
