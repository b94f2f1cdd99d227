//! Vendor-defined shape of the refresh-token exchange.
//!
//! Authorization endpoints disagree on how the refresh token is posted and how the
//! resulting token is described. [`ExchangeSchema`] captures those differences as plain
//! configuration so they can be loaded alongside the rest of the endpoint settings.

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, CONTENT_TYPE},
	},
};
use serde_json::{Map, Value};
// self
use crate::{_prelude::*, auth::Credential, error::TokenResponseError};

const MAX_EXPIRES_IN_SECS: i64 = i32::MAX as i64;

/// Body encoding used when posting the refresh token.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestEncoding {
	/// `application/x-www-form-urlencoded`.
	#[default]
	Form,
	/// `application/json` object with string values.
	Json,
}
impl RequestEncoding {
	/// MIME type sent in the `Content-Type` header.
	pub const fn content_type(self) -> &'static str {
		match self {
			RequestEncoding::Form => "application/x-www-form-urlencoded",
			RequestEncoding::Json => "application/json",
		}
	}
}

/// Request and response layout of an authorization endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSchema {
	/// Encoding of the POST body.
	pub encoding: RequestEncoding,
	/// Body parameter carrying the refresh token.
	pub refresh_token_param: String,
	/// Additional constant parameters (e.g. `grant_type`).
	pub extra_params: BTreeMap<String, String>,
	/// Response field holding the bearer value.
	pub access_token_field: String,
	/// Response field holding the lifetime in seconds.
	pub expires_in_field: String,
}
impl ExchangeSchema {
	/// VMware Cloud Services layout: form-posted `refresh_token`, JSON `access_token` and
	/// `expires_in` in the response.
	pub fn csp() -> Self {
		Self {
			encoding: RequestEncoding::Form,
			refresh_token_param: "refresh_token".into(),
			extra_params: BTreeMap::new(),
			access_token_field: "access_token".into(),
			expires_in_field: "expires_in".into(),
		}
	}

	/// RFC 6749 §6 refresh grant (`grant_type=refresh_token`).
	pub fn oauth2_refresh_grant() -> Self {
		Self::csp().with_extra_param("grant_type", "refresh_token")
	}

	/// Adds a constant body parameter.
	pub fn with_extra_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.extra_params.insert(key.into(), value.into());

		self
	}

	/// Builds the exchange request for `credential`.
	pub fn build_request(&self, credential: &Credential) -> Result<HttpRequest, AuthError> {
		let secret = credential.refresh_token.expose();
		let body = match self.encoding {
			RequestEncoding::Form => {
				let mut form = url::form_urlencoded::Serializer::new(String::new());

				for (key, value) in &self.extra_params {
					form.append_pair(key, value);
				}

				form.append_pair(&self.refresh_token_param, secret);

				form.finish()
			},
			RequestEncoding::Json => {
				let mut object = Map::new();

				for (key, value) in &self.extra_params {
					object.insert(key.clone(), Value::String(value.clone()));
				}

				object.insert(self.refresh_token_param.clone(), Value::String(secret.to_owned()));

				Value::Object(object).to_string()
			},
		};
		let request = Request::builder()
			.method(Method::POST)
			.uri(credential.authorization_url.as_str())
			.header(CONTENT_TYPE, self.encoding.content_type())
			.header(ACCEPT, "application/json")
			.body(body.into_bytes())?;

		Ok(request)
	}

	/// Extracts the bearer value and lifetime from a 2xx response body.
	pub fn parse_response(&self, body: &[u8]) -> Result<TokenGrant, TokenResponseError> {
		let object: Map<String, Value> = serde_json::from_slice(body)?;
		let access_token = match object.get(&self.access_token_field) {
			Some(Value::String(value)) if !value.is_empty() => value.clone(),
			Some(Value::String(_)) | None =>
				return Err(TokenResponseError::MissingField {
					field: self.access_token_field.clone(),
				}),
			Some(_) =>
				return Err(TokenResponseError::WrongType {
					field: self.access_token_field.clone(),
				}),
		};
		let expires_in = self.read_expires_in(&object)?;

		if expires_in <= 0 {
			return Err(TokenResponseError::NonPositiveExpiresIn);
		}
		if expires_in > MAX_EXPIRES_IN_SECS {
			return Err(TokenResponseError::ExpiresInOutOfRange);
		}

		Ok(TokenGrant { access_token, expires_in: Duration::seconds(expires_in) })
	}

	fn read_expires_in(&self, object: &Map<String, Value>) -> Result<i64, TokenResponseError> {
		let wrong_type = || TokenResponseError::WrongType { field: self.expires_in_field.clone() };

		match object.get(&self.expires_in_field) {
			Some(Value::Number(number)) => number.as_i64().ok_or_else(|| {
				if number.as_u64().is_some() {
					TokenResponseError::ExpiresInOutOfRange
				} else {
					wrong_type()
				}
			}),
			// Some gateways quote the lifetime.
			Some(Value::String(raw)) => raw.trim().parse::<i64>().map_err(|_| wrong_type()),
			Some(_) => Err(wrong_type()),
			None => Err(TokenResponseError::MissingField { field: self.expires_in_field.clone() }),
		}
	}
}
impl Default for ExchangeSchema {
	fn default() -> Self {
		Self::csp()
	}
}

/// Token material extracted from an exchange response.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
	/// Bearer value.
	pub access_token: String,
	/// Lifetime relative to the moment the response was received.
	pub expires_in: Duration,
}
impl Debug for TokenGrant {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenGrant")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}
