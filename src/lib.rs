//! Token-refreshing authenticated client for policy-style REST APIs.
//!
//! A [`TokenManager`](auth::TokenManager) exchanges a CSP refresh token for short-lived
//! bearer tokens and renews them one exchange at a time. A
//! [`PolicyResourceClient`](policy::PolicyResourceClient) uses it to create, read, update,
//! and delete NSX-T gateway firewall rules.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod error;
pub mod http;
pub mod obs;
pub mod policy;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{Credential, ExchangeSchema, ReqwestTokenManager},
		http::{ReqwestHttpClient, ReqwestTransportErrorMapper, TlsPolicy},
		policy::{PolicyEndpoint, ReqwestPolicyClient},
	};

	/// Refresh token used by fixtures; never valid against a real control plane.
	pub const TEST_REFRESH_TOKEN: &str = "refresh-fixture";
	/// Organization identifier used by fixtures.
	pub const TEST_ORG_ID: &str = "org-fixture";
	/// SDDC identifier used by fixtures.
	pub const TEST_SDDC_ID: &str = "sddc-fixture";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::from_policy(TlsPolicy::DangerAcceptInvalid, None)
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a credential pointing at the provided authorization URL.
	pub fn test_credential(authorization_url: &str) -> Credential {
		Credential::new(
			TEST_REFRESH_TOKEN,
			Url::parse(authorization_url).expect("Authorization URL fixture should parse."),
			TEST_ORG_ID,
			TEST_SDDC_ID,
		)
	}

	/// Constructs a [`ReqwestTokenManager`] that exchanges [`TEST_REFRESH_TOKEN`] at
	/// `authorization_url` through the reqwest transport used across integration tests.
	pub fn build_reqwest_test_tokens(authorization_url: &str) -> Arc<ReqwestTokenManager> {
		let manager = ReqwestTokenManager::with_http_client(
			test_credential(authorization_url),
			ExchangeSchema::csp(),
			test_reqwest_http_client(),
			ReqwestTransportErrorMapper,
		)
		.expect("Token manager fixture should initialize.");

		Arc::new(manager)
	}

	/// Constructs a [`ReqwestPolicyClient`] for `base_url` sharing the provided token manager.
	pub fn build_reqwest_test_client(
		base_url: &str,
		tokens: Arc<ReqwestTokenManager>,
	) -> ReqwestPolicyClient {
		let endpoint = PolicyEndpoint::builder(
			Url::parse(base_url).expect("Policy base URL fixture should parse."),
		)
		.verify_tls(false)
		.build()
		.expect("Policy endpoint fixture should build.");

		ReqwestPolicyClient::reqwest(endpoint, tokens)
			.expect("Policy client fixture should build.")
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{AuthError, ClientError, Result};
}

pub use oauth2;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))]
use {clap as _, color_eyre as _, httpmock as _, tracing_subscriber as _};
