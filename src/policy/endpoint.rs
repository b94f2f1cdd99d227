//! Policy API location, transport settings, and SDDC-based discovery.

// crates.io
use oauth2::http::Method;
// self
use crate::{
	_prelude::*,
	auth::{Credential, TokenSource},
	http::{PolicyHttpClient, TlsPolicy, TransportErrorMapper},
	obs::{self, CallKind, CallOutcome, CallSpan},
	policy::{
		PathTemplate, RuleRef,
		client::authorized::{self, AuthorizedCaller},
	},
};

/// Errors raised while validating a [`PolicyEndpoint`] or an [`SddcLocator`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum EndpointError {
	/// Only `http` and `https` URLs are supported.
	#[error("URL scheme `{scheme}` is not supported; use http or https.")]
	UnsupportedScheme {
		/// Scheme found in the URL.
		scheme: String,
	},
	/// The URL cannot carry a path.
	#[error("URL `{url}` cannot be used as a base URL.")]
	CannotBeABase {
		/// Offending URL.
		url: String,
	},
	/// A zero request timeout would fail every call.
	#[error("Request timeout must be greater than zero.")]
	ZeroRequestTimeout,
	/// Organization or SDDC identifier is empty.
	#[error("SDDC locator field `{field}` must not be empty.")]
	MissingLocatorField {
		/// Name of the empty field.
		field: &'static str,
	},
}

/// Where policy resources live and how to reach them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PolicyEndpointConfig")]
pub struct PolicyEndpoint {
	base_url: Url,
	path_template: PathTemplate,
	tls: TlsPolicy,
	request_timeout: Option<std::time::Duration>,
}
impl PolicyEndpoint {
	/// Starts a builder for the provided base URL.
	pub fn builder(base_url: Url) -> PolicyEndpointBuilder {
		PolicyEndpointBuilder::new(base_url)
	}

	/// Base URL every rule path is appended to.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Layout of rule paths below the base URL.
	pub fn path_template(&self) -> &PathTemplate {
		&self.path_template
	}

	/// Certificate verification policy of the resource transport.
	pub fn tls(&self) -> TlsPolicy {
		self.tls
	}

	/// Per-request transport timeout, if any.
	pub fn request_timeout(&self) -> Option<std::time::Duration> {
		self.request_timeout
	}

	/// Resolves the absolute URL of `reference`.
	pub fn rule_url(&self, reference: &RuleRef) -> Result<Url> {
		self.path_template.resolve(&self.base_url, reference).map_err(ClientError::request)
	}
}

#[derive(Deserialize)]
struct PolicyEndpointConfig {
	base_url: Url,
	#[serde(default)]
	path_template: PathTemplate,
	#[serde(default)]
	tls: TlsPolicy,
	#[serde(default)]
	request_timeout: Option<std::time::Duration>,
}
impl TryFrom<PolicyEndpointConfig> for PolicyEndpoint {
	type Error = EndpointError;

	fn try_from(config: PolicyEndpointConfig) -> Result<Self, Self::Error> {
		let mut builder =
			Self::builder(config.base_url).path_template(config.path_template).tls(config.tls);

		if let Some(timeout) = config.request_timeout {
			builder = builder.request_timeout(timeout);
		}

		builder.build()
	}
}

/// Builder for [`PolicyEndpoint`].
#[derive(Clone, Debug)]
pub struct PolicyEndpointBuilder {
	base_url: Url,
	path_template: PathTemplate,
	tls: TlsPolicy,
	request_timeout: Option<std::time::Duration>,
}
impl PolicyEndpointBuilder {
	fn new(base_url: Url) -> Self {
		Self {
			base_url,
			path_template: PathTemplate::default(),
			tls: TlsPolicy::default(),
			request_timeout: None,
		}
	}

	/// Overrides the rule path layout (defaults to [`PathTemplate::DEFAULT`]).
	pub fn path_template(mut self, template: PathTemplate) -> Self {
		self.path_template = template;

		self
	}

	/// Sets the TLS policy from a boolean switch.
	///
	/// `false` selects [`TlsPolicy::DangerAcceptInvalid`]; read its warning first.
	pub fn verify_tls(self, verify: bool) -> Self {
		self.tls(TlsPolicy::from_verify(verify))
	}

	/// Sets the TLS policy.
	pub fn tls(mut self, tls: TlsPolicy) -> Self {
		self.tls = tls;

		self
	}

	/// Bounds every single HTTP request.
	pub fn request_timeout(mut self, timeout: std::time::Duration) -> Self {
		self.request_timeout = Some(timeout);

		self
	}

	/// Validates the settings and produces a [`PolicyEndpoint`].
	pub fn build(self) -> Result<PolicyEndpoint, EndpointError> {
		validate_base_url(&self.base_url)?;

		if self.request_timeout.is_some_and(|timeout| timeout.is_zero()) {
			return Err(EndpointError::ZeroRequestTimeout);
		}

		Ok(PolicyEndpoint {
			base_url: self.base_url,
			path_template: self.path_template,
			tls: self.tls,
			request_timeout: self.request_timeout,
		})
	}
}

/// Identifies the SDDC whose policy endpoint should be discovered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SddcLocator {
	/// VMware Cloud control plane URL.
	pub vmc_url: Url,
	/// Organization owning the SDDC.
	pub organization_id: String,
	/// SDDC identifier.
	pub sddc_id: String,
}
impl SddcLocator {
	/// Public VMware Cloud control plane.
	pub const VMC_URL: &'static str = "https://vmc.vmware.com";

	/// Creates a locator from explicit identifiers.
	pub fn new(
		vmc_url: Url,
		organization_id: impl Into<String>,
		sddc_id: impl Into<String>,
	) -> Self {
		Self { vmc_url, organization_id: organization_id.into(), sddc_id: sddc_id.into() }
	}

	/// Uses the organization and SDDC carried by `credential`.
	pub fn for_credential(vmc_url: Url, credential: &Credential) -> Self {
		Self::new(vmc_url, credential.organization_id.clone(), credential.sddc_id.clone())
	}

	/// Resolves `{vmc_url}/vmc/api/orgs/{org}/sddcs/{sddc}`.
	pub fn sddc_url(&self) -> Result<Url, EndpointError> {
		if self.organization_id.trim().is_empty() {
			return Err(EndpointError::MissingLocatorField { field: "organization_id" });
		}
		if self.sddc_id.trim().is_empty() {
			return Err(EndpointError::MissingLocatorField { field: "sddc_id" });
		}

		validate_base_url(&self.vmc_url)?;

		let mut url = self.vmc_url.clone();

		url.path_segments_mut()
			.map_err(|_| EndpointError::CannotBeABase { url: self.vmc_url.to_string() })?
			.pop_if_empty()
			.extend([
				"vmc",
				"api",
				"orgs",
				self.organization_id.as_str(),
				"sddcs",
				self.sddc_id.as_str(),
			]);

		Ok(url)
	}
}

#[derive(Deserialize)]
struct SddcRecord {
	resource_config: SddcResourceConfig,
}

#[derive(Deserialize)]
struct SddcResourceConfig {
	nsx_api_public_endpoint_url: Url,
}

/// Looks up the NSX policy base URL of the SDDC named by `locator`.
///
/// The lookup is an authenticated GET against the control plane and follows the same
/// single-renewal contract as rule calls. A missing or unparsable
/// `resource_config.nsx_api_public_endpoint_url` yields [`ClientError::MalformedResponse`].
pub async fn discover_policy_endpoint<C, M>(
	locator: &SddcLocator,
	tokens: Arc<dyn TokenSource>,
	http_client: Arc<C>,
	transport_mapper: Arc<M>,
) -> Result<Url>
where
	C: ?Sized + PolicyHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const KIND: CallKind = CallKind::DiscoverEndpoint;

	let url = locator.sddc_url().map_err(ClientError::request)?;
	let caller = AuthorizedCaller { tokens, http_client, transport_mapper, call_deadline: None };
	let span = CallSpan::new(KIND, "discover_policy_endpoint", url.path());

	obs::record_call_outcome(KIND, CallOutcome::Attempt);

	let result = span
		.instrument(async {
			let response = caller.send(KIND, Method::GET, &url, None).await?;

			if !response.status().is_success() {
				return Err(authorized::classify_failure(&response));
			}

			let record: SddcRecord = authorized::parse_json(response.body())?;

			Ok(record.resource_config.nsx_api_public_endpoint_url)
		})
		.await;

	obs::record_result(KIND, &result);

	result
}

fn validate_base_url(url: &Url) -> Result<(), EndpointError> {
	if !matches!(url.scheme(), "http" | "https") {
		return Err(EndpointError::UnsupportedScheme { scheme: url.scheme().into() });
	}
	if url.cannot_be_a_base() {
		return Err(EndpointError::CannotBeABase { url: url.to_string() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn url(raw: &str) -> Url {
		Url::parse(raw).expect("URL fixture should parse.")
	}

	#[test]
	fn builder_validates_scheme_and_timeout() {
		assert_eq!(
			PolicyEndpoint::builder(url("ftp://nsx.example.com")).build(),
			Err(EndpointError::UnsupportedScheme { scheme: "ftp".into() })
		);
		assert_eq!(
			PolicyEndpoint::builder(url("https://nsx.example.com"))
				.request_timeout(std::time::Duration::ZERO)
				.build(),
			Err(EndpointError::ZeroRequestTimeout)
		);

		let endpoint = PolicyEndpoint::builder(url("https://nsx.example.com"))
			.verify_tls(false)
			.build()
			.expect("Endpoint should build.");

		assert_eq!(endpoint.tls(), TlsPolicy::DangerAcceptInvalid);
		assert_eq!(endpoint.path_template(), &PathTemplate::default());
	}

	#[test]
	fn endpoint_deserializes_through_validation() {
		let endpoint: PolicyEndpoint = serde_json::from_str(
			r#"{"base_url":"https://nsx.example.com/sks-nsxt-manager","tls":"danger_accept_invalid","path_template":"policy/api/v1/infra/domains/{domain}/gateway-policies/{policy}/rules/{rule}"}"#,
		)
		.expect("Endpoint config should deserialize.");
		let reference = RuleRef::parse("cgw", "default", "r1").expect("Reference should parse.");

		assert_eq!(
			endpoint.rule_url(&reference).expect("Rule URL should resolve.").path(),
			"/sks-nsxt-manager/policy/api/v1/infra/domains/cgw/gateway-policies/default/rules/r1"
		);
		assert!(serde_json::from_str::<PolicyEndpoint>(r#"{"base_url":"file:///tmp"}"#).is_err());
	}

	#[test]
	fn locator_builds_sddc_url() {
		let locator = SddcLocator::new(url(SddcLocator::VMC_URL), "org 1", "sddc-2");

		assert_eq!(
			locator.sddc_url().expect("SDDC URL should resolve.").as_str(),
			"https://vmc.vmware.com/vmc/api/orgs/org%201/sddcs/sddc-2"
		);
		assert_eq!(
			SddcLocator::new(url(SddcLocator::VMC_URL), "org", " ").sddc_url(),
			Err(EndpointError::MissingLocatorField { field: "sddc_id" })
		);
	}
}
