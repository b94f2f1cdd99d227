//! Long-lived refresh credential supplied once at startup.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::{_prelude::*, auth::TokenSecret};

/// Authorization endpoint of the VMware Cloud Services platform.
pub const CSP_AUTHORIZATION_URL: &str =
	"https://console.cloud.vmware.com/csp/gateway/am/api/auth/api-tokens/authorize";

const FINGERPRINT_LEN: usize = 16;

/// Refresh credential exchanged for short-lived access tokens.
///
/// The organization and SDDC identifiers travel with the refresh token because the
/// control plane scopes every policy endpoint to one SDDC of one organization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Long-lived refresh token; never log it.
	pub refresh_token: TokenSecret,
	/// Authorization endpoint that accepts the refresh token.
	pub authorization_url: Url,
	/// Organization owning the SDDC.
	pub organization_id: String,
	/// Software-defined data center hosting the policy API.
	pub sddc_id: String,
}
impl Credential {
	/// Creates a credential without validating it; see [`Credential::validate`].
	pub fn new(
		refresh_token: impl Into<String>,
		authorization_url: Url,
		organization_id: impl Into<String>,
		sddc_id: impl Into<String>,
	) -> Self {
		Self {
			refresh_token: TokenSecret::new(refresh_token),
			authorization_url,
			organization_id: organization_id.into(),
			sddc_id: sddc_id.into(),
		}
	}

	/// Checks that every required field is non-empty.
	pub fn validate(&self) -> Result<(), AuthError> {
		if self.refresh_token.is_blank() {
			return Err(AuthError::InvalidCredential { field: "refresh_token" });
		}
		if self.organization_id.trim().is_empty() {
			return Err(AuthError::InvalidCredential { field: "organization_id" });
		}
		if self.sddc_id.trim().is_empty() {
			return Err(AuthError::InvalidCredential { field: "sddc_id" });
		}

		Ok(())
	}

	/// Returns a short, log-safe digest identifying the refresh token.
	pub fn fingerprint(&self) -> String {
		let digest = Sha256::digest(self.refresh_token.expose().as_bytes());
		let mut encoded = URL_SAFE_NO_PAD.encode(digest);

		encoded.truncate(FINGERPRINT_LEN);

		encoded
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("refresh_token", &"<redacted>")
			.field("authorization_url", &self.authorization_url.as_str())
			.field("organization_id", &self.organization_id)
			.field("sddc_id", &self.sddc_id)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn credential(refresh: &str, org: &str, sddc: &str) -> Credential {
		Credential::new(
			refresh,
			Url::parse(CSP_AUTHORIZATION_URL).expect("CSP URL constant should parse."),
			org,
			sddc,
		)
	}

	#[test]
	fn validate_names_the_empty_field() {
		for (cred, field) in [
			(credential("", "org", "sddc"), "refresh_token"),
			(credential("  ", "org", "sddc"), "refresh_token"),
			(credential("refresh", "", "sddc"), "organization_id"),
			(credential("refresh", "org", "\n"), "sddc_id"),
		] {
			match cred.validate() {
				Err(AuthError::InvalidCredential { field: actual }) => assert_eq!(actual, field),
				other => panic!("Unexpected validation result: {other:?}."),
			}
		}

		credential("refresh", "org", "sddc").validate().expect("Complete credential is valid.");
	}

	#[test]
	fn debug_and_fingerprint_hide_the_secret() {
		let cred = credential("very-secret-refresh", "org", "sddc");
		let rendered = format!("{cred:?}");
		let fingerprint = cred.fingerprint();

		assert!(!rendered.contains("very-secret-refresh"));
		assert!(rendered.contains("<redacted>"));
		assert_eq!(fingerprint.len(), FINGERPRINT_LEN);
		assert!(!fingerprint.contains("secret"));
		assert_eq!(fingerprint, credential("very-secret-refresh", "o", "s").fingerprint());
		assert_ne!(fingerprint, credential("other-refresh", "org", "sddc").fingerprint());
	}
}
