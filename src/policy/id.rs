//! Validated path identifiers addressing a rule inside the policy hierarchy.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (domain, policy, rule).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (domain, policy, rule).
		kind: &'static str,
	},
	/// The identifier is a `.` or `..` path segment.
	#[error("{kind} identifier cannot be a dot segment.")]
	DotSegment {
		/// Kind of identifier (domain, policy, rule).
		kind: &'static str,
	},
	/// The identifier would split into several path segments.
	#[error("{kind} identifier contains a path separator.")]
	ContainsSeparator {
		/// Kind of identifier (domain, policy, rule).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (domain, policy, rule).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
}

def_id! { DomainId, "Policy domain such as `cgw` (compute gateway) or `mgw`.", "Domain" }
def_id! { PolicyId, "Gateway policy within a domain, usually `default`.", "Policy" }
def_id! { RuleId, "Rule identifier within a gateway policy.", "Rule" }

/// Identifies one rule within the remote `domain/policy/rule` hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleRef {
	/// Domain segment.
	pub domain: DomainId,
	/// Gateway policy segment.
	pub policy: PolicyId,
	/// Rule segment.
	pub rule: RuleId,
}
impl RuleRef {
	/// Creates a reference from validated identifiers.
	pub fn new(domain: DomainId, policy: PolicyId, rule: RuleId) -> Self {
		Self { domain, policy, rule }
	}

	/// Validates and assembles a reference from raw segments.
	pub fn parse(
		domain: impl AsRef<str>,
		policy: impl AsRef<str>,
		rule: impl AsRef<str>,
	) -> Result<Self, IdentifierError> {
		Ok(Self::new(DomainId::new(domain)?, PolicyId::new(policy)?, RuleId::new(rule)?))
	}

	/// Compute-gateway default policy, the location the CRUD walkthrough targets.
	pub fn compute_gateway(rule: RuleId) -> Self {
		Self {
			domain: DomainId("cgw".into()),
			policy: PolicyId("default".into()),
			rule,
		}
	}
}
impl Display for RuleRef {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{}/{}/{}", self.domain, self.policy, self.rule)
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSeparator { kind });
	}
	if matches!(view, "." | "..") {
		return Err(IdentifierError::DotSegment { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}
