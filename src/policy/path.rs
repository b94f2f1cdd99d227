//! Configurable location of a rule below the policy base URL.

// self
use crate::{_prelude::*, policy::RuleRef};

/// Errors raised while parsing or expanding a [`PathTemplate`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum PathTemplateError {
	/// Two consecutive separators produced an empty segment.
	#[error("Path template `{template}` contains an empty segment.")]
	EmptySegment {
		/// Offending template.
		template: String,
	},
	/// A `{name}` segment names an unsupported placeholder.
	#[error("Path template placeholder `{name}` is not one of domain, policy, rule.")]
	UnknownPlaceholder {
		/// Placeholder name without braces.
		name: String,
	},
	/// A literal segment contains a stray brace or is a `.`/`..` dot segment.
	#[error("Path template segment `{segment}` is malformed.")]
	MalformedSegment {
		/// Offending segment.
		segment: String,
	},
	/// A placeholder appears more than once.
	#[error("Path template placeholder `{name}` appears more than once.")]
	DuplicatePlaceholder {
		/// Placeholder name.
		name: &'static str,
	},
	/// A placeholder is absent, so two rules could map to the same URL.
	#[error("Path template is missing the `{name}` placeholder.")]
	MissingPlaceholder {
		/// Placeholder name.
		name: &'static str,
	},
	/// The base URL cannot carry a path (e.g. `mailto:`).
	#[error("Base URL `{url}` cannot be extended with path segments.")]
	CannotBeABase {
		/// Offending base URL.
		url: String,
	},
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Segment {
	Literal(String),
	Domain,
	Policy,
	Rule,
}

/// `/`-separated template with `{domain}`, `{policy}`, and `{rule}` placeholders.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PathTemplate {
	raw: String,
	segments: Vec<Segment>,
}
impl PathTemplate {
	/// Bare `{domain}/{policy}/{rule}` layout.
	pub const DEFAULT: &'static str = "{domain}/{policy}/{rule}";
	/// NSX-T policy API layout for gateway firewall rules.
	pub const NSX_GATEWAY_RULES: &'static str =
		"policy/api/v1/infra/domains/{domain}/gateway-policies/{policy}/rules/{rule}";

	/// Parses and validates a template.
	pub fn parse(raw: impl Into<String>) -> Result<Self, PathTemplateError> {
		let raw = raw.into();
		let mut segments = Vec::new();

		for part in raw.trim_matches('/').split('/') {
			if part.is_empty() {
				return Err(PathTemplateError::EmptySegment { template: raw });
			}

			let segment = match part.strip_prefix('{').and_then(|rest| rest.strip_suffix('}')) {
				Some("domain") => Segment::Domain,
				Some("policy") => Segment::Policy,
				Some("rule") => Segment::Rule,
				Some(name) => return Err(PathTemplateError::UnknownPlaceholder { name: name.into() }),
				None if part.contains(['{', '}']) || matches!(part, "." | "..") =>
					return Err(PathTemplateError::MalformedSegment { segment: part.into() }),
				None => Segment::Literal(part.into()),
			};

			segments.push(segment);
		}

		for (placeholder, name) in
			[(Segment::Domain, "domain"), (Segment::Policy, "policy"), (Segment::Rule, "rule")]
		{
			match segments.iter().filter(|segment| **segment == placeholder).count() {
				0 => return Err(PathTemplateError::MissingPlaceholder { name }),
				1 => {},
				_ => return Err(PathTemplateError::DuplicatePlaceholder { name }),
			}
		}

		Ok(Self { raw, segments })
	}

	/// NSX-T gateway firewall rule layout ([`Self::NSX_GATEWAY_RULES`]).
	pub fn nsx_gateway_rules() -> Self {
		let literal = |text: &str| Segment::Literal(text.into());

		Self {
			raw: Self::NSX_GATEWAY_RULES.into(),
			segments: vec![
				literal("policy"),
				literal("api"),
				literal("v1"),
				literal("infra"),
				literal("domains"),
				Segment::Domain,
				literal("gateway-policies"),
				Segment::Policy,
				literal("rules"),
				Segment::Rule,
			],
		}
	}

	/// Original template text.
	pub fn as_str(&self) -> &str {
		&self.raw
	}

	/// Appends the expanded template to `base`, percent-encoding every segment.
	pub fn resolve(&self, base: &Url, reference: &RuleRef) -> Result<Url, PathTemplateError> {
		let mut url = base.clone();

		{
			let mut path = url
				.path_segments_mut()
				.map_err(|_| PathTemplateError::CannotBeABase { url: base.to_string() })?;

			path.pop_if_empty();

			for segment in &self.segments {
				path.push(match segment {
					Segment::Literal(text) => text.as_str(),
					Segment::Domain => reference.domain.as_ref(),
					Segment::Policy => reference.policy.as_ref(),
					Segment::Rule => reference.rule.as_ref(),
				});
			}
		}

		Ok(url)
	}
}
impl Default for PathTemplate {
	fn default() -> Self {
		Self {
			raw: Self::DEFAULT.into(),
			segments: vec![Segment::Domain, Segment::Policy, Segment::Rule],
		}
	}
}
impl TryFrom<String> for PathTemplate {
	type Error = PathTemplateError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(value)
	}
}
impl From<PathTemplate> for String {
	fn from(value: PathTemplate) -> Self {
		value.raw
	}
}
impl FromStr for PathTemplate {
	type Err = PathTemplateError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl Debug for PathTemplate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "PathTemplate({})", self.raw)
	}
}
impl Display for PathTemplate {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.raw)
	}
}
