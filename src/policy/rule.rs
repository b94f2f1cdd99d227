//! Firewall rule payload sent to and read from the policy API.

// self
use crate::_prelude::*;

/// Verdict applied to matching traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleAction {
	/// Let the traffic through.
	Allow,
	/// Silently discard the traffic; NSX reports this verdict as `DROP`.
	#[serde(alias = "DROP")]
	Deny,
	/// Discard the traffic and notify the sender.
	Reject,
}
impl RuleAction {
	/// Returns the wire label.
	pub const fn as_str(self) -> &'static str {
		match self {
			RuleAction::Allow => "ALLOW",
			RuleAction::Deny => "DENY",
			RuleAction::Reject => "REJECT",
		}
	}
}
impl Display for RuleAction {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors produced by [`RuleSpecBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RuleSpecBuilderError {
	/// Issued when no action was provided.
	#[error("Rule action is required.")]
	MissingAction,
	/// Issued when the display name is empty.
	#[error("Rule display name is required.")]
	MissingDisplayName,
}

/// Subset of the gateway firewall rule model exercised by this crate.
///
/// Only these fields are sent on writes, so a PATCH leaves every other server-side field
/// untouched. Unknown fields in responses are ignored; missing ones fail the read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
	/// Verdict for matching traffic.
	pub action: RuleAction,
	/// Human-readable name.
	pub display_name: String,
	/// Ordered enforcement points, e.g. `/infra/labels/cgw-all`.
	pub scope: Vec<String>,
	/// Service paths, or `ANY`.
	pub services: BTreeSet<String>,
	/// Source group paths, or `ANY`.
	pub source_groups: BTreeSet<String>,
	/// Destination group paths, or `ANY`.
	pub destination_groups: BTreeSet<String>,
}
impl RuleSpec {
	/// Wildcard accepted by the services and group fields.
	pub const ANY: &'static str = "ANY";

	/// Returns a builder for assembling a rule.
	pub fn builder() -> RuleSpecBuilder {
		RuleSpecBuilder::default()
	}
}

/// Builder for [`RuleSpec`].
#[derive(Clone, Debug, Default)]
pub struct RuleSpecBuilder {
	action: Option<RuleAction>,
	display_name: String,
	scope: Vec<String>,
	services: BTreeSet<String>,
	source_groups: BTreeSet<String>,
	destination_groups: BTreeSet<String>,
}
impl RuleSpecBuilder {
	/// Sets the verdict.
	pub fn action(mut self, action: RuleAction) -> Self {
		self.action = Some(action);

		self
	}

	/// Sets the display name.
	pub fn display_name(mut self, name: impl Into<String>) -> Self {
		self.display_name = name.into();

		self
	}

	/// Appends one scope path, keeping insertion order.
	pub fn scope(mut self, path: impl Into<String>) -> Self {
		self.scope.push(path.into());

		self
	}

	/// Adds service paths.
	pub fn services<I, S>(mut self, services: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.services.extend(services.into_iter().map(Into::into));

		self
	}

	/// Adds source group paths.
	pub fn source_groups<I, S>(mut self, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.source_groups.extend(groups.into_iter().map(Into::into));

		self
	}

	/// Adds destination group paths.
	pub fn destination_groups<I, S>(mut self, groups: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.destination_groups.extend(groups.into_iter().map(Into::into));

		self
	}

	/// Matches any service, source, and destination.
	pub fn match_any(self) -> Self {
		self.services([RuleSpec::ANY])
			.source_groups([RuleSpec::ANY])
			.destination_groups([RuleSpec::ANY])
	}

	/// Consumes the builder and produces a [`RuleSpec`].
	pub fn build(self) -> Result<RuleSpec, RuleSpecBuilderError> {
		let action = self.action.ok_or(RuleSpecBuilderError::MissingAction)?;

		if self.display_name.trim().is_empty() {
			return Err(RuleSpecBuilderError::MissingDisplayName);
		}

		Ok(RuleSpec {
			action,
			display_name: self.display_name,
			scope: self.scope,
			services: self.services,
			source_groups: self.source_groups,
			destination_groups: self.destination_groups,
		})
	}
}
