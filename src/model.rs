//! Records exchanged with the inventory backend.
//!
//! The backend owns these; the client only reads them and posts small
//! creation/update bodies for relationships.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend identity of a resource.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub i64);

impl fmt::Display for ResourceId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A tracked cloud resource. Unknown fields sent by the backend are ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
	pub id: ResourceId,
	#[serde(default)]
	pub name: String,
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub region: Option<String>,
	#[serde(default)]
	pub account_id: Option<String>,
	/// AWS-side identifier, e.g. `subnet-0abc` or `vpc-0123`.
	#[serde(default)]
	pub resource_id: Option<String>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub environment: Option<String>,
	#[serde(default)]
	pub vpc_id: Option<String>,
	#[serde(default)]
	pub subnet_id: Option<String>,
	#[serde(default)]
	pub instance_type: Option<String>,
	#[serde(default)]
	pub private_ip: Option<String>,
	#[serde(default)]
	pub public_ip: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

impl Resource {
	/// The VPC this resource is placed in; blank strings count as missing.
	pub fn vpc(&self) -> Option<&str> {
		non_blank(self.vpc_id.as_deref())
	}

	/// The subnet this resource is placed in; blank strings count as missing.
	pub fn subnet(&self) -> Option<&str> {
		non_blank(self.subnet_id.as_deref())
	}

	pub fn region_name(&self) -> Option<&str> {
		non_blank(self.region.as_deref())
	}

	pub fn account(&self) -> Option<&str> {
		non_blank(self.account_id.as_deref())
	}

	pub fn aws_id(&self) -> Option<&str> {
		non_blank(self.resource_id.as_deref())
	}

	pub fn kind_lower(&self) -> String {
		self.kind.to_ascii_lowercase()
	}
}

fn non_blank(value: Option<&str>) -> Option<&str> {
	value.map(str::trim).filter(|v| !v.is_empty())
}

/// Directed relationship between two resources.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
	pub id: i64,
	pub source_resource_id: ResourceId,
	pub target_resource_id: ResourceId,
	#[serde(default = "default_relationship_type")]
	pub relationship_type: String,
	#[serde(default)]
	pub port: Option<u16>,
	#[serde(default)]
	pub protocol: Option<String>,
	#[serde(default)]
	pub label: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
	#[serde(default)]
	pub status: Option<String>,
	#[serde(default)]
	pub auto_detected: bool,
}

fn default_relationship_type() -> String {
	"connects_to".into()
}

/// Body posted when the user connects two resources.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewRelationship {
	pub source_resource_id: ResourceId,
	pub target_resource_id: ResourceId,
	pub relationship_type: String,
	pub direction: String,
	pub port: Option<u16>,
	pub protocol: Option<String>,
	pub label: Option<String>,
	pub description: Option<String>,
	pub status: String,
	pub auto_detected: bool,
}

impl NewRelationship {
	pub fn between(source: ResourceId, target: ResourceId, relationship_type: &str) -> Self {
		Self {
			source_resource_id: source,
			target_resource_id: target,
			relationship_type: relationship_type.to_string(),
			direction: "outbound".into(),
			port: None,
			protocol: None,
			label: None,
			description: None,
			status: "active".into(),
			auto_detected: false,
		}
	}
}

/// Partial update of a relationship. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RelationshipUpdate {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source_resource_id: Option<ResourceId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub target_resource_id: Option<ResourceId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub relationship_type: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
}

impl RelationshipUpdate {
	/// Update that flips source and target of `rel`.
	pub fn swapped(rel: &Relationship) -> Self {
		Self {
			source_resource_id: Some(rel.target_resource_id),
			target_resource_id: Some(rel.source_resource_id),
			..Self::default()
		}
	}

	/// Full replacement from the edit form. A blank description clears it.
	pub fn edited(
		source: ResourceId,
		target: ResourceId,
		relationship_type: &str,
		description: &str,
	) -> Self {
		Self {
			source_resource_id: Some(source),
			target_resource_id: Some(target),
			relationship_type: Some(relationship_type.to_string()),
			description: Some(description.trim().to_string()),
		}
	}
}

/// Body of a resource create or full update.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResourceDraft {
	pub name: String,
	#[serde(rename = "type")]
	pub kind: String,
	pub region: String,
	pub account_id: Option<String>,
	pub resource_id: Option<String>,
	pub status: Option<String>,
	pub environment: Option<String>,
	pub vpc_id: Option<String>,
	pub subnet_id: Option<String>,
	pub instance_type: Option<String>,
	pub private_ip: Option<String>,
	pub public_ip: Option<String>,
	pub description: Option<String>,
}

impl Default for ResourceDraft {
	fn default() -> Self {
		Self {
			name: String::new(),
			kind: "ec2".into(),
			region: "us-east-1".into(),
			account_id: None,
			resource_id: None,
			status: Some("unknown".into()),
			environment: None,
			vpc_id: None,
			subnet_id: None,
			instance_type: None,
			private_ip: None,
			public_ip: None,
			description: None,
		}
	}
}

impl From<&Resource> for ResourceDraft {
	fn from(r: &Resource) -> Self {
		Self {
			name: r.name.clone(),
			kind: r.kind.clone(),
			region: r.region.clone().unwrap_or_default(),
			account_id: r.account_id.clone(),
			resource_id: r.resource_id.clone(),
			status: r.status.clone(),
			environment: r.environment.clone(),
			vpc_id: r.vpc_id.clone(),
			subnet_id: r.subnet_id.clone(),
			instance_type: r.instance_type.clone(),
			private_ip: r.private_ip.clone(),
			public_ip: r.public_ip.clone(),
			description: r.description.clone(),
		}
	}
}

impl ResourceDraft {
	/// Trim every field and drop blank optional ones.
	pub fn normalized(mut self) -> Self {
		fn tidy(value: &mut Option<String>) {
			*value = value.take().map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
		}
		self.name = self.name.trim().to_string();
		self.kind = self.kind.trim().to_ascii_lowercase();
		self.region = self.region.trim().to_string();
		for field in [
			&mut self.account_id,
			&mut self.resource_id,
			&mut self.status,
			&mut self.environment,
			&mut self.vpc_id,
			&mut self.subnet_id,
			&mut self.instance_type,
			&mut self.private_ip,
			&mut self.public_ip,
			&mut self.description,
		] {
			tidy(field);
		}
		self
	}

	/// Checks the backend would reject with a 422: name, type and region are
	/// required, an account id is at most 12 digits.
	pub fn validate(&self) -> Result<(), String> {
		if self.name.trim().is_empty() {
			return Err("Name is required".into());
		}
		if self.kind.trim().is_empty() {
			return Err("Type is required".into());
		}
		if self.region.trim().is_empty() {
			return Err("Region is required".into());
		}
		if let Some(account) = non_blank(self.account_id.as_deref()) {
			if account.len() > 12 || !account.chars().all(|c| c.is_ascii_digit()) {
				return Err(format!("Account id '{account}' must be up to 12 digits"));
			}
		}
		Ok(())
	}
}

/// Account and VPC filter applied before layout. `None` means "all".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResourceFilter {
	pub account: Option<String>,
	pub vpc: Option<String>,
}

impl ResourceFilter {
	pub fn matches(&self, resource: &Resource) -> bool {
		let account_ok = match &self.account {
			Some(account) => resource.account() == Some(account.as_str()),
			None => true,
		};
		let vpc_ok = match &self.vpc {
			Some(vpc) => resource.vpc() == Some(vpc.as_str()),
			None => true,
		};
		account_ok && vpc_ok
	}

	/// Filtered copy, input order preserved.
	pub fn apply(&self, resources: &[Resource]) -> Vec<Resource> {
		resources.iter().filter(|r| self.matches(r)).cloned().collect()
	}
}

/// Distinct account ids in first-seen order.
pub fn accounts(resources: &[Resource]) -> Vec<String> {
	distinct(resources.iter().filter_map(Resource::account))
}

/// Distinct VPC ids in first-seen order.
pub fn vpcs(resources: &[Resource]) -> Vec<String> {
	distinct(resources.iter().filter_map(Resource::vpc))
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
	let mut out: Vec<String> = Vec::new();
	for value in values {
		if !out.iter().any(|v| v == value) {
			out.push(value.to_string());
		}
	}
	out
}
