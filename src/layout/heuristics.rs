//! Guessed relations between resources for the navigator.
//!
//! These rules are heuristics over resource types and placement only. The
//! strengths order candidates and set line widths; they say nothing about the
//! real network topology.

use crate::model::{Relationship, Resource, ResourceId};

/// Coarse service family of a resource type string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeClass {
	Dns,
	Cdn,
	LoadBalancer,
	Compute,
	Database,
	Storage,
	Messaging,
	Network,
	Pipeline,
	Other,
}

impl TypeClass {
	pub fn of(kind: &str) -> Self {
		match kind.to_ascii_lowercase().as_str() {
			"route53" | "route_53" | "dns" => TypeClass::Dns,
			"cloudfront" => TypeClass::Cdn,
			"elb" | "alb" | "nlb" | "elasticloadbalancing" | "load_balancer" => {
				TypeClass::LoadBalancer
			}
			"ec2" | "instance" | "lambda" | "ecs" | "eks" | "fargate" => TypeClass::Compute,
			"rds" | "aurora" | "dynamodb" | "elasticache" | "redshift" => TypeClass::Database,
			"s3" | "efs" | "ebs" => TypeClass::Storage,
			"sns" | "sqs" | "kinesis" | "eventbridge" => TypeClass::Messaging,
			"vpc" | "subnet" | "security_group" | "nat_gateway" | "internet_gateway" => {
				TypeClass::Network
			}
			"codepipeline" | "codebuild" | "codecommit" | "codedeploy" => TypeClass::Pipeline,
			_ => TypeClass::Other,
		}
	}
}

/// Placement two resources must share for a rule to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
	Subnet,
	Vpc,
	Region,
	Account,
}

impl Scope {
	fn holds(self, a: &Resource, b: &Resource) -> bool {
		fn same(a: Option<&str>, b: Option<&str>) -> bool {
			matches!((a, b), (Some(x), Some(y)) if x == y)
		}
		match self {
			Scope::Subnet => same(a.subnet(), b.subnet()),
			Scope::Vpc => same(a.vpc(), b.vpc()),
			Scope::Region => same(a.region_name(), b.region_name()),
			Scope::Account => same(a.account(), b.account()),
		}
	}
}

/// One row of the inference table.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
	pub source: TypeClass,
	pub target: TypeClass,
	pub scope: Scope,
	pub relationship_type: &'static str,
	pub strength: f64,
}

const fn rule(
	source: TypeClass,
	target: TypeClass,
	scope: Scope,
	relationship_type: &'static str,
	strength: f64,
) -> Rule {
	Rule { source, target, scope, relationship_type, strength }
}

pub const RULES: &[Rule] = &[
	rule(TypeClass::Dns, TypeClass::LoadBalancer, Scope::Account, "connects_to", 0.9),
	rule(TypeClass::Dns, TypeClass::Cdn, Scope::Account, "connects_to", 0.85),
	rule(TypeClass::LoadBalancer, TypeClass::Compute, Scope::Vpc, "connects_to", 0.9),
	rule(TypeClass::Cdn, TypeClass::Storage, Scope::Account, "reads_from", 0.85),
	rule(TypeClass::Cdn, TypeClass::LoadBalancer, Scope::Account, "connects_to", 0.8),
	rule(TypeClass::Compute, TypeClass::Database, Scope::Vpc, "connects_to", 0.8),
	rule(TypeClass::Compute, TypeClass::Messaging, Scope::Region, "uses", 0.5),
	rule(TypeClass::Compute, TypeClass::Storage, Scope::Region, "uses", 0.4),
	rule(TypeClass::Pipeline, TypeClass::Compute, Scope::Account, "deploy_to", 0.45),
	rule(TypeClass::Network, TypeClass::Compute, Scope::Vpc, "references", 0.3),
];

/// Fallback strength for any two resources in one subnet.
pub const SAME_SUBNET: f64 = 0.6;
/// Fallback strength for any two resources in one VPC.
pub const SAME_VPC: f64 = 0.35;

/// A guessed or known relation from the point of view of one resource.
#[derive(Clone, Debug, PartialEq)]
pub struct Relation {
	/// Index of the other resource.
	pub other: usize,
	pub relationship_type: String,
	pub strength: f64,
	pub inferred: bool,
	/// A known relationship pointing at the viewing resource.
	pub incoming: bool,
}

/// Strongest heuristic relation between `a` and `b`, in either direction.
pub fn infer(a: &Resource, b: &Resource) -> Option<(&'static str, f64)> {
	let (ca, cb) = (TypeClass::of(&a.kind), TypeClass::of(&b.kind));
	let mut best: Option<(&'static str, f64)> = None;
	let mut offer = |kind: &'static str, strength: f64| {
		if best.is_none_or(|(_, s)| strength > s) {
			best = Some((kind, strength));
		}
	};

	for r in RULES {
		let pair = (r.source == ca && r.target == cb) || (r.source == cb && r.target == ca);
		if pair && r.scope.holds(a, b) {
			offer(r.relationship_type, r.strength);
		}
	}
	if Scope::Subnet.holds(a, b) {
		offer("connects_to", SAME_SUBNET);
	}
	if Scope::Vpc.holds(a, b) {
		offer("connects_to", SAME_VPC);
	}
	best
}

/// Every resource related to `resources[focus]`, strongest first.
///
/// Known relationships count with strength 1.0. Ties keep input order.
pub fn relations_of(
	resources: &[Resource],
	relationships: &[Relationship],
	focus: usize,
) -> Vec<Relation> {
	let Some(center) = resources.get(focus) else {
		return Vec::new();
	};
	let mut out: Vec<Relation> = Vec::new();
	for (index, other) in resources.iter().enumerate() {
		if index == focus || other.id == center.id {
			continue;
		}
		if let Some(rel) = known(relationships, center.id, other.id) {
			out.push(Relation {
				other: index,
				relationship_type: rel.relationship_type.clone(),
				strength: 1.0,
				inferred: false,
				incoming: rel.target_resource_id == center.id,
			});
		} else if let Some((kind, strength)) = infer(center, other) {
			out.push(Relation {
				other: index,
				relationship_type: kind.to_string(),
				strength,
				inferred: true,
				incoming: false,
			});
		}
	}
	// stable: ties stay in input order
	out.sort_by(|a, b| b.strength.total_cmp(&a.strength));
	out
}

fn known(relationships: &[Relationship], a: ResourceId, b: ResourceId) -> Option<&Relationship> {
	relationships.iter().find(|r| {
		(r.source_resource_id == a && r.target_resource_id == b)
			|| (r.source_resource_id == b && r.target_resource_id == a)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::fixtures::{relationship, resource};

	#[test]
	fn classifies_common_types() {
		assert_eq!(TypeClass::of("ALB"), TypeClass::LoadBalancer);
		assert_eq!(TypeClass::of("lambda"), TypeClass::Compute);
		assert_eq!(TypeClass::of("dynamodb"), TypeClass::Database);
		assert_eq!(TypeClass::of("something-new"), TypeClass::Other);
	}

	#[test]
	fn load_balancer_and_instance_in_one_vpc() {
		let lb = resource(1, "elb", Some("vpc-1"), Some("subnet-pub"));
		let ec2 = resource(2, "ec2", Some("vpc-1"), Some("subnet-priv"));
		assert_eq!(infer(&lb, &ec2), Some(("connects_to", 0.9)));
		assert_eq!(infer(&ec2, &lb), Some(("connects_to", 0.9)));
	}

	#[test]
	fn rules_respect_scope() {
		let ec2 = resource(1, "ec2", Some("vpc-1"), None);
		let db = resource(2, "rds", Some("vpc-2"), None);
		assert_eq!(infer(&ec2, &db), None);
	}

	#[test]
	fn fallbacks_for_shared_placement() {
		let a = resource(1, "mystery", Some("vpc-1"), Some("subnet-1"));
		let b = resource(2, "other", Some("vpc-1"), Some("subnet-1"));
		let c = resource(3, "other", Some("vpc-1"), Some("subnet-2"));
		assert_eq!(infer(&a, &b), Some(("connects_to", SAME_SUBNET)));
		assert_eq!(infer(&a, &c), Some(("connects_to", SAME_VPC)));
	}

	#[test]
	fn known_relationships_rank_first() {
		let resources = vec![
			resource(1, "ec2", Some("vpc-1"), None),
			resource(2, "rds", Some("vpc-1"), None),
			resource(3, "s3", None, None),
			resource(4, "elb", Some("vpc-1"), None),
		];
		let rels = vec![relationship(10, 3, 1, "writes_to")];
		let related = relations_of(&resources, &rels, 0);
		let order: Vec<usize> = related.iter().map(|r| r.other).collect();
		assert_eq!(order, vec![2, 3, 1]);
		assert!(!related[0].inferred);
		assert!(related[0].incoming);
		assert_eq!(related[0].relationship_type, "writes_to");
		assert!(!related[1].incoming);
	}

	#[test]
	fn unrelated_focus_has_no_relations() {
		let mut lonely = resource(1, "ec2", Some("vpc-1"), None);
		lonely.region = Some("ap-south-1".into());
		lonely.account_id = Some("222222222222".into());
		let resources = vec![lonely, resource(2, "s3", None, None)];
		assert!(relations_of(&resources, &[], 0).is_empty());
	}
}
