//! Colors, icons and labels for resource and relationship types.

/// Visual identity of one resource type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeStyle {
	pub color: &'static str,
	pub icon: &'static str,
	pub label: &'static str,
}

const fn ts(color: &'static str, icon: &'static str, label: &'static str) -> TypeStyle {
	TypeStyle { color, icon, label }
}

pub const GENERIC: TypeStyle = ts("#6B7280", "📦", "Resource");

const TYPE_STYLES: &[(&str, TypeStyle)] = &[
	("ec2", ts("#FF9900", "🖥️", "EC2")),
	("instance", ts("#FF9900", "🖥️", "EC2")),
	("lambda", ts("#FF9900", "λ", "Lambda")),
	("s3", ts("#569A31", "🗄️", "S3")),
	("rds", ts("#527FFF", "🗃️", "RDS")),
	("aurora", ts("#527FFF", "🗃️", "Aurora")),
	("dynamodb", ts("#4053D6", "📊", "DynamoDB")),
	("vpc", ts("#4B92D4", "🔒", "VPC")),
	("subnet", ts("#10B981", "▦", "Subnet")),
	("elb", ts("#8C4FFF", "⚖️", "Load Balancer")),
	("alb", ts("#8C4FFF", "⚖️", "ALB")),
	("nlb", ts("#8C4FFF", "⚖️", "NLB")),
	("elasticloadbalancing", ts("#8C4FFF", "⚖️", "Load Balancer")),
	("cloudfront", ts("#8B5CF6", "🌐", "CloudFront")),
	("route53", ts("#10B981", "🌍", "Route 53")),
	("sns", ts("#FF6B6B", "📨", "SNS")),
	("sqs", ts("#FF9F1C", "📬", "SQS")),
	("codepipeline", ts("#4053D6", "⛓", "Pipeline")),
	("codebuild", ts("#4053D6", "⚙", "CodeBuild")),
];

/// Style for a resource type; unknown types get [`GENERIC`].
pub fn resource_style(kind: &str) -> TypeStyle {
	let kind = kind.to_ascii_lowercase();
	TYPE_STYLES
		.iter()
		.find(|(k, _)| *k == kind)
		.map(|(_, s)| *s)
		.unwrap_or(GENERIC)
}

/// Relationship types offered in forms, with their line colors.
pub const RELATIONSHIP_TYPES: &[(&str, &str, &str)] = &[
	("connects_to", "Connects To", "#8B5CF6"),
	("depends_on", "Depends On", "#F59E0B"),
	("uses", "Uses", "#3B82F6"),
	("triggers", "Triggers", "#EC4899"),
	("streams_to", "Streams To", "#06B6D4"),
	("deploy_to", "Deploy To", "#10B981"),
	("deployed_with", "Deployed With", "#10B981"),
	("references", "References", "#6B7280"),
	("reads_from", "Reads From", "#14B8A6"),
	("writes_to", "Writes To", "#F97316"),
	("invokes", "Invokes", "#A855F7"),
	("authenticates", "Authenticates", "#EF4444"),
];

pub fn relationship_color(kind: &str) -> &'static str {
	RELATIONSHIP_TYPES
		.iter()
		.find(|(k, _, _)| *k == kind)
		.map(|(_, _, c)| *c)
		.unwrap_or("#94A3B8")
}

pub fn status_color(status: Option<&str>) -> &'static str {
	match status.unwrap_or("unknown") {
		"running" | "available" | "active" => "#10B981",
		"stopped" => "#EF4444",
		"in-use" => "#3B82F6",
		"pending" => "#F59E0B",
		"terminated" => "#6B7280",
		_ => "#9CA3AF",
	}
}

/// Cut `name` to 11 characters plus an ellipsis.
pub fn truncate_name(name: &str) -> String {
	const MAX: usize = 11;
	if name.chars().count() > MAX {
		let head: String = name.chars().take(MAX).collect();
		format!("{head}...")
	} else {
		name.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_type_falls_back_to_generic() {
		assert_eq!(resource_style("quantum-ledger"), GENERIC);
		assert_eq!(resource_style("EC2").label, "EC2");
	}

	#[test]
	fn names_are_truncated_on_char_boundaries() {
		assert_eq!(truncate_name("short"), "short");
		assert_eq!(truncate_name("production-web-server"), "production-...");
		assert_eq!(truncate_name("ééééééééééééé"), "ééééééééééé...");
	}

	#[test]
	fn colors_have_fallbacks() {
		assert_eq!(relationship_color("uses"), "#3B82F6");
		assert_eq!(relationship_color("???"), "#94A3B8");
		assert_eq!(status_color(None), "#9CA3AF");
		assert_eq!(status_color(Some("running")), "#10B981");
	}
}
