//! AWS account connection: credential check and resource scan.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Transport};
use crate::error::ApiError;

/// Resource families the backend scanner knows, as (id, label).
pub const SCANNABLE: &[(&str, &str)] = &[
	("ec2", "EC2 Instances"),
	("rds", "RDS Databases"),
	("lambda", "Lambda Functions"),
	("s3", "S3 Buckets"),
	("elb", "Load Balancers"),
	("vpc", "VPCs"),
	("ecs", "ECS Clusters"),
	("eks", "EKS Clusters"),
	("dynamodb", "DynamoDB Tables"),
	("sns", "SNS Topics"),
	("sqs", "SQS Queues"),
	("apigateway", "API Gateway"),
	("codepipeline", "CodePipeline"),
];

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AwsCredentials {
	pub aws_access_key_id: String,
	pub aws_secret_access_key: String,
	pub region: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub aws_session_token: Option<String>,
}

impl Default for AwsCredentials {
	fn default() -> Self {
		Self {
			aws_access_key_id: String::new(),
			aws_secret_access_key: String::new(),
			region: "us-east-1".into(),
			aws_session_token: None,
		}
	}
}

impl AwsCredentials {
	pub fn is_complete(&self) -> bool {
		!self.aws_access_key_id.trim().is_empty()
			&& !self.aws_secret_access_key.trim().is_empty()
			&& !self.region.trim().is_empty()
	}
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ConnectionInfo {
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub account_id: Option<String>,
	#[serde(default)]
	pub current_region: Option<String>,
	#[serde(default)]
	pub available_regions: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScanRequest<'a> {
	pub credentials: &'a AwsCredentials,
	/// `None` scans every family.
	pub resource_types: Option<Vec<String>>,
}

impl<'a> ScanRequest<'a> {
	/// Selecting every family, or none, sends no filter.
	pub fn new(credentials: &'a AwsCredentials, selected: &[String]) -> Self {
		let all = SCANNABLE.iter().all(|(id, _)| selected.iter().any(|s| s == id));
		let resource_types = (!all && !selected.is_empty()).then(|| selected.to_vec());
		Self { credentials, resource_types }
	}
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ScanReport {
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub message: String,
	#[serde(default)]
	pub resources_found: BTreeMap<String, usize>,
	#[serde(default)]
	pub import_stats: Option<BTreeMap<String, usize>>,
}

impl ScanReport {
	pub fn total_found(&self) -> usize {
		self.resources_found.values().sum()
	}
}

impl<T: Transport> ApiClient<T> {
	pub async fn test_connection(
		&self,
		credentials: &AwsCredentials,
	) -> Result<ConnectionInfo, ApiError> {
		let info: ConnectionInfo =
			self.send_json("POST", "/api/aws/test-connection", credentials).await?;
		log::info!("AWS account {} reachable", info.account_id.as_deref().unwrap_or("?"));
		Ok(info)
	}

	/// Scan the account and import what was found. Can take minutes.
	pub async fn scan(&self, request: &ScanRequest<'_>) -> Result<ScanReport, ApiError> {
		let report: ScanReport = self.send_json("POST", "/api/aws/scan", request).await?;
		log::info!("AWS scan found {} resources", report.total_found());
		Ok(report)
	}
}
