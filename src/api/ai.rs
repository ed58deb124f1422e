//! AI analysis of the signed-in user's inventory.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::client::{ApiClient, Transport};
use crate::error::ApiError;

/// Longest prompt the backend accepts.
pub const MAX_PROMPT: usize = 2000;

#[derive(Serialize)]
struct PromptRequest<'a> {
	prompt: &'a str,
	include_resources: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Analysis {
	#[serde(default)]
	pub analysis: String,
	#[serde(default)]
	pub summary: Option<String>,
	#[serde(default)]
	pub recommendations: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ArchitectureSummary {
	#[serde(default)]
	pub total_resources: usize,
	#[serde(default)]
	pub resource_breakdown: BTreeMap<String, usize>,
	#[serde(default)]
	pub regions_used: Vec<String>,
	#[serde(default)]
	pub architecture_summary: String,
	#[serde(default)]
	pub cost_optimization_tips: Vec<String>,
	#[serde(default)]
	pub security_recommendations: Vec<String>,
	#[serde(default)]
	pub best_practices: Vec<String>,
}

/// Plain-text report of whatever analysis the user has on screen.
pub fn report(
	prompt: &str,
	analysis: Option<&Analysis>,
	summary: Option<&ArchitectureSummary>,
) -> String {
	let mut out = String::from("AI INSIGHTS\n\n");
	if let Some(summary) = summary {
		let _ = writeln!(out, "ARCHITECTURE SUMMARY\n{}\n", summary.architecture_summary);
		let _ = writeln!(out, "Total resources: {}", summary.total_resources);
		for (kind, count) in &summary.resource_breakdown {
			let _ = writeln!(out, "  {kind}: {count}");
		}
		if !summary.regions_used.is_empty() {
			let _ = writeln!(out, "Regions: {}", summary.regions_used.join(", "));
		}
		for (title, items) in [
			("COST OPTIMIZATION", &summary.cost_optimization_tips),
			("SECURITY", &summary.security_recommendations),
			("BEST PRACTICES", &summary.best_practices),
		] {
			let _ = writeln!(out, "\n{title}");
			for (i, item) in items.iter().enumerate() {
				let _ = writeln!(out, "{}. {item}", i + 1);
			}
		}
		out.push('\n');
	}
	if let Some(analysis) = analysis {
		let (question, answer) = (prompt.trim(), analysis.analysis.trim());
		let _ = writeln!(out, "QUESTION\n{question}\n\nANALYSIS\n{answer}");
	}
	out
}

impl<T: Transport> ApiClient<T> {
	/// Free-text question about the inventory. Blank or over-long prompts
	/// are rejected before sending.
	pub async fn analyze(&self, prompt: &str) -> Result<Analysis, ApiError> {
		let prompt = prompt.trim();
		if prompt.is_empty() {
			return Err(ApiError::Invalid("Enter a question first".into()));
		}
		if prompt.chars().count() > MAX_PROMPT {
			let message = format!("Questions are limited to {MAX_PROMPT} characters");
			return Err(ApiError::Invalid(message));
		}
		let body = PromptRequest { prompt, include_resources: true };
		self.send_json("POST", "/ai/analyze", &body).await
	}

	pub async fn summary(&self) -> Result<ArchitectureSummary, ApiError> {
		let summary: ArchitectureSummary = self.get("/api/ai/summary").await?;
		log::info!("summary covers {} resources", summary.total_resources);
		Ok(summary)
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;

	use super::*;
	use crate::api::client::testing::Scripted;
	use crate::api::session::{MemoryTokens, Session};
	use crate::config::AppConfig;

	fn client(transport: &Scripted) -> ApiClient<Scripted> {
		ApiClient::with_transport(
			transport.clone(),
			AppConfig::with_api_url("http://api"),
			Session::new(MemoryTokens::default()),
		)
	}

	#[test]
	fn blank_and_long_prompts_never_reach_the_backend() {
		let transport = Scripted::default();
		let api = client(&transport);
		assert!(matches!(block_on(api.analyze("   ")), Err(ApiError::Invalid(_))));
		let long = "x".repeat(MAX_PROMPT + 1);
		assert!(matches!(block_on(api.analyze(&long)), Err(ApiError::Invalid(_))));
		assert!(transport.log().is_empty());
	}

	#[test]
	fn analyze_sends_prompt_with_inventory() {
		let transport = Scripted::default();
		transport.reply(200, r#"{"analysis":"Looks fine","summary":"Analyzed 3 resources"}"#);
		let api = client(&transport);
		let result = block_on(api.analyze(" any public buckets? ")).unwrap();
		assert_eq!(result.analysis, "Looks fine");

		let (_, url, _, body) = transport.log().remove(0);
		assert_eq!(url, "http://api/ai/analyze");
		let body: serde_json::Value = serde_json::from_str(body.as_deref().unwrap()).unwrap();
		let expected = serde_json::json!({
			"prompt": "any public buckets?",
			"include_resources": true,
		});
		assert_eq!(body, expected);
	}

	#[test]
	fn unavailable_service_keeps_its_status() {
		let transport = Scripted::default();
		transport.reply(503, r#"{"detail":"Ollama error: connection refused"}"#);
		let api = client(&transport);
		assert!(matches!(block_on(api.analyze("hi")), Err(ApiError::Http { status: 503, .. })));
	}

	#[test]
	fn report_lists_summary_sections_in_order() {
		let summary = ArchitectureSummary {
			total_resources: 2,
			resource_breakdown: BTreeMap::from([("ec2".to_string(), 2)]),
			regions_used: vec!["us-east-1".into()],
			architecture_summary: "Two instances.".into(),
			cost_optimization_tips: vec!["Use reserved instances".into()],
			security_recommendations: vec!["Close port 22".into()],
			best_practices: vec![],
		};
		let text = report("", None, Some(&summary));
		let cost = text.find("COST OPTIMIZATION").unwrap();
		let security = text.find("SECURITY\n1. Close port 22").unwrap();
		assert!(text.contains("  ec2: 2"));
		assert!(cost < security);
		assert!(!text.contains("QUESTION"));
	}
}
