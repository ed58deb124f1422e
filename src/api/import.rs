//! Spreadsheet import: upload, optional AI analysis, preview and batched
//! execute.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::client::{ApiClient, Transport};
use crate::error::ApiError;

pub type Record = Map<String, Value>;

/// Parsed workbook returned by `/api/import/upload`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct UploadResult {
	#[serde(default)]
	pub file_type: Option<String>,
	#[serde(default)]
	pub sheet_names: Vec<String>,
	#[serde(default)]
	pub sheets: BTreeMap<String, Vec<Record>>,
	#[serde(default)]
	pub total_rows: usize,
}

impl UploadResult {
	/// Column names of `sheet`, first-seen order across its rows.
	pub fn columns(&self, sheet: &str) -> Vec<String> {
		let mut out: Vec<String> = Vec::new();
		for row in self.sheets.get(sheet).into_iter().flatten() {
			for key in row.keys() {
				if !out.contains(key) {
					out.push(key.clone());
				}
			}
		}
		out
	}
}

/// Rows sent for mapping suggestions.
pub const ANALYZE_SAMPLE: usize = 5;

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
	sheet_name: &'a str,
	sample_data: &'a [Record],
}

#[derive(Deserialize)]
struct AnalyzeResponse {
	#[serde(default)]
	analysis: MappingSuggestion,
}

/// Column mappings proposed by the backend's model.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MappingSuggestion {
	#[serde(default)]
	pub detected_resource_type: Option<String>,
	#[serde(default)]
	pub field_mappings: BTreeMap<String, String>,
	#[serde(default)]
	pub type_specific_mappings: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PreviewRequest<'a> {
	pub sheet_data: &'a [Record],
	/// Source column → resource field.
	pub field_mappings: &'a BTreeMap<String, String>,
	pub type_specific_mappings: &'a BTreeMap<String, String>,
	pub resource_type: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct InvalidRow {
	#[serde(default)]
	pub row: usize,
	#[serde(default)]
	pub errors: Vec<String>,
	#[serde(default)]
	pub warnings: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Preview {
	#[serde(default)]
	pub valid_count: usize,
	#[serde(default)]
	pub invalid_count: usize,
	#[serde(default)]
	pub valid_resources: Vec<Record>,
	#[serde(default)]
	pub invalid_resources: Vec<InvalidRow>,
}

#[derive(Serialize)]
struct ExecuteRequest<'a> {
	resources: &'a [Record],
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RowError {
	#[serde(default)]
	pub resource: String,
	#[serde(default)]
	pub error: String,
}

/// Response of one `/api/import/execute` call.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ExecuteResponse {
	#[serde(default, alias = "imported_count")]
	pub created: usize,
	#[serde(default)]
	pub updated: usize,
	#[serde(default)]
	pub error_count: usize,
	#[serde(default)]
	pub errors: Vec<RowError>,
}

/// Counts accumulated over every batch of an import.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportTally {
	pub created: usize,
	pub updated: usize,
	pub errors: usize,
	pub batches: usize,
	pub failed_batches: usize,
	pub messages: Vec<String>,
}

impl ImportTally {
	/// Fold in the outcome of a batch of `size` records. A failed batch
	/// counts every record as an error.
	pub fn absorb(&mut self, size: usize, outcome: Result<ExecuteResponse, ApiError>) {
		self.batches += 1;
		match outcome {
			Ok(resp) => {
				self.created += resp.created;
				self.updated += resp.updated;
				self.errors += resp.error_count.max(resp.errors.len());
				let failures = resp.errors.into_iter().map(|e| {
					format!("{}: {}", e.resource, e.error)
				});
				self.messages.extend(failures);
			}
			Err(err) => {
				self.failed_batches += 1;
				self.errors += size;
				self.messages.push(format!("batch {} failed: {err}", self.batches));
			}
		}
	}

	pub fn total(&self) -> usize {
		self.created + self.updated + self.errors
	}
}

impl<T: Transport> ApiClient<T> {
	/// Send the file for parsing. `use_ai` lets the backend clean up messy
	/// sheets with its model.
	pub async fn upload(
		&self,
		file: &web_sys::File,
		use_ai: bool,
	) -> Result<UploadResult, ApiError> {
		let form = web_sys::FormData::new().map_err(|e| ApiError::Network(format!("{e:?}")))?;
		form.append_with_blob_and_filename("file", file, &file.name())
			.map_err(|e| ApiError::Network(format!("{e:?}")))?;
		form.append_with_str("use_ai", if use_ai { "true" } else { "false" })
			.map_err(|e| ApiError::Network(format!("{e:?}")))?;
		let result: UploadResult = self.send_form("/api/import/upload", form).await?;
		log::info!("parsed {} rows across {} sheets", result.total_rows, result.sheet_names.len());
		Ok(result)
	}

	/// Ask for mapping suggestions from the first rows of `sheet`.
	pub async fn analyze_sheet(
		&self,
		sheet: &str,
		rows: &[Record],
	) -> Result<MappingSuggestion, ApiError> {
		let sample = &rows[..rows.len().min(ANALYZE_SAMPLE)];
		let body = AnalyzeRequest { sheet_name: sheet, sample_data: sample };
		let resp: AnalyzeResponse = self.send_json("POST", "/api/import/analyze", &body).await?;
		log::info!("model suggested {} column mappings", resp.analysis.field_mappings.len());
		Ok(resp.analysis)
	}

	pub async fn preview(&self, request: &PreviewRequest<'_>) -> Result<Preview, ApiError> {
		self.send_json("POST", "/api/import/preview", request).await
	}

	/// Send `records` sequentially in batches of the configured size. Failed
	/// batches are counted and skipped, never retried or rolled back.
	/// `progress` sees the tally after every batch.
	pub async fn execute_import(
		&self,
		records: &[Record],
		mut progress: impl FnMut(&ImportTally),
	) -> ImportTally {
		let mut tally = ImportTally::default();
		for batch in records.chunks(self.config().import_batch_size.max(1)) {
			let outcome = self
				.send_json("POST", "/api/import/execute", &ExecuteRequest { resources: batch })
				.await;
			if let Err(err) = &outcome {
				log::warn!("import batch of {} failed: {err}", batch.len());
			}
			tally.absorb(batch.len(), outcome);
			progress(&tally);
		}
		log::info!(
			"import finished: {} created, {} updated, {} errors",
			tally.created,
			tally.updated,
			tally.errors
		);
		tally
	}
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use serde_json::json;

	use super::*;
	use crate::api::client::testing::Scripted;
	use crate::api::session::{MemoryTokens, Session};
	use crate::config::AppConfig;

	fn records(n: usize) -> Vec<Record> {
		(0..n)
			.map(|i| {
				let Value::Object(map) = json!({ "name": format!("r{i}"), "type": "ec2" }) else {
					unreachable!()
				};
				map
			})
			.collect()
	}

	#[test]
	fn execute_response_accepts_imported_count() {
		let resp: ExecuteResponse = serde_json::from_str(
			r#"{"success":true,"imported_count":3,"error_count":1,"errors":[{"resource":"x","error":"bad"}]}"#,
		)
		.unwrap();
		assert_eq!(resp.created, 3);
		assert_eq!(resp.error_count, 1);
	}

	#[test]
	fn failed_batch_counts_all_records_as_errors() {
		let mut tally = ImportTally::default();
		let batch = ExecuteResponse { created: 48, updated: 1, error_count: 1, errors: vec![] };
		tally.absorb(50, Ok(batch));
		tally.absorb(20, Err(ApiError::Network("offline".into())));
		assert_eq!(tally.created, 48);
		assert_eq!(tally.updated, 1);
		assert_eq!(tally.errors, 21);
		assert_eq!(tally.failed_batches, 1);
		assert_eq!(tally.total(), 70);
	}

	#[test]
	fn records_are_sent_in_batches_of_fifty() {
		let transport = Scripted::default();
		transport
			.reply(200, r#"{"imported_count":50,"error_count":0,"errors":[]}"#)
			.reply(500, r#"{"detail":"Database error"}"#)
			.reply(
				200,
				r#"{"imported_count":19,"error_count":1,"errors":[{"resource":"r120","error":"dup"}]}"#,
			);
		let session = Session::new(MemoryTokens::default());
		let config = AppConfig::with_api_url("http://api");
		let client = ApiClient::with_transport(transport.clone(), config, session);

		let mut seen = Vec::new();
		let tally = block_on(client.execute_import(&records(120), |t| seen.push(t.batches)));

		let sizes: Vec<usize> = transport
			.log()
			.iter()
			.map(|(_, _, _, body)| {
				let body: Value = serde_json::from_str(body.as_deref().unwrap()).unwrap();
				body["resources"].as_array().unwrap().len()
			})
			.collect();
		assert_eq!(sizes, vec![50, 50, 20]);
		assert_eq!(seen, vec![1, 2, 3]);
		assert_eq!(tally.created, 69);
		assert_eq!(tally.errors, 51);
		assert_eq!(tally.failed_batches, 1);
		assert_eq!(tally.messages.len(), 2);
	}

	#[test]
	fn analysis_sends_a_small_sample_and_reads_suggestions() {
		let transport = Scripted::default();
		transport.reply(
			200,
			r#"{"success":true,"analysis":{"detected_resource_type":"rds",
			"field_mappings":{"DB Name":"name","Engine":"type"},"arn_column":null}}"#,
		);
		let session = Session::new(MemoryTokens::default());
		let config = AppConfig::with_api_url("http://api");
		let client = ApiClient::with_transport(transport.clone(), config, session);

		let suggestion = block_on(client.analyze_sheet("Databases", &records(12))).unwrap();
		assert_eq!(suggestion.detected_resource_type.as_deref(), Some("rds"));
		assert_eq!(suggestion.field_mappings["DB Name"], "name");
		assert!(suggestion.type_specific_mappings.is_empty());

		let (_, url, _, body) = transport.log().remove(0);
		assert_eq!(url, "http://api/api/import/analyze");
		let body: Value = serde_json::from_str(body.as_deref().unwrap()).unwrap();
		assert_eq!(body["sheet_name"], "Databases");
		assert_eq!(body["sample_data"].as_array().unwrap().len(), ANALYZE_SAMPLE);
	}

	#[test]
	fn columns_follow_first_seen_order() {
		let upload: UploadResult = serde_json::from_value(json!({
			"sheet_names": ["Sheet1"],
			"sheets": {
				"Sheet1": [{ "Name": "a", "Type": "ec2" }, { "Name": "b", "Region": "eu" }]
			},
			"total_rows": 2
		}))
		.unwrap();
		assert_eq!(upload.columns("Sheet1"), vec!["Name", "Type", "Region"]);
		assert!(upload.columns("missing").is_empty());
	}
}
