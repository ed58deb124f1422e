use std::collections::BTreeMap;

use leptos::prelude::*;
use leptos::task::spawn_local;

use super::{ErrorBanner, alert, confirm, require_session, use_api};
use crate::api::import::{ImportTally, MappingSuggestion, Preview, PreviewRequest, UploadResult};

/// Resource fields a column can be mapped onto.
const FIELDS: &[&str] = &[
	"name",
	"type",
	"region",
	"resource_id",
	"account_id",
	"status",
	"environment",
	"vpc_id",
	"subnet_id",
	"instance_type",
	"private_ip",
	"public_ip",
	"description",
];

/// Field a spreadsheet column most likely holds, by normalized header.
fn guess_field(column: &str) -> Option<&'static str> {
	let key: String = column
		.trim()
		.to_ascii_lowercase()
		.chars()
		.map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
		.collect();
	let key = match key.as_str() {
		"resource_name" | "instance_name" => "name",
		"resource_type" | "kind" => "type",
		"vpc" => "vpc_id",
		"subnet" => "subnet_id",
		"account" => "account_id",
		"state" => "status",
		"env" => "environment",
		other => other,
	};
	FIELDS.iter().copied().find(|f| *f == key)
}

fn default_mappings(columns: &[String]) -> BTreeMap<String, String> {
	columns
		.iter()
		.filter_map(|c| guess_field(c).map(|f| (c.clone(), f.to_string())))
		.collect()
}

/// Suggested mappings restricted to columns the sheet has and fields the
/// form offers; columns the model skipped keep their header guess.
fn merge_suggestion(
	columns: &[String],
	suggestion: &MappingSuggestion,
) -> BTreeMap<String, String> {
	let mut out = default_mappings(columns);
	for (column, field) in &suggestion.field_mappings {
		if columns.contains(column) && FIELDS.contains(&field.as_str()) {
			out.insert(column.clone(), field.clone());
		}
	}
	out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
	Upload,
	Map,
	Preview,
	Done,
}

/// Upload a spreadsheet, map its columns, preview and import in batches.
#[component]
pub fn Import() -> impl IntoView {
	let api = StoredValue::new(use_api());
	require_session(&api.get_value());

	let step = RwSignal::new(Step::Upload);
	let busy = RwSignal::new(false);
	let error = RwSignal::new(None::<String>);
	let upload = RwSignal::new(None::<UploadResult>);
	let sheet = RwSignal::new(String::new());
	let resource_type = RwSignal::new("ec2".to_string());
	let mappings = RwSignal::new(BTreeMap::<String, String>::new());
	let type_specific = RwSignal::new(BTreeMap::<String, String>::new());
	let use_ai = RwSignal::new(false);
	let analyzing = RwSignal::new(false);
	let preview = RwSignal::new(None::<Preview>);
	let tally = RwSignal::new(None::<ImportTally>);
	let input_ref = NodeRef::<leptos::html::Input>::new();

	let columns = Signal::derive(move || {
		upload.with(|u| u.as_ref().map(|u| u.columns(&sheet.get())).unwrap_or_default())
	});
	let sheet_rows = move || {
		upload.with_untracked(|u| {
			u.as_ref()
				.and_then(|u| u.sheets.get(&sheet.get_untracked()).cloned())
				.unwrap_or_default()
		})
	};

	let select_sheet = move |name: String| {
		sheet.set(name);
		mappings.set(default_mappings(&columns.get_untracked()));
		type_specific.set(BTreeMap::new());
	};

	let on_upload = move |_| {
		let file = input_ref
			.get_untracked()
			.and_then(|input| input.files())
			.and_then(|files| files.get(0));
		let Some(file) = file else {
			alert("Choose an Excel (.xlsx, .xls) or CSV (.csv) file first");
			return;
		};
		let api = api.get_value();
		let ai = use_ai.get_untracked();
		busy.set(true);
		error.set(None);
		spawn_local(async move {
			match api.upload(&file, ai).await {
				Ok(result) => {
					let first = result.sheet_names.first().cloned().unwrap_or_default();
					upload.set(Some(result));
					select_sheet(first);
					step.set(Step::Map);
				}
				Err(err) => error.set(Some(err.to_string())),
			}
			busy.set(false);
		});
	};

	let on_analyze = move |_| {
		let api = api.get_value();
		analyzing.set(true);
		error.set(None);
		spawn_local(async move {
			let rows = sheet_rows();
			match api.analyze_sheet(&sheet.get_untracked(), &rows).await {
				Ok(suggestion) => {
					mappings.set(merge_suggestion(&columns.get_untracked(), &suggestion));
					type_specific.set(suggestion.type_specific_mappings);
					let detected = suggestion.detected_resource_type;
					if let Some(kind) = detected.filter(|k| !k.trim().is_empty()) {
						resource_type.set(kind);
					}
				}
				Err(err) => {
					log::warn!("mapping analysis failed: {err}");
					alert(&format!("AI analysis failed, map the columns by hand: {err}"));
				}
			}
			analyzing.set(false);
		});
	};

	let on_preview = move |_| {
		let api = api.get_value();
		busy.set(true);
		error.set(None);
		spawn_local(async move {
			let rows = sheet_rows();
			let (fields, kind) = (mappings.get_untracked(), resource_type.get_untracked());
			let overrides = type_specific.get_untracked();
			let request = PreviewRequest {
				sheet_data: &rows,
				field_mappings: &fields,
				type_specific_mappings: &overrides,
				resource_type: &kind,
			};
			match api.preview(&request).await {
				Ok(result) => {
					preview.set(Some(result));
					step.set(Step::Preview);
				}
				Err(err) => error.set(Some(err.to_string())),
			}
			busy.set(false);
		});
	};

	let on_execute = move |_| {
		let records = preview.with_untracked(|p| p.as_ref().map(|p| p.valid_resources.clone()));
		let Some(records) = records else {
			return;
		};
		if records.is_empty() {
			alert("Nothing to import");
			return;
		}
		let api = api.get_value();
		busy.set(true);
		spawn_local(async move {
			let result = api.execute_import(&records, |t| tally.set(Some(t.clone()))).await;
			tally.set(Some(result));
			step.set(Step::Done);
			busy.set(false);
		});
	};

	let on_cancel = move |_| {
		let started = step.get_untracked() != Step::Upload;
		if started && !confirm("Cancel this import? All progress will be lost.") {
			return;
		}
		step.set(Step::Upload);
		upload.set(None);
		preview.set(None);
		tally.set(None);
		mappings.set(BTreeMap::new());
		type_specific.set(BTreeMap::new());
		error.set(None);
	};

	view! {
		<div class="page import">
			<header class="toolbar">
				<h1>"Import resources"</h1>
				<button on:click=on_cancel>"Start over"</button>
			</header>
			<ErrorBanner error=error />

			<Show when=move || step.get() == Step::Upload>
				<section>
					<input type="file" accept=".xlsx,.xls,.csv" node_ref=input_ref />
					<label>
						<input
							type="checkbox"
							prop:checked=move || use_ai.get()
							on:change=move |_| use_ai.update(|on| *on = !*on)
						/>
						"Let AI clean up the sheet while parsing"
					</label>
					<button disabled=move || busy.get() on:click=on_upload>
						{move || if busy.get() { "Uploading..." } else { "Upload" }}
					</button>
				</section>
			</Show>

			<Show when=move || step.get() == Step::Map>
				<section>
					<label>
						"Sheet"
						<select
							prop:value=move || sheet.get()
							on:change=move |ev| select_sheet(event_target_value(&ev))
						>
							{move || {
								let names = upload.with(|u| {
									u.as_ref().map(|u| u.sheet_names.clone()).unwrap_or_default()
								});
								names
									.into_iter()
									.map(|name| {
										{ let value = name.clone(); view! { <option value=value>{name}</option> } }
									})
									.collect_view()
							}}
						</select>
					</label>
					<button disabled=move || analyzing.get() on:click=on_analyze>
						{move || match analyzing.get() {
							true => "Analyzing...",
							false => "Suggest mappings with AI",
						}}
					</button>
					<label>
						"Resource type"
						<input
							type="text"
							prop:value=move || resource_type.get()
							on:input=move |ev| resource_type.set(event_target_value(&ev))
						/>
					</label>
					<table class="mappings">
						<thead>
							<tr>
								<th>"Column"</th>
								<th>"Field"</th>
							</tr>
						</thead>
						<tbody>
							<For each=move || columns.get() key=|c| c.clone() let:column>
								<MappingRow column=column mappings=mappings />
							</For>
						</tbody>
					</table>
					<button disabled=move || busy.get() on:click=on_preview>"Preview"</button>
				</section>
			</Show>

			<Show when=move || matches!(step.get(), Step::Preview | Step::Done)>
				{move || preview.get().map(preview_summary)}
				<Show when=move || step.get() == Step::Preview>
					<button disabled=move || busy.get() on:click=on_execute>
						{move || if busy.get() { "Importing..." } else { "Import" }}
					</button>
				</Show>
				{move || tally.get().map(tally_summary)}
			</Show>
		</div>
	}
}

#[component]
fn MappingRow(column: String, mappings: RwSignal<BTreeMap<String, String>>) -> impl IntoView {
	let key = column.clone();
	let current = column.clone();
	let value = move || mappings.with(|m| m.get(&current).cloned().unwrap_or_default());
	view! {
		<tr>
			<td>{column}</td>
			<td>
				<select
					prop:value=value
					on:change=move |ev| {
						let value = event_target_value(&ev);
						mappings.update(|m| {
							if value.is_empty() {
								m.remove(&key);
							} else {
								m.insert(key.clone(), value);
							}
						});
					}
				>
					<option value="">"(skip)"</option>
					{FIELDS.iter().map(|f| view! { <option value=*f>{*f}</option> }).collect_view()}
				</select>
			</td>
		</tr>
	}
}

fn preview_summary(p: Preview) -> impl IntoView {
	let invalid = p.invalid_resources.into_iter().map(|row| {
		let reasons = row.errors.join(", ");
		view! { <li>{format!("Row {}: {reasons}", row.row)}</li> }
	});
	view! {
		<section>
			<p>{format!("{} valid, {} invalid rows", p.valid_count, p.invalid_count)}</p>
			<ul class="invalid">{invalid.collect_view()}</ul>
		</section>
	}
}

fn tally_summary(t: ImportTally) -> impl IntoView {
	view! {
		<section class="tally">
			<p>
				{format!(
					"{} created, {} updated, {} errors ({} of {} batches failed)",
					t.created,
					t.updated,
					t.errors,
					t.failed_batches,
					t.batches,
				)}
			</p>
			<ul>{t.messages.into_iter().map(|m| view! { <li>{m}</li> }).collect_view()}</ul>
		</section>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn headers_are_matched_to_fields() {
		assert_eq!(guess_field("Name"), Some("name"));
		assert_eq!(guess_field(" VPC "), Some("vpc_id"));
		assert_eq!(guess_field("Instance Type"), Some("instance_type"));
		assert_eq!(guess_field("Private-IP"), Some("private_ip"));
		assert_eq!(guess_field("Cost Center"), None);
	}

	#[test]
	fn suggestions_override_guesses_for_known_columns_only() {
		let columns = vec!["Name".to_string(), "Engine".to_string(), "Size".to_string()];
		let suggestion = MappingSuggestion {
			detected_resource_type: Some("rds".into()),
			field_mappings: BTreeMap::from([
				("Engine".to_string(), "type".to_string()),
				("Size".to_string(), "disk_gb".to_string()),
				("Missing".to_string(), "region".to_string()),
			]),
			type_specific_mappings: BTreeMap::new(),
		};
		let merged = merge_suggestion(&columns, &suggestion);
		assert_eq!(merged.len(), 2);
		assert_eq!(merged["Name"], "name");
		assert_eq!(merged["Engine"], "type");
	}

	#[test]
	fn default_mappings_skip_unknown_columns() {
		let columns = vec!["Name".to_string(), "Notes".to_string(), "State".to_string()];
		let mappings = default_mappings(&columns);
		assert_eq!(mappings.len(), 2);
		assert_eq!(mappings["Name"], "name");
		assert_eq!(mappings["State"], "status");
	}
}
