use std::collections::BTreeSet;

use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::{ErrorBanner, Inventory, alert, confirm, require_session, use_api};
use crate::api::aws::{AwsCredentials, ConnectionInfo, SCANNABLE, ScanReport, ScanRequest};
use crate::model::{Resource, ResourceDraft, ResourceId};

/// Case-insensitive match on name, type, region or AWS id.
fn matches_query(resource: &Resource, query: &str) -> bool {
	let query = query.trim().to_lowercase();
	if query.is_empty() {
		return true;
	}
	[
		Some(resource.name.as_str()),
		Some(resource.kind.as_str()),
		resource.region_name(),
		resource.aws_id(),
	]
	.into_iter()
	.flatten()
	.any(|field| field.to_lowercase().contains(&query))
}

/// Replace the resource with the same id, or append it.
fn upsert(resources: &mut Vec<Resource>, resource: Resource) {
	match resources.iter_mut().find(|r| r.id == resource.id) {
		Some(slot) => *slot = resource,
		None => resources.push(resource),
	}
}

type Getter = fn(&ResourceDraft) -> String;
type Setter = fn(&mut ResourceDraft, String);
type CredentialGetter = fn(&AwsCredentials) -> String;
type CredentialSetter = fn(&mut AwsCredentials, String);

/// Editable draft fields as (label, read, write).
const DRAFT_FIELDS: &[(&str, Getter, Setter)] = &[
	("Name", |d| d.name.clone(), |d, v| d.name = v),
	("Type", |d| d.kind.clone(), |d, v| d.kind = v),
	("Region", |d| d.region.clone(), |d, v| d.region = v),
	("Account id", |d| d.account_id.clone().unwrap_or_default(), |d, v| d.account_id = Some(v)),
	("AWS id", |d| d.resource_id.clone().unwrap_or_default(), |d, v| d.resource_id = Some(v)),
	("Status", |d| d.status.clone().unwrap_or_default(), |d, v| d.status = Some(v)),
	("Environment", |d| d.environment.clone().unwrap_or_default(), |d, v| d.environment = Some(v)),
	("VPC", |d| d.vpc_id.clone().unwrap_or_default(), |d, v| d.vpc_id = Some(v)),
	("Subnet", |d| d.subnet_id.clone().unwrap_or_default(), |d, v| d.subnet_id = Some(v)),
	(
		"Instance type",
		|d| d.instance_type.clone().unwrap_or_default(),
		|d, v| d.instance_type = Some(v),
	),
	("Private IP", |d| d.private_ip.clone().unwrap_or_default(), |d, v| d.private_ip = Some(v)),
	("Public IP", |d| d.public_ip.clone().unwrap_or_default(), |d, v| d.public_ip = Some(v)),
	("Description", |d| d.description.clone().unwrap_or_default(), |d, v| d.description = Some(v)),
];

/// Credential inputs as (label, secret, read, write).
const CREDENTIAL_FIELDS: &[(&str, bool, CredentialGetter, CredentialSetter)] = &[
	("Access key id", false, |c| c.aws_access_key_id.clone(), |c, v| c.aws_access_key_id = v),
	(
		"Secret access key",
		true,
		|c| c.aws_secret_access_key.clone(),
		|c, v| c.aws_secret_access_key = v,
	),
	("Region", false, |c| c.region.clone(), |c, v| c.region = v),
	(
		"Session token (optional)",
		true,
		|c| c.aws_session_token.clone().unwrap_or_default(),
		|c, v| c.aws_session_token = (!v.trim().is_empty()).then_some(v),
	),
];

fn row_key(r: &Resource) -> (ResourceId, String, String, Option<String>, Option<String>) {
	(r.id, r.name.clone(), r.kind.clone(), r.region.clone(), r.status.clone())
}

/// Which resource the form is working on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Editing {
	Closed,
	New,
	Existing(ResourceId),
}

/// Resource table with create, edit, delete and an AWS account scan.
#[component]
pub fn Resources() -> impl IntoView {
	let api = StoredValue::new(use_api());
	let inventory = Inventory::new();
	if require_session(&api.get_value()) {
		inventory.load(api.get_value());
	}

	let query = RwSignal::new(String::new());
	let editing = RwSignal::new(Editing::Closed);
	let draft = RwSignal::new(ResourceDraft::default());
	let form_error = RwSignal::new(None::<String>);
	let saving = RwSignal::new(false);
	let notice = RwSignal::new(None::<String>);

	let shown = Signal::derive(move || {
		let query = query.get();
		inventory.resources.with(|all| {
			all.iter().filter(|r| matches_query(r, &query)).cloned().collect::<Vec<_>>()
		})
	});

	let open_new = move |_| {
		draft.set(ResourceDraft::default());
		form_error.set(None);
		editing.set(Editing::New);
	};

	let open_edit = Callback::new(move |resource: Resource| {
		draft.set(ResourceDraft::from(&resource));
		form_error.set(None);
		editing.set(Editing::Existing(resource.id));
	});

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let body = draft.get_untracked().normalized();
		if let Err(message) = body.validate() {
			form_error.set(Some(message));
			return;
		}
		let target = editing.get_untracked();
		let api = api.get_value();
		saving.set(true);
		form_error.set(None);
		spawn_local(async move {
			let saved = match target {
				Editing::Existing(id) => api.update_resource(id, &body).await,
				_ => api.create_resource(&body).await,
			};
			match saved {
				Ok(resource) => {
					let verb = if target == Editing::New { "added" } else { "updated" };
					notice.set(Some(format!("{} {verb}", resource.name)));
					inventory.resources.update(|all| upsert(all, resource));
					editing.set(Editing::Closed);
				}
				Err(err) => form_error.set(Some(err.to_string())),
			}
			saving.set(false);
		});
	};

	let delete_one = Callback::new(move |resource: Resource| {
		if !confirm(&format!("Delete {}? Its relationships go with it.", resource.name)) {
			return;
		}
		let api = api.get_value();
		spawn_local(async move {
			match api.delete_resource(resource.id).await {
				Ok(()) => {
					inventory.resources.update(|all| all.retain(|r| r.id != resource.id));
					if editing.get_untracked() == Editing::Existing(resource.id) {
						editing.set(Editing::Closed);
					}
					notice.set(Some(format!("{} deleted", resource.name)));
				}
				Err(err) => alert(&format!("Could not delete resource: {err}")),
			}
		});
	});

	let on_scanned = Callback::new(move |report: ScanReport| {
		notice.set(Some(format!("Scan imported {} resources", report.total_found())));
		inventory.load(api.get_value());
	});

	view! {
		<div class="page resources">
			<header class="toolbar">
				<h1>"Resources"</h1>
				<input
					type="search"
					placeholder="Search name, type, region or id"
					prop:value=move || query.get()
					on:input=move |ev| query.set(event_target_value(&ev))
				/>
				<button on:click=open_new>"Add resource"</button>
				<button on:click=move |_| inventory.load(api.get_value())>"Refresh"</button>
			</header>
			<ErrorBanner error=inventory.error />
			{move || notice.get().map(|n| view! { <div class="notice">{n}</div> })}

			<div class="split">
				<div class="list">
					<table>
						<thead>
							<tr>
								<th>"Name"</th>
								<th>"Type"</th>
								<th>"Region"</th>
								<th>"Status"</th>
								<th></th>
							</tr>
						</thead>
						<tbody>
							<For each=move || shown.get() key=row_key let:resource>
								<ResourceRow
									resource=resource
									on_edit=open_edit
									on_delete=delete_one
								/>
							</For>
						</tbody>
					</table>
					<Show when=move || shown.with(|s| s.is_empty()) && !inventory.loading.get()>
						<p class="empty">"No resources match."</p>
					</Show>
				</div>

				<div class="side">
					<Show when=move || editing.get() != Editing::Closed>
						<form class="resource-form" on:submit=on_submit>
							<h2>
								{move || match editing.get() {
									Editing::Existing(_) => "Edit resource",
									_ => "New resource",
								}}
							</h2>
							<ErrorBanner error=form_error />
							{DRAFT_FIELDS
								.iter()
								.map(|&(label, read, write)| {
									view! {
										<label>
											{label}
											<input
												type="text"
												prop:value=move || draft.with(read)
												on:input=move |ev| {
													let value = event_target_value(&ev);
													draft.update(|d| write(d, value));
												}
											/>
										</label>
									}
								})
								.collect_view()}
							<button type="submit" disabled=move || saving.get()>
								{move || if saving.get() { "Saving..." } else { "Save" }}
							</button>
							<button type="button" on:click=move |_| editing.set(Editing::Closed)>
								"Cancel"
							</button>
						</form>
					</Show>
					<AwsConnect on_scanned=on_scanned />
				</div>
			</div>
		</div>
	}
}

#[component]
fn ResourceRow(
	resource: Resource,
	on_edit: Callback<Resource>,
	on_delete: Callback<Resource>,
) -> impl IntoView {
	let (edit, delete) = (resource.clone(), resource.clone());
	view! {
		<tr>
			<td>{resource.name}</td>
			<td>{resource.kind}</td>
			<td>{resource.region.unwrap_or_default()}</td>
			<td>{resource.status.unwrap_or_default()}</td>
			<td>
				<button title="Edit" on:click=move |_| on_edit.run(edit.clone())>"✎"</button>
				<button title="Delete" on:click=move |_| on_delete.run(delete.clone())>
					"✕"
				</button>
			</td>
		</tr>
	}
}

/// Credential check and account scan. Found resources are imported by the
/// backend, `on_scanned` fires once it reports back.
#[component]
fn AwsConnect(on_scanned: Callback<ScanReport>) -> impl IntoView {
	let api = StoredValue::new(use_api());
	let credentials = RwSignal::new(AwsCredentials::default());
	let every_type: BTreeSet<String> = SCANNABLE.iter().map(|(id, _)| id.to_string()).collect();
	let selected = RwSignal::new(every_type);
	let connection = RwSignal::new(None::<ConnectionInfo>);
	let report = RwSignal::new(None::<ScanReport>);
	let busy = RwSignal::new(None::<&'static str>);
	let error = RwSignal::new(None::<String>);

	let on_test = move |_| {
		let creds = credentials.get_untracked();
		if !creds.is_complete() {
			error.set(Some("Access key, secret key and region are required".into()));
			return;
		}
		let api = api.get_value();
		busy.set(Some("Testing..."));
		error.set(None);
		spawn_local(async move {
			match api.test_connection(&creds).await {
				Ok(info) => connection.set(Some(info)),
				Err(err) => {
					connection.set(None);
					error.set(Some(err.to_string()));
				}
			}
			busy.set(None);
		});
	};

	let on_scan = move |_| {
		let creds = credentials.get_untracked();
		let chosen: Vec<String> = selected.get_untracked().into_iter().collect();
		if chosen.is_empty() {
			error.set(Some("Pick at least one resource type".into()));
			return;
		}
		let api = api.get_value();
		busy.set(Some("Scanning..."));
		error.set(None);
		spawn_local(async move {
			match api.scan(&ScanRequest::new(&creds, &chosen)).await {
				Ok(result) => {
					report.set(Some(result.clone()));
					on_scanned.run(result);
				}
				Err(err) => error.set(Some(err.to_string())),
			}
			busy.set(None);
		});
	};

	view! {
		<section class="aws-connect">
			<h2>"Connect AWS account"</h2>
			<ErrorBanner error=error />
			{CREDENTIAL_FIELDS
				.iter()
				.map(|&(label, secret, read, write)| {
					view! {
						<label>
							{label}
							<input
								type=if secret { "password" } else { "text" }
								prop:value=move || credentials.with(read)
								on:input=move |ev| {
									let value = event_target_value(&ev);
									credentials.update(|c| write(c, value));
								}
							/>
						</label>
					}
				})
				.collect_view()}
			<button disabled=move || busy.get().is_some() on:click=on_test>
				"Test connection"
			</button>
			{move || {
				connection
					.get()
					.map(|info| {
						view! {
							<p class="notice">
								{format!(
									"{} (account {}, {} regions)",
									info.message,
									info.account_id.unwrap_or_default(),
									info.available_regions.len(),
								)}
							</p>
						}
					})
			}}
			<fieldset>
				<legend>"Resource types"</legend>
				{SCANNABLE
					.iter()
					.map(|&(id, label)| {
						view! {
							<label>
								<input
									type="checkbox"
									prop:checked=move || selected.with(|s| s.contains(id))
									on:change=move |_| selected.update(|s| {
										if !s.remove(id) {
											s.insert(id.to_string());
										}
									})
								/>
								{label}
							</label>
						}
					})
					.collect_view()}
			</fieldset>
			<button
				disabled=move || busy.get().is_some() || connection.with(|c| c.is_none())
				on:click=on_scan
			>
				{move || busy.get().unwrap_or("Scan and import")}
			</button>
			{move || report.get().map(scan_summary)}
		</section>
	}
}

fn scan_summary(report: ScanReport) -> impl IntoView {
	let found = report
		.resources_found
		.into_iter()
		.map(|(kind, n)| view! { <li>{format!("{kind}: {n}")}</li> });
	view! {
		<section class="tally">
			<p>{report.message}</p>
			<ul>{found.collect_view()}</ul>
		</section>
	}
}
