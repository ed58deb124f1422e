use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::{ErrorBanner, Inventory, alert, require_session, use_api};
use crate::components::resource_canvas::{CanvasEvent, ResourceCanvas, ViewCommand};
use crate::layout::{GroupedLayout, Strategy};
use crate::model::{NewRelationship, Resource, ResourceFilter, ResourceId, accounts, vpcs};
use crate::style::{RELATIONSHIP_TYPES, resource_style};

pub(crate) fn name_of(resources: &[Resource], id: ResourceId) -> String {
	resources
		.iter()
		.find(|r| r.id == id)
		.map(|r| r.name.clone())
		.unwrap_or_else(|| format!("#{id}"))
}

fn non_empty(value: String) -> Option<String> {
	let value = value.trim();
	(!value.is_empty()).then(|| value.to_string())
}

/// Selection that survives a filter change: cleared once the resource is
/// no longer drawn.
fn still_visible(selected: Option<ResourceId>, visible: &[Resource]) -> Option<ResourceId> {
	selected.filter(|id| visible.iter().any(|r| r.id == *id))
}

/// Port field: blank means none, anything else must be 1-65535.
fn parse_port(value: &str) -> Result<Option<u16>, String> {
	let value = value.trim();
	if value.is_empty() {
		return Ok(None);
	}
	match value.parse::<u16>() {
		Ok(port) if port > 0 => Ok(Some(port)),
		_ => Err(format!("'{value}' is not a valid port")),
	}
}

/// Grouped region/VPC/subnet diagram of the inventory.
#[component]
pub fn Architecture() -> impl IntoView {
	let api = use_api();
	let inventory = Inventory::new();
	if require_session(&api) {
		inventory.load(api);
	}

	let account = RwSignal::new(None::<String>);
	let vpc = RwSignal::new(None::<String>);
	let visible = Signal::derive(move || {
		let filter = ResourceFilter { account: account.get(), vpc: vpc.get() };
		inventory.resources.with(|all| filter.apply(all))
	});
	let account_options = Signal::derive(move || inventory.resources.with(|all| accounts(all)));
	let vpc_options = Signal::derive(move || {
		let filter = ResourceFilter { account: account.get(), vpc: None };
		inventory.resources.with(|all| vpcs(&filter.apply(all)))
	});

	let strategy = Signal::stored(Strategy::Grouped(GroupedLayout));
	let zoom = RwSignal::new(1.0_f64);
	let commands = RwSignal::new(None::<ViewCommand>);
	let connect_mode = RwSignal::new(false);
	let connect_source = RwSignal::new(None::<ResourceId>);
	let pending = RwSignal::new(None::<(ResourceId, ResourceId)>);
	let selected = RwSignal::new(None::<ResourceId>);

	Effect::new(move |_| {
		let kept = visible.with(|shown| still_visible(selected.get_untracked(), shown));
		if kept != selected.get_untracked() {
			selected.set(kept);
		}
	});

	let send = move |command: ViewCommand| commands.set(Some(command));

	let on_event = Callback::new(move |event: CanvasEvent| match event {
		CanvasEvent::Selected { id, .. } => selected.set(Some(id)),
		CanvasEvent::Cleared => selected.set(None),
		CanvasEvent::ConnectStarted(id) => connect_source.set(Some(id)),
		CanvasEvent::ConnectCancelled => connect_source.set(None),
		CanvasEvent::ConnectRequested { source, target } => {
			connect_source.set(None);
			pending.set(Some((source, target)));
		}
		CanvasEvent::Moved { .. } => {}
	});

	let toggle_connect = move |_| {
		connect_mode.update(|on| *on = !*on);
		connect_source.set(None);
		pending.set(None);
	};

	view! {
		<div class="page architecture">
			<header class="toolbar">
				<h1>"Architecture"</h1>
				<select
					prop:value=move || account.get().unwrap_or_default()
					on:change=move |ev| {
						account.set(non_empty(event_target_value(&ev)));
						vpc.set(None);
					}
				>
					<option value="">"All accounts"</option>
					<For each=move || account_options.get() key=|a| a.clone() let:a>
						<option value=a.clone()>{a.clone()}</option>
					</For>
				</select>
				<select
					prop:value=move || vpc.get().unwrap_or_default()
					on:change=move |ev| vpc.set(non_empty(event_target_value(&ev)))
				>
					<option value="">"All VPCs"</option>
					<For each=move || vpc_options.get() key=|v| v.clone() let:v>
						<option value=v.clone()>{v.clone()}</option>
					</For>
				</select>
				<button on:click=move |_| send(ViewCommand::ZoomOut)>"-"</button>
				<span class="zoom">{move || format!("{:.0}%", zoom.get() * 100.0)}</span>
				<button on:click=move |_| send(ViewCommand::ZoomIn)>"+"</button>
				<button on:click=move |_| send(ViewCommand::Reset)>"Reset view"</button>
				<button
					class:active=move || connect_mode.get()
					on:click=toggle_connect
				>
					{move || if connect_mode.get() { "Cancel connect" } else { "Connect" }}
				</button>
				<button on:click=move |_| send(ViewCommand::Download)>"Download PNG"</button>
			</header>

			<ErrorBanner error=inventory.error />
			<Show when=move || inventory.loading.get()>
				<div class="loading">"Loading inventory..."</div>
			</Show>
			<Show when=move || connect_mode.get()>
				<div class="hint">
					{move || match connect_source.get() {
						Some(id) => {
							format!(
								"Source: {}. Click the target resource.",
								inventory.resources.with(|r| name_of(r, id)),
							)
						}
						None => "Click the source resource.".to_string(),
					}}
				</div>
			</Show>

			<div class="canvas-area">
				<ResourceCanvas
					resources=visible
					relationships=inventory.relationships
					strategy=strategy
					on_event=on_event
					connect_mode=connect_mode
					commands=commands
					zoom=zoom.write_only()
					file_name="architecture-diagram.png"
				/>
				<ConnectForm pending=pending inventory=inventory />
				<SelectedPanel selected=selected inventory=inventory />
			</div>
		</div>
	}
}

/// Relationship details asked for after the second click of a connect.
#[component]
fn ConnectForm(
	pending: RwSignal<Option<(ResourceId, ResourceId)>>,
	inventory: Inventory,
) -> impl IntoView {
	let api = use_api();
	let kind = RwSignal::new("connects_to".to_string());
	let port = RwSignal::new(String::new());
	let protocol = RwSignal::new("TCP".to_string());
	let label = RwSignal::new(String::new());
	let saving = RwSignal::new(false);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let Some((source, target)) = pending.get_untracked() else {
			return;
		};
		let port = match parse_port(&port.get_untracked()) {
			Ok(port) => port,
			Err(message) => {
				alert(&message);
				return;
			}
		};
		let mut body = NewRelationship::between(source, target, &kind.get_untracked());
		body.port = port;
		body.protocol = non_empty(protocol.get_untracked());
		body.label = non_empty(label.get_untracked());

		let api = api.clone();
		saving.set(true);
		spawn_local(async move {
			match api.create_relationship(&body).await {
				Ok(created) => {
					log::info!("created relationship {}", created.id);
					inventory.relationships.update(|rels| rels.push(created));
					pending.set(None);
					label.set(String::new());
				}
				Err(err) => alert(&format!("Could not create relationship: {err}")),
			}
			saving.set(false);
		});
	};

	move || {
		pending.get().map(|(source, target)| {
			let names = inventory.resources.with(|r| (name_of(r, source), name_of(r, target)));
			view! {
				<form class="connect-form" on:submit=on_submit.clone()>
					<h3>{format!("{} → {}", names.0, names.1)}</h3>
					<label>
						"Type"
						<select
							prop:value=move || kind.get()
							on:change=move |ev| kind.set(event_target_value(&ev))
						>
							{RELATIONSHIP_TYPES
								.iter()
								.map(|(value, text, _)| {
									view! { <option value=*value>{*text}</option> }
								})
								.collect_view()}
						</select>
					</label>
					<label>
						"Port"
						<input
							type="text"
							inputmode="numeric"
							prop:value=move || port.get()
							on:input=move |ev| port.set(event_target_value(&ev))
						/>
					</label>
					<label>
						"Protocol"
						<input
							type="text"
							prop:value=move || protocol.get()
							on:input=move |ev| protocol.set(event_target_value(&ev))
						/>
					</label>
					<label>
						"Label"
						<input
							type="text"
							prop:value=move || label.get()
							on:input=move |ev| label.set(event_target_value(&ev))
						/>
					</label>
					<button type="submit" disabled=move || saving.get()>"Create"</button>
					<button type="button" on:click=move |_| pending.set(None)>"Cancel"</button>
				</form>
			}
		})
	}
}

#[component]
fn SelectedPanel(selected: RwSignal<Option<ResourceId>>, inventory: Inventory) -> impl IntoView {
	let resource = Signal::derive(move || {
		let id = selected.get()?;
		inventory.resources.with(|all| all.iter().find(|r| r.id == id).cloned())
	});

	move || {
		resource.get().map(|r| {
			let style = resource_style(&r.kind);
			let links: Vec<String> = inventory.relationships.with(|rels| {
				inventory.resources.with(|all| {
					rels.iter()
						.filter_map(|rel| {
							let (arrow, other) = if rel.source_resource_id == r.id {
								("→", rel.target_resource_id)
							} else if rel.target_resource_id == r.id {
								("←", rel.source_resource_id)
							} else {
								return None;
							};
							let name = name_of(all, other);
							Some(format!("{arrow} {name} ({})", rel.relationship_type))
						})
						.collect()
				})
			});
			let fields = [
				("Type", Some(style.label.to_string())),
				("Status", r.status.clone()),
				("Region", r.region.clone()),
				("Account", r.account_id.clone()),
				("VPC", r.vpc_id.clone()),
				("Subnet", r.subnet_id.clone()),
				("Instance type", r.instance_type.clone()),
				("Private IP", r.private_ip.clone()),
				("Public IP", r.public_ip.clone()),
				("Environment", r.environment.clone()),
			];
			view! {
				<aside class="selected-panel">
					<h2>{format!("{} {}", style.icon, r.name)}</h2>
					<dl>
						{fields
							.into_iter()
							.filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v)))
							.map(|(k, v)| view! { <dt>{k}</dt><dd>{v}</dd> })
							.collect_view()}
					</dl>
					<h3>{format!("Relationships ({})", links.len())}</h3>
					<ul>{links.into_iter().map(|l| view! { <li>{l}</li> }).collect_view()}</ul>
					<button on:click=move |_| selected.set(None)>"Close"</button>
				</aside>
			}
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::fixtures::resource;

	#[test]
	fn port_field_accepts_blank_or_valid_numbers() {
		assert_eq!(parse_port("  "), Ok(None));
		assert_eq!(parse_port("443"), Ok(Some(443)));
		assert!(parse_port("0").is_err());
		assert!(parse_port("70000").is_err());
		assert!(parse_port("http").is_err());
	}

	#[test]
	fn filtering_out_the_selection_clears_it() {
		let shown = vec![
			resource(1, "ec2", Some("vpc-a"), None),
			resource(2, "rds", Some("vpc-a"), None),
		];
		assert_eq!(still_visible(Some(ResourceId(2)), &shown), Some(ResourceId(2)));
		assert_eq!(still_visible(Some(ResourceId(3)), &shown), None);
		assert_eq!(still_visible(Some(ResourceId(1)), &[]), None);
		assert_eq!(still_visible(None, &shown), None);
	}

	#[test]
	fn unknown_ids_are_named_by_number() {
		let resources = vec![resource(1, "ec2", None, None)];
		assert_eq!(name_of(&resources, ResourceId(1)), "ec2-1");
		assert_eq!(name_of(&resources, ResourceId(9)), "#9");
	}
}
