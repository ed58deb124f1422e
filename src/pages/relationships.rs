use std::collections::{BTreeSet, HashSet};

use leptos::ev::SubmitEvent;
use leptos::prelude::*;
use leptos::task::spawn_local;

use super::architecture::name_of;
use super::{ErrorBanner, Inventory, alert, confirm, require_session, use_api};
use crate::components::resource_canvas::{CanvasEvent, ResourceCanvas, ViewCommand};
use crate::layout::{ForceLayout, Strategy};
use crate::model::{NewRelationship, Relationship, RelationshipUpdate, Resource, ResourceId};
use crate::style::{RELATIONSHIP_TYPES, relationship_color};

/// Relationships shown in the list and graph: matching `kind` when set and
/// touching `focus` when set.
fn visible(
	relationships: &[Relationship],
	kind: Option<&str>,
	focus: Option<ResourceId>,
) -> Vec<Relationship> {
	relationships
		.iter()
		.filter(|r| kind.is_none_or(|k| r.relationship_type == k))
		.filter(|r| focus.is_none_or(|id| r.source_resource_id == id || r.target_resource_id == id))
		.cloned()
		.collect()
}

/// Resources that take part in `relationships`, inventory order.
fn participants(resources: &[Resource], relationships: &[Relationship]) -> Vec<Resource> {
	let ids: HashSet<ResourceId> = relationships
		.iter()
		.flat_map(|r| [r.source_resource_id, r.target_resource_id])
		.collect();
	resources.iter().filter(|r| ids.contains(&r.id)).cloned().collect()
}

/// Source and target picked in a form, which must be two different resources.
fn endpoints(source: &str, target: &str) -> Result<(ResourceId, ResourceId), String> {
	let (Ok(s), Ok(t)) = (source.parse::<i64>(), target.parse::<i64>()) else {
		return Err("Pick a source and a target".into());
	};
	if s == t {
		return Err("Source and target must differ".into());
	}
	Ok((ResourceId(s), ResourceId(t)))
}

/// Full update built from the edit form's values.
fn edit_body(
	source: &str,
	target: &str,
	kind: &str,
	description: &str,
) -> Result<RelationshipUpdate, String> {
	let (s, t) = endpoints(source, target)?;
	if kind.trim().is_empty() {
		return Err("Pick a relationship type".into());
	}
	Ok(RelationshipUpdate::edited(s, t, kind.trim(), description))
}

fn replace(relationships: &mut [Relationship], updated: Relationship) {
	if let Some(slot) = relationships.iter_mut().find(|r| r.id == updated.id) {
		*slot = updated;
	}
}

fn type_label(kind: &str) -> String {
	RELATIONSHIP_TYPES
		.iter()
		.find(|(value, _, _)| *value == kind)
		.map(|(_, label, _)| label.to_string())
		.unwrap_or_else(|| kind.to_string())
}

/// Relationship list and force graph with create, swap and delete.
#[component]
pub fn Relationships() -> impl IntoView {
	let api = use_api();
	let inventory = Inventory::new();
	if require_session(&api) {
		inventory.load(api.clone());
	}

	let kind = RwSignal::new(None::<String>);
	let focus = RwSignal::new(None::<ResourceId>);
	let checked = RwSignal::new(BTreeSet::<i64>::new());
	let commands = RwSignal::new(None::<ViewCommand>);
	let editing = RwSignal::new(None::<Relationship>);
	let extracting = RwSignal::new(false);

	let shown = Signal::derive(move || {
		inventory
			.relationships
			.with(|rels| visible(rels, kind.get().as_deref(), focus.get()))
	});
	let graph_resources = Signal::derive(move || {
		let rels = visible(&inventory.relationships.get(), kind.get().as_deref(), None);
		inventory.resources.with(|all| participants(all, &rels))
	});
	let graph_relationships = Signal::derive(move || {
		inventory.relationships.with(|rels| visible(rels, kind.get().as_deref(), None))
	});
	let strategy = Signal::stored(Strategy::Force(ForceLayout::default()));

	let on_event = Callback::new(move |event: CanvasEvent| match event {
		CanvasEvent::Selected { id, .. } => focus.set(Some(id)),
		CanvasEvent::Cleared => focus.set(None),
		_ => {}
	});

	let swap = {
		let api = api.clone();
		Callback::new(move |rel: Relationship| {
			let api = api.clone();
			spawn_local(async move {
				let body = RelationshipUpdate::swapped(&rel);
				match api.update_relationship(rel.id, &body).await {
					Ok(updated) => inventory.relationships.update(|rels| replace(rels, updated)),
					Err(err) => alert(&format!("Could not swap direction: {err}")),
				}
			});
		})
	};

	let delete_one = {
		let api = api.clone();
		Callback::new(move |id: i64| {
			if !confirm("Delete this relationship?") {
				return;
			}
			let api = api.clone();
			spawn_local(async move {
				match api.delete_relationship(id).await {
					Ok(()) => {
						inventory.relationships.update(|rels| rels.retain(|r| r.id != id));
						checked.update(|c| {
							c.remove(&id);
						});
					}
					Err(err) => alert(&format!("Could not delete relationship: {err}")),
				}
			});
		})
	};

	let delete_checked = {
		let api = api.clone();
		move |_| {
			let ids: Vec<i64> = checked.get_untracked().into_iter().collect();
			if ids.is_empty() || !confirm(&format!("Delete {} relationships?", ids.len())) {
				return;
			}
			let api = api.clone();
			spawn_local(async move {
				let (deleted, err) = api.delete_relationships(&ids).await;
				let gone: HashSet<i64> = deleted.into_iter().collect();
				inventory.relationships.update(|rels| rels.retain(|r| !gone.contains(&r.id)));
				checked.update(|c| c.retain(|id| !gone.contains(id)));
				if let Some(err) = err {
					alert(&format!("Deleted {} of {}: {err}", gone.len(), ids.len()));
				}
			});
		}
	};

	let extract = {
		let api = api.clone();
		move |_| {
			let api = api.clone();
			extracting.set(true);
			spawn_local(async move {
				match api.extract_relationships().await {
					Ok(found) => {
						alert(&format!("{} ({} relationships)", found.message, found.count));
						inventory.load(api);
					}
					Err(err) => alert(&format!("Could not extract relationships: {err}")),
				}
				extracting.set(false);
			});
		}
	};

	view! {
		<div class="page relationships">
			<header class="toolbar">
				<h1>"Relationships"</h1>
				<select
					prop:value=move || kind.get().unwrap_or_default()
					on:change=move |ev| {
						let value = event_target_value(&ev);
						kind.set((!value.is_empty()).then_some(value));
					}
				>
					<option value="">"All types"</option>
					<TypeOptions />
				</select>
				<button on:click=move |_| commands.set(Some(ViewCommand::Reset))>
					"Reset view"
				</button>
				<button disabled=move || extracting.get() on:click=extract>
					{move || match extracting.get() {
						true => "Extracting...",
						false => "Extract from resource data",
					}}
				</button>
				<button
					disabled=move || checked.with(|c| c.is_empty())
					on:click=delete_checked
				>
					{move || format!("Delete selected ({})", checked.with(|c| c.len()))}
				</button>
			</header>
			<ErrorBanner error=inventory.error />

			<div class="split">
				<div class="canvas-area">
					<ResourceCanvas
						resources=graph_resources
						relationships=graph_relationships
						strategy=strategy
						on_event=on_event
						commands=commands
						file_name="relationships.png"
					/>
				</div>
				<div class="list">
					{move || {
						editing.get().map(|rel| {
							view! { <EditForm inventory=inventory editing=editing rel=rel /> }
						})
					}}
					<CreateForm inventory=inventory />
					{move || {
						focus
							.get()
							.map(|id| {
								let name = inventory.resources.with(|r| name_of(r, id));
								view! {
									<p class="filter-note">
										{format!("Showing relationships of {name}")}
										<button on:click=move |_| focus.set(None)>
											"Show all"
										</button>
									</p>
								}
							})
					}}
					<table>
						<thead>
							<tr>
								<th></th>
								<th>"Source"</th>
								<th>"Type"</th>
								<th>"Target"</th>
								<th></th>
							</tr>
						</thead>
						<tbody>
							<For
								each=move || shown.get()
								key=|r| (r.id, r.source_resource_id, r.target_resource_id)
								let:rel
							>
								<RelationshipRow
									rel=rel
									inventory=inventory
									checked=checked
									editing=editing
									on_swap=swap
									on_delete=delete_one
								/>
							</For>
						</tbody>
					</table>
					<Show when=move || shown.with(|s| s.is_empty()) && !inventory.loading.get()>
						<p class="empty">"No relationships yet."</p>
					</Show>
				</div>
			</div>
		</div>
	}
}

#[component]
fn CreateForm(inventory: Inventory) -> impl IntoView {
	let api = use_api();
	let source = RwSignal::new(String::new());
	let target = RwSignal::new(String::new());
	let kind = RwSignal::new("connects_to".to_string());
	let description = RwSignal::new(String::new());
	let error = RwSignal::new(None::<String>);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let (s, t) = match endpoints(&source.get_untracked(), &target.get_untracked()) {
			Ok(ids) => ids,
			Err(message) => {
				error.set(Some(message));
				return;
			}
		};
		error.set(None);
		let mut body = NewRelationship::between(s, t, &kind.get_untracked());
		let text = description.get_untracked();
		body.description = (!text.trim().is_empty()).then(|| text.trim().to_string());

		let api = api.clone();
		spawn_local(async move {
			match api.create_relationship(&body).await {
				Ok(created) => {
					inventory.relationships.update(|rels| rels.push(created));
					description.set(String::new());
				}
				Err(err) => error.set(Some(err.to_string())),
			}
		});
	};

	view! {
		<form class="create-form" on:submit=on_submit>
			<ErrorBanner error=error />
			<select
				prop:value=move || source.get()
				on:change=move |ev| source.set(event_target_value(&ev))
			>
				<option value="">"Source"</option>
				<ResourceOptions inventory=inventory />
			</select>
			<select
				prop:value=move || kind.get()
				on:change=move |ev| kind.set(event_target_value(&ev))
			>
				<TypeOptions />
			</select>
			<select
				prop:value=move || target.get()
				on:change=move |ev| target.set(event_target_value(&ev))
			>
				<option value="">"Target"</option>
				<ResourceOptions inventory=inventory />
			</select>
			<input
				type="text"
				placeholder="Description"
				prop:value=move || description.get()
				on:input=move |ev| description.set(event_target_value(&ev))
			/>
			<button type="submit">"Add"</button>
		</form>
	}
}

/// Full edit of one relationship: both ends, type and description.
#[component]
fn EditForm(
	inventory: Inventory,
	editing: RwSignal<Option<Relationship>>,
	rel: Relationship,
) -> impl IntoView {
	let api = use_api();
	let id = rel.id;
	let source = RwSignal::new(rel.source_resource_id.to_string());
	let target = RwSignal::new(rel.target_resource_id.to_string());
	let kind = RwSignal::new(rel.relationship_type.clone());
	let description = RwSignal::new(rel.description.clone().unwrap_or_default());
	let error = RwSignal::new(None::<String>);

	let on_submit = move |ev: SubmitEvent| {
		ev.prevent_default();
		let body = edit_body(
			&source.get_untracked(),
			&target.get_untracked(),
			&kind.get_untracked(),
			&description.get_untracked(),
		);
		let body = match body {
			Ok(body) => body,
			Err(message) => {
				error.set(Some(message));
				return;
			}
		};
		let api = api.clone();
		spawn_local(async move {
			match api.update_relationship(id, &body).await {
				Ok(updated) => {
					inventory.relationships.update(|rels| replace(rels, updated));
					editing.set(None);
				}
				Err(err) => error.set(Some(err.to_string())),
			}
		});
	};

	view! {
		<form class="create-form edit-form" on:submit=on_submit>
			<h2>"Edit relationship"</h2>
			<ErrorBanner error=error />
			<select
				prop:value=move || source.get()
				on:change=move |ev| source.set(event_target_value(&ev))
			>
				<ResourceOptions inventory=inventory />
			</select>
			<select
				prop:value=move || kind.get()
				on:change=move |ev| kind.set(event_target_value(&ev))
			>
				<TypeOptions />
			</select>
			<select
				prop:value=move || target.get()
				on:change=move |ev| target.set(event_target_value(&ev))
			>
				<ResourceOptions inventory=inventory />
			</select>
			<input
				type="text"
				placeholder="Description"
				prop:value=move || description.get()
				on:input=move |ev| description.set(event_target_value(&ev))
			/>
			<button type="submit">"Save"</button>
			<button type="button" on:click=move |_| editing.set(None)>"Cancel"</button>
		</form>
	}
}

#[component]
fn RelationshipRow(
	rel: Relationship,
	inventory: Inventory,
	checked: RwSignal<BTreeSet<i64>>,
	editing: RwSignal<Option<Relationship>>,
	on_swap: Callback<Relationship>,
	on_delete: Callback<i64>,
) -> impl IntoView {
	let id = rel.id;
	let (source, target) = inventory.resources.with(|all| {
		(name_of(all, rel.source_resource_id), name_of(all, rel.target_resource_id))
	});
	let color = relationship_color(&rel.relationship_type);
	let label = type_label(&rel.relationship_type);
	let detail = rel.port.map(|p| format!(" :{p}")).unwrap_or_default();
	let edit = rel.clone();
	let toggle = move |_| {
		checked.update(|c| {
			if !c.remove(&id) {
				c.insert(id);
			}
		})
	};

	view! {
		<tr>
			<td>
				<input
					type="checkbox"
					prop:checked=move || checked.with(|c| c.contains(&id))
					on:change=toggle
				/>
			</td>
			<td>{source}</td>
			<td style=format!("color: {color}")>{format!("{label}{detail}")}</td>
			<td>{target}</td>
			<td>
				<button title="Edit" on:click=move |_| editing.set(Some(edit.clone()))>
					"✎"
				</button>
				<button title="Swap direction" on:click=move |_| on_swap.run(rel.clone())>
					"⇄"
				</button>
				<button title="Delete" on:click=move |_| on_delete.run(id)>"✕"</button>
			</td>
		</tr>
	}
}

#[component]
fn ResourceOptions(inventory: Inventory) -> impl IntoView {
	move || {
		inventory.resources.with(|all| {
			all.iter()
				.map(|r| {
					let text = format!("{} ({})", r.name, r.kind);
					view! { <option value=r.id.to_string()>{text}</option> }
				})
				.collect_view()
		})
	}
}

#[component]
fn TypeOptions() -> impl IntoView {
	RELATIONSHIP_TYPES
		.iter()
		.map(|(value, label, _)| view! { <option value=*value>{*label}</option> })
		.collect_view()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::fixtures::{relationship, resource};

	#[test]
	fn filters_by_type_and_focus() {
		let rels = vec![
			relationship(1, 1, 2, "uses"),
			relationship(2, 2, 3, "depends_on"),
			relationship(3, 3, 1, "uses"),
		];
		let ids = |v: Vec<Relationship>| v.into_iter().map(|r| r.id).collect::<Vec<_>>();
		assert_eq!(ids(visible(&rels, None, None)), vec![1, 2, 3]);
		assert_eq!(ids(visible(&rels, Some("uses"), None)), vec![1, 3]);
		assert_eq!(ids(visible(&rels, None, Some(ResourceId(2)))), vec![1, 2]);
		assert_eq!(ids(visible(&rels, Some("uses"), Some(ResourceId(2)))), vec![1]);
	}

	#[test]
	fn graph_only_shows_connected_resources() {
		let resources = vec![
			resource(1, "ec2", None, None),
			resource(2, "rds", None, None),
			resource(3, "s3", None, None),
		];
		let rels = vec![relationship(1, 2, 1, "uses")];
		let shown: Vec<i64> = participants(&resources, &rels).iter().map(|r| r.id.0).collect();
		assert_eq!(shown, vec![1, 2]);
	}

	#[test]
	fn edit_form_sends_every_field() {
		let body = edit_body("3", "1", "depends_on", "  nightly job ").unwrap();
		assert_eq!(body.source_resource_id, Some(ResourceId(3)));
		assert_eq!(body.target_resource_id, Some(ResourceId(1)));
		assert_eq!(body.relationship_type.as_deref(), Some("depends_on"));
		assert_eq!(body.description.as_deref(), Some("nightly job"));

		assert!(edit_body("2", "2", "uses", "").is_err());
		assert!(edit_body("", "2", "uses", "").is_err());
		assert!(edit_body("1", "2", " ", "").is_err());
	}

	#[test]
	fn edits_replace_the_matching_row() {
		let mut rels = vec![relationship(1, 1, 2, "uses"), relationship(2, 2, 3, "uses")];
		replace(&mut rels, relationship(2, 3, 2, "depends_on"));
		replace(&mut rels, relationship(9, 1, 3, "uses"));
		assert_eq!(rels.len(), 2);
		assert_eq!(rels[1].source_resource_id, ResourceId(3));
		assert_eq!(rels[1].relationship_type, "depends_on");
	}

	#[test]
	fn unknown_types_are_labelled_verbatim() {
		assert_eq!(type_label("reads_from"), "Reads From");
		assert_eq!(type_label("peers_with"), "peers_with");
	}
}
