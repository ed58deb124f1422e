use leptos::prelude::*;

use super::architecture::name_of;
use super::{ErrorBanner, Inventory, require_session, use_api};
use crate::components::resource_canvas::{CanvasEvent, ResourceCanvas, ViewCommand};
use crate::layout::{RadialLayout, Strategy};
use crate::model::ResourceId;
use crate::style::resource_style;

/// Focus on one resource and walk its relations ring by ring.
#[component]
pub fn Navigator() -> impl IntoView {
	let api = use_api();
	let inventory = Inventory::new();
	if require_session(&api) {
		inventory.load(api);
	}

	let radial = RwSignal::new(RadialLayout::default());
	let strategy = Signal::derive(move || Strategy::Radial(radial.get()));
	let commands = RwSignal::new(None::<ViewCommand>);
	let zoom = RwSignal::new(1.0_f64);

	// focus the first resource once data arrives
	Effect::new(move |_| {
		let first = inventory.resources.with(|all| all.first().map(|r| r.id));
		if radial.with_untracked(|r| r.focus.is_none()) {
			if let Some(id) = first {
				radial.update(|r| r.refocus(id));
			}
		}
	});

	let on_event = Callback::new(move |event: CanvasEvent| {
		if let CanvasEvent::Selected { id, ring } = event {
			let mut next = radial.get_untracked();
			if next.on_node_clicked(id, ring) {
				radial.set(next);
			}
		}
	});

	let send = move |command: ViewCommand| commands.set(Some(command));
	let focused = move || radial.with(|r| r.focus.map(|id| id.to_string()).unwrap_or_default());

	let focus_name = move || {
		radial.with(|r| r.focus).map(|id| {
			inventory.resources.with(|all| {
				let kind = all.iter().find(|r| r.id == id).map(|r| r.kind.as_str());
				let kind = kind.unwrap_or_default();
				format!("{} {}", resource_style(kind).icon, name_of(all, id))
			})
		})
	};

	view! {
		<div class="page navigator">
			<header class="toolbar">
				<h1>"Navigator"</h1>
				<select
					prop:value=focused
					on:change=move |ev| {
						if let Ok(id) = event_target_value(&ev).parse::<i64>() {
							radial.update(|r| r.refocus(ResourceId(id)));
						}
					}
				>
					<For
						each=move || inventory.resources.get()
						key=|r| r.id
						let:r
					>
						<option value=r.id.to_string()>{format!("{} ({})", r.name, r.kind)}</option>
					</For>
				</select>
				<button on:click=move |_| send(ViewCommand::ZoomOut)>"-"</button>
				<span class="zoom">{move || format!("{:.0}%", zoom.get() * 100.0)}</span>
				<button on:click=move |_| send(ViewCommand::ZoomIn)>"+"</button>
				<button on:click=move |_| send(ViewCommand::Reset)>"Reset view"</button>
				<span class="focus">{focus_name}</span>
			</header>
			<ErrorBanner error=inventory.error />
			<p class="hint">"Click an inner node to expand it, an outer node to focus it."</p>
			<div class="canvas-area">
				<ResourceCanvas
					resources=inventory.resources
					relationships=inventory.relationships
					strategy=strategy
					on_event=on_event
					commands=commands
					zoom=zoom.write_only()
					file_name="navigator.png"
				/>
			</div>
		</div>
	}
}
