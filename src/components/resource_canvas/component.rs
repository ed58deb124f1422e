use std::cell::{Cell, RefCell};
use std::mem::{Discriminant, discriminant};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::ev;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlAnchorElement, HtmlCanvasElement, MouseEvent, WheelEvent,
};

use super::render;
use super::state::CanvasState;
use super::types::{CanvasEvent, ViewCommand};
use crate::layout::{LayoutInput, Strategy, Viewport};
use crate::model::{Relationship, Resource};

type Frame = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

fn pointer(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

fn measure(canvas: &HtmlCanvasElement, width: Option<f64>, height: Option<f64>) -> (f64, f64) {
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.filter(|w| *w > 0.0)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.filter(|h| *h > 0.0)
				.unwrap_or(600.0)
		}),
	)
}

fn download_png(canvas: &HtmlCanvasElement, file_name: &str) -> Result<(), JsValue> {
	let url = canvas.to_data_url()?;
	let document = web_sys::window()
		.and_then(|w| w.document())
		.ok_or_else(|| JsValue::from_str("no document"))?;
	let link: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
	link.set_href(&url);
	link.set_download(file_name);
	link.click();
	Ok(())
}

/// Canvas that lays out `resources` with `strategy` and reports finished
/// gestures through `on_event`. Layout reruns whenever the inputs change;
/// dragged positions survive until a [`ViewCommand::Reset`].
#[component]
pub fn ResourceCanvas(
	#[prop(into)] resources: Signal<Vec<Resource>>,
	#[prop(into)] relationships: Signal<Vec<Relationship>>,
	#[prop(into)] strategy: Signal<Strategy>,
	#[prop(into)] on_event: Callback<CanvasEvent>,
	#[prop(into, default = Signal::stored(false))] connect_mode: Signal<bool>,
	#[prop(optional)] commands: Option<RwSignal<Option<ViewCommand>>>,
	/// Receives the zoom factor after every zoom change.
	#[prop(optional)] zoom: Option<WriteSignal<f64>>,
	#[prop(default = "diagram.png")] file_name: &'static str,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: Rc<RefCell<Option<CanvasState>>> = Rc::new(RefCell::new(None));
	let shown: Rc<RefCell<Vec<Resource>>> = Rc::new(RefCell::new(Vec::new()));
	let animate: Frame = Rc::new(RefCell::new(None));
	let alive = Arc::new(AtomicBool::new(true));

	on_cleanup({
		let alive = alive.clone();
		move || alive.store(false, Ordering::Relaxed)
	});

	let kind: Rc<Cell<Option<Discriminant<Strategy>>>> = Rc::new(Cell::new(None));

	let relayout = {
		let shown = shown.clone();
		move |s: &mut CanvasState,
		      resources: Vec<Resource>,
		      relationships: &[Relationship],
		      strategy: &Strategy| {
			let viewport = Viewport { width: s.width, height: s.height };
			s.relayout(strategy, &LayoutInput::new(&resources, relationships, viewport));
			*shown.borrow_mut() = resources;
		}
	};

	// mount: size the canvas, build the state, start the frame loop
	let (state_init, shown_init, animate_init, alive_init) =
		(state.clone(), shown.clone(), animate.clone(), alive.clone());
	let (relayout_init, kind_init) = (relayout.clone(), kind.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let Some(window) = web_sys::window() else {
			return;
		};
		let (w, h) = measure(&canvas, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx,
			_ => {
				log::warn!("2d context unavailable, canvas stays blank");
				return;
			}
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			return;
		};

		let current = strategy.get_untracked();
		kind_init.set(Some(discriminant(&current)));
		let mut s = CanvasState::new(w, h, current.view_config(Viewport { width: w, height: h }));
		s.set_connect_mode(connect_mode.get_untracked());
		relayout_init(
			&mut s,
			resources.get_untracked(),
			&relationships.get_untracked(),
			&current,
		);
		log::debug!("canvas mounted at {w}x{h} with {} nodes", s.layout.nodes.len());
		if let Some(zoom) = zoom {
			zoom.set(s.transform.k);
		}
		*state_init.borrow_mut() = Some(s);

		let (state_anim, shown_anim, animate_inner, alive_anim) = (
			state_init.clone(),
			shown_init.clone(),
			animate_init.clone(),
			alive_init.clone(),
		);
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if !alive_anim.load(Ordering::Relaxed) {
				return;
			}
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				s.tick(0.016);
				render::render(s, &shown_anim.borrow(), &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	// removed with the component so no resize reaches a dropped canvas
	let state_resize = state.clone();
	let resize = window_event_listener(ev::resize, move |_| {
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let (nw, nh) = measure(&canvas, width, height);
		canvas.set_width(nw as u32);
		canvas.set_height(nh as u32);
		if let Some(ref mut s) = *state_resize.borrow_mut() {
			s.resize(nw, nh);
		}
	});
	on_cleanup(move || resize.remove());

	// relayout on data or strategy changes
	let state_data = state.clone();
	Effect::new(move |_| {
		let next = strategy.get();
		let (resources, relationships) = (resources.get(), relationships.get());
		let mut guard = state_data.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		// switching views swaps zoom limits and starts from a clean view
		if kind.replace(Some(discriminant(&next))) != Some(discriminant(&next)) {
			s.config = next.view_config(Viewport { width: s.width, height: s.height });
			s.reset_view();
			if let Some(zoom) = zoom {
				zoom.set(s.transform.k);
			}
		}
		relayout(s, resources, &relationships, &next);
	});

	let state_cm = state.clone();
	Effect::new(move |_| {
		let on = connect_mode.get();
		if let Some(ref mut s) = *state_cm.borrow_mut() {
			s.set_connect_mode(on);
		}
	});

	let (state_cmd, shown_cmd) = (state.clone(), shown.clone());
	Effect::new(move |_| {
		let Some(command) = commands.and_then(|c| c.get()) else {
			return;
		};
		let Some(canvas) = canvas_ref.get_untracked() else {
			return;
		};
		let mut guard = state_cmd.borrow_mut();
		let Some(s) = guard.as_mut() else {
			return;
		};
		match command {
			ViewCommand::ZoomIn => s.zoom_by(1.2),
			ViewCommand::ZoomOut => s.zoom_by(1.0 / 1.2),
			ViewCommand::Reset => {
				s.reset_view();
				let resources = shown_cmd.borrow().clone();
				let current = strategy.get_untracked();
				relationships.with_untracked(|rels| {
					let viewport = Viewport { width: s.width, height: s.height };
					s.relayout(&current, &LayoutInput::new(&resources, rels, viewport));
				});
			}
			ViewCommand::Download => {
				if let Err(err) = download_png(&canvas, file_name) {
					log::error!("PNG export failed: {err:?}");
				}
			}
		}
		if let Some(zoom) = zoom {
			zoom.set(s.transform.k);
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer(&canvas, &ev);
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer(&canvas, &ev);
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			s.pointer_move(x, y);
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		let event = state_mu.borrow_mut().as_mut().and_then(|s| s.pointer_up());
		if let Some(event) = event {
			on_event.run(event);
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_leave();
		}
	};

	let state_wh = state;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer(&canvas, &ev);
		let k = state_wh.borrow_mut().as_mut().map(|s| {
			s.zoom_at(x, y, ev.delta_y());
			s.transform.k
		});
		if let (Some(zoom), Some(k)) = (zoom, k) {
			zoom.set(k);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="resource-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style=move || {
				if connect_mode.get() {
					"display: block; cursor: crosshair;"
				} else {
					"display: block; cursor: grab;"
				}
			}
		/>
	}
}

#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
	use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
	use web_sys::{Event, HtmlElement};

	use super::*;
	use crate::layout::GroupedLayout;
	use crate::model::fixtures::resource;

	wasm_bindgen_test_configure!(run_in_browser);

	async fn next_tick() {
		let tick = js_sys::Promise::resolve(&JsValue::NULL);
		let _ = wasm_bindgen_futures::JsFuture::from(tick).await;
	}

	#[wasm_bindgen_test]
	async fn window_resize_after_unmount_reaches_no_canvas() {
		let window = web_sys::window().unwrap();
		let document = window.document().unwrap();
		let host: HtmlElement = document.create_element("div").unwrap().dyn_into().unwrap();
		document.body().unwrap().append_child(&host).unwrap();

		let handle = leptos::mount::mount_to(host.clone(), || {
			view! {
				<ResourceCanvas
					resources=Signal::stored(vec![resource(1, "ec2", Some("vpc-1"), None)])
					relationships=Signal::stored(Vec::new())
					strategy=Signal::stored(Strategy::Grouped(GroupedLayout))
					on_event=Callback::new(|_| {})
					width=Some(400.0)
					height=Some(300.0)
				/>
			}
		});
		next_tick().await;
		assert!(host.query_selector("canvas").unwrap().is_some());

		window.dispatch_event(&Event::new("resize").unwrap()).unwrap();
		drop(handle);
		next_tick().await;
		assert!(host.query_selector("canvas").unwrap().is_none());

		// a listener left behind would read the disposed canvas ref and trap
		window.dispatch_event(&Event::new("resize").unwrap()).unwrap();
		next_tick().await;
	}
}
