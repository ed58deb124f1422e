use std::collections::{HashMap, HashSet};

use crate::layout::{
	self, Layout, LayoutInput, Node, Overrides, Strategy, ViewConfig, ease_out_elastic, hit_test,
};
use crate::model::ResourceId;

use super::types::CanvasEvent;

/// Pointer travel (screen px) below which a press/release is a click.
pub const CLICK_TOLERANCE: f64 = 3.0;
/// Seconds a relayout takes to settle.
pub const TRANSITION_SECS: f64 = 0.9;

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node: Option<ResourceId>,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub moved: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<ResourceId>,
	pub neighbors: HashSet<ResourceId>,
	pub highlight_t: f64,
	pub prev_node: Option<ResourceId>,
	pub prev_neighbors: HashSet<ResourceId>,
	delay_t: f64,
}

#[derive(Clone, Debug, Default)]
struct Transition {
	from: HashMap<ResourceId, (f64, f64)>,
	t: f64,
}

pub struct CanvasState {
	pub layout: Layout,
	pub overrides: Overrides,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub selected: Option<ResourceId>,
	pub connect_mode: bool,
	pub connect_source: Option<ResourceId>,
	pub config: ViewConfig,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
	displayed: Vec<Node>,
	transition: Option<Transition>,
}

impl CanvasState {
	pub fn new(width: f64, height: f64, config: ViewConfig) -> Self {
		let (x, y, k) = config.initial;
		Self {
			layout: Layout::default(),
			overrides: Overrides::default(),
			transform: ViewTransform { x, y, k },
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			selected: None,
			connect_mode: false,
			connect_source: None,
			config,
			width,
			height,
			flow_time: 0.0,
			displayed: Vec::new(),
			transition: None,
		}
	}

	/// Nodes at the positions shown this frame.
	pub fn displayed(&self) -> &[Node] {
		&self.displayed
	}

	pub fn displayed_node(&self, id: ResourceId) -> Option<&Node> {
		self.displayed.iter().find(|n| n.id == id)
	}

	pub fn is_animating(&self) -> bool {
		self.transition.is_some()
	}

	/// Lay out `input` with `strategy`, keeping dragged positions.
	pub fn relayout(&mut self, strategy: &Strategy, input: &LayoutInput<'_>) {
		let layout = layout::compute(strategy, input, &self.overrides);
		self.set_layout(layout);
	}

	pub fn set_layout(&mut self, layout: Layout) {
		if self.config.animate && !self.displayed.is_empty() {
			let origin = layout
				.nodes
				.iter()
				.find(|n| n.ring == 0)
				.map(|n| n.center())
				.unwrap_or((self.width / 2.0, self.height / 2.0));
			let mut from: HashMap<ResourceId, (f64, f64)> =
				self.displayed.iter().map(|n| (n.id, (n.x, n.y))).collect();
			for node in &layout.nodes {
				if self.overrides.get(node.id).is_some() {
					from.insert(node.id, (node.x, node.y));
				} else {
					from.entry(node.id).or_insert((
						origin.0 - node.width / 2.0,
						origin.1 - node.height / 2.0,
					));
				}
			}
			self.transition = Some(Transition { from, t: 0.0 });
		} else {
			self.transition = None;
		}

		let present: HashSet<ResourceId> = layout.nodes.iter().map(|n| n.id).collect();
		self.selected = self.selected.filter(|id| present.contains(id));
		self.connect_source = self.connect_source.filter(|id| present.contains(id));
		if self.hover.node.is_some_and(|id| !present.contains(&id)) {
			self.set_hover(None);
		}

		self.layout = layout;
		self.update_displayed();
	}

	fn update_displayed(&mut self) {
		let eased = self.transition.as_ref().map(|t| (ease_out_elastic(t.t), t));
		self.displayed = self
			.layout
			.nodes
			.iter()
			.map(|node| {
				let mut shown = node.clone();
				if let Some((e, transition)) = eased {
					if let Some(&(fx, fy)) = transition.from.get(&node.id) {
						shown.x = fx + (node.x - fx) * e;
						shown.y = fy + (node.y - fy) * e;
					}
				}
				shown
			})
			.collect();
	}

	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<&Node> {
		let (wx, wy) = self.screen_to_world(sx, sy);
		hit_test(&self.displayed, self.layout.shape, wx, wy).map(|i| &self.displayed[i])
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		let hit = self.node_at_position(x, y).map(|n| (n.id, n.x, n.y));
		if let Some((id, nx, ny)) = hit {
			self.drag = DragState {
				active: true,
				node: Some(id),
				moved: false,
				start_x: x,
				start_y: y,
				node_start_x: nx,
				node_start_y: ny,
			};
		} else {
			self.pan = PanState {
				active: true,
				moved: false,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if !self.drag.active {
			let hovered = self.node_at_position(x, y).map(|n| n.id);
			self.set_hover(hovered);
		}

		if self.drag.active {
			let Some(id) = self.drag.node else {
				return;
			};
			if !self.drag.moved
				&& (x - self.drag.start_x).hypot(y - self.drag.start_y) <= CLICK_TOLERANCE
			{
				return;
			}
			self.drag.moved = true;
			let (dx, dy) = (
				(x - self.drag.start_x) / self.transform.k,
				(y - self.drag.start_y) / self.transform.k,
			);
			let (nx, ny) = (self.drag.node_start_x + dx, self.drag.node_start_y + dy);
			self.pin(id, nx, ny);
		} else if self.pan.active {
			let (dx, dy) = (x - self.pan.start_x, y - self.pan.start_y);
			if dx.hypot(dy) > CLICK_TOLERANCE {
				self.pan.moved = true;
			}
			self.transform.x = self.pan.transform_start_x + dx;
			self.transform.y = self.pan.transform_start_y + dy;
		}
	}

	/// Write a manual position for `id` into the overrides and show it now.
	pub fn pin(&mut self, id: ResourceId, x: f64, y: f64) {
		self.overrides.set(id, x, y);
		if let Some(node) = self.layout.node_mut(id) {
			node.x = x;
			node.y = y;
		}
		if let Some(transition) = self.transition.as_mut() {
			transition.from.insert(id, (x, y));
		}
		if let Some(node) = self.displayed.iter_mut().find(|n| n.id == id) {
			node.x = x;
			node.y = y;
		}
	}

	pub fn pointer_up(&mut self) -> Option<CanvasEvent> {
		let event = if self.drag.active {
			match self.drag.node {
				Some(id) if self.drag.moved => self
					.layout
					.node(id)
					.map(|n| CanvasEvent::Moved { id, x: n.x, y: n.y }),
				Some(id) => self.click_node(id),
				None => None,
			}
		} else if self.pan.active && !self.pan.moved {
			self.click_empty()
		} else {
			None
		};
		self.drag = DragState::default();
		self.pan = PanState::default();
		event
	}

	pub fn pointer_leave(&mut self) {
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.set_hover(None);
	}

	fn click_node(&mut self, id: ResourceId) -> Option<CanvasEvent> {
		if self.connect_mode {
			return match self.connect_source {
				None => {
					self.connect_source = Some(id);
					Some(CanvasEvent::ConnectStarted(id))
				}
				Some(source) if source == id => {
					self.connect_source = None;
					Some(CanvasEvent::ConnectCancelled)
				}
				Some(source) => {
					self.connect_source = None;
					Some(CanvasEvent::ConnectRequested { source, target: id })
				}
			};
		}
		let ring = self.layout.node(id).map(|n| n.ring).unwrap_or(0);
		self.selected = Some(id);
		Some(CanvasEvent::Selected { id, ring })
	}

	fn click_empty(&mut self) -> Option<CanvasEvent> {
		self.selected.take().map(|_| CanvasEvent::Cleared)
	}

	pub fn set_connect_mode(&mut self, on: bool) {
		self.connect_mode = on;
		self.connect_source = None;
	}

	/// Zoom by one wheel notch around the screen point `(x, y)`.
	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		self.zoom_around(x, y, factor);
	}

	/// Zoom around the canvas center, as the toolbar buttons do.
	pub fn zoom_by(&mut self, factor: f64) {
		self.zoom_around(self.width / 2.0, self.height / 2.0, factor);
	}

	fn zoom_around(&mut self, x: f64, y: f64, factor: f64) {
		let new_k = (self.transform.k * factor).clamp(self.config.min_zoom, self.config.max_zoom);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Drop manual positions and return to the initial pan/zoom. The caller
	/// relayouts afterwards.
	pub fn reset_view(&mut self) {
		self.overrides.clear();
		let (x, y, k) = self.config.initial;
		self.transform = ViewTransform { x, y, k };
	}

	pub fn set_hover(&mut self, node: Option<ResourceId>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around while it fades out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(id) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for edge in &self.layout.edges {
				if edge.source == id {
					self.hover.neighbors.insert(edge.target);
				} else if edge.target == id {
					self.hover.neighbors.insert(edge.source);
				}
			}
		}
	}

	pub fn is_highlighted(&self, id: ResourceId) -> bool {
		self.hover.node == Some(id)
			|| self.hover.neighbors.contains(&id)
			|| self.hover.prev_node == Some(id)
			|| self.hover.prev_neighbors.contains(&id)
	}

	pub fn is_hovered(&self, id: ResourceId) -> bool {
		self.hover.node == Some(id) || self.hover.prev_node == Some(id)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;

		if let Some(transition) = self.transition.as_mut() {
			transition.t = (transition.t + dt / TRANSITION_SECS).min(1.0);
			if transition.t >= 1.0 {
				self.transition = None;
			}
			self.update_displayed();
		}

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layout::{GroupedLayout, RadialLayout, Viewport};
	use crate::model::Resource;
	use crate::model::fixtures::{relationship, resource};

	fn grouped_state(resources: &[Resource]) -> CanvasState {
		let strategy = Strategy::Grouped(GroupedLayout);
		let viewport = Viewport::default();
		let config = strategy.view_config(viewport);
		let mut state = CanvasState::new(viewport.width, viewport.height, config);
		state.relayout(&strategy, &LayoutInput::new(resources, &[], viewport));
		state
	}

	fn screen_center(state: &CanvasState, id: i64) -> (f64, f64) {
		let (wx, wy) = state.layout.node(ResourceId(id)).unwrap().center();
		(wx * state.transform.k + state.transform.x, wy * state.transform.k + state.transform.y)
	}

	#[test]
	fn click_on_node_center_selects_it() {
		let resources = vec![
			resource(1, "ec2", Some("vpc"), None),
			resource(2, "rds", Some("vpc"), None),
		];
		let mut state = grouped_state(&resources);
		let (x, y) = screen_center(&state, 2);
		state.pointer_down(x, y);
		assert_eq!(state.pointer_up(), Some(CanvasEvent::Selected { id: ResourceId(2), ring: 0 }));
		assert_eq!(state.selected, Some(ResourceId(2)));

		// empty canvas clears it
		state.pointer_down(-500.0, -500.0);
		assert_eq!(state.pointer_up(), Some(CanvasEvent::Cleared));
		assert_eq!(state.selected, None);
		state.pointer_down(-500.0, -500.0);
		assert_eq!(state.pointer_up(), None);
	}

	#[test]
	fn drag_pins_position_across_relayouts() {
		let resources = vec![
			resource(1, "ec2", Some("vpc"), None),
			resource(2, "rds", Some("vpc"), None),
		];
		let mut state = grouped_state(&resources);
		let before = state.layout.node(ResourceId(1)).unwrap().clone();
		let (x, y) = screen_center(&state, 1);

		state.pointer_down(x, y);
		state.pointer_move(x + 40.0, y + 80.0);
		let Some(CanvasEvent::Moved { id, x: ex, y: ey }) = state.pointer_up() else {
			panic!("expected a move");
		};
		assert_eq!(id, ResourceId(1));
		let k = state.transform.k;
		assert!((ex - (before.x + 40.0 / k)).abs() < 1e-9);
		assert!((ey - (before.y + 80.0 / k)).abs() < 1e-9);
		assert_eq!(state.overrides.get(ResourceId(1)), Some((ex, ey)));

		let strategy = Strategy::Grouped(GroupedLayout);
		for _ in 0..2 {
			state.relayout(&strategy, &LayoutInput::new(&resources, &[], Viewport::default()));
			let node = state.layout.node(ResourceId(1)).unwrap();
			assert_eq!((node.x, node.y), (ex, ey));
			assert_eq!(state.displayed_node(ResourceId(1)).unwrap().x, ex);
		}

		state.reset_view();
		state.relayout(&strategy, &LayoutInput::new(&resources, &[], Viewport::default()));
		assert_eq!(state.layout.node(ResourceId(1)).unwrap().x, before.x);
	}

	#[test]
	fn tiny_movement_is_still_a_click() {
		let resources = vec![resource(1, "ec2", None, None)];
		let mut state = grouped_state(&resources);
		let (x, y) = screen_center(&state, 1);
		state.pointer_down(x, y);
		state.pointer_move(x + 1.0, y + 1.0);
		assert!(matches!(state.pointer_up(), Some(CanvasEvent::Selected { .. })));
		assert!(state.overrides.is_empty());
	}

	#[test]
	fn connect_workflow_takes_two_distinct_clicks() {
		let resources = vec![
			resource(1, "ec2", Some("vpc"), None),
			resource(2, "rds", Some("vpc"), None),
		];
		let mut state = grouped_state(&resources);
		state.set_connect_mode(true);
		let (ax, ay) = screen_center(&state, 1);
		let (bx, by) = screen_center(&state, 2);

		state.pointer_down(ax, ay);
		assert_eq!(state.pointer_up(), Some(CanvasEvent::ConnectStarted(ResourceId(1))));
		state.pointer_down(ax, ay);
		assert_eq!(state.pointer_up(), Some(CanvasEvent::ConnectCancelled));

		state.pointer_down(ax, ay);
		state.pointer_up();
		state.pointer_down(bx, by);
		assert_eq!(
			state.pointer_up(),
			Some(CanvasEvent::ConnectRequested { source: ResourceId(1), target: ResourceId(2) })
		);
		assert_eq!(state.connect_source, None);
		assert_eq!(state.selected, None);
	}

	#[test]
	fn panning_moves_transform_not_nodes() {
		let resources = vec![resource(1, "ec2", None, None)];
		let mut state = grouped_state(&resources);
		let start = state.transform.clone();
		state.pointer_down(-100.0, -100.0);
		state.pointer_move(-60.0, -70.0);
		assert_eq!(state.pointer_up(), None);
		assert_eq!(state.transform.x, start.x + 40.0);
		assert_eq!(state.transform.y, start.y + 30.0);
		assert!(state.overrides.is_empty());
	}

	#[test]
	fn zoom_is_clamped_and_keeps_pointer_anchor() {
		let mut state = grouped_state(&[resource(1, "ec2", None, None)]);
		let world = state.screen_to_world(300.0, 200.0);
		state.zoom_at(300.0, 200.0, -1.0);
		let after = state.screen_to_world(300.0, 200.0);
		assert!((world.0 - after.0).abs() < 1e-9 && (world.1 - after.1).abs() < 1e-9);

		for _ in 0..50 {
			state.zoom_at(0.0, 0.0, -1.0);
		}
		assert_eq!(state.transform.k, state.config.max_zoom);
		for _ in 0..50 {
			state.zoom_by(0.5);
		}
		assert_eq!(state.transform.k, state.config.min_zoom);
	}

	#[test]
	fn hit_test_follows_pan_and_zoom() {
		let mut state = grouped_state(&[resource(1, "ec2", None, None)]);
		state.transform = ViewTransform { x: 300.0, y: -20.0, k: 1.7 };
		let (x, y) = screen_center(&state, 1);
		assert_eq!(state.node_at_position(x, y).map(|n| n.id), Some(ResourceId(1)));
		assert!(state.node_at_position(x + 500.0, y).is_none());
	}

	#[test]
	fn radial_relayout_eases_into_place() {
		let resources = vec![
			resource(0, "elb", Some("vpc"), None),
			resource(1, "ec2", Some("vpc"), None),
			resource(2, "ec2", Some("vpc"), None),
		];
		let viewport = Viewport::default();
		let mut strategy = RadialLayout::focused(ResourceId(0));
		let config = Strategy::Radial(strategy.clone()).view_config(viewport);
		let mut state = CanvasState::new(viewport.width, viewport.height, config);
		let input = LayoutInput::new(&resources, &[], viewport);
		state.relayout(&Strategy::Radial(strategy.clone()), &input);
		assert!(!state.is_animating());

		strategy.refocus(ResourceId(1));
		state.relayout(&Strategy::Radial(strategy), &input);
		assert!(state.is_animating());
		let target = state.layout.node(ResourceId(1)).unwrap().clone();
		assert_ne!(state.displayed_node(ResourceId(1)).unwrap().x, target.x);

		for _ in 0..120 {
			state.tick(0.016);
		}
		assert!(!state.is_animating());
		assert_eq!(state.displayed_node(ResourceId(1)).unwrap(), &target);
	}

	#[test]
	fn hover_collects_neighbors_from_edges() {
		let resources = vec![
			resource(1, "ec2", None, None),
			resource(2, "rds", None, None),
			resource(3, "s3", None, None),
		];
		let rels = vec![relationship(1, 1, 2, "uses")];
		let strategy = Strategy::Grouped(GroupedLayout);
		let mut state = CanvasState::new(800.0, 600.0, strategy.view_config(Viewport::default()));
		state.relayout(&strategy, &LayoutInput::new(&resources, &rels, Viewport::default()));
		let (x, y) = screen_center(&state, 1);
		state.pointer_move(x, y);
		assert!(state.is_hovered(ResourceId(1)));
		assert!(state.is_highlighted(ResourceId(2)));
		assert!(!state.is_highlighted(ResourceId(3)));
	}

	#[test]
	fn selection_is_dropped_when_node_disappears() {
		let resources = vec![resource(1, "ec2", None, None), resource(2, "ec2", None, None)];
		let mut state = grouped_state(&resources);
		state.selected = Some(ResourceId(2));
		let strategy = Strategy::Grouped(GroupedLayout);
		state.relayout(&strategy, &LayoutInput::new(&resources[..1], &[], Viewport::default()));
		assert_eq!(state.selected, None);
	}
}
