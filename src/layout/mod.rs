//! Node placement for the canvas views.
//!
//! Every view goes through [`LayoutStrategy`]; the concrete placement
//! (grouped grid, radial, force-directed) is picked by a [`Strategy`] value.
//! Layouts are recomputed from scratch on each pass and carry no identity
//! beyond it, except for positions pinned in [`Overrides`].

use std::collections::HashMap;

use crate::model::{Relationship, Resource, ResourceId};

mod force;
mod grouped;
pub mod heuristics;
mod hit;
mod radial;

pub use force::ForceLayout;
pub use grouped::GroupedLayout;
pub use hit::hit_test;
pub use radial::{RadialLayout, ease_out_elastic};

/// Axis-aligned rectangle in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
}

impl Rect {
	pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
		Self { x, y, width, height }
	}

	pub fn contains(&self, px: f64, py: f64) -> bool {
		px >= self.x && px <= self.x + self.width && py >= self.y && py <= self.y + self.height
	}

	/// True when `other` lies entirely inside `self`.
	pub fn encloses(&self, other: &Rect) -> bool {
		self.contains(other.x, other.y)
			&& self.contains(other.x + other.width, other.y + other.height)
	}

	pub fn area(&self) -> f64 {
		self.width * self.height
	}

	pub fn center(&self) -> (f64, f64) {
		(self.x + self.width / 2.0, self.y + self.height / 2.0)
	}
}

/// Canvas size in CSS pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	pub width: f64,
	pub height: f64,
}

impl Default for Viewport {
	fn default() -> Self {
		Self { width: 800.0, height: 600.0 }
	}
}

/// How nodes are drawn and hit-tested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeShape {
	#[default]
	Card,
	Circle,
}

/// A placed resource. `x`/`y` is the top-left corner of the bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	pub id: ResourceId,
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	/// 0 for the focus (radial) or for every node in flat layouts.
	pub ring: u8,
	/// Index into the resource slice the layout was computed from.
	pub resource: usize,
}

impl Node {
	pub fn bounds(&self) -> Rect {
		Rect::new(self.x, self.y, self.width, self.height)
	}

	pub fn center(&self) -> (f64, f64) {
		self.bounds().center()
	}

	pub fn move_center_to(&mut self, cx: f64, cy: f64) {
		self.x = cx - self.width / 2.0;
		self.y = cy - self.height / 2.0;
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
	Region,
	Vpc,
	Subnet,
}

/// Grouping box drawn behind nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Container {
	pub kind: ContainerKind,
	/// Grouping key, e.g. `vpc-0abc` or `no-vpc`.
	pub key: String,
	pub bounds: Rect,
}

/// A line between two placed nodes.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
	pub source: ResourceId,
	pub target: ResourceId,
	pub relationship_type: String,
	/// 0..=1, drives line width.
	pub strength: f64,
	/// Guessed from placement rather than fetched from the backend.
	pub inferred: bool,
}

/// Output of one layout pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Layout {
	pub nodes: Vec<Node>,
	pub containers: Vec<Container>,
	pub edges: Vec<Edge>,
	pub shape: NodeShape,
}

impl Layout {
	pub fn node(&self, id: ResourceId) -> Option<&Node> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn node_mut(&mut self, id: ResourceId) -> Option<&mut Node> {
		self.nodes.iter_mut().find(|n| n.id == id)
	}

	/// Copy `overrides` onto matching nodes; node sizes stay as laid out.
	pub fn apply_overrides(&mut self, overrides: &Overrides) {
		for node in &mut self.nodes {
			if let Some((x, y)) = overrides.get(node.id) {
				node.x = x;
				node.y = y;
			}
		}
	}
}

/// Inputs shared by every strategy.
#[derive(Clone, Copy, Debug)]
pub struct LayoutInput<'a> {
	pub resources: &'a [Resource],
	pub relationships: &'a [Relationship],
	pub viewport: Viewport,
}

impl<'a> LayoutInput<'a> {
	pub fn new(
		resources: &'a [Resource],
		relationships: &'a [Relationship],
		viewport: Viewport,
	) -> Self {
		Self { resources, relationships, viewport }
	}

	/// Relationship edges whose both ends were placed.
	pub fn known_edges(&self, nodes: &[Node]) -> Vec<Edge> {
		self.relationships
			.iter()
			.filter(|rel| {
				nodes.iter().any(|n| n.id == rel.source_resource_id)
					&& nodes.iter().any(|n| n.id == rel.target_resource_id)
			})
			.map(|rel| Edge {
				source: rel.source_resource_id,
				target: rel.target_resource_id,
				relationship_type: rel.relationship_type.clone(),
				strength: 1.0,
				inferred: false,
			})
			.collect()
	}
}

/// Placement algorithm.
pub trait LayoutStrategy {
	fn layout(&self, input: &LayoutInput<'_>) -> Layout;
}

/// The strategy a canvas is configured with.
#[derive(Clone, Debug, PartialEq)]
pub enum Strategy {
	Grouped(GroupedLayout),
	Radial(RadialLayout),
	Force(ForceLayout),
}

impl Default for Strategy {
	fn default() -> Self {
		Strategy::Grouped(GroupedLayout)
	}
}

impl LayoutStrategy for Strategy {
	fn layout(&self, input: &LayoutInput<'_>) -> Layout {
		match self {
			Strategy::Grouped(s) => s.layout(input),
			Strategy::Radial(s) => s.layout(input),
			Strategy::Force(s) => s.layout(input),
		}
	}
}

impl Strategy {
	/// Zoom bounds and initial pan/zoom for this view.
	pub fn view_config(&self, viewport: Viewport) -> ViewConfig {
		match self {
			Strategy::Grouped(_) => ViewConfig {
				min_zoom: 0.3,
				max_zoom: 2.0,
				initial: (50.0, 50.0, 0.8),
				animate: false,
			},
			Strategy::Radial(_) => ViewConfig {
				min_zoom: 0.1,
				max_zoom: 4.0,
				initial: (0.0, 0.0, 1.0),
				animate: true,
			},
			Strategy::Force(_) => ViewConfig {
				min_zoom: 0.1,
				max_zoom: 4.0,
				initial: (viewport.width * 0.1, viewport.height * 0.1, 0.8),
				animate: true,
			},
		}
	}
}

/// Per-view interaction settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewConfig {
	pub min_zoom: f64,
	pub max_zoom: f64,
	/// Pan x, pan y, zoom.
	pub initial: (f64, f64, f64),
	/// Ease nodes towards new targets after a relayout.
	pub animate: bool,
}

/// Positions the user pinned by dragging, keyed by resource id.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Overrides {
	positions: HashMap<ResourceId, (f64, f64)>,
}

impl Overrides {
	pub fn set(&mut self, id: ResourceId, x: f64, y: f64) {
		self.positions.insert(id, (x, y));
	}

	pub fn get(&self, id: ResourceId) -> Option<(f64, f64)> {
		self.positions.get(&id).copied()
	}

	pub fn remove(&mut self, id: ResourceId) {
		self.positions.remove(&id);
	}

	pub fn clear(&mut self) {
		self.positions.clear();
	}

	pub fn is_empty(&self) -> bool {
		self.positions.is_empty()
	}
}

/// Run `strategy` and pin overridden nodes.
pub fn compute(strategy: &Strategy, input: &LayoutInput<'_>, overrides: &Overrides) -> Layout {
	let mut layout = match strategy {
		Strategy::Force(force) if !overrides.is_empty() => {
			let mut force = force.clone();
			force.pinned = overrides.clone();
			force.layout(input)
		}
		_ => strategy.layout(input),
	};
	layout.apply_overrides(overrides);
	log::debug!(
		"layout pass: {} nodes, {} containers, {} edges",
		layout.nodes.len(),
		layout.containers.len(),
		layout.edges.len()
	);
	layout
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::fixtures::resource;

	#[test]
	fn overrides_survive_repeated_passes_until_cleared() {
		let resources = vec![
			resource(1, "ec2", Some("vpc-a"), Some("subnet-a")),
			resource(2, "ec2", Some("vpc-a"), Some("subnet-a")),
		];
		let input = LayoutInput::new(&resources, &[], Viewport::default());
		let strategy = Strategy::default();
		let mut overrides = Overrides::default();
		overrides.set(ResourceId(2), 999.0, -40.0);

		for _ in 0..3 {
			let layout = compute(&strategy, &input, &overrides);
			let node = layout.node(ResourceId(2)).unwrap();
			assert_eq!((node.x, node.y), (999.0, -40.0));
		}

		overrides.clear();
		let layout = compute(&strategy, &input, &overrides);
		let free = strategy.layout(&input);
		assert_eq!(layout, free);
		assert_ne!(layout.node(ResourceId(2)).unwrap().x, 999.0);
	}

	#[test]
	fn override_keeps_node_size() {
		let resources = vec![resource(1, "rds", Some("vpc-a"), None)];
		let input = LayoutInput::new(&resources, &[], Viewport::default());
		let mut overrides = Overrides::default();
		overrides.set(ResourceId(1), 5.0, 5.0);
		let layout = compute(&Strategy::default(), &input, &overrides);
		let node = &layout.nodes[0];
		assert_eq!((node.width, node.height), (grouped::NODE_WIDTH, grouped::NODE_HEIGHT));
	}

	#[test]
	fn known_edges_skip_unplaced_ends() {
		let resources = vec![resource(1, "ec2", None, None), resource(2, "rds", None, None)];
		let rels = vec![
			crate::model::fixtures::relationship(1, 1, 2, "connects_to"),
			crate::model::fixtures::relationship(2, 1, 99, "uses"),
		];
		let input = LayoutInput::new(&resources, &rels, Viewport::default());
		let layout = Strategy::default().layout(&input);
		assert_eq!(layout.edges.len(), 1);
		assert_eq!(layout.edges[0].target, ResourceId(2));
	}

	#[test]
	fn rect_encloses() {
		let outer = Rect::new(0.0, 0.0, 100.0, 100.0);
		assert!(outer.encloses(&Rect::new(10.0, 10.0, 20.0, 20.0)));
		assert!(!outer.encloses(&Rect::new(90.0, 90.0, 20.0, 20.0)));
	}
}
