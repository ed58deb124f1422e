use std::collections::{BTreeSet, HashSet};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::heuristics::{Relation, relations_of};
use super::{Edge, Layout, LayoutInput, LayoutStrategy, Node, NodeShape};
use crate::model::ResourceId;

pub const RING1_LIMIT: usize = 12;
pub const RING2_LIMIT: usize = 5;
pub const RING1_RADIUS: f64 = 220.0;
pub const RING2_RADIUS: f64 = 110.0;
/// Angular spread of an expanded node's children.
pub const RING2_ARC: f64 = FRAC_PI_2;
pub const FOCUS_SIZE: f64 = 72.0;
pub const RING1_SIZE: f64 = 52.0;
pub const RING2_SIZE: f64 = 36.0;

/// Focused resource in the middle, related resources in rings around it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RadialLayout {
	pub focus: Option<ResourceId>,
	/// Ring-1 nodes whose own relations are shown.
	pub expanded: BTreeSet<ResourceId>,
}

impl RadialLayout {
	pub fn focused(id: ResourceId) -> Self {
		Self { focus: Some(id), expanded: BTreeSet::new() }
	}

	pub fn toggle(&mut self, id: ResourceId) {
		if !self.expanded.remove(&id) {
			self.expanded.insert(id);
		}
	}

	pub fn refocus(&mut self, id: ResourceId) {
		self.focus = Some(id);
		self.expanded.clear();
	}

	/// Ring 1 toggles expansion, ring 2 becomes the new focus. Returns whether
	/// a relayout is needed.
	pub fn on_node_clicked(&mut self, id: ResourceId, ring: u8) -> bool {
		match ring {
			0 => false,
			1 => {
				self.toggle(id);
				true
			}
			_ => {
				self.refocus(id);
				true
			}
		}
	}
}

fn circle(input: &LayoutInput<'_>, resource: usize, cx: f64, cy: f64, size: f64, ring: u8) -> Node {
	let mut node = Node {
		id: input.resources[resource].id,
		x: 0.0,
		y: 0.0,
		width: size,
		height: size,
		ring,
		resource,
	};
	node.move_center_to(cx, cy);
	node
}

/// Inferred edges point outward; known ones keep their stored direction.
fn edge(input: &LayoutInput<'_>, from: usize, rel: &Relation) -> Edge {
	let (near, far) = (input.resources[from].id, input.resources[rel.other].id);
	let (source, target) = if rel.incoming { (far, near) } else { (near, far) };
	Edge {
		source,
		target,
		relationship_type: rel.relationship_type.clone(),
		strength: rel.strength,
		inferred: rel.inferred,
	}
}

impl LayoutStrategy for RadialLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> Layout {
		let mut layout = Layout { shape: NodeShape::Circle, ..Layout::default() };
		let Some(focus) = self
			.focus
			.and_then(|id| input.resources.iter().position(|r| r.id == id))
		else {
			return layout;
		};

		let (cx, cy) = (input.viewport.width / 2.0, input.viewport.height / 2.0);
		layout.nodes.push(circle(input, focus, cx, cy, FOCUS_SIZE, 0));

		let related = relations_of(input.resources, input.relationships, focus);
		let ring1: Vec<&Relation> = related.iter().take(RING1_LIMIT).collect();
		let mut placed: HashSet<usize> = ring1.iter().map(|r| r.other).collect();
		placed.insert(focus);

		let step = TAU / ring1.len().max(1) as f64;
		for (k, rel) in ring1.iter().enumerate() {
			let angle = -PI / 2.0 + k as f64 * step;
			let (x, y) = (cx + RING1_RADIUS * angle.cos(), cy + RING1_RADIUS * angle.sin());
			layout.nodes.push(circle(input, rel.other, x, y, RING1_SIZE, 1));
			layout.edges.push(edge(input, focus, rel));
		}

		for (k, rel) in ring1.iter().enumerate() {
			if !self.expanded.contains(&input.resources[rel.other].id) {
				continue;
			}
			let angle = -PI / 2.0 + k as f64 * step;
			let (px, py) = (cx + RING1_RADIUS * angle.cos(), cy + RING1_RADIUS * angle.sin());
			let children: Vec<Relation> =
				relations_of(input.resources, input.relationships, rel.other)
					.into_iter()
					.filter(|c| !placed.contains(&c.other))
					.take(RING2_LIMIT)
					.collect();

			let spread = match children.len() {
				0 | 1 => 0.0,
				n => RING2_ARC / (n - 1) as f64,
			};
			let start = if children.len() > 1 { -RING2_ARC / 2.0 } else { 0.0 };
			for (j, child) in children.iter().enumerate() {
				let a = angle + start + j as f64 * spread;
				let (x, y) = (px + RING2_RADIUS * a.cos(), py + RING2_RADIUS * a.sin());
				placed.insert(child.other);
				layout.nodes.push(circle(input, child.other, x, y, RING2_SIZE, 2));
				layout.edges.push(edge(input, rel.other, child));
			}
		}

		layout
	}
}

/// Elastic ease-out: overshoots then settles on 1.
pub fn ease_out_elastic(t: f64) -> f64 {
	const C4: f64 = TAU / 3.0;
	if t <= 0.0 {
		0.0
	} else if t >= 1.0 {
		1.0
	} else {
		2f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * C4).sin() + 1.0
	}
}
