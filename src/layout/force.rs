use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::{Layout, LayoutInput, LayoutStrategy, Node, NodeShape, Overrides};
use crate::model::ResourceId;

pub const NODE_SIZE: f64 = 28.0;
const SEED_RADIUS: f64 = 160.0;
const STEPS: usize = 240;
const STEP_DT: f32 = 0.016;

/// Relationship graph settled by a fixed number of force simulation steps.
///
/// `pinned` nodes are anchored during the simulation, so neighbours arrange
/// around positions the user dragged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ForceLayout {
	pub pinned: Overrides,
}

#[derive(Clone, Debug, Default)]
struct Slot {
	resource: usize,
}

fn simulation() -> ForceGraph<Slot, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

impl LayoutStrategy for ForceLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> Layout {
		let mut layout = Layout { shape: NodeShape::Circle, ..Layout::default() };
		if input.resources.is_empty() {
			return layout;
		}

		let mut graph = simulation();
		let mut id_to_idx: HashMap<ResourceId, DefaultNodeIdx> = HashMap::new();
		let (cx, cy) = (input.viewport.width / 2.0, input.viewport.height / 2.0);
		let count = input.resources.len() as f64;

		for (i, resource) in input.resources.iter().enumerate() {
			let pinned = self.pinned.get(resource.id);
			let (x, y) = match pinned {
				Some((px, py)) => (px + NODE_SIZE / 2.0, py + NODE_SIZE / 2.0),
				None => {
					let angle = i as f64 * 2.0 * PI / count;
					(cx + SEED_RADIUS * angle.cos(), cy + SEED_RADIUS * angle.sin())
				}
			};
			let idx = graph.add_node(NodeData {
				x: x as f32,
				y: y as f32,
				mass: 10.0,
				is_anchor: pinned.is_some(),
				user_data: Slot { resource: i },
			});
			id_to_idx.insert(resource.id, idx);
		}

		for rel in input.relationships {
			if let (Some(&src), Some(&tgt)) = (
				id_to_idx.get(&rel.source_resource_id),
				id_to_idx.get(&rel.target_resource_id),
			) {
				if src != tgt {
					graph.add_edge(src, tgt, EdgeData::default());
				}
			}
		}

		for _ in 0..STEPS {
			graph.update(STEP_DT);
		}

		let mut placed: Vec<(usize, f64, f64)> = Vec::with_capacity(input.resources.len());
		graph.visit_nodes(|node| {
			placed.push((node.data.user_data.resource, node.x() as f64, node.y() as f64));
		});
		placed.sort_by_key(|(resource, _, _)| *resource);

		for (resource, x, y) in placed {
			let mut node = Node {
				id: input.resources[resource].id,
				x: 0.0,
				y: 0.0,
				width: NODE_SIZE,
				height: NODE_SIZE,
				ring: 0,
				resource,
			};
			node.move_center_to(x, y);
			layout.nodes.push(node);
		}
		layout.edges = input.known_edges(&layout.nodes);
		layout
	}
}
