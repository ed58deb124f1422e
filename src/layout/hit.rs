use super::{Node, NodeShape};

/// Topmost node under the world-space point `(x, y)`.
///
/// Nodes are drawn in slice order, so the scan runs backwards. This is a
/// linear scan and is only meant for the tens of nodes a view shows.
pub fn hit_test(nodes: &[Node], shape: NodeShape, x: f64, y: f64) -> Option<usize> {
	nodes.iter().rposition(|node| match shape {
		NodeShape::Card => node.bounds().contains(x, y),
		NodeShape::Circle => {
			let (cx, cy) = node.center();
			let r = node.width / 2.0;
			(x - cx).powi(2) + (y - cy).powi(2) <= r * r
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::ResourceId;

	fn node(id: i64, x: f64, y: f64, size: f64) -> Node {
		Node { id: ResourceId(id), x, y, width: size, height: size, ring: 0, resource: id as usize }
	}

	#[test]
	fn center_click_resolves_to_the_node() {
		let nodes = vec![node(0, 0.0, 0.0, 50.0), node(1, 200.0, 100.0, 50.0)];
		for shape in [NodeShape::Card, NodeShape::Circle] {
			for (i, n) in nodes.iter().enumerate() {
				let (cx, cy) = n.center();
				assert_eq!(hit_test(&nodes, shape, cx, cy), Some(i));
			}
		}
	}

	#[test]
	fn click_outside_everything_selects_nothing() {
		let nodes = vec![node(0, 0.0, 0.0, 50.0), node(1, 200.0, 100.0, 50.0)];
		assert_eq!(hit_test(&nodes, NodeShape::Card, 120.0, 20.0), None);
		assert_eq!(hit_test(&nodes, NodeShape::Card, -0.5, 10.0), None);
		// box corner is outside the inscribed circle
		assert_eq!(hit_test(&nodes, NodeShape::Circle, 2.0, 2.0), None);
		assert_eq!(hit_test(&[], NodeShape::Card, 0.0, 0.0), None);
	}

	#[test]
	fn topmost_wins_on_overlap() {
		let nodes = vec![node(0, 0.0, 0.0, 100.0), node(1, 50.0, 50.0, 100.0)];
		assert_eq!(hit_test(&nodes, NodeShape::Card, 75.0, 75.0), Some(1));
		assert_eq!(hit_test(&nodes, NodeShape::Card, 25.0, 25.0), Some(0));
	}
}
