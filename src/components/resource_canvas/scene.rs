use crate::layout::Layout;
use crate::model::Resource;
use crate::style::{TypeStyle, resource_style};

/// One step of a frame, in paint order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Paint {
	Background,
	/// Index into `Layout::containers`.
	Container(usize),
	/// Index into `Layout::edges`.
	Edge(usize),
	/// Index into the displayed nodes.
	Node(usize),
	Legend,
}

/// Paint list for `layout`: background, containers from largest to smallest,
/// edges, nodes, legend. Edges must stay under nodes, and nodes keep layout
/// order so hit testing can scan the same list backwards.
pub fn compose(layout: &Layout) -> Vec<Paint> {
	let mut containers: Vec<usize> = (0..layout.containers.len()).collect();
	containers.sort_by(|&a, &b| {
		layout.containers[b]
			.bounds
			.area()
			.total_cmp(&layout.containers[a].bounds.area())
	});

	let capacity = 2 + containers.len() + layout.edges.len() + layout.nodes.len();
	let mut paints = Vec::with_capacity(capacity);
	paints.push(Paint::Background);
	paints.extend(containers.into_iter().map(Paint::Container));
	paints.extend((0..layout.edges.len()).map(Paint::Edge));
	paints.extend((0..layout.nodes.len()).map(Paint::Node));
	paints.push(Paint::Legend);
	paints
}

/// Distinct styles of the placed resources, first-seen order.
pub fn legend_entries(layout: &Layout, resources: &[Resource]) -> Vec<TypeStyle> {
	let mut out: Vec<TypeStyle> = Vec::new();
	for node in &layout.nodes {
		let Some(resource) = resources.get(node.resource) else {
			continue;
		};
		let style = resource_style(&resource.kind);
		if !out.contains(&style) {
			out.push(style);
		}
	}
	out
}
