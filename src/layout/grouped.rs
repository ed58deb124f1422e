use super::{Container, ContainerKind, Layout, LayoutInput, LayoutStrategy, Node, NodeShape, Rect};
use crate::model::Resource;

pub const GRID_COLUMNS: usize = 4;
pub const NODE_WIDTH: f64 = 120.0;
pub const NODE_HEIGHT: f64 = 75.0;
pub const NODE_SPACING_X: f64 = 130.0;
pub const NODE_SPACING_Y: f64 = 100.0;
/// Subnet header (35) plus footer (25).
pub const SUBNET_PADDING: f64 = 60.0;
pub const SUBNET_HEADER: f64 = 35.0;
pub const SUBNET_GAP: f64 = 15.0;
pub const VPC_HEADER: f64 = 40.0;
pub const VPC_GAP: f64 = 30.0;
pub const REGION_WIDTH: f64 = 1400.0;

const NODE_INSET_X: f64 = 10.0;
const SUBNET_INSET_X: f64 = 10.0;
const SUBNET_WIDTH: f64 =
	2.0 * NODE_INSET_X + (GRID_COLUMNS as f64 - 1.0) * NODE_SPACING_X + NODE_WIDTH;
pub const VPC_WIDTH: f64 = SUBNET_WIDTH + 2.0 * SUBNET_INSET_X;

const REGION_X: f64 = 50.0;
const REGION_INSET_X: f64 = 20.0;
const REGION_HEADER: f64 = 60.0;
const REGION_PADDING: f64 = 30.0;
const REGION_GAP: f64 = 50.0;

pub const UNKNOWN_REGION: &str = "unknown";
pub const NO_VPC: &str = "no-vpc";
pub const NO_SUBNET: &str = "no-subnet";

/// Region → VPC → subnet boxes with a fixed-column grid of cards inside each
/// subnet.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GroupedLayout;

struct Group<T> {
	key: String,
	items: Vec<T>,
}

fn entry<'g, T>(groups: &'g mut Vec<Group<T>>, key: &str) -> &'g mut Group<T> {
	let pos = match groups.iter().position(|g| g.key == key) {
		Some(pos) => pos,
		None => {
			groups.push(Group { key: key.to_string(), items: Vec::new() });
			groups.len() - 1
		}
	};
	&mut groups[pos]
}

type Subnets = Vec<Group<usize>>;
type Vpcs = Vec<Group<Group<usize>>>;

/// Single pass into nested groups, keeping first-seen order at every level.
///
/// `vpc` and `subnet` resources are placed inside the group they define, so
/// a subnet box is drawn even when nothing else lives in it.
fn group(resources: &[Resource]) -> Vec<Group<Group<Group<usize>>>> {
	let mut regions: Vec<Group<Group<Group<usize>>>> = Vec::new();
	for (index, resource) in resources.iter().enumerate() {
		let kind = resource.kind_lower();
		let region = resource.region_name().unwrap_or(UNKNOWN_REGION);
		let vpc = resource
			.vpc()
			.or_else(|| if kind == "vpc" { resource.aws_id() } else { None })
			.unwrap_or(NO_VPC);
		let subnet = resource
			.subnet()
			.or_else(|| if kind == "subnet" { resource.aws_id() } else { None })
			.unwrap_or(NO_SUBNET);

		let vpcs: &mut Vpcs = &mut entry(&mut regions, region).items;
		let subnets: &mut Subnets = &mut entry(vpcs, vpc).items;
		entry(subnets, subnet).items.push(index);
	}
	regions
}

pub fn subnet_height(members: usize) -> f64 {
	let rows = members.div_ceil(GRID_COLUMNS);
	rows as f64 * NODE_SPACING_Y + SUBNET_PADDING
}

fn vpc_height(subnets: &Subnets) -> f64 {
	VPC_HEADER
		+ subnets
			.iter()
			.map(|s| subnet_height(s.items.len()) + SUBNET_GAP)
			.sum::<f64>()
}

impl LayoutStrategy for GroupedLayout {
	fn layout(&self, input: &LayoutInput<'_>) -> Layout {
		let mut nodes = Vec::with_capacity(input.resources.len());
		let mut containers = Vec::new();
		let first_x = REGION_X + REGION_INSET_X;
		let mut y = REGION_X;

		for region in group(input.resources) {
			let region_top = y;
			let mut x = first_x;
			let mut row_top = region_top + REGION_HEADER;
			let mut row_height: f64 = 0.0;

			for vpc in &region.items {
				let height = vpc_height(&vpc.items);
				if x + VPC_WIDTH > REGION_WIDTH && x > first_x {
					x = first_x;
					row_top += row_height + VPC_GAP;
					row_height = 0.0;
				}
				containers.push(Container {
					kind: ContainerKind::Vpc,
					key: vpc.key.clone(),
					bounds: Rect::new(x, row_top, VPC_WIDTH, height),
				});

				let mut subnet_y = row_top + VPC_HEADER;
				for subnet in &vpc.items {
					let subnet_x = x + SUBNET_INSET_X;
					let h = subnet_height(subnet.items.len());
					containers.push(Container {
						kind: ContainerKind::Subnet,
						key: subnet.key.clone(),
						bounds: Rect::new(subnet_x, subnet_y, SUBNET_WIDTH, h),
					});
					for (slot, &resource) in subnet.items.iter().enumerate() {
						let (col, row) = (slot % GRID_COLUMNS, slot / GRID_COLUMNS);
						nodes.push(Node {
							id: input.resources[resource].id,
							x: subnet_x + NODE_INSET_X + col as f64 * NODE_SPACING_X,
							y: subnet_y + SUBNET_HEADER + row as f64 * NODE_SPACING_Y,
							width: NODE_WIDTH,
							height: NODE_HEIGHT,
							ring: 0,
							resource,
						});
					}
					subnet_y += h + SUBNET_GAP;
				}

				row_height = row_height.max(height);
				x += VPC_WIDTH + VPC_GAP;
			}

			let region_height = row_top + row_height + REGION_PADDING - region_top;
			containers.push(Container {
				kind: ContainerKind::Region,
				key: region.key.clone(),
				bounds: Rect::new(REGION_X, region_top, REGION_WIDTH, region_height),
			});
			y = region_top + region_height + REGION_GAP;
		}

		let edges = input.known_edges(&nodes);
		Layout { nodes, containers, edges, shape: NodeShape::Card }
	}
}

#[cfg(test)]
mod tests {
	use std::collections::HashSet;

	use super::*;
	use crate::layout::Viewport;
	use crate::model::fixtures::resource;
	use crate::model::ResourceId;

	fn run(resources: &[Resource]) -> Layout {
		GroupedLayout.layout(&LayoutInput::new(resources, &[], Viewport::default()))
	}

	fn subnet_box<'a>(layout: &'a Layout, key: &str) -> &'a Container {
		layout
			.containers
			.iter()
			.find(|c| c.kind == ContainerKind::Subnet && c.key == key)
			.unwrap()
	}

	#[test]
	fn five_instances_wrap_into_two_rows() {
		let resources: Vec<_> = (1..=5)
			.map(|i| resource(i, "ec2", Some("vpc-1"), Some("subnet-1")))
			.collect();
		let layout = run(&resources);

		let subnet = subnet_box(&layout, "subnet-1");
		assert_eq!(subnet.bounds.height, 2.0 * NODE_SPACING_Y + SUBNET_PADDING);

		let rows: HashSet<i64> = layout.nodes.iter().map(|n| n.y as i64).collect();
		assert_eq!(rows.len(), 2);
		let first_row = layout.nodes.iter().filter(|n| n.y == layout.nodes[0].y).count();
		assert_eq!(first_row, GRID_COLUMNS);
		assert_eq!(layout.nodes[4].x, layout.nodes[0].x);
	}

	#[test]
	fn every_resource_gets_one_fixed_size_node() {
		let resources = vec![
			resource(1, "ec2", Some("vpc-1"), Some("subnet-1")),
			resource(2, "s3", None, None),
			resource(3, "rds", Some("vpc-2"), None),
			resource(4, "lambda", Some("vpc-1"), Some("subnet-2")),
			resource(5, "mystery", Some("vpc-1"), Some("subnet-1")),
		];
		let layout = run(&resources);
		assert_eq!(layout.nodes.len(), resources.len());
		let ids: HashSet<ResourceId> = layout.nodes.iter().map(|n| n.id).collect();
		assert_eq!(ids.len(), resources.len());
		for node in &layout.nodes {
			assert_eq!((node.width, node.height), (NODE_WIDTH, NODE_HEIGHT));
			assert_eq!(resources[node.resource].id, node.id);
		}
	}

	#[test]
	fn layout_is_deterministic() {
		let resources: Vec<_> = (1..=9)
			.map(|i| resource(i, "ec2", Some(["vpc-a", "vpc-b", "vpc-c"][i as usize % 3]), None))
			.collect();
		assert_eq!(run(&resources), run(&resources));
	}

	#[test]
	fn vpc_boxes_only_hold_their_own_resources() {
		let mut resources = Vec::new();
		for i in 0..12 {
			let vpc = ["vpc-a", "vpc-b", "vpc-c", "vpc-d"][i % 4];
			let subnet = if i % 3 == 0 { None } else { Some("subnet-x") };
			resources.push(resource(i as i64, "ec2", Some(vpc), subnet));
		}
		resources.push(resource(100, "s3", None, None));
		let layout = run(&resources);

		for node in &layout.nodes {
			let own = resources[node.resource].vpc().unwrap_or(NO_VPC);
			for vpc in layout.containers.iter().filter(|c| c.kind == ContainerKind::Vpc) {
				if vpc.bounds.encloses(&node.bounds()) {
					assert_eq!(vpc.key, own, "node {} inside foreign vpc", node.id);
				}
			}
		}
	}

	#[test]
	fn siblings_in_a_subnet_never_overlap() {
		let resources: Vec<_> = (0..10)
			.map(|i| resource(i, "ec2", Some("vpc-1"), Some("subnet-1")))
			.collect();
		let layout = run(&resources);
		for (i, a) in layout.nodes.iter().enumerate() {
			for b in &layout.nodes[i + 1..] {
				let apart = a.x + a.width <= b.x
					|| b.x + b.width <= a.x
					|| a.y + a.height <= b.y
					|| b.y + b.height <= a.y;
				assert!(apart, "{} overlaps {}", a.id, b.id);
			}
			assert!(subnet_box(&layout, "subnet-1").bounds.encloses(&a.bounds()));
		}
	}

	#[test]
	fn missing_placement_goes_to_synthetic_groups() {
		let mut global = resource(1, "s3", None, None);
		global.region = None;
		let layout = run(&[global]);
		let keys: Vec<(ContainerKind, &str)> =
			layout.containers.iter().map(|c| (c.kind, c.key.as_str())).collect();
		assert!(keys.contains(&(ContainerKind::Region, UNKNOWN_REGION)));
		assert!(keys.contains(&(ContainerKind::Vpc, NO_VPC)));
		assert!(keys.contains(&(ContainerKind::Subnet, NO_SUBNET)));
	}

	#[test]
	fn subnet_resource_draws_its_own_box() {
		let mut subnet = resource(1, "subnet", Some("vpc-1"), None);
		subnet.resource_id = Some("subnet-empty".into());
		let layout = run(&[subnet, resource(2, "ec2", Some("vpc-1"), Some("subnet-busy"))]);
		let empty = subnet_box(&layout, "subnet-empty");
		assert_eq!(empty.bounds.height, subnet_height(1));
		assert!(empty.bounds.encloses(&layout.nodes[0].bounds()));
	}

	#[test]
	fn vpcs_wrap_within_region_width() {
		let resources: Vec<_> = (0..3)
			.map(|i| resource(i, "ec2", Some(["vpc-a", "vpc-b", "vpc-c"][i as usize]), None))
			.collect();
		let layout = run(&resources);
		let vpcs: Vec<&Container> = layout
			.containers
			.iter()
			.filter(|c| c.kind == ContainerKind::Vpc)
			.collect();
		assert_eq!(vpcs[0].bounds.y, vpcs[1].bounds.y);
		assert!(vpcs[2].bounds.y > vpcs[0].bounds.y + vpcs[0].bounds.height);
		assert_eq!(vpcs[2].bounds.x, vpcs[0].bounds.x);

		let region = layout
			.containers
			.iter()
			.find(|c| c.kind == ContainerKind::Region)
			.unwrap();
		for vpc in vpcs {
			assert!(region.bounds.encloses(&vpc.bounds));
		}
	}

	#[test]
	fn empty_input_yields_empty_layout() {
		let layout = run(&[]);
		assert!(layout.nodes.is_empty());
		assert!(layout.containers.is_empty());
	}
}
