use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::scene::{Paint, compose, legend_entries};
use super::state::CanvasState;
use crate::layout::{Container, ContainerKind, Edge, Node, NodeShape};
use crate::model::Resource;
use crate::style::{relationship_color, resource_style, status_color, truncate_name};

const BACKGROUND: &str = "#1a1a2e";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Paint one frame. World-space paints run between `Background` (which
/// applies pan/zoom) and `Legend` (which drops it again).
pub fn render(state: &CanvasState, resources: &[Resource], ctx: &CanvasRenderingContext2d) {
	for paint in compose(&state.layout) {
		match paint {
			Paint::Background => {
				ctx.set_fill_style_str(BACKGROUND);
				ctx.fill_rect(0.0, 0.0, state.width, state.height);
				ctx.save();
				let _ = ctx.translate(state.transform.x, state.transform.y);
				let _ = ctx.scale(state.transform.k, state.transform.k);
			}
			Paint::Container(i) => draw_container(&state.layout.containers[i], ctx),
			Paint::Edge(i) => draw_edge(state, &state.layout.edges[i], ctx),
			Paint::Node(i) => {
				let node = &state.displayed()[i];
				if let Some(resource) = resources.get(node.resource) {
					draw_node(state, node, resource, ctx);
				}
			}
			Paint::Legend => {
				ctx.restore();
				draw_legend(state, resources, ctx);
			}
		}
	}
}

fn draw_container(container: &Container, ctx: &CanvasRenderingContext2d) {
	let b = container.bounds;
	match container.kind {
		ContainerKind::Region => {
			ctx.set_fill_style_str("rgba(255, 255, 255, 0.04)");
			ctx.fill_rect(b.x, b.y, b.width, b.height);
			ctx.set_fill_style_str("#e5e7eb");
			ctx.set_font("bold 20px sans-serif");
			let _ = ctx.fill_text(&container.key.to_uppercase(), b.x + 20.0, b.y + 35.0);
		}
		ContainerKind::Vpc => {
			ctx.set_stroke_style_str("#3B82F6");
			ctx.set_line_width(3.0);
			ctx.stroke_rect(b.x, b.y, b.width, b.height);
			ctx.set_fill_style_str("#93c5fd");
			ctx.set_font("bold 14px sans-serif");
			let _ = ctx.fill_text(&format!("VPC: {}", container.key), b.x + 10.0, b.y + 22.0);
		}
		ContainerKind::Subnet => {
			ctx.set_stroke_style_str("#10B981");
			ctx.set_line_width(2.0);
			let dash = js_sys::Array::of2(&JsValue::from_f64(5.0), &JsValue::from_f64(3.0));
			let _ = ctx.set_line_dash(&dash);
			ctx.stroke_rect(b.x, b.y, b.width, b.height);
			let _ = ctx.set_line_dash(&js_sys::Array::new());
			ctx.set_fill_style_str("#6ee7b7");
			ctx.set_font("bold 12px sans-serif");
			let _ = ctx.fill_text(&format!("Subnet: {}", container.key), b.x + 10.0, b.y + 20.0);
		}
	}
}

/// Distance from a node's center to its outline along the unit vector.
fn outline_distance(node: &Node, shape: NodeShape, ux: f64, uy: f64) -> f64 {
	match shape {
		NodeShape::Circle => node.width / 2.0,
		NodeShape::Card => {
			let (hw, hh) = (node.width / 2.0, node.height / 2.0);
			let tx = if ux.abs() > 1e-9 { hw / ux.abs() } else { f64::INFINITY };
			let ty = if uy.abs() > 1e-9 { hh / uy.abs() } else { f64::INFINITY };
			tx.min(ty)
		}
	}
}

fn draw_edge(state: &CanvasState, edge: &Edge, ctx: &CanvasRenderingContext2d) {
	let ends = (state.displayed_node(edge.source), state.displayed_node(edge.target));
	let (Some(n1), Some(n2)) = ends else {
		return;
	};
	let k = state.transform.k;
	let ((x1, y1), (x2, y2)) = (n1.center(), n2.center());
	let (dx, dy) = (x2 - x1, y2 - y1);
	let dist = (dx * dx + dy * dy).sqrt();
	if dist < 0.001 {
		return;
	}

	let t = ease_out_cubic(state.hover.highlight_t);
	let is_highlighted = state.is_highlighted(edge.source) && state.is_highlighted(edge.target);
	let base_width = (1.0 + 2.0 * edge.strength) / k;
	let (alpha, width) = if is_highlighted {
		(0.6 + 0.4 * t, base_width * (1.0 + 0.3 * t))
	} else {
		(0.6 - 0.45 * t, base_width * (1.0 - 0.3 * t))
	};
	let (dash, gap, arrow_size) = (8.0 / k, 4.0 / k, 8.0 / k);
	let color = relationship_color(&edge.relationship_type);

	let (ux, uy) = (dx / dist, dy / dist);
	let start = outline_distance(n1, state.layout.shape, ux, uy);
	let end = outline_distance(n2, state.layout.shape, -ux, -uy);

	ctx.set_global_alpha(alpha);
	ctx.set_stroke_style_str(color);
	ctx.set_line_width(width);
	if edge.inferred {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(2.0 / k),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(0.0);
	} else {
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(-(state.flow_time * 30.0) % (dash + gap));
	}
	ctx.begin_path();
	ctx.move_to(x1 + ux * start, y1 + uy * start);
	ctx.line_to(x2 - ux * (end + arrow_size), y2 - uy * (end + arrow_size));
	ctx.stroke();
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	ctx.set_fill_style_str(color);
	let (tip_x, tip_y) = (x2 - ux * end, y2 - uy * end);
	let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
	let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
	ctx.begin_path();
	ctx.move_to(tip_x, tip_y);
	ctx.line_to(back_x + px, back_y + py);
	ctx.line_to(back_x - px, back_y - py);
	ctx.close_path();
	ctx.fill();
	ctx.set_global_alpha(1.0);
}

fn round_rect(ctx: &CanvasRenderingContext2d, x: f64, y: f64, w: f64, h: f64, r: f64) {
	ctx.begin_path();
	ctx.move_to(x + r, y);
	ctx.line_to(x + w - r, y);
	ctx.quadratic_curve_to(x + w, y, x + w, y + r);
	ctx.line_to(x + w, y + h - r);
	ctx.quadratic_curve_to(x + w, y + h, x + w - r, y + h);
	ctx.line_to(x + r, y + h);
	ctx.quadratic_curve_to(x, y + h, x, y + h - r);
	ctx.line_to(x, y + r);
	ctx.quadratic_curve_to(x, y, x + r, y);
	ctx.close_path();
}

fn draw_node(
	state: &CanvasState,
	node: &Node,
	resource: &Resource,
	ctx: &CanvasRenderingContext2d,
) {
	let t = ease_out_cubic(state.hover.highlight_t);
	let dimmed = state.has_active_highlight() && !state.is_highlighted(node.id);
	ctx.set_global_alpha(if dimmed { 1.0 - 0.7 * t } else { 1.0 });
	let selected = state.selected == Some(node.id);
	let source = state.connect_source == Some(node.id);

	match state.layout.shape {
		NodeShape::Card => draw_card(node, resource, selected, ctx),
		NodeShape::Circle => draw_circle(state, node, resource, selected, ctx),
	}

	if source {
		ctx.set_stroke_style_str("#facc15");
		ctx.set_line_width(2.0 / state.transform.k);
		let dash = js_sys::Array::of2(&JsValue::from_f64(6.0), &JsValue::from_f64(3.0));
		let _ = ctx.set_line_dash(&dash);
		ctx.stroke_rect(node.x - 4.0, node.y - 4.0, node.width + 8.0, node.height + 8.0);
		let _ = ctx.set_line_dash(&js_sys::Array::new());
	}
	if state.is_hovered(node.id) && t > 0.01 {
		ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
		ctx.set_line_width(1.5 / state.transform.k);
		ctx.stroke_rect(node.x - 2.0, node.y - 2.0, node.width + 4.0, node.height + 4.0);
	}
	ctx.set_global_alpha(1.0);
}

fn draw_card(node: &Node, resource: &Resource, selected: bool, ctx: &CanvasRenderingContext2d) {
	let style = resource_style(&resource.kind);
	let (x, y, w, h) = (node.x, node.y, node.width, node.height);

	if selected {
		ctx.set_shadow_blur(15.0);
		ctx.set_shadow_color("rgba(59, 130, 246, 0.5)");
	} else {
		ctx.set_shadow_blur(5.0);
		ctx.set_shadow_color("rgba(0, 0, 0, 0.2)");
	}
	ctx.set_fill_style_str(style.color);
	round_rect(ctx, x, y, w, h, 8.0);
	ctx.fill();
	ctx.set_shadow_blur(0.0);

	ctx.set_fill_style_str(status_color(resource.status.as_deref()));
	ctx.begin_path();
	let _ = ctx.arc(x + w - 10.0, y + 10.0, 5.0, 0.0, 2.0 * PI);
	ctx.fill();

	ctx.set_fill_style_str("#FFFFFF");
	ctx.set_font("24px sans-serif");
	let _ = ctx.fill_text(style.icon, x + 8.0, y + 32.0);
	ctx.set_font("bold 11px sans-serif");
	let _ = ctx.fill_text(&truncate_name(&resource.name), x + 38.0, y + 25.0);
	ctx.set_fill_style_str("#FFFFFFCC");
	ctx.set_font("9px sans-serif");
	let _ = ctx.fill_text(&resource.kind.to_uppercase(), x + 38.0, y + 38.0);

	if let Some(env) = resource.environment.as_deref().filter(|e| !e.is_empty()) {
		badge(ctx, &env.to_uppercase(), x + 8.0, y + 48.0);
	}
	if let Some(instance_type) = resource.instance_type.as_deref().filter(|t| !t.is_empty()) {
		let width = ctx
			.measure_text(instance_type)
			.map(|m| m.width() + 8.0)
			.unwrap_or(48.0);
		badge(ctx, instance_type, x + w - width - 8.0, y + h - 20.0);
	}

	if selected {
		ctx.set_stroke_style_str("#3B82F6");
		ctx.set_line_width(3.0);
		round_rect(ctx, x, y, w, h, 8.0);
		ctx.stroke();
	}
}

fn badge(ctx: &CanvasRenderingContext2d, text: &str, x: f64, y: f64) {
	ctx.set_font("8px sans-serif");
	let width = ctx.measure_text(text).map(|m| m.width() + 8.0).unwrap_or(40.0);
	ctx.set_fill_style_str("#00000033");
	round_rect(ctx, x, y, width, 14.0, 3.0);
	ctx.fill();
	ctx.set_fill_style_str("#FFFFFF");
	let _ = ctx.fill_text(text, x + 4.0, y + 10.0);
}

fn draw_circle(
	state: &CanvasState,
	node: &Node,
	resource: &Resource,
	selected: bool,
	ctx: &CanvasRenderingContext2d,
) {
	let style = resource_style(&resource.kind);
	let k = state.transform.k;
	let (cx, cy) = node.center();
	let r = node.width / 2.0;

	ctx.begin_path();
	let _ = ctx.arc(cx, cy, r, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(style.color);
	ctx.fill();

	if selected || node.ring == 0 && r > 20.0 {
		ctx.begin_path();
		let _ = ctx.arc(cx, cy, r + 3.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(if selected { "#3B82F6" } else { "rgba(255, 255, 255, 0.6)" });
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}

	ctx.set_text_align("center");
	ctx.set_fill_style_str("#FFFFFF");
	ctx.set_font(&format!("{}px sans-serif", (r * 0.8).max(10.0)));
	let _ = ctx.fill_text(style.icon, cx, cy + r * 0.3);
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	ctx.set_fill_style_str("rgba(255, 255, 255, 0.85)");
	let _ = ctx.fill_text(&truncate_name(&resource.name), cx, cy + r + 12.0);
	ctx.set_text_align("start");
}

fn draw_legend(state: &CanvasState, resources: &[Resource], ctx: &CanvasRenderingContext2d) {
	let entries = legend_entries(&state.layout, resources);
	if entries.is_empty() {
		return;
	}
	let (row, pad) = (18.0, 10.0);
	let height = entries.len() as f64 * row + pad * 2.0;
	let (x, y) = (12.0, state.height - height - 12.0);

	ctx.set_fill_style_str("rgba(15, 23, 42, 0.85)");
	ctx.fill_rect(x, y, 150.0, height);
	ctx.set_font("11px sans-serif");
	for (i, style) in entries.iter().enumerate() {
		let ry = y + pad + i as f64 * row;
		ctx.set_fill_style_str(style.color);
		ctx.fill_rect(x + pad, ry + 3.0, 10.0, 10.0);
		ctx.set_fill_style_str("#e5e7eb");
		let _ = ctx.fill_text(style.label, x + pad + 16.0, ry + 12.0);
	}
}
