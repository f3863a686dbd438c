use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::state::GraphViewState;

const LINK_WIDTH: f64 = 2.0;
const LINK_ALPHA: f64 = 0.6;
const NODE_STROKE: &str = "#fff";
const NODE_STROKE_WIDTH: f64 = 2.0;
const ARROW_SIZE: f64 = 8.0;
const LABEL_FONT: &str = "10px sans-serif";
const LABEL_DX: f64 = 12.0;
const LABEL_DY: f64 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Theme {
	/// `None` leaves the canvas transparent.
	pub background: Option<&'static str>,
	pub link: &'static str,
	pub arrow: &'static str,
	pub label: &'static str,
}

impl Theme {
	pub const DARK: Theme = Theme {
		background: Some("#1f1f1f"),
		link: "#666",
		arrow: "#999",
		label: "#e0e0e0",
	};
	pub const LIGHT: Theme = Theme {
		background: None,
		link: "#999",
		arrow: "#999",
		label: "#000",
	};

	pub fn select(dark: bool) -> Self {
		if dark { Self::DARK } else { Self::LIGHT }
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkSegment {
	pub from: (f64, f64),
	pub to: (f64, f64),
	/// Tip and the two back corners, tip touching the target's rim.
	pub arrow: Option<[(f64, f64); 3]>,
}

/// Geometry for every link. Directed links end at the target's rim under an
/// arrowhead; undirected ones run center to center.
pub fn link_segments(state: &GraphViewState) -> Vec<LinkSegment> {
	state
		.links
		.iter()
		.filter_map(|&(s, t)| {
			let (src, tgt) = (state.nodes.get(s)?, state.nodes.get(t)?);
			let (from, to) = ((src.x, src.y), (tgt.x, tgt.y));
			if !state.directed {
				return Some(LinkSegment { from, to, arrow: None });
			}
			let (dx, dy) = (to.0 - from.0, to.1 - from.1);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 0.001 {
				return Some(LinkSegment { from, to, arrow: None });
			}
			let (ux, uy) = (dx / dist, dy / dist);
			let tip = (to.0 - ux * tgt.radius, to.1 - uy * tgt.radius);
			let back = (tip.0 - ux * ARROW_SIZE, tip.1 - uy * ARROW_SIZE);
			let (px, py) = (-uy * ARROW_SIZE * 0.5, ux * ARROW_SIZE * 0.5);
			Some(LinkSegment {
				from,
				to: back,
				arrow: Some([tip, (back.0 + px, back.1 + py), (back.0 - px, back.1 - py)]),
			})
		})
		.collect()
}

pub fn render(state: &GraphViewState, ctx: &CanvasRenderingContext2d) {
	let theme = Theme::select(state.dark_theme);
	ctx.clear_rect(0.0, 0.0, state.width, state.height);
	if let Some(background) = theme.background {
		ctx.set_fill_style_str(background);
		ctx.fill_rect(0.0, 0.0, state.width, state.height);
	}
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_links(state, ctx, &theme);
	draw_nodes(state, ctx);
	if state.show_labels {
		draw_labels(state, ctx, &theme);
	}
	ctx.restore();
}

fn draw_links(state: &GraphViewState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_line_width(LINK_WIDTH);
	for segment in link_segments(state) {
		ctx.set_global_alpha(LINK_ALPHA);
		ctx.set_stroke_style_str(theme.link);
		ctx.begin_path();
		ctx.move_to(segment.from.0, segment.from.1);
		ctx.line_to(segment.to.0, segment.to.1);
		ctx.stroke();
		ctx.set_global_alpha(1.0);

		if let Some([tip, left, right]) = segment.arrow {
			ctx.set_fill_style_str(theme.arrow);
			ctx.begin_path();
			ctx.move_to(tip.0, tip.1);
			ctx.line_to(left.0, left.1);
			ctx.line_to(right.0, right.1);
			ctx.close_path();
			ctx.fill();
		}
	}
}

fn draw_nodes(state: &GraphViewState, ctx: &CanvasRenderingContext2d) {
	ctx.set_line_width(NODE_STROKE_WIDTH);
	ctx.set_stroke_style_str(NODE_STROKE);
	for node in &state.nodes {
		ctx.begin_path();
		let _ = ctx.arc(node.x, node.y, node.radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&node.color);
		ctx.fill();
		ctx.stroke();
	}
}

fn draw_labels(state: &GraphViewState, ctx: &CanvasRenderingContext2d, theme: &Theme) {
	ctx.set_fill_style_str(theme.label);
	ctx.set_font(LABEL_FONT);
	for node in &state.nodes {
		let _ = ctx.fill_text(&node.name, node.x + LABEL_DX, node.y + LABEL_DY);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::graph_view::state::tests::{
		StubSimulation, free_payload, positioned_payload,
	};
	use crate::components::graph_view::state::ViewConfig;

	#[test]
	fn undirected_links_have_no_arrowheads() {
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&positioned_payload(), 500.0, 500.0);

		let segments = link_segments(&state);
		assert_eq!(segments.len(), 2);
		assert!(segments.iter().all(|s| s.arrow.is_none()));
		assert_eq!(segments[0].from, (50.0, 450.0));
		assert_eq!(segments[0].to, (250.0, 50.0));
	}

	#[test]
	fn directed_links_end_in_arrowheads_at_target_rim() {
		let mut payload = positioned_payload();
		payload.directed = true;
		// Put a and b on a horizontal line.
		payload.nodes[1].y = Some(0.0);
		payload.nodes[2].y = Some(100.0);
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&payload, 500.0, 500.0);

		let segments = link_segments(&state);
		let first = &segments[0];
		let [tip, left, right] = first.arrow.expect("arrowhead");
		// b is at (250, 450) with radius 8.
		assert_eq!(tip, (242.0, 450.0));
		assert_eq!(first.to, (234.0, 450.0));
		assert_eq!(left, (234.0, 454.0));
		assert_eq!(right, (234.0, 446.0));
	}

	#[test]
	fn theme_follows_flag() {
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&free_payload(), 500.0, 500.0);
		assert_eq!(Theme::select(state.dark_theme), Theme::DARK);
		state.set_theme(false);
		let light = Theme::select(state.dark_theme);
		assert_eq!(light.background, None);
		assert_eq!(light.link, "#999");
		assert_eq!(light.label, "#000");
	}
}
