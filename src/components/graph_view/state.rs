use std::collections::HashMap;
use std::f64::consts::PI;

use log::{debug, info};

use super::scale::{LinearScale, extent};
use super::simulation::{ForceConfig, Simulation, Step};
use super::types::{GraphPayload, NodeId, ViewNode};

pub const DEFAULT_RADIUS: f64 = 8.0;
pub const DEFAULT_COLOR: &str = "#69b3a2";
/// Smallest on-screen hit target for a node, in pixels.
const MIN_HIT_PX: f64 = 4.0;

#[derive(Clone, Debug)]
pub struct ViewConfig {
	/// Gap kept between supplied layouts and the canvas edges.
	pub padding: f64,
	pub default_radius: f64,
	pub default_color: String,
	pub min_zoom: f64,
	pub max_zoom: f64,
	/// Radius of the ring unpositioned nodes start on.
	pub seed_radius: f64,
	pub forces: ForceConfig,
}

impl Default for ViewConfig {
	fn default() -> Self {
		Self {
			padding: 50.0,
			default_radius: DEFAULT_RADIUS,
			default_color: DEFAULT_COLOR.into(),
			min_zoom: 0.1,
			max_zoom: 10.0,
			seed_radius: 100.0,
			forces: ForceConfig::default(),
		}
	}
}

#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<usize>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodePosition {
	pub id: NodeId,
	pub name: String,
	pub x: f64,
	pub y: f64,
}

/// One rendered graph: its nodes and links, the viewport, and the
/// simulation laying it out.
pub struct GraphViewState {
	pub nodes: Vec<ViewNode>,
	pub links: Vec<(usize, usize)>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub width: f64,
	pub height: f64,
	pub directed: bool,
	pub show_labels: bool,
	pub dark_theme: bool,
	pub config: ViewConfig,
	simulation: Box<dyn Simulation>,
	rendered: bool,
}

impl GraphViewState {
	pub fn new(simulation: Box<dyn Simulation>, config: ViewConfig) -> Self {
		Self {
			nodes: Vec::new(),
			links: Vec::new(),
			transform: ViewTransform::default(),
			drag: DragState::default(),
			pan: PanState::default(),
			width: 0.0,
			height: 0.0,
			directed: false,
			show_labels: false,
			dark_theme: false,
			config,
			simulation,
			rendered: false,
		}
	}

	/// Replaces whatever was shown with `payload`, laid out in a
	/// `width` x `height` viewport.
	pub fn render(&mut self, payload: &GraphPayload, width: f64, height: f64) {
		self.simulation.stop();
		self.width = width;
		self.height = height;
		self.transform = ViewTransform::default();
		self.drag = DragState::default();
		self.pan = PanState::default();
		self.directed = payload.directed;
		self.show_labels = payload.show_labels;
		self.dark_theme = payload.dark_theme;

		let count = payload.nodes.len();
		let (cx, cy) = (width / 2.0, height / 2.0);
		self.nodes = payload
			.nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				let angle = (i as f64) * 2.0 * PI / count as f64;
				ViewNode {
					id: node.id.clone(),
					name: node.display_name().to_owned(),
					x: cx + self.config.seed_radius * angle.cos(),
					y: cy + self.config.seed_radius * angle.sin(),
					fx: None,
					fy: None,
					// Zero sizes and empty colors count as unset.
					radius: node
						.size
						.filter(|size| *size > 0.0)
						.unwrap_or(self.config.default_radius),
					color: node
						.color
						.clone()
						.filter(|color| !color.is_empty())
						.unwrap_or_else(|| self.config.default_color.clone()),
				}
			})
			.collect();

		let id_to_idx: HashMap<&str, usize> = payload
			.nodes
			.iter()
			.enumerate()
			.map(|(i, n)| (n.id.as_str(), i))
			.collect();
		self.links = payload
			.links
			.iter()
			.filter_map(|link| {
				Some((
					*id_to_idx.get(link.source.as_str())?,
					*id_to_idx.get(link.target.as_str())?,
				))
			})
			.collect();

		let positions: Option<Vec<(f64, f64)>> =
			payload.nodes.iter().map(|n| n.position()).collect();
		match positions {
			Some(positions) if !positions.is_empty() => {
				self.place_at(&positions);
				info!("rendered {} nodes at supplied positions", self.nodes.len());
			}
			_ => {
				let forces = ForceConfig {
					center: (cx, cy),
					..self.config.forces.clone()
				};
				self.simulation.start(&self.nodes, &self.links, &forces);
				info!(
					"simulating layout for {} nodes, {} links",
					self.nodes.len(),
					self.links.len()
				);
			}
		}
		self.rendered = true;
	}

	/// Scales data-space positions into the viewport and pins every node.
	/// Data y grows upward, canvas y grows downward, so the y range is
	/// reversed.
	fn place_at(&mut self, positions: &[(f64, f64)]) {
		let pad = self.config.padding;
		let (Some(x_extent), Some(y_extent)) = (
			extent(positions.iter().map(|p| p.0)),
			extent(positions.iter().map(|p| p.1)),
		) else {
			return;
		};
		let x_scale = LinearScale::new(x_extent, (pad, self.width - pad));
		let y_scale = LinearScale::new(y_extent, (self.height - pad, pad));
		for (node, &(x, y)) in self.nodes.iter_mut().zip(positions) {
			node.fix_at(x_scale.apply(x), y_scale.apply(y));
		}
	}

	pub fn is_rendered(&self) -> bool {
		self.rendered
	}

	pub fn is_simulating(&self) -> bool {
		self.simulation.is_running()
	}

	/// Advances the layout by one frame. When the layout settles every node
	/// is pinned where it landed.
	pub fn tick(&mut self) -> Step {
		let step = self.simulation.step(&mut self.nodes);
		if step == Step::Settled {
			for node in &mut self.nodes {
				node.fix();
			}
			info!("layout settled");
		}
		step
	}

	/// Changes the surface size only; the layout is left as is.
	pub fn resize(&mut self, width: f64, height: f64) {
		debug!("resize to {width}x{height}");
		self.width = width;
		self.height = height;
	}

	pub fn positions(&self) -> Vec<NodePosition> {
		self.nodes
			.iter()
			.map(|node| {
				let (x, y) = node.position();
				NodePosition {
					id: node.id.clone(),
					name: node.name.clone(),
					x,
					y,
				}
			})
			.collect()
	}

	pub fn set_labels(&mut self, show: bool) {
		self.show_labels = show;
	}

	pub fn set_theme(&mut self, dark: bool) {
		self.dark_theme = dark;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	/// Topmost node under the screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let min_hit = MIN_HIT_PX / self.transform.k;
		self.nodes.iter().rposition(|node| {
			let (dx, dy) = (node.x - gx, node.y - gy);
			(dx * dx + dy * dy).sqrt() <= node.radius.max(min_hit)
		})
	}

	/// Pins the node where it is. The simulation keeps running for the rest.
	pub fn drag_start(&mut self, idx: usize) {
		if let Some(node) = self.nodes.get_mut(idx) {
			node.fix();
		}
	}

	/// Moves the node to a graph-space point and pins it there.
	pub fn drag_to(&mut self, idx: usize, x: f64, y: f64) {
		if let Some(node) = self.nodes.get_mut(idx) {
			node.fix_at(x, y);
		}
	}

	pub fn drag_end(&mut self, idx: usize) {
		if let Some(node) = self.nodes.get_mut(idx) {
			node.fix();
		}
	}

	/// Starts a node drag when the point hits a node, a pan otherwise.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(idx) = self.node_at_position(sx, sy) {
			self.drag_start(idx);
			let node = &self.nodes[idx];
			self.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: sx,
				start_y: sy,
				node_start_x: node.x,
				node_start_y: node.y,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: sx,
				start_y: sy,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	/// Returns whether the pointer is over a node or dragging one.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) -> bool {
		if self.drag.active {
			if let Some(idx) = self.drag.node_idx {
				let (dx, dy) = (
					(sx - self.drag.start_x) / self.transform.k,
					(sy - self.drag.start_y) / self.transform.k,
				);
				self.drag_to(idx, self.drag.node_start_x + dx, self.drag.node_start_y + dy);
			}
			return true;
		}
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (sx - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (sy - self.pan.start_y);
		}
		self.node_at_position(sx, sy).is_some()
	}

	pub fn pointer_up(&mut self) {
		if self.drag.active {
			if let Some(idx) = self.drag.node_idx {
				self.drag_end(idx);
			}
		}
		self.drag = DragState::default();
		self.pan.active = false;
	}

	/// Zooms by `factor` keeping the screen point under the cursor fixed.
	pub fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		let new_k = (self.transform.k * factor).clamp(self.config.min_zoom, self.config.max_zoom);
		let ratio = new_k / self.transform.k;
		self.transform.x = sx - (sx - self.transform.x) * ratio;
		self.transform.y = sy - (sy - self.transform.y) * ratio;
		self.transform.k = new_k;
	}
}
