//! Physics behind the view. The view only talks to [`Simulation`]; the
//! production implementation drives the `force_graph` crate for repulsion
//! and integration and layers link distance, centering and collision on top.

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::types::ViewNode;

/// Seconds of simulated time per animation frame.
pub const FRAME_DT: f32 = 0.016;

const NODE_MASS: f32 = 10.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ForceConfig {
	pub link_distance: f64,
	pub link_strength: f64,
	/// Many-body strength; negative values repel.
	pub charge_strength: f64,
	pub center: (f64, f64),
	/// Added to each node's radius for collision.
	pub collision_margin: f64,
	pub alpha_decay: f64,
	pub alpha_min: f64,
}

impl Default for ForceConfig {
	fn default() -> Self {
		Self {
			link_distance: 100.0,
			link_strength: 0.1,
			charge_strength: -50.0,
			center: (0.0, 0.0),
			collision_margin: 5.0,
			alpha_decay: 0.05,
			alpha_min: 0.001,
		}
	}
}

impl ForceConfig {
	fn parameters(&self) -> SimulationParameters {
		SimulationParameters {
			force_charge: (-self.charge_strength * 3.0) as f32,
			force_spring: (self.link_strength * 0.5) as f32,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

/// What a call to [`Simulation::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
	/// Not running; positions untouched.
	Idle,
	/// Positions advanced; the view should redraw.
	Ticked,
	/// Positions advanced and the layout has cooled down. Returned once.
	Settled,
}

pub trait Simulation {
	/// Starts a fresh run over `nodes`, discarding any previous one.
	/// `links` are index pairs into `nodes`.
	fn start(&mut self, nodes: &[ViewNode], links: &[(usize, usize)], config: &ForceConfig);

	/// Advances one frame. Fixed nodes are never moved.
	fn step(&mut self, nodes: &mut [ViewNode]) -> Step;

	fn stop(&mut self);

	fn is_running(&self) -> bool;
}

#[derive(Default)]
pub struct ForceGraphSimulation {
	graph: Option<ForceGraph<usize, ()>>,
	links: Vec<(usize, usize)>,
	config: ForceConfig,
	alpha: f64,
	running: bool,
}

impl ForceGraphSimulation {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Simulation for ForceGraphSimulation {
	fn start(&mut self, nodes: &[ViewNode], links: &[(usize, usize)], config: &ForceConfig) {
		let mut graph = ForceGraph::new(config.parameters());
		let indices: Vec<_> = nodes
			.iter()
			.enumerate()
			.map(|(i, node)| {
				graph.add_node(NodeData {
					x: node.x as f32,
					y: node.y as f32,
					mass: NODE_MASS,
					is_anchor: node.is_fixed(),
					user_data: i,
				})
			})
			.collect();
		for &(src, tgt) in links {
			graph.add_edge(indices[src], indices[tgt], EdgeData::default());
		}

		self.graph = Some(graph);
		self.links = links.to_vec();
		self.config = config.clone();
		self.alpha = 1.0;
		self.running = true;
	}

	fn step(&mut self, nodes: &mut [ViewNode]) -> Step {
		if !self.running {
			return Step::Idle;
		}
		let Some(graph) = self.graph.as_mut() else {
			return Step::Idle;
		};

		self.alpha += (0.0 - self.alpha) * self.config.alpha_decay;

		// Drags happen between frames, so pull the view's positions in first.
		graph.visit_nodes_mut(|n| {
			let node = &nodes[n.data.user_data];
			let (x, y) = node.position();
			n.data.x = x as f32;
			n.data.y = y as f32;
			n.data.is_anchor = node.is_fixed();
		});
		graph.update(FRAME_DT * self.alpha as f32);
		graph.visit_nodes(|n| {
			let node = &mut nodes[n.data.user_data];
			if !node.is_fixed() {
				node.x = n.x() as f64;
				node.y = n.y() as f64;
			}
		});

		apply_links(nodes, &self.links, &self.config, self.alpha);
		apply_center(nodes, self.config.center);
		apply_collisions(nodes, self.config.collision_margin);
		for node in nodes.iter_mut() {
			if let (Some(fx), Some(fy)) = (node.fx, node.fy) {
				node.x = fx;
				node.y = fy;
			}
		}

		if self.alpha < self.config.alpha_min {
			self.running = false;
			Step::Settled
		} else {
			Step::Ticked
		}
	}

	fn stop(&mut self) {
		self.running = false;
	}

	fn is_running(&self) -> bool {
		self.running
	}
}

/// Tiny deterministic offset for coincident nodes, so forces have a direction.
fn jiggle(i: usize) -> f64 {
	(i as f64 + 1.0) * 1e-6
}

/// Pulls or pushes linked nodes toward `link_distance`, split between the
/// endpoints by their degree.
pub fn apply_links(nodes: &mut [ViewNode], links: &[(usize, usize)], config: &ForceConfig, alpha: f64) {
	let mut degree = vec![0usize; nodes.len()];
	for &(s, t) in links {
		degree[s] += 1;
		degree[t] += 1;
	}

	for (i, &(s, t)) in links.iter().enumerate() {
		if s == t {
			continue;
		}
		let mut dx = nodes[t].x - nodes[s].x;
		let dy = nodes[t].y - nodes[s].y;
		if dx == 0.0 && dy == 0.0 {
			dx = jiggle(i);
		}
		let dist = (dx * dx + dy * dy).sqrt();
		let k = (dist - config.link_distance) / dist * alpha * config.link_strength;
		let (dx, dy) = (dx * k, dy * k);
		let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;

		if !nodes[t].is_fixed() {
			nodes[t].x -= dx * bias;
			nodes[t].y -= dy * bias;
		}
		if !nodes[s].is_fixed() {
			nodes[s].x += dx * (1.0 - bias);
			nodes[s].y += dy * (1.0 - bias);
		}
	}
}

/// Translates the free nodes so the mean of all nodes sits on `center`.
pub fn apply_center(nodes: &mut [ViewNode], center: (f64, f64)) {
	if nodes.is_empty() {
		return;
	}
	let n = nodes.len() as f64;
	let (sx, sy) = nodes
		.iter()
		.fold((0.0, 0.0), |(sx, sy), node| (sx + node.x, sy + node.y));
	let (dx, dy) = (center.0 - sx / n, center.1 - sy / n);
	for node in nodes.iter_mut().filter(|node| !node.is_fixed()) {
		node.x += dx;
		node.y += dy;
	}
}

/// Separates overlapping nodes, treating each as a circle of
/// `radius + margin`. Overlap is split by squared radius; a fixed node
/// leaves the whole correction to the other.
pub fn apply_collisions(nodes: &mut [ViewNode], margin: f64) {
	for i in 0..nodes.len() {
		for j in (i + 1)..nodes.len() {
			let (fi, fj) = (nodes[i].is_fixed(), nodes[j].is_fixed());
			if fi && fj {
				continue;
			}
			let (ri, rj) = (nodes[i].radius + margin, nodes[j].radius + margin);
			let reach = ri + rj;
			let mut dx = nodes[j].x - nodes[i].x;
			let mut dy = nodes[j].y - nodes[i].y;
			if dx == 0.0 && dy == 0.0 {
				dx = jiggle(j);
				dy = jiggle(i);
			}
			let dist_sq = dx * dx + dy * dy;
			if dist_sq >= reach * reach {
				continue;
			}
			let dist = dist_sq.sqrt();
			let push = (reach - dist) / dist;
			let (px, py) = (dx * push, dy * push);

			let (ri2, rj2) = (ri * ri, rj * rj);
			let share_i = match (fi, fj) {
				(false, true) => 1.0,
				(true, false) => 0.0,
				_ => rj2 / (ri2 + rj2),
			};
			nodes[i].x -= px * share_i;
			nodes[i].y -= py * share_i;
			nodes[j].x += px * (1.0 - share_i);
			nodes[j].y += py * (1.0 - share_i);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(id: &str, x: f64, y: f64) -> ViewNode {
		ViewNode {
			id: id.into(),
			name: id.into(),
			x,
			y,
			fx: None,
			fy: None,
			radius: 8.0,
			color: "#69b3a2".into(),
		}
	}

	fn distance(a: &ViewNode, b: &ViewNode) -> f64 {
		((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
	}

	#[test]
	fn collisions_separate_free_nodes() {
		let mut nodes = vec![node("a", 100.0, 100.0), node("b", 110.0, 100.0)];
		apply_collisions(&mut nodes, 5.0);
		assert!((distance(&nodes[0], &nodes[1]) - 26.0).abs() < 1e-9);
		// Equal radii share the correction.
		assert!((nodes[0].x - 92.0).abs() < 1e-9);
		assert!((nodes[1].x - 118.0).abs() < 1e-9);
	}

	#[test]
	fn collisions_never_move_fixed_nodes() {
		let mut nodes = vec![node("a", 100.0, 100.0), node("b", 100.0, 110.0)];
		nodes[0].fix();
		apply_collisions(&mut nodes, 5.0);
		assert_eq!((nodes[0].x, nodes[0].y), (100.0, 100.0));
		assert!((nodes[1].y - 126.0).abs() < 1e-9);
	}

	#[test]
	fn coincident_nodes_still_separate() {
		let mut nodes = vec![node("a", 50.0, 50.0), node("b", 50.0, 50.0)];
		apply_collisions(&mut nodes, 5.0);
		// The jiggle offset itself is not made up, so allow for its length.
		assert!((distance(&nodes[0], &nodes[1]) - 26.0).abs() < 1e-5);
	}

	#[test]
	fn center_moves_mean_onto_target() {
		let mut nodes = vec![node("a", 0.0, 0.0), node("b", 20.0, 40.0)];
		apply_center(&mut nodes, (100.0, 100.0));
		assert_eq!((nodes[0].x, nodes[0].y), (90.0, 80.0));
		assert_eq!((nodes[1].x, nodes[1].y), (110.0, 120.0));
	}

	#[test]
	fn links_pull_distant_nodes_together() {
		let mut nodes = vec![node("a", 0.0, 0.0), node("b", 300.0, 0.0)];
		let config = ForceConfig::default();
		apply_links(&mut nodes, &[(0, 1)], &config, 1.0);
		// 200px too long, strength 0.1, split evenly.
		assert!((nodes[0].x - 10.0).abs() < 1e-9);
		assert!((nodes[1].x - 290.0).abs() < 1e-9);
	}

	#[test]
	fn idle_until_started() {
		let mut sim = ForceGraphSimulation::new();
		let mut nodes = vec![node("a", 1.0, 2.0)];
		assert_eq!(sim.step(&mut nodes), Step::Idle);
		assert!(!sim.is_running());
	}

	#[test]
	fn cools_down_and_settles_once() {
		let mut nodes: Vec<_> = (0..6)
			.map(|i| node(&i.to_string(), 200.0 + 30.0 * i as f64, 200.0 + 7.0 * i as f64))
			.collect();
		let links = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)];
		let config = ForceConfig {
			center: (250.0, 250.0),
			..ForceConfig::default()
		};
		let mut sim = ForceGraphSimulation::new();
		sim.start(&nodes, &links, &config);

		let mut steps = 0;
		let mut settled = 0;
		while sim.is_running() && steps < 1000 {
			if sim.step(&mut nodes) == Step::Settled {
				settled += 1;
			}
			steps += 1;
		}

		assert_eq!(settled, 1);
		// 0.95^n < 0.001 first holds at n = 135.
		assert_eq!(steps, 135);
		assert_eq!(sim.step(&mut nodes), Step::Idle);
		assert!(nodes.iter().all(|n| n.x.is_finite() && n.y.is_finite()));
	}

	#[test]
	fn fixed_nodes_hold_through_steps() {
		let mut nodes = vec![node("a", 100.0, 100.0), node("b", 105.0, 100.0)];
		nodes[0].fix();
		let mut sim = ForceGraphSimulation::new();
		sim.start(&nodes, &[(0, 1)], &ForceConfig::default());
		for _ in 0..20 {
			sim.step(&mut nodes);
		}
		assert_eq!((nodes[0].x, nodes[0].y), (100.0, 100.0));
	}

	#[test]
	fn stop_halts_stepping() {
		let mut nodes = vec![node("a", 0.0, 0.0), node("b", 1.0, 1.0)];
		let mut sim = ForceGraphSimulation::new();
		sim.start(&nodes, &[], &ForceConfig::default());
		sim.stop();
		let before = nodes.clone();
		assert_eq!(sim.step(&mut nodes), Step::Idle);
		assert_eq!(nodes, before);
	}
}
