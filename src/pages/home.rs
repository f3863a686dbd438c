use leptos::prelude::*;
use log::{error, info};

use crate::components::graph_view::{GraphLink, GraphNode, GraphPayload, GraphView};

/// Element a host page embeds its graph payload in.
const PAYLOAD_ELEMENT_ID: &str = "graph-payload";

/// Generate sample graph data (random tree).
fn generate_sample_data(n: usize) -> GraphPayload {
	let nodes: Vec<GraphNode> = (0..n)
		.map(|i| GraphNode {
			id: i.to_string().into(),
			name: Some(format!("Node {}", i)),
			x: None,
			y: None,
			size: None,
			color: None,
		})
		.collect();

	let links: Vec<GraphLink> = (1..n)
		.map(|i| {
			let target = (rand_simple(i) * (i as f64)) as usize;
			GraphLink {
				source: i.to_string(),
				target: target.to_string(),
			}
		})
		.collect();

	GraphPayload {
		nodes,
		links,
		directed: true,
		show_labels: true,
		dark_theme: true,
	}
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// Payload and view id embedded by the host page, if any.
fn embedded_payload() -> Option<(GraphPayload, Option<String>)> {
	let element = web_sys::window()?
		.document()?
		.get_element_by_id(PAYLOAD_ELEMENT_ID)?;
	let json = element.text_content()?;
	match GraphPayload::from_json(&json) {
		Ok(payload) => Some((payload, element.get_attribute("data-view-id"))),
		Err(err) => {
			error!("{err}");
			None
		}
	}
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let (payload, view_id) = embedded_payload().unwrap_or_else(|| {
		info!("no embedded payload; showing sample graph");
		(generate_sample_data(40), None)
	});
	let graph_data = Signal::derive(move || payload.clone());

	view! {
		<div class="fullscreen-graph">
			<GraphView
				data=graph_data
				view_id=view_id.unwrap_or_else(|| "graph".into())
				fullscreen=true
			/>
		</div>
	}
}
