//! Messages exchanged with the page hosting the widget.
//!
//! The host addresses a widget through channel names suffixed with the
//! widget's id (`getNodePositions_<id>`, `toggleLabels_<id>`,
//! `setTheme_<id>`). Position replies go back on `<id>_positions`.

use std::cell::RefCell;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use wasm_bindgen::JsValue;
use web_sys::{MessageEvent, Window};

use super::state::{GraphViewState, NodePosition};

#[derive(Clone, Debug, PartialEq)]
pub enum HostMessage {
	Positions,
	ToggleLabels { show: bool },
	SetTheme { dark: bool },
}

#[derive(Deserialize)]
struct ToggleLabels {
	show: bool,
}

#[derive(Deserialize)]
struct SetTheme {
	dark: bool,
}

/// Envelope posted by the host: `{ "type": <channel>, "message": <body> }`.
#[derive(Deserialize)]
struct Envelope {
	#[serde(rename = "type")]
	channel: String,
	#[serde(default)]
	message: Value,
}

impl HostMessage {
	/// Decodes a message on `channel` meant for `view_id`. Messages for other
	/// views, unknown channels and malformed bodies yield `None`.
	pub fn decode(view_id: &str, channel: &str, body: Value) -> Option<Self> {
		let name = channel.strip_suffix(view_id)?.strip_suffix('_')?;
		let parsed = match name {
			"getNodePositions" => Ok(HostMessage::Positions),
			"toggleLabels" => serde_json::from_value::<ToggleLabels>(body)
				.map(|m| HostMessage::ToggleLabels { show: m.show }),
			"setTheme" => {
				serde_json::from_value::<SetTheme>(body).map(|m| HostMessage::SetTheme { dark: m.dark })
			}
			_ => return None,
		};
		parsed
			.map_err(|err| warn!("dropping malformed `{channel}` message: {err}"))
			.ok()
	}

	/// Decodes a whole envelope as posted through `window.postMessage`.
	pub fn decode_envelope(view_id: &str, json: &str) -> Option<Self> {
		let envelope: Envelope = serde_json::from_str(json).ok()?;
		Self::decode(view_id, &envelope.channel, envelope.message)
	}
}

/// Column-oriented positions, the shape hosts read as a data frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PositionsTable {
	pub id: Vec<Value>,
	pub name: Vec<String>,
	pub x: Vec<f64>,
	pub y: Vec<f64>,
}

impl FromIterator<NodePosition> for PositionsTable {
	fn from_iter<I: IntoIterator<Item = NodePosition>>(iter: I) -> Self {
		let mut table = PositionsTable::default();
		for p in iter {
			table.id.push(p.id.to_value());
			table.name.push(p.name);
			table.x.push(p.x);
			table.y.push(p.y);
		}
		table
	}
}

/// Where replies to the host go.
pub trait HostChannel {
	fn send_positions(&self, view_id: &str, table: &PositionsTable);
}

/// Applies `message` to the view. Before the first render every message is
/// a no-op.
pub fn dispatch(
	state: Option<&mut GraphViewState>,
	message: &HostMessage,
	view_id: &str,
	channel: &dyn HostChannel,
) {
	let Some(state) = state.filter(|s| s.is_rendered()) else {
		debug!("ignoring {message:?}: view not rendered");
		return;
	};
	match *message {
		HostMessage::Positions => {
			let table: PositionsTable = state.positions().into_iter().collect();
			channel.send_positions(view_id, &table);
		}
		HostMessage::ToggleLabels { show } => state.set_labels(show),
		HostMessage::SetTheme { dark } => state.set_theme(dark),
	}
}

#[derive(Serialize)]
struct Reply<'a> {
	#[serde(rename = "type")]
	channel: String,
	value: &'a PositionsTable,
	priority: &'static str,
}

/// Target origin for replies to a message from `origin`. Opaque origins
/// (`"null"`, as sandboxed frames report) can only be addressed as `"*"`.
fn reply_origin(origin: &str) -> &str {
	if origin.is_empty() || origin == "null" {
		"*"
	} else {
		origin
	}
}

/// Talks to the embedding page through `postMessage`. Only messages posted
/// by the parent frame are accepted, and replies go back to the origin of
/// the last accepted message.
pub struct ParentFrameChannel {
	parent: Window,
	origin: RefCell<Option<String>>,
}

impl ParentFrameChannel {
	/// A channel to the parent frame, or `None` when the widget is not
	/// embedded in another page.
	pub fn detect(window: &Window) -> Option<Self> {
		let parent = window.parent().ok().flatten()?;
		let (own, other): (&JsValue, &JsValue) = (window.as_ref(), parent.as_ref());
		if own == other {
			return None;
		}
		Some(Self {
			parent,
			origin: RefCell::new(None),
		})
	}

	/// Whether `ev` came from the parent frame. Accepted events set the
	/// origin replies are posted to.
	pub fn accept(&self, ev: &MessageEvent) -> bool {
		let Some(source) = ev.source() else {
			return false;
		};
		let parent: &JsValue = self.parent.as_ref();
		if &JsValue::from(source) != parent {
			debug!("ignoring message from origin {}", ev.origin());
			return false;
		}
		*self.origin.borrow_mut() = Some(reply_origin(&ev.origin()).to_owned());
		true
	}
}

impl HostChannel for ParentFrameChannel {
	fn send_positions(&self, view_id: &str, table: &PositionsTable) {
		let Some(origin) = self.origin.borrow().clone() else {
			warn!("no host message accepted yet; not posting positions");
			return;
		};
		let reply = Reply {
			channel: format!("{view_id}_positions"),
			value: table,
			priority: "event",
		};
		let Ok(json) = serde_json::to_string(&reply) else {
			return;
		};
		match js_sys::JSON::parse(&json) {
			Ok(value) => {
				if let Err(err) = self.parent.post_message(&value, &origin) {
					warn!("failed to post positions: {err:?}");
				}
			}
			Err(err) => warn!("failed to encode positions: {err:?}"),
		}
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use serde_json::json;

	use super::*;
	use crate::components::graph_view::state::ViewConfig;
	use crate::components::graph_view::types::GraphPayload;
	use crate::components::graph_view::state::tests::{StubSimulation, positioned_payload};

	#[derive(Default)]
	struct Recorder {
		sent: RefCell<Vec<(String, PositionsTable)>>,
	}

	impl HostChannel for Recorder {
		fn send_positions(&self, view_id: &str, table: &PositionsTable) {
			self.sent.borrow_mut().push((view_id.to_owned(), table.clone()));
		}
	}

	#[test]
	fn decodes_channels_for_this_view_only() {
		assert_eq!(
			HostMessage::decode("graph_1", "getNodePositions_graph_1", Value::Null),
			Some(HostMessage::Positions)
		);
		assert_eq!(
			HostMessage::decode("1", "toggleLabels_graph_1", json!({"show": false})),
			None
		);
		assert_eq!(
			HostMessage::decode("g1", "toggleLabels_g1", json!({"show": false})),
			Some(HostMessage::ToggleLabels { show: false })
		);
		assert_eq!(
			HostMessage::decode("g1", "setTheme_g1", json!({"dark": true})),
			Some(HostMessage::SetTheme { dark: true })
		);
		assert_eq!(HostMessage::decode("g1", "setTheme_g2", json!({"dark": true})), None);
		assert_eq!(HostMessage::decode("g1", "setTheme_g1", json!({"dark": "yes"})), None);
		assert_eq!(HostMessage::decode("g1", "reticulate_g1", Value::Null), None);
	}

	#[test]
	fn replies_target_the_sender_origin() {
		assert_eq!(reply_origin("https://dash.example.org"), "https://dash.example.org");
		assert_eq!(reply_origin("null"), "*");
		assert_eq!(reply_origin(""), "*");
	}

	#[test]
	fn decodes_posted_envelopes() {
		assert_eq!(
			HostMessage::decode_envelope("w", r#"{"type": "setTheme_w", "message": {"dark": false}}"#),
			Some(HostMessage::SetTheme { dark: false })
		);
		assert_eq!(
			HostMessage::decode_envelope("w", r#"{"type": "getNodePositions_w"}"#),
			Some(HostMessage::Positions)
		);
		assert_eq!(HostMessage::decode_envelope("w", "not json"), None);
	}

	#[test]
	fn positions_reply_is_column_oriented() {
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&positioned_payload(), 500.0, 500.0);
		let recorder = Recorder::default();

		dispatch(Some(&mut state), &HostMessage::Positions, "w", &recorder);

		let sent = recorder.sent.borrow();
		assert_eq!(sent.len(), 1);
		let (view_id, table) = &sent[0];
		assert_eq!(view_id, "w");
		assert_eq!(table.name, ["A", "B", "C"]);
		assert_eq!(table.x, [50.0, 250.0, 450.0]);
		assert_eq!(table.y, [450.0, 50.0, 350.0]);
		assert_eq!(
			serde_json::to_value(table).unwrap(),
			json!({
				"id": ["a", "b", "c"],
				"name": ["A", "B", "C"],
				"x": [50.0, 250.0, 450.0],
				"y": [450.0, 50.0, 350.0],
			})
		);
	}

	#[test]
	fn positions_reply_echoes_numeric_ids() {
		let payload = GraphPayload::from_json(
			r#"{"nodes": {"id": [1, "two"], "name": ["One", "Two"], "x": [0, 10], "y": [0, 10]}}"#,
		)
		.unwrap();
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&payload, 500.0, 500.0);
		let recorder = Recorder::default();

		dispatch(Some(&mut state), &HostMessage::Positions, "w", &recorder);

		let sent = recorder.sent.borrow();
		assert_eq!(serde_json::to_value(&sent[0].1.id).unwrap(), json!([1, "two"]));
	}

	#[test]
	fn commands_are_idempotent_and_keep_positions() {
		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		state.render(&positioned_payload(), 500.0, 500.0);
		let before = state.positions();
		let recorder = Recorder::default();

		for _ in 0..2 {
			dispatch(Some(&mut state), &HostMessage::ToggleLabels { show: false }, "w", &recorder);
			assert!(!state.show_labels);
			dispatch(Some(&mut state), &HostMessage::SetTheme { dark: true }, "w", &recorder);
			assert!(state.dark_theme);
		}
		dispatch(Some(&mut state), &HostMessage::ToggleLabels { show: true }, "w", &recorder);
		assert!(state.show_labels);
		assert_eq!(state.positions(), before);
		assert!(recorder.sent.borrow().is_empty());
	}

	#[test]
	fn messages_before_render_are_no_ops() {
		let recorder = Recorder::default();
		dispatch(None, &HostMessage::Positions, "w", &recorder);

		let mut state = GraphViewState::new(StubSimulation::boxed(3), ViewConfig::default());
		dispatch(Some(&mut state), &HostMessage::Positions, "w", &recorder);
		dispatch(Some(&mut state), &HostMessage::SetTheme { dark: true }, "w", &recorder);

		assert!(recorder.sent.borrow().is_empty());
		assert!(!state.dark_theme);
	}
}
