use std::collections::HashSet;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use thiserror::Error;

/// A node id as the host sent it. Ids match by their text form, so `1` and
/// `"1"` name the same node, while replies echo the original value.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeId {
	key: String,
	value: Value,
}

impl NodeId {
	pub fn as_str(&self) -> &str {
		&self.key
	}

	pub fn to_value(&self) -> Value {
		self.value.clone()
	}
}

impl From<String> for NodeId {
	fn from(key: String) -> Self {
		Self {
			value: Value::String(key.clone()),
			key,
		}
	}
}

impl From<&str> for NodeId {
	fn from(key: &str) -> Self {
		key.to_owned().into()
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.key)
	}
}

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
		let value = Value::deserialize(de)?;
		let key = id_key(&value).map_err(serde::de::Error::custom)?;
		Ok(Self { key, value })
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphNode {
	pub id: NodeId,
	#[serde(default)]
	pub name: Option<String>,
	#[serde(default)]
	pub x: Option<f64>,
	#[serde(default)]
	pub y: Option<f64>,
	#[serde(default)]
	pub size: Option<f64>,
	#[serde(default)]
	pub color: Option<String>,
}

impl GraphNode {
	/// Name shown in labels and reported to the host, falling back to the id.
	pub fn display_name(&self) -> &str {
		self.name.as_deref().unwrap_or(self.id.as_str())
	}

	pub fn position(&self) -> Option<(f64, f64)> {
		Some((self.x?, self.y?))
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphLink {
	#[serde(deserialize_with = "id_string")]
	pub source: String,
	#[serde(deserialize_with = "id_string")]
	pub target: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct GraphPayload {
	#[serde(deserialize_with = "table")]
	pub nodes: Vec<GraphNode>,
	#[serde(default, deserialize_with = "table")]
	pub links: Vec<GraphLink>,
	#[serde(default)]
	pub directed: bool,
	#[serde(default)]
	pub show_labels: bool,
	#[serde(default)]
	pub dark_theme: bool,
}

/// A node as laid out on the canvas. `x`/`y` are the current pixel
/// coordinates; `fx`/`fy` pin the node so the simulation leaves it alone.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewNode {
	pub id: NodeId,
	pub name: String,
	pub x: f64,
	pub y: f64,
	pub fx: Option<f64>,
	pub fy: Option<f64>,
	pub radius: f64,
	pub color: String,
}

impl ViewNode {
	pub fn is_fixed(&self) -> bool {
		self.fx.is_some() && self.fy.is_some()
	}

	/// Pins the node where it currently is.
	pub fn fix(&mut self) {
		self.fx = Some(self.x);
		self.fy = Some(self.y);
	}

	pub fn fix_at(&mut self, x: f64, y: f64) {
		self.x = x;
		self.y = y;
		self.fx = Some(x);
		self.fy = Some(y);
	}

	/// Fixed coordinates when pinned, otherwise the simulated ones.
	pub fn position(&self) -> (f64, f64) {
		(self.fx.unwrap_or(self.x), self.fy.unwrap_or(self.y))
	}
}

#[derive(Debug, Error)]
pub enum PayloadError {
	#[error("invalid graph payload: {0}")]
	Json(#[from] serde_json::Error),
	#[error("link {index} references unknown node `{id}`")]
	UnknownNode { index: usize, id: String },
}

impl GraphPayload {
	pub fn from_json(json: &str) -> Result<Self, PayloadError> {
		let payload: Self = serde_json::from_str(json)?;
		payload.check_links()?;
		Ok(payload)
	}

	fn check_links(&self) -> Result<(), PayloadError> {
		let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		for (index, link) in self.links.iter().enumerate() {
			for id in [&link.source, &link.target] {
				if !ids.contains(id.as_str()) {
					return Err(PayloadError::UnknownNode {
						index,
						id: id.clone(),
					});
				}
			}
		}
		Ok(())
	}
}

/// Hosts send ids as strings or numbers; both are keyed by their text form.
fn id_key(value: &Value) -> Result<String, String> {
	match value {
		Value::String(s) => Ok(s.clone()),
		Value::Number(n) => Ok(n.to_string()),
		other => Err(format!("expected string or number id, got {other}")),
	}
}

fn id_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
	id_key(&Value::deserialize(de)?).map_err(serde::de::Error::custom)
}

/// Accepts a table either as an array of row objects or as a data frame
/// (object of equal-length column arrays). `null` cells are dropped so they
/// read as absent fields.
fn table<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
	D: Deserializer<'de>,
	T: DeserializeOwned,
{
	let rows = match Value::deserialize(de)? {
		Value::Array(rows) => rows,
		Value::Object(columns) => columns_to_rows(columns).map_err(serde::de::Error::custom)?,
		Value::Null => Vec::new(),
		other => {
			return Err(serde::de::Error::custom(format!(
				"expected table, got {other}"
			)));
		}
	};
	rows.into_iter()
		.map(|row| serde_json::from_value(strip_nulls(row)).map_err(serde::de::Error::custom))
		.collect()
}

fn columns_to_rows(columns: Map<String, Value>) -> Result<Vec<Value>, String> {
	let mut len = None;
	let mut cols = Vec::with_capacity(columns.len());
	for (name, col) in columns {
		// A scalar column is a single-row frame.
		let cells = match col {
			Value::Array(cells) => cells,
			scalar => vec![scalar],
		};
		match len {
			None => len = Some(cells.len()),
			Some(n) if n != cells.len() => {
				return Err(format!(
					"column `{name}` has {} rows, expected {n}",
					cells.len()
				));
			}
			Some(_) => {}
		}
		cols.push((name, cells));
	}

	let mut rows: Vec<Map<String, Value>> = vec![Map::new(); len.unwrap_or(0)];
	for (name, cells) in cols {
		for (row, cell) in rows.iter_mut().zip(cells) {
			row.insert(name.clone(), cell);
		}
	}
	Ok(rows.into_iter().map(Value::Object).collect())
}

fn strip_nulls(row: Value) -> Value {
	match row {
		Value::Object(map) => Value::Object(map.into_iter().filter(|(_, v)| !v.is_null()).collect()),
		other => other,
	}
}
