//! Force-directed graph view embeddable in a host page.

mod component;
mod host;
mod render;
mod scale;
mod simulation;
mod state;
mod types;

pub use component::GraphView;
pub use types::{GraphLink, GraphNode, GraphPayload};
