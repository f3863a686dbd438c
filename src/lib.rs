//! Interactive force-directed graph widget for embedding in host pages.
//!
//! The page reads its graph from an embedded `#graph-payload` script
//! element and falls back to a sample graph when there is none.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
mod components;
mod pages;

// Top-Level pages
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

/// The view fills the frame it is embedded in.
const PAGE_STYLE: &str = "html, body { margin: 0; height: 100%; overflow: hidden; }
.fullscreen-graph { width: 100vw; height: 100vh; }";

/// Simulation and host message tracing is only logged in debug builds.
fn log_level(debug_build: bool) -> Level {
	if debug_build { Level::Debug } else { Level::Info }
}

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let level = log_level(cfg!(debug_assertions));
	let _ = console_log::init_with_level(level);
	console_error_panic_hook::set_once();
	info!("graph view logging at {level}");
}

/// An app router which renders the graph view and handles 404's
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" />

		<Title text="Graph View" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />
		<Style>{PAGE_STYLE}</Style>

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn release_builds_log_at_info() {
		assert_eq!(log_level(true), Level::Debug);
		assert_eq!(log_level(false), Level::Info);
	}
}
