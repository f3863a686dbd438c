use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{
	CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, MessageEvent, MouseEvent, WheelEvent,
	Window,
};

use super::host::{self, HostMessage, ParentFrameChannel};
use super::render;
use super::simulation::ForceGraphSimulation;
use super::state::{GraphViewState, ViewConfig};
use super::types::GraphPayload;

type SharedState = Rc<RefCell<Option<GraphViewState>>>;
type Callback<T> = Rc<RefCell<Option<Closure<T>>>>;

fn context(canvas: &HtmlCanvasElement) -> Option<CanvasRenderingContext2d> {
	canvas.get_context("2d").ok()??.dyn_into().ok()
}

/// Size the graph is laid out in: the window when fullscreen, otherwise the
/// requested size, falling back to the parent element's realized size.
fn measure(
	canvas: &HtmlCanvasElement,
	window: &Window,
	fullscreen: bool,
	width: Option<f64>,
	height: Option<f64>,
) -> (f64, f64) {
	if fullscreen {
		let inner = |v: Result<JsValue, JsValue>, fallback| v.ok().and_then(|v| v.as_f64()).unwrap_or(fallback);
		return (inner(window.inner_width(), 800.0), inner(window.inner_height(), 600.0));
	}
	let parent = canvas.parent_element();
	(
		width.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_width() as f64)
				.unwrap_or(800.0)
		}),
		height.unwrap_or_else(|| {
			parent
				.as_ref()
				.map(|p| p.client_height() as f64)
				.unwrap_or(600.0)
		}),
	)
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Cursor for a pointer hovering at a spot, not dragging.
fn hover_cursor(over_node: bool) -> &'static str {
	if over_node { "grab" } else { "default" }
}

fn set_cursor(canvas_ref: NodeRef<leptos::html::Canvas>, cursor: &str) {
	if let Some(canvas) = canvas_ref.get() {
		let canvas: HtmlCanvasElement = canvas.into();
		let _ = HtmlElement::style(&canvas).set_property("cursor", cursor);
	}
}

/// Interactive force-directed graph on a canvas.
///
/// `view_id` scopes the host message channels. Host messages are only
/// listened for when the page is embedded in another frame, and only
/// accepted from the parent frame.
#[component]
pub fn GraphView(
	#[prop(into)] data: Signal<GraphPayload>,
	#[prop(into, default = "graph".to_string())] view_id: String,
	#[prop(default = false)] fullscreen: bool,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state: SharedState = Rc::new(RefCell::new(None));
	let animate: Callback<dyn FnMut()> = Rc::new(RefCell::new(None));
	let resize_cb: Callback<dyn FnMut()> = Rc::new(RefCell::new(None));
	let message_cb: Callback<dyn FnMut(MessageEvent)> = Rc::new(RefCell::new(None));
	let (state_init, animate_init, resize_cb_init, message_cb_init) = (
		state.clone(),
		animate.clone(),
		resize_cb.clone(),
		message_cb.clone(),
	);

	Effect::new(move |_| {
		let payload = data.get();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = measure(&canvas, &window, fullscreen, width, height);
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);
		state_init
			.borrow_mut()
			.get_or_insert_with(|| {
				GraphViewState::new(Box::new(ForceGraphSimulation::new()), ViewConfig::default())
			})
			.render(&payload, w, h);

		// Everything below is installed once per mounted canvas.
		if animate_init.borrow().is_some() {
			return;
		}
		let Some(ctx) = context(&canvas) else {
			error!("canvas has no 2d context");
			return;
		};

		let (state_resize, canvas_resize) = (state_init.clone(), canvas.clone());
		*resize_cb_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			let (nw, nh) = measure(&canvas_resize, &win, fullscreen, width, height);
			canvas_resize.set_width(nw as u32);
			canvas_resize.set_height(nh as u32);
			if let Some(ref mut s) = *state_resize.borrow_mut() {
				s.resize(nw, nh);
			}
		}));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		if let Some(channel) = ParentFrameChannel::detect(&window) {
			debug!("embedded in a host frame; listening for `{view_id}` messages");
			let (state_msg, view_id) = (state_init.clone(), view_id.clone());
			*message_cb_init.borrow_mut() = Some(Closure::new(move |ev: MessageEvent| {
				if !channel.accept(&ev) {
					return;
				}
				let Some(json) = js_sys::JSON::stringify(&ev.data()).ok().and_then(|s| s.as_string())
				else {
					return;
				};
				if let Some(message) = HostMessage::decode_envelope(&view_id, &json) {
					debug!("host message {message:?}");
					host::dispatch(
						state_msg.borrow_mut().as_mut(),
						&message,
						&view_id,
						&channel,
					);
				}
			}));
			if let Some(ref cb) = *message_cb_init.borrow() {
				let _ =
					window.add_event_listener_with_callback("message", cb.as_ref().unchecked_ref());
			}
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		let (resize_cb_anim, message_cb_anim) = (resize_cb_init.clone(), message_cb_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			let Some(win) = web_sys::window() else {
				return;
			};
			// The host removed the view: drop it and stop the loop.
			if !canvas.is_connected() {
				*state_anim.borrow_mut() = None;
				if let Some(ref cb) = *resize_cb_anim.borrow() {
					let _ = win.remove_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
				}
				if let Some(ref cb) = *message_cb_anim.borrow() {
					let _ =
						win.remove_event_listener_with_callback("message", cb.as_ref().unchecked_ref());
				}
				debug!("graph view removed");
				return;
			}
			if let Some(ref mut s) = *state_anim.borrow_mut() {
				if s.is_simulating() {
					s.tick();
				}
				render::render(s, &ctx);
			}
			if let Some(ref cb) = *animate_inner.borrow() {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_md.borrow_mut() {
			s.pointer_down(x, y);
			if s.drag.active {
				set_cursor(canvas_ref, "grabbing");
			}
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_mm.borrow_mut() {
			let over_node = s.pointer_move(x, y);
			if s.drag.active {
				// Redraw now rather than on the next frame so the node
				// tracks the pointer.
				if let Some(canvas) = canvas_ref.get() {
					let canvas: HtmlCanvasElement = canvas.into();
					if let Some(ctx) = context(&canvas) {
						render::render(s, &ctx);
					}
				}
			} else {
				set_cursor(canvas_ref, hover_cursor(over_node));
			}
		}
	};

	let state_mu = state.clone();
	let on_mouseup = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_mu.borrow_mut() {
			s.pointer_up();
		}
		set_cursor(canvas_ref, "default");
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		if let Some(ref mut s) = *state_ml.borrow_mut() {
			s.pointer_up();
		}
		set_cursor(canvas_ref, "default");
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		if let Some(ref mut s) = *state_wh.borrow_mut() {
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			s.zoom_at(x, y, factor);
		}
	};

	view! {
		<canvas
			node_ref=canvas_ref
			class="graph-view"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block;"
		/>
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hovering_a_node_offers_grab() {
		assert_eq!(hover_cursor(true), "grab");
		assert_eq!(hover_cursor(false), "default");
	}
}
