//! Wires a classified node's `eventHandlers` to live DOM listeners that
//! forward serialized events to the server (§4.4's "Reconciler ↔ server
//! event plumbing").

use std::rc::Rc;

use web_sys::Element;

use crate::{
    event,
    model::EventHandlers,
    transport::WebSocketRpcClient,
    utils::EventListener,
    wire::ClientMsg,
};

/// Live listeners bound to one element, torn down together when the owning
/// [`super::RenderedNode`] is destroyed.
pub struct BoundListeners(Vec<EventListener<Element, web_sys::Event>>);

/// Installs one [`EventListener`] per entry in `handlers`.
///
/// A binding failure (the underlying `addEventListener` call itself cannot
/// fail in practice, but the wrapper surfaces `Result` for symmetry with
/// other platform calls) is logged and that single handler is skipped; it
/// never takes the whole node down.
pub fn bind(element: &Rc<Element>, handlers: &EventHandlers, transport: &Rc<WebSocketRpcClient>) -> BoundListeners {
    let mut listeners = Vec::with_capacity(handlers.len());

    for (event_name, spec) in handlers {
        let native_event_name = dom_event_name(event_name);
        let target = spec.target.clone();
        let prevent_default = spec.prevent_default;
        let stop_propagation = spec.stop_propagation;
        let transport = Rc::clone(transport);

        let listener = EventListener::new_mut(
            Rc::clone(element),
            native_event_name,
            move |native_event: web_sys::Event| {
                if prevent_default {
                    native_event.prevent_default();
                }
                if stop_propagation {
                    native_event.stop_propagation();
                }
                let data = event::serialize(&native_event);
                transport.send(ClientMsg::LayoutEvent {
                    target: target.clone(),
                    data: vec![data],
                });
            },
        );

        match listener {
            Ok(listener) => listeners.push(listener),
            Err(e) => log::error!("Failed to bind `{event_name}` handler: {e}"),
        }
    }

    BoundListeners(listeners)
}

/// Maps a prop-style event name (`onClick`) to the native DOM event name
/// `addEventListener` expects (`click`).
///
/// The native name is, with one exception, just the lowercased suffix after
/// `on`; `DoubleClick` is special-cased to the DOM's historical `dblclick`.
fn dom_event_name(prop_name: &str) -> String {
    let suffix = prop_name.strip_prefix("on").unwrap_or(prop_name);
    if suffix.eq_ignore_ascii_case("DoubleClick") {
        return "dblclick".to_owned();
    }
    suffix.to_ascii_lowercase()
}
