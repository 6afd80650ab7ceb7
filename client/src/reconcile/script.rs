//! `ScriptElement` rendering: attribute-driven `<script>` insertion, or
//! eval-and-cleanup for bare string children (§4.4).

use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Document, Element, HtmlScriptElement};

use crate::model::ScriptNode;

/// Persistent state for one rendered `ScriptNode`: either a real `<script>`
/// element, or a cleanup value returned by an evaluated script, kept around
/// so it can be invoked on unmount.
pub enum ScriptState {
    /// Model had attributes; `element` is the constructed `<script>` node
    /// inserted at this child's position.
    Element(Element),
    /// Model had no attributes; its first string child was evaluated.
    /// `cleanup`, if the evaluation returned a callable, is invoked on
    /// unmount or re-key.
    Evaluated { cleanup: Option<js_sys::Function> },
}

/// Builds the rendered state for a freshly mounted `ScriptNode`.
pub fn create(document: &Document, node: &ScriptNode) -> ScriptState {
    if node.attributes.is_empty() {
        ScriptState::Evaluated { cleanup: evaluate(node) }
    } else {
        ScriptState::Element(build_element(document, node))
    }
}

/// Returns the DOM node contributed by this script to its parent's child
/// list, if attribute-mode; `None` in eval mode (no DOM is produced).
pub fn dom_element(state: &ScriptState) -> Option<&Element> {
    match state {
        ScriptState::Element(element) => Some(element),
        ScriptState::Evaluated { .. } => None,
    }
}

/// Tears down a `ScriptState`, invoking an eval-mode cleanup if present.
/// Attribute-mode elements need no explicit teardown beyond DOM removal,
/// handled by the caller.
pub fn destroy(state: ScriptState) {
    if let ScriptState::Evaluated { cleanup: Some(cleanup) } = state {
        if let Err(e) = cleanup.call0(&JsValue::NULL) {
            log::error!("Script cleanup threw: {e:?}");
        }
    }
}

fn build_element(document: &Document, node: &ScriptNode) -> Element {
    let element = document
        .create_element("script")
        .expect("document.createElement never fails for a valid tag name");
    super::attributes::apply(&element, &node.attributes, None);

    if let Some(script) = element.dyn_ref::<HtmlScriptElement>() {
        if let Some(text) = node.children.iter().find_map(leading_text) {
            script.set_text(&text);
        }
    }
    element
}

fn leading_text(child: &crate::model::VdomNode) -> Option<String> {
    match child {
        crate::model::VdomNode::Text(text) => Some(text.clone()),
        _ => None,
    }
}

/// Evaluates the first string child as JavaScript. If it returns a
/// function, that function is kept as the cleanup to run on unmount.
fn evaluate(node: &ScriptNode) -> Option<js_sys::Function> {
    let source = node.children.iter().find_map(leading_text)?;
    match js_sys::eval(&source) {
        Ok(result) => result.dyn_into::<js_sys::Function>().ok(),
        Err(e) => {
            log::error!("Evaluated script threw: {e:?}");
            None
        }
    }
}
