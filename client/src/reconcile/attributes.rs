//! Applies a classified node's `attributes` mapping onto a live DOM element
//! (§3's `style`/`class_name`/`html_for` remapping).

use serde_json::Value as Json;
use web_sys::{Element, HtmlElement};

use crate::model::Attributes;

/// Attribute keys the reconciler handles itself and never forwards to
/// [`Element::set_attribute`].
const SPECIAL_KEYS: [&str; 4] = ["key", "style", "class_name", "html_for"];

/// Replaces `element`'s attributes with `attributes`, removing whatever was
/// present in `previous` but is no longer present in `attributes`.
pub fn apply(element: &Element, attributes: &Attributes, previous: Option<&Attributes>) {
    if let Some(previous) = previous {
        for key in previous.keys() {
            if SPECIAL_KEYS.contains(&key.as_str()) || attributes.contains_key(key) {
                continue;
            }
            let _ = element.remove_attribute(key);
        }
        if previous.contains_key("style") && !attributes.contains_key("style") {
            if let Some(html_element) = element.dyn_ref_html_element() {
                let _ = html_element.style().set_css_text("");
            }
        }
    }

    for (key, value) in attributes {
        match key.as_str() {
            "key" => {}
            "style" => apply_style(element, value),
            "class_name" => apply_simple(element, "class", value),
            "html_for" => apply_simple(element, "for", value),
            _ => apply_simple(element, key, value),
        }
    }
}

fn apply_style(element: &Element, value: &Json) {
    let html_element = match element.dyn_ref_html_element() {
        Some(html_element) => html_element,
        None => return,
    };
    let style = html_element.style();
    let _ = style.set_css_text("");
    if let Some(props) = value.as_object() {
        for (prop, value) in props {
            if let Some(text) = as_css_value(value) {
                let _ = style.set_property(prop, &text);
            }
        }
    }
}

fn as_css_value(value: &Json) -> Option<String> {
    match value {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn apply_simple(element: &Element, name: &str, value: &Json) {
    match value {
        Json::Bool(true) => {
            let _ = element.set_attribute(name, "");
        }
        Json::Bool(false) | Json::Null => {
            let _ = element.remove_attribute(name);
        }
        Json::String(s) => {
            let _ = element.set_attribute(name, s);
        }
        Json::Number(n) => {
            let _ = element.set_attribute(name, &n.to_string());
        }
        Json::Array(_) | Json::Object(_) => {
            if let Ok(text) = serde_json::to_string(value) {
                let _ = element.set_attribute(name, &text);
            }
        }
    }
}

/// Extension trait narrowing an [`Element`] to [`HtmlElement`] without
/// pulling `wasm_bindgen::JsCast` into every call site above.
trait AsHtmlElement {
    fn dyn_ref_html_element(&self) -> Option<&HtmlElement>;
}

impl AsHtmlElement for Element {
    fn dyn_ref_html_element(&self) -> Option<&HtmlElement> {
        use wasm_bindgen::JsCast as _;
        self.dyn_ref::<HtmlElement>()
    }
}
