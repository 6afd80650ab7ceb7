//! Converts native browser values into JSON-safe structures (§4.5).
//!
//! This is the most subtle part of the runtime: a server-declared event
//! handler receives whatever the browser hands it — most commonly a DOM
//! [`Event`], but potentially any object reachable from one — and the
//! result has to round-trip through `JSON.stringify`/`parse` on the wire
//! without throwing, without looping forever on circular references (every
//! [`Node`] points back at its `parentNode`), and without accidentally
//! triggering a synchronous layout reflow by touching `offsetWidth` et al.

use js_sys::{Array, Object, Reflect, Symbol};
use serde_json::{Map, Value as Json};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Event, HtmlFormElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

/// Recursion bound applied at the top-level call (§4.5).
const DEFAULT_MAX_DEPTH: i32 = 10;

/// Minimum depth granted to a `files` property so `File` descriptors
/// round-trip even if the surrounding recursion is almost exhausted.
const FILES_MIN_DEPTH: i32 = 3;

/// Property names skipped regardless of which object they appear on.
const GLOBALLY_IGNORED_KEYS: &[&str] = &["view", "size", "length"];

/// Recursive-/layout-triggering/large-payload [`Node`] properties, skipped
/// only when the parent being walked is a [`Node`] (§4.5).
const NODE_IGNORED_KEYS: &[&str] = &[
    "parentNode",
    "parentElement",
    "ownerDocument",
    "getRootNode",
    "childNodes",
    "children",
    "firstChild",
    "lastChild",
    "previousSibling",
    "nextSibling",
    "previousElementSibling",
    "nextElementSibling",
    "innerHTML",
    "outerHTML",
    "offsetParent",
    "offsetWidth",
    "offsetHeight",
    "offsetLeft",
    "offsetTop",
    "clientTop",
    "clientLeft",
    "clientWidth",
    "clientHeight",
    "scrollWidth",
    "scrollHeight",
    "scrollTop",
    "scrollLeft",
];

/// Allow-listed input properties folded in even when the host's prototype
/// chain doesn't make them enumerable.
const INPUT_ALLOW_LIST: &[&str] = &["value", "checked", "files", "type", "name", "dataset"];

/// Sentinel returned by the recursive walk instead of a value, standing in
/// for "this branch contributes nothing to the result" (cycle, depth
/// exhausted, or an ignorable value).
enum Walked {
    Value(Json),
    Stop,
}

/// Serializes a native [`Event`] (and anything reachable from it) into a
/// JSON-safe [`Json`] value, per §4.5's algorithm. Never panics: a property
/// access that throws on the JS side is treated the same as an ignorable
/// value — the property is dropped and the walk continues (§7).
#[must_use]
pub fn serialize(event: &Event) -> Json {
    let mut visited = Vec::new();
    let mut out = match walk(event.as_ref(), DEFAULT_MAX_DEPTH, &mut visited) {
        Walked::Value(Json::Object(map)) => map,
        _ => Map::new(),
    };

    if let Some(selection) = synthesize_selection(&mut visited) {
        out.insert("selection".to_owned(), selection);
    }

    Json::Object(out)
}

/// Recursively walks `value`, returning [`Walked::Stop`] for anything that
/// should not appear in the serialized output.
fn walk(value: &JsValue, depth: i32, visited: &mut Vec<JsValue>) -> Walked {
    if is_ignorable_value(value) {
        return Walked::Stop;
    }
    if let Some(primitive) = as_primitive(value) {
        return Walked::Value(primitive);
    }
    if depth <= 0 {
        return Walked::Stop;
    }
    if visited.iter().any(|seen| seen == value) {
        return Walked::Stop;
    }
    visited.push(value.clone());

    if value.is_instance_of::<web_sys::CssStyleDeclaration>() {
        return Walked::Value(serialize_style(value.unchecked_ref()));
    }
    if is_array_like(value) {
        return Walked::Value(serialize_array_like(value, depth, visited));
    }
    Walked::Value(serialize_object(value, depth, visited))
}

/// Values that are never serialized, independent of their key or parent.
fn is_ignorable_value(value: &JsValue) -> bool {
    if value.is_null() || value.is_undefined() {
        return true;
    }
    if value.is_function() {
        return true;
    }
    if value.is_instance_of::<web_sys::CssStyleSheet>() {
        return true;
    }
    if value.is_instance_of::<web_sys::Window>() {
        return true;
    }
    if value.is_instance_of::<web_sys::Document>() {
        return true;
    }
    false
}

/// Converts `value` to a [`Json`] primitive if it is a JS boolean, number,
/// or string; [`None`] for anything else (including objects and arrays).
fn as_primitive(value: &JsValue) -> Option<Json> {
    if let Some(b) = value.as_bool() {
        return Some(Json::Bool(b));
    }
    if let Some(n) = value.as_f64() {
        return serde_json::Number::from_f64(n).map(Json::Number).or(Some(Json::Null));
    }
    if let Some(s) = value.as_string() {
        return Some(Json::String(s));
    }
    None
}

/// `Array.isArray(x) OR (typeof x.length === "number" AND x[Symbol.iterator]
/// is a function)`, excluding `Map`/`Set`-flavored objects and
/// `CSSStyleDeclaration` (§4.5).
fn is_array_like(value: &JsValue) -> bool {
    if Array::is_array(value) {
        return true;
    }
    if value.is_instance_of::<js_sys::Map>() || value.is_instance_of::<js_sys::Set>() {
        return false;
    }
    if value.is_instance_of::<web_sys::CssStyleDeclaration>() {
        return false;
    }
    let has_length = Reflect::get(value, &JsValue::from_str("length"))
        .map(|len| len.as_f64().is_some())
        .unwrap_or(false);
    let has_iterator = Reflect::get(value, &Symbol::iterator())
        .map(|it| it.is_function())
        .unwrap_or(false);
    has_length && has_iterator
}

fn serialize_array_like(value: &JsValue, depth: i32, visited: &mut Vec<JsValue>) -> Json {
    let items = Array::from(value);
    let mut out = Vec::with_capacity(items.length() as usize);
    for item in items.iter() {
        if let Walked::Value(v) = walk(&item, depth - 1, visited) {
            out.push(v);
        }
    }
    Json::Array(out)
}

/// Iterates own and inherited enumerable keys (mirroring the source's
/// `for...in` walk, which the DOM's prototype chain makes see accessor
/// properties like `Event.target` or `Node.nodeName`), folds in the
/// allow-listed input properties, and special-cases `<form>` elements.
fn serialize_object(value: &JsValue, depth: i32, visited: &mut Vec<JsValue>) -> Json {
    let is_node = value.is_instance_of::<web_sys::Node>();
    let mut map = Map::new();

    for key in enumerable_keys(value).iter().filter_map(|k| k.as_string()) {
        insert_property(&mut map, value, &key, depth, visited, is_node);
    }
    for &key in INPUT_ALLOW_LIST {
        if map.contains_key(key) {
            continue;
        }
        insert_property(&mut map, value, key, depth, visited, is_node);
    }

    if let Some(form) = value.dyn_ref::<HtmlFormElement>() {
        fold_form_controls(form, &mut map);
    }

    Json::Object(map)
}

fn insert_property(
    map: &mut Map<String, Json>,
    value: &JsValue,
    key: &str,
    depth: i32,
    visited: &mut Vec<JsValue>,
    is_node: bool,
) {
    if is_ignorable_key(key, is_node) {
        return;
    }
    let Ok(prop) = Reflect::get(value, &JsValue::from_str(key)) else {
        // Property access threw; skip just this one (§7).
        return;
    };
    let sub_depth = if key == "files" { depth.max(FILES_MIN_DEPTH) } else { depth };
    if let Walked::Value(serialized) = walk(&prop, sub_depth - 1, visited) {
        map.insert(key.to_owned(), serialized);
    }
}

fn is_ignorable_key(key: &str, parent_is_node: bool) -> bool {
    if key.starts_with("__") {
        return true;
    }
    if is_all_caps_word(key) {
        return true;
    }
    if GLOBALLY_IGNORED_KEYS.contains(&key) {
        return true;
    }
    parent_is_node && NODE_IGNORED_KEYS.contains(&key)
}

fn is_all_caps_word(key: &str) -> bool {
    !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase())
}

/// Folds each named form control into the result under its `name`, the
/// way a plain `for...in` walk of a `<form>` element would not (form
/// controls are exposed positionally/by-name on the form itself, not as
/// enumerable own properties).
fn fold_form_controls(form: &HtmlFormElement, map: &mut Map<String, Json>) {
    let elements = form.elements();
    for i in 0..elements.length() {
        let Some(el) = elements.item(i) else { continue };
        let name = el.unchecked_ref::<web_sys::Element>().get_attribute("name");
        let Some(name) = name.filter(|n| !n.is_empty()) else { continue };

        let value = if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
            Some(Json::String(input.value()))
        } else if let Some(textarea) = el.dyn_ref::<HtmlTextAreaElement>() {
            Some(Json::String(textarea.value()))
        } else if let Some(select) = el.dyn_ref::<HtmlSelectElement>() {
            Some(Json::String(select.value()))
        } else {
            None
        };
        if let Some(value) = value {
            map.insert(name, value);
        }
    }
}

/// `CSSStyleDeclaration` exposes its set properties positionally
/// (`style[i]` is a property *name*, `style.getPropertyValue(name)` its
/// value); empty-string values are dropped (§4.5).
fn serialize_style(style: &web_sys::CssStyleDeclaration) -> Json {
    let mut map = Map::new();
    for i in 0..style.length() {
        let Ok(name) = style.item(i) else { continue };
        let Ok(value) = style.get_property_value(&name) else { continue };
        if value.is_empty() {
            continue;
        }
        map.insert(name, Json::String(value));
    }
    Json::Object(map)
}

/// Synthesizes the `selection` property attached to every serialized
/// `Event` from `window.getSelection()` (§4.5). Returns [`None`] if there is
/// no window or no active selection, in which case no `selection` key is
/// added at all.
fn synthesize_selection(visited: &mut Vec<JsValue>) -> Option<Json> {
    let selection = web_sys::window()?.get_selection().ok()??;

    let mut map = Map::new();
    map.insert("type".to_owned(), Json::String(selection.type_()));
    map.insert("anchorOffset".to_owned(), Json::from(selection.anchor_offset()));
    map.insert("focusOffset".to_owned(), Json::from(selection.focus_offset()));
    map.insert("isCollapsed".to_owned(), Json::Bool(selection.is_collapsed()));
    map.insert("rangeCount".to_owned(), Json::from(selection.range_count()));

    if let Some(anchor) = selection.anchor_node() {
        if let Walked::Value(v) = walk(anchor.as_ref(), FILES_MIN_DEPTH, visited) {
            map.insert("anchorNode".to_owned(), v);
        }
    }
    if let Some(focus) = selection.focus_node() {
        if let Walked::Value(v) = walk(focus.as_ref(), FILES_MIN_DEPTH, visited) {
            map.insert("focusNode".to_owned(), v);
        }
    }
    map.insert(
        "selectedText".to_owned(),
        Json::String(stringify(selection.as_ref()).unwrap_or_default()),
    );

    Some(Json::Object(map))
}

/// Calls `value.toString()` on the JS side, for objects (like `Selection`)
/// whose useful string form comes from a stringifier rather than a
/// primitive field.
fn stringify(value: &JsValue) -> Option<String> {
    let to_string = Reflect::get(value, &JsValue::from_str("toString")).ok()?;
    let to_string: js_sys::Function = to_string.dyn_into().ok()?;
    to_string.call0(value).ok()?.as_string()
}

#[wasm_bindgen::prelude::wasm_bindgen(inline_js = "\
export function enumerable_keys(obj) {\
    const keys = [];\
    for (const key in obj) { keys.push(key); }\
    return keys;\
}\
")]
extern "C" {
    /// `for...in` enumeration, which (unlike [`Object::keys`]) also walks
    /// inherited enumerable properties — the DOM's prototype chain makes
    /// accessor properties like `Event.target` enumerable this way, not as
    /// own properties of the event instance.
    fn enumerable_keys(obj: &JsValue) -> Array;
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wasm_bindgen_test::wasm_bindgen_test;

    use super::*;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn cycle_safe_serialization_does_not_throw_or_loop() {
        let obj = Object::new();
        Reflect::set(&obj, &JsValue::from_str("a"), &JsValue::from_f64(1.0)).unwrap();
        Reflect::set(&obj, &JsValue::from_str("self"), &obj).unwrap();

        let mut visited = Vec::new();
        let result = match walk(&obj, DEFAULT_MAX_DEPTH, &mut visited) {
            Walked::Value(v) => v,
            Walked::Stop => panic!("expected a value"),
        };

        assert_eq!(result.get("a"), Some(&json!(1.0)));
        assert_eq!(result.get("self"), None);
    }

    #[wasm_bindgen_test]
    fn depth_bound_terminates_on_infinite_nesting() {
        let root = Object::new();
        let mut current = root.clone();
        for _ in 0..50 {
            let child = Object::new();
            Reflect::set(&current, &JsValue::from_str("next"), &child).unwrap();
            current = child;
        }

        let mut visited = Vec::new();
        assert!(matches!(
            walk(&root, DEFAULT_MAX_DEPTH, &mut visited),
            Walked::Value(Json::Object(_))
        ));
    }

    #[wasm_bindgen_test]
    fn ignores_dunder_and_all_caps_keys() {
        assert!(is_ignorable_key("__proto__", false));
        assert!(is_ignorable_key("NONE", false));
        assert!(!is_ignorable_key("value", false));
    }

    #[wasm_bindgen_test]
    fn ignores_node_reflow_properties_only_on_nodes() {
        assert!(is_ignorable_key("offsetWidth", true));
        assert!(!is_ignorable_key("offsetWidth", false));
    }
}
