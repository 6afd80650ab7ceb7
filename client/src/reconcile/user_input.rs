//! Controlled-input local echo for `UserInputElement` (§4.4).

use serde_json::Value as Json;
use wasm_bindgen::JsCast as _;
use web_sys::{Element, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement};

use crate::model::Attributes;

/// Tracks the last `value`/`checked` this element was synchronized to from
/// the server, so a reconcile pass only overwrites the DOM's live value when
/// the server actually changed it — never when the change is the user's own
/// typing echoed back unmodified (the common case, since the server usually
/// just accepts what it was sent).
#[derive(Default)]
pub struct UserInputState {
    last_synced_value: Option<Json>,
    last_synced_checked: Option<Json>,
}

impl UserInputState {
    /// Applies `attributes.value`/`attributes.checked` to `element`,
    /// skipping either one whose server value hasn't changed since the last
    /// sync (leaving room for in-progress local typing/toggling).
    pub fn sync(&mut self, element: &Element, attributes: &Attributes) {
        if let Some(value) = attributes.get("value") {
            if self.last_synced_value.as_ref() != Some(value) {
                set_value(element, value);
                self.last_synced_value = Some(value.clone());
            }
        }
        if let Some(checked) = attributes.get("checked") {
            if self.last_synced_checked.as_ref() != Some(checked) {
                set_checked(element, checked);
                self.last_synced_checked = Some(checked.clone());
            }
        }
    }
}

fn set_value(element: &Element, value: &Json) {
    let text = match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => n.to_string(),
        Json::Null => String::new(),
        _ => return,
    };
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.set_value(&text);
    } else if let Some(textarea) = element.dyn_ref::<HtmlTextAreaElement>() {
        textarea.set_value(&text);
    } else if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
        select.set_value(&text);
    }
}

fn set_checked(element: &Element, value: &Json) {
    let checked = match value {
        Json::Bool(b) => *b,
        _ => return,
    };
    if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
        input.set_checked(checked);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wasm_bindgen_test::wasm_bindgen_test;

    use super::*;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    fn input() -> Element {
        web_sys::window()
            .unwrap()
            .document()
            .unwrap()
            .create_element("input")
            .unwrap()
    }

    #[wasm_bindgen_test]
    fn syncs_server_value_on_first_update() {
        let element = input();
        let mut state = UserInputState::default();
        let mut attrs = Attributes::new();
        attrs.insert("value".into(), json!("hello"));

        state.sync(&element, &attrs);

        assert_eq!(element.dyn_ref::<HtmlInputElement>().unwrap().value(), "hello");
    }

    #[wasm_bindgen_test]
    fn does_not_clobber_unchanged_value_on_repeat_sync() {
        let element = input();
        let mut state = UserInputState::default();
        let mut attrs = Attributes::new();
        attrs.insert("value".into(), json!("hello"));
        state.sync(&element, &attrs);

        let typed = element.dyn_ref::<HtmlInputElement>().unwrap();
        typed.set_value("hello-but-user-kept-typing");

        state.sync(&element, &attrs);

        assert_eq!(typed.value(), "hello-but-user-kept-typing");
    }

    #[wasm_bindgen_test]
    fn resyncs_when_server_value_changes() {
        let element = input();
        let mut state = UserInputState::default();
        let mut attrs = Attributes::new();
        attrs.insert("value".into(), json!("hello"));
        state.sync(&element, &attrs);

        attrs.insert("value".into(), json!("goodbye"));
        state.sync(&element, &attrs);

        assert_eq!(element.dyn_ref::<HtmlInputElement>().unwrap().value(), "goodbye");
    }
}
