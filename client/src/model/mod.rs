//! In-memory representation of the server-pushed layout tree, and its
//! classification into a render-ready tagged union.

mod pointer;
mod store;

pub use self::{
    pointer::PointerError,
    store::{ModelStore, StoreError},
};

use std::collections::BTreeMap;

use serde_json::{Map, Value as Json};

/// HTML tags that get [`VdomNode::UserInput`] treatment.
const USER_INPUT_TAGS: [&str; 3] = ["input", "select", "textarea"];

/// Attribute/property mapping of a VDOM node, as received on the wire.
pub type Attributes = Map<String, Json>;

/// A single event binding declared by a VDOM node.
#[derive(Clone, Debug, PartialEq)]
pub struct EventSpec {
    /// Opaque identifier sent back to the server when this event fires.
    pub target: String,

    /// Whether the handler should call `Event.preventDefault()`.
    pub prevent_default: bool,

    /// Whether the handler should call `Event.stopPropagation()`.
    pub stop_propagation: bool,
}

/// `eventHandlers` mapping of a VDOM node, keyed by event name (e.g.
/// `onClick`).
pub type EventHandlers = BTreeMap<String, EventSpec>;

/// Where an [`ImportSource`]'s module comes from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ImportSourceKind {
    /// Resolved against the server's `/modules/<name>` endpoint.
    Name,
    /// Used as-is.
    Url,
}

/// Declares that a node renders through a dynamically-imported framework
/// binding instead of as plain HTML (§4.6).
#[derive(Clone, Debug, PartialEq)]
pub struct ImportSource {
    /// Module specifier or name, depending on `kind`.
    pub source: String,
    /// How to resolve `source` into a module specifier.
    pub kind: ImportSourceKind,
    /// What to render while the module is loading.
    pub fallback: Option<Box<VdomNode>>,
    /// Whether to unmount and re-bind on every update instead of calling
    /// `render` in place.
    pub unmount_before_update: bool,
}

/// A host element's classified shape: tag, key, attributes, children, and
/// event bindings shared by every element-like [`VdomNode`] variant.
#[derive(Clone, Debug, PartialEq)]
pub struct ElementNode {
    /// HTML tag name.
    pub tag: String,
    /// Stable sibling identity, if the producer supplied one.
    pub key: Option<String>,
    /// DOM attributes/properties.
    pub attributes: Attributes,
    /// Already-classified children.
    pub children: Vec<VdomNode>,
    /// Declared event bindings.
    pub handlers: EventHandlers,
}

/// A `<script>`-tagged node, which does not carry event handlers (§4.4).
#[derive(Clone, Debug, PartialEq)]
pub struct ScriptNode {
    /// Stable sibling identity, if the producer supplied one.
    pub key: Option<String>,
    /// DOM attributes; presence (non-empty) decides attribute- vs.
    /// eval-mode rendering.
    pub attributes: Attributes,
    /// Children; only a single leading string child matters in eval mode.
    pub children: Vec<VdomNode>,
}

/// A node whose rendering is delegated to a dynamically-imported framework
/// binding.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportedNode {
    /// Tag (or dotted sub-component path) resolved against the imported
    /// module's exports.
    pub tag: String,
    /// Stable sibling identity, if the producer supplied one.
    pub key: Option<String>,
    /// Attributes/props forwarded to the imported component.
    pub attributes: Attributes,
    /// Already-classified children.
    pub children: Vec<VdomNode>,
    /// Declared event bindings.
    pub handlers: EventHandlers,
    /// Where to load the binding module from.
    pub import_source: ImportSource,
}

/// A server-pushed layout node, classified once per render pass into the
/// specialized shape its renderer needs (§3's tagged-union expansion of the
/// original dispatch table).
#[derive(Clone, Debug, PartialEq)]
pub enum VdomNode {
    /// A plain text child.
    Text(String),
    /// `error` was set on the raw node; render `<pre>{0}</pre>`, or nothing
    /// if empty.
    Error(String),
    /// `tagName ∈ {input, select, textarea}`.
    UserInput(ElementNode),
    /// `tagName == "script"`.
    Script(ScriptNode),
    /// `importSource` was set on the raw node.
    Imported(ImportedNode),
    /// `tagName == ""`; renders its children with no host element.
    Fragment(Vec<VdomNode>),
    /// Any other tagged element.
    Standard(ElementNode),
}

/// Classifies a raw JSON layout node into a [`VdomNode`], recursively
/// classifying its children.
///
/// This is a pure function of its input, independent of any previous
/// render, which is what makes the classification step testable without a
/// live DOM.
#[must_use]
pub fn classify(value: &Json) -> VdomNode {
    if let Some(text) = value.as_str() {
        return VdomNode::Text(text.to_owned());
    }
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return VdomNode::Fragment(Vec::new()),
    };

    if let Some(error) = obj.get("error").and_then(Json::as_str) {
        return VdomNode::Error(error.to_owned());
    }

    let tag = obj.get("tagName").and_then(Json::as_str).unwrap_or_default();
    let attributes = obj
        .get("attributes")
        .and_then(Json::as_object)
        .cloned()
        .unwrap_or_default();
    let key = attributes.get("key").and_then(Json::as_str).map(str::to_owned);
    let children = obj
        .get("children")
        .and_then(Json::as_array)
        .map(|c| c.iter().map(classify).collect())
        .unwrap_or_default();
    let handlers = classify_handlers(obj.get("eventHandlers"));

    if USER_INPUT_TAGS.contains(&tag) {
        return VdomNode::UserInput(ElementNode {
            tag: tag.to_owned(),
            key,
            attributes,
            children,
            handlers,
        });
    }
    if tag == "script" {
        return VdomNode::Script(ScriptNode {
            key,
            attributes,
            children,
        });
    }
    if let Some(import_source) =
        obj.get("importSource").and_then(classify_import_source)
    {
        return VdomNode::Imported(ImportedNode {
            tag: tag.to_owned(),
            key,
            attributes,
            children,
            handlers,
            import_source,
        });
    }
    if tag.is_empty() {
        return VdomNode::Fragment(children);
    }

    VdomNode::Standard(ElementNode {
        tag: tag.to_owned(),
        key,
        attributes,
        children,
        handlers,
    })
}

fn classify_handlers(value: Option<&Json>) -> EventHandlers {
    let obj = match value.and_then(Json::as_object) {
        Some(obj) => obj,
        None => return EventHandlers::new(),
    };
    obj.iter()
        .filter_map(|(name, spec)| {
            let spec = spec.as_object()?;
            let target = spec.get("target")?.as_str()?.to_owned();
            let prevent_default = spec
                .get("preventDefault")
                .and_then(Json::as_bool)
                .unwrap_or(false);
            let stop_propagation = spec
                .get("stopPropagation")
                .and_then(Json::as_bool)
                .unwrap_or(false);
            Some((
                name.clone(),
                EventSpec {
                    target,
                    prevent_default,
                    stop_propagation,
                },
            ))
        })
        .collect()
}

fn classify_import_source(value: &Json) -> Option<ImportSource> {
    let obj = value.as_object()?;
    let source = obj.get("source")?.as_str()?.to_owned();
    let kind = match obj.get("sourceType").and_then(Json::as_str) {
        Some("URL") => ImportSourceKind::Url,
        _ => ImportSourceKind::Name,
    };
    let fallback = match obj.get("fallback") {
        Some(Json::Null) | None => None,
        Some(fallback) => Some(Box::new(classify(fallback))),
    };
    let unmount_before_update = obj
        .get("unmountBeforeUpdate")
        .and_then(Json::as_bool)
        .unwrap_or(false);
    Some(ImportSource {
        source,
        kind,
        fallback,
        unmount_before_update,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classifies_plain_text_child() {
        assert_eq!(classify(&json!("hello")), VdomNode::Text("hello".into()));
    }

    #[test]
    fn classifies_error_before_anything_else() {
        let node = classify(&json!({
            "tagName": "input",
            "error": "boom",
        }));
        assert_eq!(node, VdomNode::Error("boom".into()));
    }

    #[test]
    fn classifies_user_input_over_import_source() {
        let node = classify(&json!({
            "tagName": "input",
            "importSource": { "source": "x", "sourceType": "NAME" },
        }));
        assert!(matches!(node, VdomNode::UserInput(_)));
    }

    #[test]
    fn classifies_script_over_import_source() {
        let node = classify(&json!({
            "tagName": "script",
            "importSource": { "source": "x", "sourceType": "NAME" },
        }));
        assert!(matches!(node, VdomNode::Script(_)));
    }

    #[test]
    fn classifies_imported_element() {
        let node = classify(&json!({
            "tagName": "Foo.Bar",
            "importSource": {
                "source": "chart-lib",
                "sourceType": "NAME",
                "fallback": "loading",
            },
        }));
        match node {
            VdomNode::Imported(imported) => {
                assert_eq!(imported.tag, "Foo.Bar");
                assert_eq!(imported.import_source.source, "chart-lib");
                assert_eq!(imported.import_source.kind, ImportSourceKind::Name);
                assert_eq!(
                    imported.import_source.fallback,
                    Some(Box::new(VdomNode::Text("loading".into())))
                );
            }
            other => panic!("expected Imported, got {other:?}"),
        }
    }

    #[test]
    fn classifies_empty_tag_as_fragment() {
        let node = classify(&json!({
            "tagName": "",
            "children": ["a", "b"],
        }));
        assert_eq!(
            node,
            VdomNode::Fragment(vec![
                VdomNode::Text("a".into()),
                VdomNode::Text("b".into()),
            ])
        );
    }

    #[test]
    fn classifies_standard_element_with_key_and_handlers() {
        let node = classify(&json!({
            "tagName": "button",
            "attributes": { "key": "submit-btn", "disabled": false },
            "eventHandlers": {
                "onClick": { "target": "42", "preventDefault": true },
            },
        }));
        match node {
            VdomNode::Standard(el) => {
                assert_eq!(el.tag, "button");
                assert_eq!(el.key.as_deref(), Some("submit-btn"));
                let handler = el.handlers.get("onClick").unwrap();
                assert_eq!(handler.target, "42");
                assert!(handler.prevent_default);
                assert!(!handler.stop_propagation);
            }
            other => panic!("expected Standard, got {other:?}"),
        }
    }
}
