//! Observable holder of the current layout document (§4.3).

use derive_more::Display;
use futures::stream::LocalBoxStream;
use layout_reactive::ObservableCell;
use serde_json::{json, Value as Json};

use super::pointer::{self, PointerError};

/// Failed to apply a `layout-update` patch to the current document.
#[derive(Clone, Debug, Display, PartialEq)]
pub enum StoreError {
    /// The patch's `path` could not be resolved against the current
    /// document.
    #[display(fmt = "Failed to apply layout update at `{}`: {}", path, source)]
    InvalidPatch {
        /// The JSON Pointer that failed to resolve.
        path: String,
        /// The underlying pointer error.
        source: PointerError,
    },
}

/// Holds the single layout document built up from applied `layout-update`
/// patches, and notifies subscribers on every change.
///
/// Root document starts as `{"tagName": ""}`, which [`classify`][1] renders
/// as an empty [`Fragment`][2].
///
/// [1]: super::classify
/// [2]: super::VdomNode::Fragment
pub struct ModelStore(ObservableCell<Json>);

impl ModelStore {
    /// Creates a new [`ModelStore`] holding the empty root document.
    #[must_use]
    pub fn new() -> Self {
        Self(ObservableCell::new(json!({"tagName": ""})))
    }

    /// Applies a `layout-update` patch and notifies subscribers. `path == ""`
    /// deep-merges `model`'s fields into the root document, preserving any
    /// sibling fields `model` doesn't mention (§4.3); any other `path`
    /// replaces the value it resolves to with `model`.
    ///
    /// # Errors
    ///
    /// Errors if `path` cannot be resolved against the current document
    /// (e.g. a missing parent, or an out-of-bounds array index). The
    /// current document is left unchanged in that case.
    pub fn apply(&self, path: &str, model: Json) -> Result<(), StoreError> {
        let mut doc = self.0.borrow().clone();
        pointer::set(&mut doc, path, model).map_err(|source| StoreError::InvalidPatch {
            path: path.to_owned(),
            source,
        })?;
        self.0.set(doc);
        Ok(())
    }

    /// Returns a clone of the current document.
    #[must_use]
    pub fn get(&self) -> Json {
        self.0.borrow().clone()
    }

    /// Subscribes to every future document, including the current one, as
    /// they're produced by [`ModelStore::apply`].
    #[must_use]
    pub fn subscribe(&self) -> LocalBoxStream<'static, Json> {
        self.0.subscribe()
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt as _;
    use serde_json::json;

    use super::*;

    #[test]
    fn starts_empty() {
        let store = ModelStore::new();
        assert_eq!(store.get(), json!({"tagName": ""}));
    }

    #[test]
    fn apply_replaces_root_for_empty_path() {
        let store = ModelStore::new();
        store.apply("", json!({"tagName": "div"})).unwrap();
        assert_eq!(store.get(), json!({"tagName": "div"}));
    }

    #[test]
    fn apply_merges_root_preserving_untouched_siblings() {
        let store = ModelStore::new();
        store
            .apply("", json!({"tagName": "div", "attributes": {"id": "x"}}))
            .unwrap();
        store.apply("", json!({"tagName": "span"})).unwrap();
        assert_eq!(
            store.get(),
            json!({"tagName": "span", "attributes": {"id": "x"}})
        );
    }

    #[test]
    fn apply_patches_nested_path() {
        let store = ModelStore::new();
        store
            .apply("", json!({"tagName": "div", "children": [{"tagName": "span"}]}))
            .unwrap();
        store
            .apply("/children/0", json!({"tagName": "p"}))
            .unwrap();
        assert_eq!(
            store.get(),
            json!({"tagName": "div", "children": [{"tagName": "p"}]})
        );
    }

    #[test]
    fn apply_rejects_unresolvable_path_and_leaves_document_unchanged() {
        let store = ModelStore::new();
        let before = store.get();
        let err = store.apply("/children/0", json!({"tagName": "p"})).unwrap_err();
        assert!(matches!(err, StoreError::InvalidPatch { .. }));
        assert_eq!(store.get(), before);
    }

    #[test]
    fn subscribers_observe_applied_patches() {
        let store = ModelStore::new();
        let mut updates = store.subscribe();

        futures::executor::block_on(async {
            assert_eq!(updates.next().await, Some(json!({"tagName": ""})));

            store.apply("", json!({"tagName": "div"})).unwrap();
            assert_eq!(updates.next().await, Some(json!({"tagName": "div"})));
        });
    }
}
