//! Import-Source Loader (C6): resolves a framework binding from a
//! dynamically-imported module and drives it across renders (§4.6).

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use js_sys::{Array, Function};
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{Element, Node};

use crate::{
    config::ServerLocation,
    model::{Attributes, ImportSource, ImportSourceKind, ImportedNode},
    platform,
};

/// A `{create, render, unmount}` triple obtained from an import source's
/// `bind(node, context)` call, plus the module namespace it came from (for
/// resolving `node.tag` against its exports on every render).
struct Binding {
    module: JsValue,
    create: Function,
    render: Function,
    unmount: Function,
}

/// Persistent state for one rendered `ImportedNode`. The node's container
/// element lives alongside this in the reconciler's `RenderedNode`, since it
/// exists (and is where `fallback` renders) before the import settles.
pub enum ImportedState {
    /// Module import is in flight. `unmounted` is checked by the pending
    /// [`resolve`] future so a torn-down node doesn't bind after the fact.
    Loading { unmounted: Rc<Cell<bool>> },
    /// Binding has been established over the node's container.
    Bound(Binding),
    /// The module failed to import, or did not satisfy the binding
    /// contract; an error message has been rendered into the container.
    Failed,
}

impl ImportedState {
    /// Starts a [`ImportedState::Loading`] state and hands back the
    /// cancellation flag the caller should flip when the owning node is
    /// torn down before the import settles.
    #[must_use]
    pub fn loading() -> (Self, Rc<Cell<bool>>) {
        let unmounted = Rc::new(Cell::new(false));
        (Self::Loading { unmounted: Rc::clone(&unmounted) }, unmounted)
    }
}

/// Resolves `import_source`'s module and `bind()`s it against `container`.
/// Returns `None` if `unmounted` was flipped while this future was
/// in flight, in which case the caller must not touch `container` again.
pub async fn resolve(
    location: ServerLocation,
    import_source: ImportSource,
    container: Element,
    unmounted: Rc<Cell<bool>>,
) -> Option<ImportedState> {
    let specifier = match import_source.kind {
        ImportSourceKind::Url => import_source.source.clone(),
        ImportSourceKind::Name => location.module_url(&import_source.source),
    };

    let module = match platform::dynamic_import(&specifier).await {
        Ok(module) => module,
        Err(e) => {
            if unmounted.get() {
                return None;
            }
            log::error!("Failed to import `{specifier}`: {e:?}");
            render_error(&container, &specifier);
            return Some(ImportedState::Failed);
        }
    };
    if unmounted.get() {
        return None;
    }

    let bind_fn = match resolve_bind_fn(&module) {
        Some(f) => f,
        None => {
            log::error!("Module `{specifier}` does not export a `bind` function");
            render_error(&container, &specifier);
            return Some(ImportedState::Failed);
        }
    };

    let binding_obj = match bind_fn.call2(&JsValue::NULL, &container, &JsValue::NULL) {
        Ok(obj) => obj,
        Err(e) => {
            log::error!("`bind()` for `{specifier}` threw: {e:?}");
            render_error(&container, &specifier);
            return Some(ImportedState::Failed);
        }
    };

    match extract_binding(&binding_obj, module) {
        Some(binding) => Some(ImportedState::Bound(binding)),
        None => {
            log::error!(
                "`bind()` for `{specifier}` did not return {{create, render, unmount}}"
            );
            render_error(&container, &specifier);
            Some(ImportedState::Failed)
        }
    }
}

fn resolve_bind_fn(module: &JsValue) -> Option<Function> {
    platform::get_property_by_name(module, "bind", |v| v.dyn_into::<Function>().ok())
        .or_else(|| {
            platform::get_property_by_name(module, "default", |v| {
                v.dyn_into::<Function>().ok()
            })
        })
}

fn extract_binding(obj: &JsValue, module: JsValue) -> Option<Binding> {
    let create =
        platform::get_property_by_name(obj, "create", |v| v.dyn_into::<Function>().ok())?;
    let render =
        platform::get_property_by_name(obj, "render", |v| v.dyn_into::<Function>().ok())?;
    let unmount =
        platform::get_property_by_name(obj, "unmount", |v| v.dyn_into::<Function>().ok())?;
    Some(Binding { module, create, render, unmount })
}

/// Resolves `tag` against `module`'s exports, traversing dot-path
/// sub-component notation (`"Foo.Bar"` → `module.Foo.Bar`).
fn resolve_component(module: &JsValue, tag: &str) -> JsValue {
    tag.split('.').fold(module.clone(), |current, segment| {
        platform::get_property_by_name(&current, segment, Some).unwrap_or(JsValue::UNDEFINED)
    })
}

/// Drives one update of a bound import source: optionally unmounts and
/// re-binds first (when `node.import_source.unmount_before_update` is set,
/// for frameworks that mishandle in-place replacement), then renders.
///
/// A no-op beyond the optional rebind unless `state` ends up
/// [`ImportedState::Bound`].
pub fn update(
    state: &Rc<RefCell<ImportedState>>,
    container: &Element,
    node: &ImportedNode,
    rendered_children: &[Node],
) {
    if node.import_source.unmount_before_update {
        rebind(state, container);
    }
    render(&state.borrow(), node, rendered_children);
}

/// Unmounts the current binding and calls `bind()` again against the same
/// module namespace and container, replacing `state` with the fresh binding
/// (or [`ImportedState::Failed`] if re-binding did not succeed).
fn rebind(state: &Rc<RefCell<ImportedState>>, container: &Element) {
    let module = {
        let mut current = state.borrow_mut();
        let bound = matches!(&*current, ImportedState::Bound(_));
        if !bound {
            return;
        }
        match std::mem::replace(&mut *current, ImportedState::Failed) {
            ImportedState::Bound(binding) => {
                if let Err(e) = binding.unmount.call0(&JsValue::NULL) {
                    log::error!("`unmount()` threw during unmount-before-update: {e:?}");
                }
                binding.module
            }
            // Unreachable: we just checked `bound` above under the same
            // borrow, and nothing else can observe/replace this state
            // concurrently on a single-threaded runtime.
            _ => unreachable!("checked above"),
        }
    };

    let bind_fn = match resolve_bind_fn(&module) {
        Some(f) => f,
        None => {
            log::error!("Module no longer exports a `bind` function on rebind");
            return;
        }
    };
    match bind_fn.call2(&JsValue::NULL, container.as_ref(), &JsValue::NULL) {
        Ok(obj) => match extract_binding(&obj, module) {
            Some(binding) => *state.borrow_mut() = ImportedState::Bound(binding),
            None => log::error!("`bind()` did not return {{create, render, unmount}} on rebind"),
        },
        Err(e) => log::error!("`bind()` threw on rebind: {e:?}"),
    }
}

/// Calls `binding.render(binding.create(component, props, children))` for
/// the current render pass. A no-op unless `state` is [`ImportedState::Bound`].
///
/// `rendered_children` are the already-reconciled DOM nodes for
/// `node.children` (built by the caller through the ordinary reconciler, so
/// any plain nested VDOM keeps participating in normal diffing even beneath
/// an imported element).
fn render(state: &ImportedState, node: &ImportedNode, rendered_children: &[Node]) {
    let binding = match state {
        ImportedState::Bound(binding) => binding,
        _ => return,
    };

    let component = resolve_component(&binding.module, &node.tag);
    let props = attributes_to_js_object(&node.attributes);
    let children = Array::new();
    for child in rendered_children {
        children.push(child.as_ref());
    }

    let element = match binding.create.call3(&JsValue::NULL, &component, &props, &children) {
        Ok(element) => element,
        Err(e) => {
            log::error!("`create()` threw: {e:?}");
            return;
        }
    };

    if let Err(e) = binding.render.call1(&JsValue::NULL, &element) {
        log::error!("`render()` threw: {e:?}");
    }
}

/// Calls `binding.unmount()`, if a binding has been established.
pub fn unmount(state: &ImportedState) {
    if let ImportedState::Bound(binding) = state {
        if let Err(e) = binding.unmount.call0(&JsValue::NULL) {
            log::error!("`unmount()` threw: {e:?}");
        }
    }
}

fn attributes_to_js_object(attributes: &Attributes) -> JsValue {
    let value = serde_json::Value::Object(attributes.clone());
    JsValue::from_serde(&value).unwrap_or(JsValue::NULL)
}

fn render_error(container: &Element, specifier: &str) {
    container.set_text_content(Some(&format!("Failed to load \"{specifier}\"")));
}
