//! Keyed-diffing reconciler (C4): renders a classified [`VdomNode`] tree
//! into the host element, reusing per-node DOM identity and persistent
//! state (`UserInputElement` echo, `ImportedElement` bindings) by key.

mod attributes;
mod events;
mod import_source;
mod script;
mod user_input;

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use wasm_bindgen::JsCast as _;
use web_sys::{Document, Element, Node, Text};

use crate::{
    config::ServerLocation,
    model::{classify, ElementNode, ImportedNode, ScriptNode, VdomNode},
    platform,
    transport::WebSocketRpcClient,
};

use self::{
    events::BoundListeners, import_source::ImportedState, script::ScriptState,
    user_input::UserInputState,
};

/// Live DOM state for one previously-rendered [`VdomNode`], reused across
/// renders when a child's key (or position, if unkeyed) matches.
enum RenderedNode {
    Text(Text),
    /// `None` when the error message was empty (renders nothing).
    Error(Option<Element>),
    Fragment(Vec<RenderedNode>),
    Standard {
        tag: String,
        key: Option<String>,
        element: Rc<Element>,
        attrs_applied: crate::model::Attributes,
        children: Vec<RenderedNode>,
        listeners: BoundListeners,
    },
    UserInput {
        tag: String,
        key: Option<String>,
        element: Rc<Element>,
        attrs_applied: crate::model::Attributes,
        children: Vec<RenderedNode>,
        listeners: BoundListeners,
        input_state: UserInputState,
    },
    Script {
        key: Option<String>,
        state: ScriptState,
    },
    /// `fallback` mirrors whatever the producer declared for
    /// `importSource.fallback` while `state` is [`ImportedState::Loading`];
    /// it is torn down once the binding resolves (bound or failed) and
    /// `container`'s children become the binding's own responsibility.
    Imported {
        tag: String,
        key: Option<String>,
        source: String,
        container: Rc<Element>,
        state: Rc<RefCell<ImportedState>>,
        children: Vec<RenderedNode>,
        fallback: Option<Box<RenderedNode>>,
    },
}

/// Renders a [`VdomNode`] tree into a host element, diffing against the
/// previously rendered tree on every call.
pub struct Reconciler {
    host: Element,
    document: Document,
    location: ServerLocation,
    transport: Rc<WebSocketRpcClient>,
    root: RefCell<Option<RenderedNode>>,
    /// The last classified model reconciled into `root`, kept so
    /// [`Reconciler::rerender_last`] can re-diff against the real model
    /// (handlers included) instead of a handler-less reconstruction from
    /// rendered DOM state.
    last_model: RefCell<Option<VdomNode>>,
}

impl Reconciler {
    /// Creates a new [`Reconciler`] that will render into `host`.
    #[must_use]
    pub fn new(
        host: Element,
        location: ServerLocation,
        transport: Rc<WebSocketRpcClient>,
    ) -> Rc<Self> {
        let document = host.owner_document().unwrap_or_else(|| {
            web_sys::window()
                .expect("no global `window` exists")
                .document()
                .expect("no `document` on `window`")
        });
        Rc::new(Self {
            host,
            document,
            location,
            transport,
            root: RefCell::new(None),
            last_model: RefCell::new(None),
        })
    }

    /// Classifies `model` and reconciles it into the host element.
    pub fn render(self: &Rc<Self>, model: &serde_json::Value) {
        let vdom = classify(model);
        let previous = self.root.borrow_mut().take();
        let rendered = self.reconcile_node(previous, &vdom, false);

        sync_children(&self.host, std::slice::from_ref(&rendered));
        *self.root.borrow_mut() = Some(rendered);
        *self.last_model.borrow_mut() = Some(vdom);
    }

    /// Drops the rendered tree, tearing down every listener/binding/effect
    /// it holds.
    pub fn unmount(&self) {
        if let Some(node) = self.root.borrow_mut().take() {
            destroy_node(node);
        }
        while let Some(child) = self.host.first_child() {
            let _ = self.host.remove_child(&child);
        }
    }

    fn reconcile_node(
        self: &Rc<Self>,
        previous: Option<RenderedNode>,
        vdom: &VdomNode,
        suppress_fallback: bool,
    ) -> RenderedNode {
        match vdom {
            VdomNode::Text(text) => self.reconcile_text(previous, text),
            VdomNode::Error(message) => self.reconcile_error(previous, message),
            VdomNode::Fragment(children) => {
                self.reconcile_fragment(previous, children, suppress_fallback)
            }
            VdomNode::Standard(el) => self.reconcile_element(previous, el, false),
            VdomNode::UserInput(el) => self.reconcile_element(previous, el, true),
            VdomNode::Script(script_node) => self.reconcile_script(previous, script_node),
            VdomNode::Imported(imported) => {
                self.reconcile_imported(previous, imported, suppress_fallback)
            }
        }
    }

    fn reconcile_text(&self, previous: Option<RenderedNode>, text: &str) -> RenderedNode {
        if let Some(RenderedNode::Text(node)) = previous {
            node.set_data(text);
            return RenderedNode::Text(node);
        }
        if let Some(stale) = previous {
            destroy_node(stale);
        }
        RenderedNode::Text(
            Text::new_with_data(text).unwrap_or_else(|_| self.document.create_text_node(text)),
        )
    }

    fn reconcile_error(&self, previous: Option<RenderedNode>, message: &str) -> RenderedNode {
        if let Some(stale) = previous {
            destroy_node(stale);
        }
        if message.is_empty() {
            return RenderedNode::Error(None);
        }
        let element = self
            .document
            .create_element("pre")
            .expect("document.createElement never fails for a valid tag name");
        element.set_text_content(Some(message));
        RenderedNode::Error(Some(element))
    }

    fn reconcile_fragment(
        self: &Rc<Self>,
        previous: Option<RenderedNode>,
        children: &[VdomNode],
        suppress_fallback: bool,
    ) -> RenderedNode {
        let previous_children = match previous {
            Some(RenderedNode::Fragment(children)) => children,
            Some(stale) => {
                destroy_node(stale);
                Vec::new()
            }
            None => Vec::new(),
        };
        RenderedNode::Fragment(self.diff_children(previous_children, children, suppress_fallback))
    }

    fn reconcile_element(
        self: &Rc<Self>,
        previous: Option<RenderedNode>,
        el: &ElementNode,
        is_user_input: bool,
    ) -> RenderedNode {
        let reused = match previous {
            Some(RenderedNode::Standard { tag, key, element, attrs_applied, children, .. })
                if !is_user_input && tag == el.tag =>
            {
                Some((key, element, Some(attrs_applied), children, UserInputState::default()))
            }
            Some(RenderedNode::UserInput { tag, key, element, attrs_applied, children, input_state, .. })
                if is_user_input && tag == el.tag =>
            {
                Some((key, element, Some(attrs_applied), children, input_state))
            }
            Some(stale) => {
                destroy_node(stale);
                None
            }
            None => None,
        };

        let (key, element, previous_attrs, previous_children, mut input_state) = match reused {
            Some((key, element, attrs, children, input_state)) => {
                (key, element, attrs, children, input_state)
            }
            None => {
                let element = self.document.create_element(&el.tag).unwrap_or_else(|_| {
                    self.document
                        .create_element("span")
                        .expect("document.createElement never fails for `span`")
                });
                (el.key.clone(), Rc::new(element), None, Vec::new(), UserInputState::default())
            }
        };

        attributes::apply(&element, &el.attributes, previous_attrs.as_ref());
        if is_user_input {
            input_state.sync(&element, &el.attributes);
        }

        let listeners = events::bind(&element, &el.handlers, &self.transport);
        let children = self.diff_children(previous_children, &el.children, false);
        sync_children(&element, &children);

        if is_user_input {
            RenderedNode::UserInput {
                tag: el.tag.clone(),
                key,
                element,
                attrs_applied: el.attributes.clone(),
                children,
                listeners,
                input_state,
            }
        } else {
            RenderedNode::Standard {
                tag: el.tag.clone(),
                key,
                element,
                attrs_applied: el.attributes.clone(),
                children,
                listeners,
            }
        }
    }

    fn reconcile_script(&self, previous: Option<RenderedNode>, node: &ScriptNode) -> RenderedNode {
        if let Some(RenderedNode::Script { key, .. }) = &previous {
            if node.key.is_some() && key.as_ref() == node.key.as_ref() {
                // Same key: leave the effect untouched, per §4.4.
                return previous.unwrap();
            }
        }
        if let Some(stale) = previous {
            destroy_node(stale);
        }
        RenderedNode::Script {
            key: node.key.clone(),
            state: script::create(&self.document, node),
        }
    }

    fn reconcile_imported(
        self: &Rc<Self>,
        previous: Option<RenderedNode>,
        node: &ImportedNode,
        suppress_fallback: bool,
    ) -> RenderedNode {
        let reused = match previous {
            Some(RenderedNode::Imported { tag, key, source, container, state, children, fallback })
                if tag == node.tag && key == node.key && source == node.import_source.source =>
            {
                Some((container, state, children, fallback))
            }
            Some(stale) => {
                destroy_node(stale);
                None
            }
            None => None,
        };

        let (container, state, previous_children, previous_fallback) = match reused {
            Some(quad) => quad,
            None => {
                let container = Rc::new(
                    self.document
                        .create_element("div")
                        .expect("document.createElement never fails for `div`"),
                );
                let (initial, unmounted) = ImportedState::loading();
                let state = Rc::new(RefCell::new(initial));

                let weak_self = Rc::downgrade(self);
                let location = self.location.clone();
                let import_source = node.import_source.clone();
                let container_for_task = Rc::clone(&container);
                let state_for_task = Rc::clone(&state);
                platform::spawn(async move {
                    let resolved = import_source::resolve(
                        location,
                        import_source,
                        (*container_for_task).clone(),
                        unmounted,
                    )
                    .await;
                    if let Some(resolved) = resolved {
                        *state_for_task.borrow_mut() = resolved;
                        if let Some(this) = weak_self.upgrade() {
                            this.rerender_last();
                        }
                    }
                });

                (container, state, Vec::new(), None)
            }
        };

        let children = self.diff_children(previous_children, &node.children, true);

        let is_bound = matches!(&*state.borrow(), ImportedState::Bound(_));
        let fallback = if is_bound {
            // The binding owns `container`'s children from here on; we never
            // touch them again.
            if let Some(stale) = previous_fallback {
                destroy_node(*stale);
            }
            let mut child_nodes = Vec::new();
            for child in &children {
                dom_nodes_of(child, &mut child_nodes);
            }
            import_source::update(&state, &container, node, &child_nodes);
            None
        } else {
            match &*state.borrow() {
                ImportedState::Bound(_) => unreachable!("checked above"),
                ImportedState::Failed => {
                    if let Some(stale) = previous_fallback {
                        destroy_node(*stale);
                    }
                    None
                }
                ImportedState::Loading { .. } => {
                    if suppress_fallback {
                        if let Some(stale) = previous_fallback {
                            destroy_node(*stale);
                        }
                        sync_children(&container, &[]);
                        None
                    } else {
                        match &node.import_source.fallback {
                            Some(fallback_vdom) => {
                                let rendered = self.reconcile_node(
                                    previous_fallback.map(|b| *b),
                                    fallback_vdom,
                                    false,
                                );
                                sync_children(&container, std::slice::from_ref(&rendered));
                                Some(Box::new(rendered))
                            }
                            None => {
                                if let Some(stale) = previous_fallback {
                                    destroy_node(*stale);
                                }
                                sync_children(&container, &[]);
                                None
                            }
                        }
                    }
                }
            }
        };

        RenderedNode::Imported {
            tag: node.tag.clone(),
            key: node.key.clone(),
            source: node.import_source.source.clone(),
            container,
            state,
            children,
            fallback,
        }
    }

    /// Diffs `previous` against `next`, matching by `key` where present and
    /// falling back to positional index otherwise. Unconsumed previous
    /// children are torn down.
    fn diff_children(
        self: &Rc<Self>,
        previous: Vec<RenderedNode>,
        next: &[VdomNode],
        suppress_fallback: bool,
    ) -> Vec<RenderedNode> {
        let mut by_key: HashMap<String, RenderedNode> = HashMap::new();
        let mut positional: Vec<Option<RenderedNode>> = Vec::with_capacity(previous.len());

        for child in previous {
            match key_of(&child) {
                Some(key) => {
                    by_key.insert(key, child);
                }
                None => positional.push(Some(child)),
            }
        }

        let mut positional = positional.into_iter();
        let mut result = Vec::with_capacity(next.len());

        for vdom in next {
            let matched = vdom_key(vdom).and_then(|key| by_key.remove(key)).or_else(|| {
                if vdom_key(vdom).is_some() {
                    None
                } else {
                    positional.next().flatten()
                }
            });
            result.push(self.reconcile_node(matched, vdom, suppress_fallback));
        }

        for (_, leftover) in by_key {
            destroy_node(leftover);
        }
        for leftover in positional.flatten() {
            destroy_node(leftover);
        }

        result
    }

    /// Re-diffs the current tree against the last model reconciled into it,
    /// used to react to an asynchronous state change (import resolution)
    /// that isn't triggered by a new server-pushed model. Re-diffing against
    /// the retained [`VdomNode`] (rather than one reconstructed from
    /// rendered DOM state) keeps every node's `eventHandlers` intact, so an
    /// import source resolving elsewhere in the tree doesn't unbind
    /// listeners on unrelated nodes.
    fn rerender_last(self: &Rc<Self>) {
        let vdom = match self.last_model.borrow().clone() {
            Some(vdom) => vdom,
            None => return,
        };
        let previous = self.root.borrow_mut().take();
        let rendered = self.reconcile_node(previous, &vdom, false);

        sync_children(&self.host, std::slice::from_ref(&rendered));
        *self.root.borrow_mut() = Some(rendered);
    }
}

fn key_of(node: &RenderedNode) -> Option<String> {
    match node {
        RenderedNode::Standard { key, .. }
        | RenderedNode::UserInput { key, .. }
        | RenderedNode::Script { key, .. }
        | RenderedNode::Imported { key, .. } => key.clone(),
        _ => None,
    }
}

fn vdom_key(vdom: &VdomNode) -> Option<&str> {
    match vdom {
        VdomNode::Standard(el) | VdomNode::UserInput(el) => el.key.as_deref(),
        VdomNode::Script(s) => s.key.as_deref(),
        VdomNode::Imported(i) => i.key.as_deref(),
        _ => None,
    }
}

/// Appends the DOM nodes contributed by `node` (recursively expanding
/// fragments) to `out`, in document order.
fn dom_nodes_of(node: &RenderedNode, out: &mut Vec<Node>) {
    match node {
        RenderedNode::Text(text) => out.push(text.clone().unchecked_into()),
        RenderedNode::Error(Some(element)) => out.push(element.clone().unchecked_into()),
        RenderedNode::Error(None) => {}
        RenderedNode::Fragment(children) => {
            for child in children {
                dom_nodes_of(child, out);
            }
        }
        RenderedNode::Standard { element, .. } | RenderedNode::UserInput { element, .. } => {
            out.push((**element).clone().unchecked_into());
        }
        RenderedNode::Script { state, .. } => {
            if let Some(element) = script::dom_element(state) {
                out.push(element.clone().unchecked_into());
            }
        }
        RenderedNode::Imported { container, .. } => {
            out.push((**container).clone().unchecked_into());
        }
    }
}

/// Reconciles `parent`'s live DOM children to exactly the nodes contributed
/// by `children`, in order. Existing nodes are moved (not recreated) via
/// repeated [`Element::append_child`] calls — each call relocates an
/// already-attached node to the end, so replaying the wanted order into an
/// initially-unordered child list converges on the right arrangement without
/// `insertBefore`-based reference-node bookkeeping. Nodes no longer wanted
/// are detached first.
fn sync_children(parent: &Element, children: &[RenderedNode]) {
    let mut wanted = Vec::new();
    for child in children {
        dom_nodes_of(child, &mut wanted);
    }

    let existing = parent.child_nodes();
    let mut stale = Vec::new();
    for i in 0..existing.length() {
        if let Some(node) = existing.item(i) {
            if !wanted.iter().any(|w| w.is_same_node(Some(&node))) {
                stale.push(node);
            }
        }
    }
    for node in &stale {
        let _ = parent.remove_child(node);
    }
    for node in &wanted {
        let _ = parent.append_child(node);
    }
}

fn destroy_node(node: RenderedNode) {
    match node {
        RenderedNode::Text(_) | RenderedNode::Error(_) => {}
        RenderedNode::Fragment(children) => {
            for child in children {
                destroy_node(child);
            }
        }
        RenderedNode::Standard { children, .. } | RenderedNode::UserInput { children, .. } => {
            for child in children {
                destroy_node(child);
            }
        }
        RenderedNode::Script { state, .. } => script::destroy(state),
        RenderedNode::Imported { state, children, fallback, .. } => {
            import_source::unmount(&state.borrow());
            if let Some(fallback) = fallback {
                destroy_node(*fallback);
            }
            for child in children {
                destroy_node(child);
            }
        }
    }
}
