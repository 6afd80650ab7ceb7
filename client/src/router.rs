//! Ready-gated dispatcher from inbound [`ServerMsg`]s to per-type handlers
//! (§4.2).

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use futures::channel::oneshot;

use crate::wire::ServerMsg;

impl ServerMsg {
    /// Returns the wire `type` this message dispatches under, used as the
    /// [`Router`]'s lookup key.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::LayoutUpdate { .. } => "layout-update",
        }
    }
}

type Handler = Box<dyn Fn(&ServerMsg)>;

struct Inner {
    handlers: RefCell<HashMap<&'static str, Vec<(u64, Handler)>>>,
    next_id: RefCell<u64>,
    ready: RefCell<ReadyGate>,
}

/// The one-shot "first handler registered" signal the transport awaits
/// before dialing (§4.2's ready-gate), modeled as a fused, repeatedly
/// awaitable future over a [`oneshot::Receiver`].
enum ReadyGate {
    Pending {
        tx: oneshot::Sender<()>,
        rx: futures::future::Shared<
            futures::future::Map<oneshot::Receiver<()>, fn(Result<(), oneshot::Canceled>)>,
        >,
    },
    Unused,
}

/// Dispatches inbound [`ServerMsg`]s to handlers registered for their
/// [`ServerMsg::kind`], warning and dropping messages with no registered
/// handler (§4.2, §7).
#[derive(Clone)]
pub struct Router(Rc<Inner>);

/// Unregisters a handler from its [`Router`] when dropped.
#[must_use]
pub struct Unregister {
    id: u64,
    kind: &'static str,
    router: Rc<Inner>,
}

impl Drop for Unregister {
    fn drop(&mut self) {
        if let Some(handlers) = self.router.handlers.borrow_mut().get_mut(self.kind) {
            handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Router {
    /// Creates a new, empty [`Router`].
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        let fused: fn(Result<(), oneshot::Canceled>) = |_| ();
        use futures::FutureExt as _;
        let rx = rx.map(fused).shared();
        Self(Rc::new(Inner {
            handlers: RefCell::new(HashMap::new()),
            next_id: RefCell::new(0),
            ready: RefCell::new(ReadyGate::Pending { tx, rx }),
        }))
    }

    /// Registers `handler` for messages of the given `kind` (e.g.
    /// `"layout-update"`). The first call, across all `kind`s, resolves the
    /// future returned by [`Router::ready`].
    ///
    /// Returns an [`Unregister`] that removes the handler when dropped.
    pub fn on_message<F>(&self, kind: &'static str, handler: F) -> Unregister
    where
        F: Fn(&ServerMsg) + 'static,
    {
        self.mark_ready();

        let mut next_id = self.0.next_id.borrow_mut();
        let id = *next_id;
        *next_id += 1;
        drop(next_id);

        self.0
            .handlers
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push((id, Box::new(handler)));

        Unregister { id, kind, router: Rc::clone(&self.0) }
    }

    /// Dispatches `msg` to every handler registered for its
    /// [`ServerMsg::kind`]. Logs a warning and drops the message if no
    /// handler is registered (§7).
    pub fn handle_incoming(&self, msg: &ServerMsg) {
        let kind = msg.kind();
        match self.0.handlers.borrow().get(kind) {
            Some(handlers) if !handlers.is_empty() => {
                for (_, handler) in handlers {
                    handler(msg);
                }
            }
            _ => {
                log::warn!("No handler registered for message type `{kind}`");
            }
        }
    }

    /// Resolves once the first handler has been registered with
    /// [`Router::on_message`], guaranteeing no message is lost between
    /// socket open and handler registration.
    pub async fn ready(&self) {
        let shared = match &*self.0.ready.borrow() {
            ReadyGate::Pending { rx, .. } => rx.clone(),
            ReadyGate::Unused => return,
        };
        let _ = shared.await;
    }

    fn mark_ready(&self) {
        let mut gate = self.0.ready.borrow_mut();
        if let ReadyGate::Pending { .. } = &*gate {
            if let ReadyGate::Pending { tx, .. } =
                std::mem::replace(&mut *gate, ReadyGate::Unused)
            {
                let _ = tx.send(());
            }
            // Keep `Unused` — `ready()` short-circuits once marked, since a
            // handler has already been registered and the gate has already
            // resolved for every current/future waiter.
            *gate = ReadyGate::Unused;
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;

    #[test]
    fn dispatches_to_registered_handler() {
        let router = Router::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen2 = Rc::clone(&seen);
        let _unregister = router.on_message("layout-update", move |msg| {
            seen2.borrow_mut().push(msg.clone());
        });

        let msg = ServerMsg::LayoutUpdate {
            path: String::new(),
            model: serde_json::json!({"tagName": "div"}),
        };
        router.handle_incoming(&msg);

        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn unregister_on_drop_stops_dispatch() {
        let router = Router::new();
        let calls = Rc::new(RefCell::new(0));
        let calls2 = Rc::clone(&calls);
        let unregister = router.on_message("layout-update", move |_| {
            *calls2.borrow_mut() += 1;
        });
        drop(unregister);

        router.handle_incoming(&ServerMsg::LayoutUpdate {
            path: String::new(),
            model: serde_json::json!(null),
        });

        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn ready_resolves_after_first_registration() {
        let router = Router::new();
        let router2 = router.clone();
        let _unregister = router.on_message("layout-update", |_| {});

        block_on(router2.ready());
    }
}
