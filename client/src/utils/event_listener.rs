use std::rc::Rc;

use derive_more::{Display, From};
use tracerr::Traced;
use wasm_bindgen::{closure::Closure, convert::FromWasmAbi, JsCast};
use web_sys::EventTarget;

use super::{errors::JsCaused, JsError};

/// Failed to bind to an [`EventTarget`][1] event.
///
/// [1]: https://developer.mozilla.org/en-US/docs/Web/API/EventTarget
#[derive(Clone, Debug, Display, From, JsCaused, PartialEq)]
#[js(error = "JsError")]
pub struct EventListenerBindError(JsError);

/// Wrapper for a closure that handles some [`EventTarget`] event.
///
/// Bound on [`AsRef<EventTarget>`] rather than `Deref<Target = EventTarget>`
/// so it accepts any `web-sys` type in the `EventTarget` inheritance chain
/// (e.g. [`Element`](web_sys::Element), which derefs to `Node` and only
/// reaches `EventTarget` two hops up) and not just types that extend it
/// directly.
pub struct EventListener<T, A>
where
    T: AsRef<EventTarget>,
{
    event_name: String,
    target: Rc<T>,
    closure: Closure<dyn FnMut(A)>,
}

impl<T, A> EventListener<T, A>
where
    T: AsRef<EventTarget>,
    A: FromWasmAbi + 'static,
{
    /// Creates a new [`EventListener`] from the given [`FnMut`] `closure`.
    ///
    /// # Errors
    ///
    /// Errors if binding the [`EventListener`] fails.
    pub fn new_mut<F>(
        target: Rc<T>,
        event_name: impl Into<String>,
        closure: F,
    ) -> Result<Self, Traced<EventListenerBindError>>
    where
        F: FnMut(A) + 'static,
    {
        let event_name = event_name.into();
        let closure = Closure::wrap(Box::new(closure) as Box<dyn FnMut(A)>);

        target
            .as_ref()
            .add_event_listener_with_callback(
                &event_name,
                closure.as_ref().unchecked_ref(),
            )
            .map_err(JsError::from)
            .map_err(EventListenerBindError::from)
            .map_err(tracerr::wrap!())?;

        Ok(Self {
            event_name,
            target,
            closure,
        })
    }

    /// Creates a new [`EventListener`] from the given [`FnOnce`] `closure`.
    ///
    /// # Errors
    ///
    /// Errors if binding the [`EventListener`] fails.
    pub fn new_once<F>(
        target: Rc<T>,
        event_name: impl Into<String>,
        closure: F,
    ) -> Result<Self, Traced<EventListenerBindError>>
    where
        F: FnOnce(A) + 'static,
    {
        let event_name = event_name.into();
        let closure: Closure<dyn FnMut(A)> = Closure::once(closure);

        target
            .as_ref()
            .add_event_listener_with_callback(
                &event_name,
                closure.as_ref().unchecked_ref(),
            )
            .map_err(JsError::from)
            .map_err(EventListenerBindError::from)
            .map_err(tracerr::wrap!())?;

        Ok(Self {
            event_name,
            target,
            closure,
        })
    }
}

impl<T, A> Drop for EventListener<T, A>
where
    T: AsRef<EventTarget>,
{
    /// Drops this [`EventListener`]'s closure and unregisters its event
    /// handler.
    fn drop(&mut self) {
        if let Err(err) = self.target.as_ref().remove_event_listener_with_callback(
            &self.event_name,
            self.closure.as_ref().unchecked_ref(),
        ) {
            log::error!("Failed to remove EventListener: {:?}", err);
        }
    }
}
