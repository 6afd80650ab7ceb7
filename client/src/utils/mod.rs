//! Miscellaneous utility structs and functions.

mod errors;
mod event_listener;
mod resettable_delay;

#[doc(inline)]
pub use self::{
    errors::{HandlerDetachedError, JsCaused, JsError, JsonParseError, RuntimeError},
    event_listener::{EventListener, EventListenerBindError},
    resettable_delay::{resettable_delay_for, ResettableDelayHandle},
};
