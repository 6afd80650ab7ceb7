//! Helpers for application errors.

use std::{
    fmt::{Debug, Display},
    rc::Rc,
};

use derive_more::{Display, From};
use tracerr::{Trace, Traced};

use crate::platform;

pub use layout_macro::JsCaused;

/// Convenient alias for the platform-level JS error wrapper, used throughout
/// this crate's `JsCaused` error variants.
pub type JsError = platform::Error;

/// Representation of an error that may be caused by an error returned from
/// the JS side.
pub trait JsCaused {
    /// Type of the wrapper for the JS error.
    type Error;

    /// Returns the name of this error.
    fn name(&self) -> &'static str;

    /// Returns the JS error if it is the cause.
    fn js_cause(self) -> Option<Self::Error>;
}

/// Top-level runtime error reported to `console.error` or handed back across
/// the `wasm_bindgen` boundary.
#[derive(Clone, Debug, Display)]
#[display(fmt = "{}: {}\n{}", name, message, trace)]
pub struct RuntimeError {
    name: &'static str,
    message: String,
    trace: Trace,
    source: Option<platform::Error>,
}

impl RuntimeError {
    /// Returns the name of this error.
    pub fn name(&self) -> String {
        String::from(self.name)
    }

    /// Returns the message of this error.
    pub fn message(&self) -> String {
        self.message.clone()
    }

    /// Returns the trace information of this error.
    pub fn trace(&self) -> String {
        self.trace.to_string()
    }

    /// Returns the JS side error if it is the cause.
    pub fn source(&self) -> Option<platform::Error> {
        Clone::clone(&self.source)
    }

    /// Prints this error to the default logger with `ERROR` level.
    pub fn print(&self) {
        log::error!("{}", self);
    }
}

impl<E: JsCaused + Display> From<(E, Trace)> for RuntimeError
where
    E::Error: Into<platform::Error>,
{
    fn from((err, trace): (E, Trace)) -> Self {
        Self {
            name: err.name(),
            message: err.to_string(),
            trace,
            source: err.js_cause().map(Into::into),
        }
    }
}

impl<E: JsCaused + Display> From<Traced<E>> for RuntimeError
where
    E::Error: Into<platform::Error>,
{
    fn from(traced: Traced<E>) -> Self {
        Self::from(traced.into_parts())
    }
}

/// Occurs when a referenced handler/binding was already dropped.
#[derive(Debug, Display, JsCaused)]
#[js(error = "platform::Error")]
#[display(fmt = "Handler is in detached state.")]
pub struct HandlerDetachedError;

/// Wrapper for [`serde_json::error::Error`] that provides [`Clone`],
/// [`Debug`], [`Display`] implementations.
#[derive(Clone, Debug, Display, From)]
#[from(forward)]
pub struct JsonParseError(Rc<serde_json::error::Error>);

impl PartialEq for JsonParseError {
    fn eq(&self, other: &Self) -> bool {
        self.0.line() == other.0.line()
            && self.0.column() == other.0.column()
            && self.0.classify() == other.0.classify()
    }
}
