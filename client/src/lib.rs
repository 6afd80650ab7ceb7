//! Browser-resident client runtime for the layout wire protocol: connects to
//! a server over WebSocket, maintains an in-memory model of the pushed
//! layout tree, and reconciles it into a host DOM element.

#![allow(clippy::module_name_repetitions)]
#![deny(broken_intra_doc_links)]
#![cfg_attr(not(feature = "mockable"), warn(missing_docs))]
#![cfg_attr(feature = "mockable", allow(missing_docs))]

#[macro_use]
pub mod utils;

pub mod config;
pub mod event;
pub mod model;
mod mount;
pub mod platform;
mod reconcile;
pub mod router;
pub mod transport;
mod wire;

#[doc(inline)]
pub use self::{
    config::{ClientConfig, ReconnectOptions, ServerLocation},
    mount::{mount, MountHandle},
};

// When the `console_error_panic_hook` feature is enabled, we can call the
// `set_panic_hook` function at least once during initialization, and then
// we will get better error messages if our code ever panics.
//
// For more details see:
// https://github.com/rustwasm/console_error_panic_hook#readme
#[cfg(feature = "console_error_panic_hook")]
pub use self::platform::set_panic_hook;
