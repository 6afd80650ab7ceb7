//! Platform-specific functionality.
//!
//! Only a `wasm32`/browser target is supported, but the module is split out
//! on its own so a native or `dart-ffi` backend could be slotted in later
//! without touching call sites.

mod wasm;

pub use self::wasm::{
    delay_for, dynamic_import, get_property_by_name, init_logger, set_panic_hook,
    spawn, Error,
};
