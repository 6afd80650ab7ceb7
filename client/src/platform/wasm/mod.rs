//! `wasm32`-platform-specific functionality.

use std::{convert::TryInto as _, time::Duration};

pub mod error;

use js_sys::{Promise, Reflect};
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::Window;

pub use self::error::Error;

// When the `wee_alloc` feature is enabled, use `wee_alloc` as the global
// allocator.
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

// When the `console_error_panic_hook` feature is enabled, calling
// `set_panic_hook` once during initialization gives us readable error
// messages if the code ever panics.
//
// https://github.com/rustwasm/console_error_panic_hook#readme
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

/// Initializes [`wasm_logger`] as the default application logger.
///
/// [`wasm_logger`]: https://docs.rs/wasm-logger
pub fn init_logger() {
    wasm_logger::init(wasm_logger::Config::default());
}

/// Runs a Rust [`Future`] on the current thread.
///
/// [`Future`]: std::future::Future
#[inline]
pub fn spawn<F>(task: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task);
}

/// [`Future`] which resolves after the provided [`Duration`].
///
/// # Panics
///
/// If interacting with the JS side fails.
///
/// [`Future`]: std::future::Future
pub async fn delay_for(delay: Duration) {
    let delay_ms = delay.as_millis().try_into().unwrap_or(i32::max_value());
    JsFuture::from(Promise::new(&mut |yes, _| {
        window()
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                &yes, delay_ms,
            )
            .unwrap();
    }))
    .await
    .unwrap();
}

/// Dynamically imports the ES module at the given `specifier`, returning
/// its namespace object once loaded.
///
/// `wasm_bindgen`'s static `#[wasm_bindgen(module = ...)]` attribute cannot
/// express a dynamic `import()` of a runtime-computed specifier, so this
/// goes through a small inline-JS shim.
///
/// # Errors
///
/// Errors if the underlying `import()` promise rejects (e.g. network
/// failure, 404, or a syntax error in the imported module).
pub async fn dynamic_import(specifier: &str) -> Result<JsValue, JsValue> {
    JsFuture::from(js_import(specifier))
        .await
        .map(Into::into)
}

#[wasm_bindgen::prelude::wasm_bindgen(inline_js = "\
export function js_import(specifier) { return import(/* webpackIgnore: true */ specifier); }\
")]
extern "C" {
    #[wasm_bindgen(catch)]
    fn js_import(specifier: &str) -> Promise;
}

/// Returns a property of a JS object by name, if it is defined, converting
/// it with the given predicate.
pub fn get_property_by_name<T, F, U>(value: &T, name: &str, into: F) -> Option<U>
where
    T: AsRef<wasm_bindgen::JsValue>,
    F: Fn(wasm_bindgen::JsValue) -> Option<U>,
{
    Reflect::get(value.as_ref(), &JsValue::from_str(name))
        .ok()
        .map_or_else(|| None, into)
}

/// Returns the global [`Window`] object.
///
/// # Panics
///
/// When the global [`Window`] object is inaccessible.
#[must_use]
fn window() -> Window {
    web_sys::window().expect("no global `window` exists")
}
