//! Macros for the layout client runtime.
//!
//! This crate is intended for inner use only.

#![deny(rustdoc::broken_intra_doc_links, rustdoc::private_intra_doc_links)]
#![forbid(non_ascii_idents, unsafe_code)]

mod caused;

use synstructure::decl_derive;

decl_derive!([JsCaused, attributes(js)] =>
/// Generates an implementation of the `JsCaused` trait for errors
/// represented as an enum.
///
/// # How to use
///
/// The `js_cause()` method returns the nested error if its type is declared
/// as the argument of a `#[js(error = "path::to::Error")]` attribute on
/// the enum, or the enum variant holds a field of that type directly.
///
/// ```
/// use layout_macro::JsCaused;
///
/// trait JsCaused {
///     type Error;
///     fn name(&self) -> &'static str;
///     fn js_cause(self) -> Option<Self::Error>;
/// }
///
/// struct JsError;
///
/// #[derive(JsCaused)]
/// #[js(error = "JsError")]
/// enum FooError {
///     Internal,
///     Js(JsError),
/// }
/// ```
///
/// If an enum variant is annotated with `#[js]` it delegates to the
/// nested error's own `js_cause()` instead of returning itself.
caused::derive);
