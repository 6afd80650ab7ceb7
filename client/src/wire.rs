//! Wire protocol exchanged with the server over the WebSocket transport.
//!
//! Both message kinds are serialized as a JSON object tagged by a `type`
//! field, matching the shape the server-side layout renderer emits and
//! expects.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Message received from the server.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMsg {
    /// Patches the model at `path` (a JSON Pointer, `""` addressing the
    /// document root) with `model`.
    LayoutUpdate {
        /// JSON Pointer (RFC 6901) into the current document.
        path: String,
        /// Replacement value for the pointed-at location.
        model: Json,
    },
}

/// Message sent to the server.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMsg {
    /// Reports that the event handler bound to `target` fired with the
    /// given serialized arguments.
    LayoutEvent {
        /// Opaque event-target identifier assigned by the server.
        target: String,
        /// Serialized event handler arguments.
        data: Vec<Json>,
    },
}
