//! Abstraction over the concrete reconnecting-WebSocket transport.

pub mod websocket;

use derive_more::Display;
use serde::Serialize;

use crate::{platform, utils::JsCaused};

#[doc(inline)]
pub use self::websocket::{
    transport::{RpcTransport, TransportError},
    ClientState, RpcTransportFactory, WebSocketRpcClient,
};

/// Reason the client side closed (or will close) the underlying transport.
///
/// Serialized into the [WebSocket close frame][1] reason so the server can
/// tell a deliberate disconnect from a dropped connection.
///
/// [1]: https://tools.ietf.org/html/rfc6455#section-5.5.1
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum ClientDisconnect {
    /// [`WebSocketRpcClient`] was stopped explicitly by the embedding page.
    RuntimeStopped,

    /// [`WebSocketRpcClient`] was dropped without an explicit stop.
    RuntimeUnexpectedlyDropped,

    /// The underlying [`RpcTransport`] was dropped without going through
    /// [`WebSocketRpcClient`].
    TransportUnexpectedlyDropped,
}

impl ClientDisconnect {
    /// Indicates whether this [`ClientDisconnect`] is considered an error.
    #[inline]
    #[must_use]
    pub fn is_err(self) -> bool {
        !matches!(self, Self::RuntimeStopped)
    }
}

/// Reason a [WebSocket] connection closed, decoded from its [`CloseEvent`].
///
/// [WebSocket]: https://developer.mozilla.org/docs/Web/API/WebSocket
/// [`CloseEvent`]: web_sys::CloseEvent
#[derive(Clone, Debug, Display, PartialEq)]
pub enum CloseMsg {
    /// Socket closed with the normal closure code (`1000`).
    #[display(fmt = "Normal({}): {}", _0, _1)]
    Normal(u16, String),

    /// Socket closed with any other code, including no close frame at all
    /// (a dropped connection).
    #[display(fmt = "Abnormal({})", _0)]
    Abnormal(u16),
}

impl From<&web_sys::CloseEvent> for CloseMsg {
    fn from(event: &web_sys::CloseEvent) -> Self {
        let code = event.code();
        if code == 1000 {
            Self::Normal(code, event.reason())
        } else {
            Self::Abnormal(code)
        }
    }
}

/// Reason the [`WebSocketRpcClient`] ended up in [`ClientState::Closed`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClosedStateReason {
    /// Client has never been connected.
    NeverConnected,

    /// Initial connection attempt failed; this is not retried.
    CouldNotEstablish(TransportError),

    /// A previously open connection was lost.
    ConnectionLost(CloseMsg),

    /// Reconnect attempts were exhausted without re-establishing a
    /// connection.
    RetriesExhausted,
}

/// Errors occurring in [`WebSocketRpcClient`] that are not transport errors.
#[derive(Clone, Debug, Display, layout_macro::JsCaused, PartialEq)]
#[js(error = "platform::Error")]
pub enum RpcClientError {
    /// Connecting (or reconnecting) failed.
    #[display(fmt = "Connection failed: {:?}", _0)]
    ConnectionFailed(ClosedStateReason),

    /// [`WebSocketRpcClient`] was dropped while awaiting a connection
    /// result.
    #[display(fmt = "WebSocketRpcClient is gone")]
    RpcClientGone,
}
