//! Implementation of the abstractions around [WebSocket] transport.
//!
//! [WebSocket]: https://developer.mozilla.org/ru/docs/WebSockets

mod client;
pub mod transport;

#[doc(inline)]
pub use self::client::{ClientState, RpcTransportFactory, WebSocketRpcClient};
