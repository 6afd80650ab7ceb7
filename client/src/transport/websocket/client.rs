//! Reconnecting wrapper around an [`RpcTransport`].

use std::{cell::RefCell, rc::Rc};

use futures::{
    channel::mpsc,
    future::LocalBoxFuture,
    stream::{LocalBoxStream, StreamExt as _},
};
use layout_reactive::ObservableCell;
use tracerr::Traced;

use crate::{
    config::ReconnectOptions,
    platform,
    transport::{
        websocket::transport::{RpcTransport, TransportError, TransportState},
        ClientDisconnect, ClosedStateReason, RpcClientError,
    },
    utils::{resettable_delay_for, ResettableDelayHandle},
    wire::{ClientMsg, ServerMsg},
};

/// Factory closure producing an [`RpcTransport`].
pub type RpcTransportFactory = Box<
    dyn Fn(
        String,
    ) -> LocalBoxFuture<
        'static,
        Result<Rc<dyn RpcTransport>, Traced<TransportError>>,
    >,
>;

/// State of a [`WebSocketRpcClient`] and its underlying [`RpcTransport`].
#[derive(Clone, Debug, PartialEq)]
pub enum ClientState {
    /// [`WebSocketRpcClient`] is currently establishing (or re-establishing)
    /// a connection to the server.
    Connecting,

    /// Connection to the server is active.
    Open,

    /// Connection to the server is currently closed.
    Closed(ClosedStateReason),
}

/// Inner state of a [`WebSocketRpcClient`].
struct Inner {
    /// Transport connected to the server.
    sock: Option<Rc<dyn RpcTransport>>,

    /// [`ServerMsg`] subscribers.
    subs: Vec<mpsc::UnboundedSender<ServerMsg>>,

    /// Reason this [`WebSocketRpcClient`] is closing, passed down to the
    /// underlying [`RpcTransport`].
    close_reason: ClientDisconnect,

    /// Closure creating new [`RpcTransport`]s for this [`WebSocketRpcClient`]
    /// on each connection/reconnection attempt.
    rpc_transport_factory: RpcTransportFactory,

    /// URL the [`RpcTransport`] connects to.
    ///
    /// [`None`] if this [`WebSocketRpcClient`] has never connected.
    url: Option<String>,

    /// Current [`ClientState`].
    state: ObservableCell<ClientState>,

    /// Reconnect tunables.
    reconnect_options: ReconnectOptions,

    /// Number of reconnect attempts made since the last successful connect.
    retries: u32,

    /// Current reconnect delay, grows by `backoff_rate` on each attempt up
    /// to `max_interval`.
    current_interval: std::time::Duration,

    /// Whether this [`WebSocketRpcClient`] has ever reached
    /// [`ClientState::Open`].
    ever_connected: bool,

    /// Whether this [`WebSocketRpcClient`] was explicitly stopped. Once
    /// `true`, no further (re)connect attempts are made.
    closed: bool,

    /// Handle to a pending, cancellable reconnect timer.
    reconnect_timer: Option<ResettableDelayHandle>,
}

impl Inner {
    /// Instantiates a new [`Inner`] state of a [`WebSocketRpcClient`].
    fn new(
        rpc_transport_factory: RpcTransportFactory,
        reconnect_options: ReconnectOptions,
    ) -> RefCell<Self> {
        RefCell::new(Self {
            sock: None,
            subs: Vec::new(),
            close_reason: ClientDisconnect::RuntimeUnexpectedlyDropped,
            rpc_transport_factory,
            url: None,
            state: ObservableCell::new(ClientState::Closed(
                ClosedStateReason::NeverConnected,
            )),
            current_interval: reconnect_options.initial_interval,
            reconnect_options,
            retries: 0,
            ever_connected: false,
            closed: false,
            reconnect_timer: None,
        })
    }
}

/// Applies uniform jitter of `± factor * interval` to `interval`, matching
/// the standard exponential-backoff randomization formula.
fn add_jitter(interval: std::time::Duration, factor: f64) -> std::time::Duration {
    if factor <= 0.0 {
        return interval;
    }
    let millis = interval.as_millis() as f64;
    let delta = factor * millis;
    let jittered = millis + (js_sys::Math::random() * 2.0 * delta - delta);
    std::time::Duration::from_millis(jittered.max(0.0) as u64)
}

/// Reconnecting WebSocket client talking the layout-update/layout-event
/// protocol with the server.
pub struct WebSocketRpcClient(RefCell<Inner>);

impl WebSocketRpcClient {
    /// Creates a new [`WebSocketRpcClient`] with the provided
    /// [`RpcTransportFactory`] and [`ReconnectOptions`].
    #[inline]
    #[must_use]
    pub fn new(
        rpc_transport_factory: RpcTransportFactory,
        reconnect_options: ReconnectOptions,
    ) -> Self {
        Self(Inner::new(rpc_transport_factory, reconnect_options))
    }

    /// Handles a transport-reported close, deciding whether to reconnect.
    fn handle_transport_closed(self: &Rc<Self>) {
        let ever_connected = self.0.borrow().ever_connected;
        let closed = self.0.borrow().closed;
        self.0.borrow_mut().sock.take();

        if closed {
            return;
        }
        if !ever_connected {
            // Initial-connect failure: not retried.
            return;
        }

        let retries = self.0.borrow().retries;
        let max_retries = self.0.borrow().reconnect_options.max_retries;
        if retries >= max_retries {
            self.0.borrow().state.set(ClientState::Closed(
                ClosedStateReason::RetriesExhausted,
            ));
            return;
        }

        let interval = self.0.borrow().current_interval;
        let jitter = self.0.borrow().reconnect_options.interval_jitter;
        let delay = add_jitter(interval, jitter);

        let (fut, handle) = resettable_delay_for(delay, false);
        self.0.borrow_mut().reconnect_timer = Some(handle);

        let rate = self.0.borrow().reconnect_options.backoff_rate;
        let max_interval = self.0.borrow().reconnect_options.max_interval;
        {
            let mut inner = self.0.borrow_mut();
            inner.current_interval =
                interval.mul_f64(rate).min(max_interval);
            inner.retries += 1;
        }

        let weak_this = Rc::downgrade(self);
        platform::spawn(async move {
            fut.await;
            if let Some(this) = weak_this.upgrade() {
                if this.0.borrow().closed {
                    return;
                }
                if let Some(url) = this.0.borrow().url.clone() {
                    platform::spawn(async move {
                        let _ = Rc::clone(&this).connect_to(url).await;
                    });
                }
            }
        });
    }

    /// Tries to establish a new connection to `url`.
    async fn connect_to(
        self: Rc<Self>,
        url: String,
    ) -> Result<(), Traced<RpcClientError>> {
        self.0.borrow_mut().url = Some(url.clone());
        self.0.borrow().state.set(ClientState::Connecting);

        let create_transport_fut =
            (self.0.borrow().rpc_transport_factory)(url);
        let transport = match create_transport_fut.await {
            Ok(transport) => transport,
            Err(e) => {
                let transport_err = e.into_inner();
                self.0.borrow().state.set(ClientState::Closed(
                    ClosedStateReason::CouldNotEstablish(
                        transport_err.clone(),
                    ),
                ));
                self.handle_transport_closed();
                return Err(tracerr::new!(RpcClientError::ConnectionFailed(
                    ClosedStateReason::CouldNotEstablish(transport_err)
                )));
            }
        };

        transport.set_close_reason(self.0.borrow().close_reason);

        let mut transport_state_changes = transport.on_state_change();
        let weak_this = Rc::downgrade(&self);
        platform::spawn(async move {
            while let Some(state) = transport_state_changes.next().await {
                if let Some(this) = weak_this.upgrade() {
                    if let TransportState::Closed(msg) = state {
                        this.0.borrow().state.set(ClientState::Closed(
                            ClosedStateReason::ConnectionLost(msg),
                        ));
                        this.handle_transport_closed();
                    }
                }
            }
        });

        let weak_this = Rc::downgrade(&self);
        let mut on_socket_message = transport.on_message();
        platform::spawn(async move {
            while let Some(msg) = on_socket_message.next().await {
                if let Some(this) = weak_this.upgrade() {
                    this.0
                        .borrow_mut()
                        .subs
                        .retain(|sub| sub.unbounded_send(msg.clone()).is_ok());
                }
            }
        });

        self.0.borrow_mut().sock.replace(transport);
        {
            let mut inner = self.0.borrow_mut();
            inner.ever_connected = true;
            inner.retries = 0;
            inner.current_interval = inner.reconnect_options.initial_interval;
            inner.reconnect_timer.take();
        }
        self.0.borrow().state.set(ClientState::Open);

        Ok(())
    }

    /// Waits for [`ClientState::Connecting`] to resolve into a terminal
    /// state, returning the corresponding result.
    async fn connecting_result(&self) -> Result<(), Traced<RpcClientError>> {
        let mut state_changes = self.0.borrow().state.subscribe();
        while let Some(state) = state_changes.next().await {
            match state {
                ClientState::Open => return Ok(()),
                ClientState::Closed(reason) => {
                    return Err(tracerr::new!(
                        RpcClientError::ConnectionFailed(reason)
                    ));
                }
                ClientState::Connecting => (),
            }
        }
        Err(tracerr::new!(RpcClientError::RpcClientGone))
    }

    /// Tries to bring this [`WebSocketRpcClient`] to [`ClientState::Open`].
    ///
    /// If already [`ClientState::Open`] for the same `url`, resolves
    /// immediately. If already [`ClientState::Connecting`], waits for that
    /// attempt's result instead of starting a second one.
    ///
    /// # Errors
    ///
    /// Errors if connecting fails.
    pub async fn connect(
        self: Rc<Self>,
        url: String,
    ) -> Result<(), Traced<RpcClientError>> {
        let current_url = self.0.borrow().url.clone();
        if current_url.as_deref() == Some(url.as_str()) {
            let state = self.0.borrow().state.borrow().clone();
            match state {
                ClientState::Open => Ok(()),
                ClientState::Connecting => self.connecting_result().await,
                ClientState::Closed(_) => self.connect_to(url).await,
            }
        } else {
            self.connect_to(url).await
        }
    }

    /// Subscribes to [`ServerMsg`]s received by this [`WebSocketRpcClient`].
    pub fn subscribe(&self) -> LocalBoxStream<'static, ServerMsg> {
        let (tx, rx) = mpsc::unbounded();
        self.0.borrow_mut().subs.push(tx);

        Box::pin(rx)
    }

    /// Sends a [`ClientMsg`] to the server, silently dropping it if the
    /// underlying socket is not open.
    pub fn send(&self, msg: ClientMsg) {
        let socket_borrow = &self.0.borrow().sock;

        if let Some(socket) = socket_borrow.as_ref() {
            if let Err(e) = socket.send(&msg) {
                log::error!("{}", e);
            }
        }
    }

    /// Explicitly stops this [`WebSocketRpcClient`], cancelling any pending
    /// reconnect and preventing future ones.
    pub fn stop(&self) {
        self.0.borrow_mut().closed = true;
        if let Some(timer) = self.0.borrow_mut().reconnect_timer.take() {
            timer.stop();
        }
        self.0.borrow_mut().close_reason = ClientDisconnect::RuntimeStopped;
        if let Some(sock) = self.0.borrow_mut().sock.take() {
            sock.set_close_reason(ClientDisconnect::RuntimeStopped);
        }
    }

    /// Sets the reason passed to the underlying transport when this client
    /// is dropped.
    #[inline]
    pub fn set_close_reason(&self, close_reason: ClientDisconnect) {
        self.0.borrow_mut().close_reason = close_reason;
    }
}

impl Drop for Inner {
    /// Drops the related connection.
    fn drop(&mut self) {
        if let Some(socket) = self.sock.take() {
            socket.set_close_reason(self.close_reason);
        }
    }
}
