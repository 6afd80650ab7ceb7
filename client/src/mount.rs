//! Wires the transport, message router, model store, and reconciler
//! together into a running client runtime (§2's top-level lifecycle).

use std::rc::Rc;

use futures::stream::StreamExt as _;

use crate::{
    config::ClientConfig,
    model::ModelStore,
    platform,
    reconcile::Reconciler,
    router::{Router, Unregister},
    transport::{
        websocket::transport::{RpcTransport, WebSocketRpcTransport},
        WebSocketRpcClient,
    },
    wire::ServerMsg,
};

/// Handle to a mounted client runtime.
///
/// Dropping this without calling [`MountHandle::unmount`] still tears the
/// connection down (the transport stops on [`Drop`]), but leaves whatever
/// was last rendered in the host element untouched.
pub struct MountHandle {
    transport: Rc<WebSocketRpcClient>,
    reconciler: Rc<Reconciler>,
    _layout_update_handler: Unregister,
}

impl MountHandle {
    /// Stops the transport and removes every node this runtime rendered.
    pub fn unmount(self) {
        self.transport.stop();
        self.reconciler.unmount();
    }
}

/// Mounts the client runtime onto `host`: connects to the server described
/// by `config`, applies every pushed layout update to an in-memory model,
/// and reconciles that model into `host`'s DOM subtree on each change.
#[must_use]
pub fn mount(host: web_sys::Element, config: ClientConfig) -> MountHandle {
    let reconnect_options = config.reconnect_options();
    let transport = Rc::new(WebSocketRpcClient::new(
        Box::new(|url: String| {
            Box::pin(async move {
                let transport = WebSocketRpcTransport::new(&url).await?;
                Ok(Rc::new(transport) as Rc<dyn RpcTransport>)
            })
        }),
        reconnect_options,
    ));

    let router = Router::new();
    let store = Rc::new(ModelStore::new());
    let reconciler = Reconciler::new(
        host,
        config.server_location.clone(),
        Rc::clone(&transport),
    );

    let layout_update_handler = {
        let store = Rc::clone(&store);
        let reconciler = Rc::clone(&reconciler);
        router.on_message("layout-update", move |msg| {
            let ServerMsg::LayoutUpdate { path, model } = msg;
            match store.apply(path, model.clone()) {
                Ok(()) => reconciler.render(&store.get()),
                Err(e) => log::error!("Dropping unappliable layout update: {e}"),
            }
        })
    };

    {
        let mut incoming = transport.subscribe();
        let router = router.clone();
        platform::spawn(async move {
            while let Some(msg) = incoming.next().await {
                router.handle_incoming(&msg);
            }
        });
    }

    {
        let transport = Rc::clone(&transport);
        let url = config.server_location.stream_url();
        let router = router.clone();
        platform::spawn(async move {
            router.ready().await;
            if let Err(e) = transport.connect(url).await {
                log::error!("Failed to connect: {e}");
            }
        });
    }

    MountHandle {
        transport,
        reconciler,
        _layout_update_handler: layout_update_handler,
    }
}
