use std::sync::Arc;

use docserve_http::connection::{ConnectionOptions, HttpConnection};
use tokio::net::TcpStream;
use tracing::{debug, error};

use crate::dispatcher::Dispatcher;

/// Everything an accepted connection needs, built once at startup and handed
/// to the acceptor explicitly.
#[derive(Debug)]
pub struct ServerContext {
    dispatcher: Arc<Dispatcher>,
    options: ConnectionOptions,
}

impl ServerContext {
    pub fn new(dispatcher: Dispatcher, options: ConnectionOptions) -> Self {
        Self { dispatcher: Arc::new(dispatcher), options }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Starts serving `stream` on its own task.
    pub fn accept(&self, stream: TcpStream) {
        let peer = stream.peer_addr().ok();
        if let Err(e) = stream.set_nodelay(true) {
            debug!(?peer, cause = %e, "can't set TCP_NODELAY");
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let options = self.options.clone();
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            let connection = HttpConnection::with_options(reader, writer, options);
            match connection.process(dispatcher).await {
                Ok(()) => debug!(?peer, "finished process, connection shutdown"),
                Err(e) => error!(?peer, cause = %e, "service has error, connection shutdown"),
            }
        });
    }
}
