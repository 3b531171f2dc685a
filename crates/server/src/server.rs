use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use docserve_http::connection::ConnectionOptions;
use mime::Mime;
use tracing::info;

use crate::acceptor::{Acceptor, Backend, DEFAULT_BACKLOG};
use crate::context::ServerContext;
use crate::dispatcher::Dispatcher;
use crate::error::{ServerBuildError, ServerError};
use crate::mime::MimeMap;

pub const DEFAULT_DOCUMENT_ROOT: &str = "htdocs";

pub struct ServerBuilder {
    address: Option<SocketAddr>,
    document_root: String,
    backend: Backend,
    backlog: u32,
    options: ConnectionOptions,
    mimes: MimeMap,
}

impl ServerBuilder {
    fn new() -> Self {
        Self {
            address: None,
            document_root: DEFAULT_DOCUMENT_ROOT.to_owned(),
            backend: Backend::default(),
            backlog: DEFAULT_BACKLOG,
            options: ConnectionOptions::default(),
            mimes: MimeMap::default(),
        }
    }

    pub fn address(mut self, address: impl Into<SocketAddr>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn document_root(mut self, document_root: impl Into<String>) -> Self {
        self.document_root = document_root.into();
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    /// Whether `X-Reproxy-URL` responses are replaced by the fetched resource.
    pub fn reproxy(mut self, enabled: bool) -> Self {
        self.options.reproxy = enabled;
        self
    }

    pub fn reproxy_timeout(mut self, timeout: Duration) -> Self {
        self.options.reproxy_timeout = timeout;
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.options.max_body_size = max_body_size;
        self
    }

    /// Registers an extra extension on top of the default table.
    pub fn mime_type(mut self, ext: &str, mime: Mime) -> Self {
        self.mimes.define(ext, mime);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let address = self.address.ok_or(ServerBuildError::MissingAddress)?;
        if self.document_root.is_empty() {
            return Err(ServerBuildError::InvalidDocumentRoot);
        }

        let dispatcher = Dispatcher::new(self.document_root, self.mimes);
        Ok(Server {
            address,
            backend: self.backend,
            backlog: self.backlog,
            context: ServerContext::new(dispatcher, self.options),
        })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("address", &self.address)
            .field("document_root", &self.document_root)
            .field("backend", &self.backend)
            .field("backlog", &self.backlog)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct Server {
    address: SocketAddr,
    backend: Backend,
    backlog: u32,
    context: ServerContext,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Binds the listener. Must be called from within a tokio runtime.
    pub fn bind(self) -> Result<BoundServer, ServerError> {
        let acceptor = Acceptor::bind(self.address, self.backend, self.backlog)
            .map_err(|source| ServerError::Bind { addr: self.address, source })?;

        info!(
            address = %acceptor.local_addr(),
            backend = %self.backend,
            document_root = self.context.dispatcher().document_root(),
            "start listening"
        );
        Ok(BoundServer { acceptor, context: Arc::new(self.context) })
    }

    /// Runs the server on a fresh current-thread runtime until ctrl-c.
    pub fn run_blocking(self) -> Result<(), ServerError> {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(ServerError::Runtime)?;

        runtime.block_on(async move {
            let shutdown = async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("receive ctrl-c, shutting down");
                } else {
                    std::future::pending::<()>().await;
                }
            };
            self.bind()?.run_until(shutdown).await
        })
    }
}

/// A server whose listener is bound but not yet accepting.
#[derive(Debug)]
pub struct BoundServer {
    acceptor: Acceptor,
    context: Arc<ServerContext>,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.acceptor.local_addr()
    }

    pub async fn run(self) -> Result<(), ServerError> {
        self.acceptor.run(self.context).await.map_err(ServerError::Accept)
    }

    /// Like [`BoundServer::run`] but returns `Ok` once `shutdown` completes.
    /// Connections already accepted keep running on the runtime.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            result = self.run() => result,
            () = shutdown => Ok(()),
        }
    }
}
