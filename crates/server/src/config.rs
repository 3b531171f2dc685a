//! Command line and environment configuration of the `docserve` binary.
//!
//! ```bash
//! docserve --listen 127.0.0.1:8080 --document-root ./public --backend proactor
//! DOCSERVE_LOG=debug DOCSERVE_NO_REPROXY=true docserve
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tracing::Level;

use crate::acceptor::{Backend, DEFAULT_BACKLOG};
use crate::error::ServerBuildError;
use crate::server::{DEFAULT_DOCUMENT_ROOT, Server};

#[derive(Debug, Clone, Parser)]
#[command(name = "docserve", version, about = "Serves static files plus a few built-in test routes")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "DOCSERVE_LISTEN", default_value = "127.0.0.1:7890")]
    pub listen: SocketAddr,

    /// Directory static files are served from
    #[arg(long, env = "DOCSERVE_DOCUMENT_ROOT", default_value = DEFAULT_DOCUMENT_ROOT)]
    pub document_root: String,

    /// How connections are accepted
    #[arg(long, env = "DOCSERVE_BACKEND", value_enum, default_value_t = Backend::Reactor)]
    pub backend: Backend,

    /// Length of the pending connection queue
    #[arg(long, env = "DOCSERVE_BACKLOG", default_value_t = DEFAULT_BACKLOG)]
    pub backlog: u32,

    /// Send `X-Reproxy-URL` responses as they are instead of fetching the url
    #[arg(long, env = "DOCSERVE_NO_REPROXY")]
    pub no_reproxy: bool,

    /// Largest accepted request body in bytes
    #[arg(long, env = "DOCSERVE_MAX_BODY_SIZE", default_value_t = 16 * 1024 * 1024)]
    pub max_body_size: usize,

    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, env = "DOCSERVE_LOG", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Config {
    pub fn into_server(self) -> Result<Server, ServerBuildError> {
        Server::builder()
            .address(self.listen)
            .document_root(self.document_root)
            .backend(self.backend)
            .backlog(self.backlog)
            .reproxy(!self.no_reproxy)
            .max_body_size(self.max_body_size)
            .build()
    }
}
