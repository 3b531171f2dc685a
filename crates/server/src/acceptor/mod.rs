//! The listening socket and its accept loop.
//!
//! Two backends are compiled in and picked at configuration time:
//!
//! - [`Backend::Reactor`] waits for the listener to become readable and then
//!   performs the `accept` itself (readiness model, Unix only).
//! - [`Backend::Proactor`] lets the runtime complete the whole accept
//!   operation and is handed the outcome (completion model).
//!
//! Either way every accepted stream goes to [`ServerContext::accept`].

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::ValueEnum;
use tokio::net::{TcpListener, TcpSocket};

use crate::context::ServerContext;

mod proactor;
#[cfg(unix)]
mod reactor;

use proactor::ProactorListener;
#[cfg(unix)]
use reactor::ReactorListener;

/// Default length of the pending connection queue.
pub const DEFAULT_BACKLOG: u32 = 128;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    #[default]
    Reactor,
    Proactor,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Reactor => f.write_str("reactor"),
            Backend::Proactor => f.write_str("proactor"),
        }
    }
}

/// A bound, listening socket.
#[derive(Debug)]
pub struct Acceptor {
    local_addr: SocketAddr,
    listener: Listener,
}

#[derive(Debug)]
enum Listener {
    #[cfg(unix)]
    Reactor(ReactorListener),
    Proactor(ProactorListener),
}

impl Acceptor {
    /// Binds and listens on `addr` with `SO_REUSEADDR` set.
    ///
    /// Must be called from within a tokio runtime.
    pub fn bind(addr: SocketAddr, backend: Backend, backlog: u32) -> io::Result<Self> {
        let tcp_listener = listen(addr, backlog)?;
        let local_addr = tcp_listener.local_addr()?;

        let listener = match backend {
            #[cfg(unix)]
            Backend::Reactor => Listener::Reactor(ReactorListener::new(tcp_listener)?),
            #[cfg(not(unix))]
            Backend::Reactor => {
                return Err(io::Error::new(io::ErrorKind::Unsupported, "the reactor backend needs a unix platform"));
            }
            Backend::Proactor => Listener::Proactor(ProactorListener::new(tcp_listener)),
        };

        Ok(Self { local_addr, listener })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn backend(&self) -> Backend {
        match self.listener {
            #[cfg(unix)]
            Listener::Reactor(_) => Backend::Reactor,
            Listener::Proactor(_) => Backend::Proactor,
        }
    }

    /// Accepts connections until the listener itself fails.
    ///
    /// Errors of a single accept are logged and dropped; only an error that
    /// leaves the listener unusable is returned.
    pub async fn run(self, context: Arc<ServerContext>) -> io::Result<()> {
        match self.listener {
            #[cfg(unix)]
            Listener::Reactor(listener) => listener.run(&context).await,
            Listener::Proactor(listener) => listener.run(&context).await,
        }
    }
}

fn listen(addr: SocketAddr, backlog: u32) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() { TcpSocket::new_v4()? } else { TcpSocket::new_v6()? };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    socket.listen(backlog)
}
