use std::io;
use std::net::TcpListener as StdTcpListener;

use tokio::io::unix::AsyncFd;
use tokio::net::{TcpListener, TcpStream};
use tracing::{trace, warn};

use crate::context::ServerContext;

/// Readiness-driven accept loop over a non-blocking listener.
#[derive(Debug)]
pub(super) struct ReactorListener {
    fd: AsyncFd<StdTcpListener>,
}

impl ReactorListener {
    pub(super) fn new(listener: TcpListener) -> io::Result<Self> {
        let listener = listener.into_std()?;
        listener.set_nonblocking(true)?;
        Ok(Self { fd: AsyncFd::new(listener)? })
    }

    pub(super) async fn run(self, context: &ServerContext) -> io::Result<()> {
        loop {
            let mut guard = self.fd.readable().await?;

            let stream = match guard.try_io(|fd| fd.get_ref().accept()) {
                Ok(Ok((stream, peer))) => {
                    trace!(%peer, "accepted connection");
                    stream
                }
                Ok(Err(e)) => {
                    warn!(cause = %e, "failed to accept, drop it");
                    continue;
                }
                // spurious readiness, the guard has cleared it
                Err(_would_block) => continue,
            };

            match stream.set_nonblocking(true).and_then(|()| TcpStream::from_std(stream)) {
                Ok(stream) => context.accept(stream),
                Err(e) => warn!(cause = %e, "can't register accepted connection, drop it"),
            }
        }
    }
}
