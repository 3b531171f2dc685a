use std::io;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tracing::{trace, warn};

use crate::context::ServerContext;

/// Completion-driven accept loop: the runtime finishes each accept and
/// [`on_accept`] receives the outcome.
#[derive(Debug)]
pub(super) struct ProactorListener {
    listener: TcpListener,
}

impl ProactorListener {
    pub(super) fn new(listener: TcpListener) -> Self {
        Self { listener }
    }

    pub(super) async fn run(self, context: &ServerContext) -> io::Result<()> {
        loop {
            let result = self.listener.accept().await;
            on_accept(context, result);
        }
    }
}

fn on_accept(context: &ServerContext, result: io::Result<(TcpStream, SocketAddr)>) {
    match result {
        Ok((stream, peer)) => {
            trace!(%peer, "accepted connection");
            context.accept(stream);
        }
        Err(e) => warn!(cause = %e, "failed to accept, drop it"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acceptor::tests::{chunked_test, context};

    #[tokio::test]
    async fn failed_accept_keeps_listener_running() {
        let context = context();
        let listener = ProactorListener::new(TcpListener::bind("127.0.0.1:0").await.unwrap());
        let addr = listener.listener.local_addr().unwrap();

        on_accept(&context, Err(io::Error::other("boom")));

        tokio::spawn(async move { listener.run(&context).await });
        let response = chunked_test(addr).await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("hello world\n"));
    }
}
