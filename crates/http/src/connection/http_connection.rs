use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{HeaderValue, Response, StatusCode, Version, header};
use http_body::Body;
use http_body_util::{BodyExt, Full};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info, warn};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::connection::reproxy::{self, X_REPROXY_URL};
use crate::handler::Handler;
use crate::protocol::{
    HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError,
};

const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;
const DEFAULT_REPROXY_TIMEOUT: Duration = Duration::from_secs(10);

const CLOSE: HeaderValue = HeaderValue::from_static("close");
const KEEP_ALIVE: HeaderValue = HeaderValue::from_static("keep-alive");

/// Knobs shared by every connection of a server.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Substitute responses carrying `X-Reproxy-URL` with the fetched resource.
    pub reproxy: bool,
    /// Largest request body that is collected before the handler runs.
    pub max_body_size: usize,
    pub reproxy_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self { reproxy: true, max_body_size: DEFAULT_MAX_BODY_SIZE, reproxy_timeout: DEFAULT_REPROXY_TIMEOUT }
    }
}

/// Drives one client connection: decodes requests, hands each one to a
/// [`Handler`] and writes exactly one response back, until the peer goes away
/// or asks to close.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    options: ConnectionOptions,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_options(reader, writer, ConnectionOptions::default())
    }

    pub fn with_options(reader: R, writer: W, options: ConnectionOptions) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            options,
        }
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    let keep_alive = header.is_keep_alive();
                    self.do_process(header, payload_size, keep_alive, &handler).await?;
                    if !keep_alive {
                        debug!("peer did not ask for keep-alive, close connection");
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("receive body item while waiting for a request header");
                    self.send_error(StatusCode::BAD_REQUEST, Some(CLOSE)).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!(cause = %e, "can't receive next request");
                    self.send_error(StatusCode::BAD_REQUEST, Some(CLOSE)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("can't read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(
        &mut self,
        header: RequestHeader,
        payload_size: PayloadSize,
        keep_alive: bool,
        handler: &Arc<H>,
    ) -> Result<(), HttpError>
    where
        H: Handler,
        H::RespBody: Body<Data = Bytes> + Unpin,
        <H::RespBody as Body>::Error: Display,
    {
        let version = header.version();
        let connection = connection_header(version, keep_alive);

        let body = match self.read_body(payload_size).await {
            Ok(body) => body,
            Err(e) => {
                error!(cause = %e, "can't receive request body");
                let status = match e {
                    ParseError::TooLargeBody { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    _ => StatusCode::BAD_REQUEST,
                };
                self.send_error(status, Some(CLOSE)).await?;
                return Err(e.into());
            }
        };

        let response = match handler.call(header.body(body)).await {
            Ok(response) => response,
            Err(e) => {
                let e: Box<dyn Error + Send + Sync> = e.into();
                error!(cause = %e, "handle request error");
                return self.send_error(StatusCode::INTERNAL_SERVER_ERROR, connection).await;
            }
        };

        if self.options.reproxy
            && let Some(url) = response.headers().get(X_REPROXY_URL)
        {
            return self.send_reproxied(url.clone(), connection).await;
        }

        self.send_response(response, version, connection).await
    }

    /// Collects the request body announced by `payload_size`.
    async fn read_body(&mut self, payload_size: PayloadSize) -> Result<Bytes, ParseError> {
        let max_size = self.options.max_body_size;
        if let PayloadSize::Length(length) = payload_size
            && length > max_size as u64
        {
            return Err(ParseError::too_large_body(max_size));
        }

        let mut body = BytesMut::new();
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                    if body.len() + bytes.len() > max_size {
                        return Err(ParseError::too_large_body(max_size));
                    }
                    body.extend_from_slice(&bytes);
                }
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => return Err(ParseError::invalid_body("receive header while reading body")),
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::invalid_body("connection closed before the body end")),
            }
        }
    }

    async fn send_reproxied(&mut self, url: HeaderValue, connection: Option<HeaderValue>) -> Result<(), HttpError> {
        let url = match url.to_str() {
            Ok(url) => url.to_owned(),
            Err(_) => {
                warn!("reproxy url is not visible ascii");
                return self.send_error(StatusCode::BAD_GATEWAY, connection).await;
            }
        };

        match reproxy::fetch(&url, self.options.reproxy_timeout).await {
            Ok(upstream) => {
                debug!(url = %url, status = %upstream.status(), "substitute reproxied response");
                self.do_send_response(upstream, connection).await
            }
            Err(e) => {
                warn!(url = %url, cause = %e, "reproxy failed");
                self.send_error(StatusCode::BAD_GATEWAY, connection).await
            }
        }
    }

    async fn send_response<T>(&mut self, response: Response<T>, version: Version, connection: Option<HeaderValue>) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        // chunked framing is HTTP/1.1 only, buffer unknown-sized bodies for older peers
        if version == Version::HTTP_10 && response.body().size_hint().exact().is_none() {
            let (parts, body) = response.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| SendError::invalid_body(format!("resolve response body error: {e}")))?
                .to_bytes();
            return self.do_send_response(Response::from_parts(parts, Full::new(bytes)), connection).await;
        }

        self.do_send_response(response, connection).await
    }

    async fn send_error(&mut self, status: StatusCode, connection: Option<HeaderValue>) -> Result<(), HttpError> {
        self.do_send_response(build_error_response(status), connection).await
    }

    /// Sends `response`, with `connection` as its `Connection` header when set.
    async fn do_send_response<T>(&mut self, response: Response<T>, connection: Option<HeaderValue>) -> Result<(), HttpError>
    where
        T: Body<Data = Bytes> + Unpin,
        T::Error: Display,
    {
        let (mut parts, mut body) = response.into_parts();
        if let Some(value) = connection {
            parts.headers.insert(header::CONNECTION, value);
        }

        let payload_size = match body.size_hint().exact() {
            Some(length) => PayloadSize::new_length(length),
            None => PayloadSize::new_chunked(),
        };

        let head = Message::<_, Bytes>::Header((ResponseHead::from_parts(parts, ()), payload_size));
        self.framed_write.feed(head).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => {
                    // trailers are not forwarded
                    let Ok(data) = frame.into_data() else { continue };
                    self.framed_write.send(Message::Payload(PayloadItem::Chunk(data))).await?;
                }
                Some(Err(e)) => return Err(SendError::invalid_body(format!("resolve response body error: {e}")).into()),
                None => {
                    self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
                    return Ok(());
                }
            }
        }
    }
}

/// The `Connection` header telling the peer what happens after this exchange.
/// HTTP/1.1 persistence is the default and goes unannounced.
fn connection_header(version: Version, keep_alive: bool) -> Option<HeaderValue> {
    match (keep_alive, version) {
        (false, _) => Some(CLOSE),
        (true, Version::HTTP_10) => Some(KEEP_ALIVE),
        (true, _) => None,
    }
}

fn build_error_response(status: StatusCode) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = status;
    response
}
