//! Fetches the resource named by an `X-Reproxy-URL` response header.
//!
//! Only plain `http://` upstreams are supported. The upstream is asked to close
//! the connection, so the response is simply read until EOF and then parsed
//! with `httparse`; a chunked body is de-chunked with the engine's own decoder.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::uri::PathAndQuery;
use http::{Response, StatusCode, Uri};
use http_body_util::Full;
use httparse::Status;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::ChunkedDecoder;
use crate::ensure;
use crate::protocol::{PayloadItem, ReproxyError};

pub const X_REPROXY_URL: HeaderName = HeaderName::from_static("x-reproxy-url");

const MAX_HEADER_NUM: usize = 64;
const MAX_UPSTREAM_RESPONSE: usize = 64 * 1024 * 1024;
const READ_BUFFER_SIZE: usize = 8 * 1024;

pub async fn fetch(url: &str, timeout: Duration) -> Result<Response<Full<Bytes>>, ReproxyError> {
    let uri: Uri = url.parse().map_err(|_e| ReproxyError::invalid_url(url))?;
    match uri.scheme_str() {
        Some("http") => {}
        Some(scheme) => return Err(ReproxyError::UnsupportedScheme { scheme: scheme.to_owned() }),
        None => return Err(ReproxyError::invalid_url(url)),
    }

    let authority = uri.authority().ok_or_else(|| ReproxyError::invalid_url(url))?;
    let address = format!("{}:{}", authority.host(), authority.port_u16().unwrap_or(80));
    let path = uri.path_and_query().map_or("/", PathAndQuery::as_str);

    let raw = tokio::time::timeout(timeout, exchange(&address, authority.as_str(), path))
        .await
        .map_err(|_e| ReproxyError::Timeout(timeout))??;

    trace!(url, size = raw.len(), "received upstream response");
    parse_response(raw)
}

async fn exchange(address: &str, host: &str, path: &str) -> Result<BytesMut, ReproxyError> {
    let mut stream = TcpStream::connect(address)
        .await
        .map_err(|source| ReproxyError::Connect { authority: address.to_owned(), source })?;

    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut buf = BytesMut::with_capacity(READ_BUFFER_SIZE);
    loop {
        ensure!(buf.len() <= MAX_UPSTREAM_RESPONSE, ReproxyError::invalid_response("upstream response too large"));
        buf.reserve(READ_BUFFER_SIZE);
        if stream.read_buf(&mut buf).await? == 0 {
            return Ok(buf);
        }
    }
}

fn parse_response(mut buf: BytesMut) -> Result<Response<Full<Bytes>>, ReproxyError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
    let mut parsed = httparse::Response::new(&mut headers);

    let body_offset = match parsed.parse(&buf).map_err(ReproxyError::invalid_response)? {
        Status::Complete(offset) => offset,
        Status::Partial => return Err(ReproxyError::invalid_response("truncated response header")),
    };

    let code = parsed.code.ok_or_else(|| ReproxyError::invalid_response("missing status code"))?;
    let status = StatusCode::from_u16(code).map_err(ReproxyError::invalid_response)?;

    let mut header_map = HeaderMap::with_capacity(parsed.headers.len());
    let mut chunked = false;
    let mut content_length = None;
    for h in parsed.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes()).map_err(ReproxyError::invalid_response)?;
        let value = HeaderValue::from_bytes(h.value).map_err(ReproxyError::invalid_response)?;

        if name == header::TRANSFER_ENCODING {
            chunked = value.as_bytes().eq_ignore_ascii_case(b"chunked");
        } else if name == header::CONTENT_LENGTH {
            let length = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| ReproxyError::invalid_response("invalid content-length"))?;
            content_length = Some(length);
        } else if !is_hop_by_hop(&name) {
            header_map.append(name, value);
        }
    }

    let mut body = buf.split_off(body_offset);
    let body = if chunked {
        dechunk(&mut body)?
    } else if let Some(length) = content_length {
        ensure!(body.len() >= length, ReproxyError::invalid_response("upstream body shorter than its content-length"));
        body.truncate(length);
        body.freeze()
    } else {
        body.freeze()
    };

    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    *response.headers_mut() = header_map;
    Ok(response)
}

fn dechunk(src: &mut BytesMut) -> Result<Bytes, ReproxyError> {
    let mut decoder = ChunkedDecoder::new();
    let mut body = BytesMut::with_capacity(src.len());
    loop {
        match decoder.decode(src).map_err(ReproxyError::invalid_response)? {
            Some(PayloadItem::Chunk(bytes)) => body.extend_from_slice(&bytes),
            Some(PayloadItem::Eof) => return Ok(body.freeze()),
            None => return Err(ReproxyError::invalid_response("truncated chunked body")),
        }
    }
}

/// Connection-level headers that describe the upstream hop, not the resource.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    [
        header::CONNECTION,
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::UPGRADE,
    ]
    .contains(name)
        || name.as_str() == "keep-alive"
}
