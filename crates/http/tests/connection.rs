use std::convert::Infallible;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use docserve_http::connection::{ConnectionOptions, HttpConnection, X_REPROXY_URL};
use docserve_http::handler::{Handler, make_handler};
use docserve_http::protocol::{HttpError, ReasonPhrase};
use futures::stream;
use http::{Request, Response, StatusCode};
use http_body::{Body, Frame};
use http_body_util::{Full, StreamBody};
use indoc::indoc;
use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
use tokio::net::TcpListener;

type ChunkStream = StreamBody<stream::Iter<std::vec::IntoIter<Result<Frame<Bytes>, Infallible>>>>;

async fn exchange<H>(handler: H, options: ConnectionOptions, request: &[u8]) -> (Result<(), HttpError>, String)
where
    H: Handler,
    H::RespBody: Body<Data = Bytes> + Unpin,
    <H::RespBody as Body>::Error: std::fmt::Display,
{
    let (mut client, server) = duplex(64 * 1024);
    let (reader, writer) = tokio::io::split(server);
    let connection = HttpConnection::with_options(reader, writer, options);

    let client_side = async move {
        client.write_all(request).await.unwrap();
        let mut out = Vec::new();
        client.read_to_end(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    };

    tokio::join!(connection.process(Arc::new(handler)), client_side)
}

async fn echo(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(Response::new(Full::new(request.into_body())))
}

async fn chunks(_request: Request<Bytes>) -> Result<Response<ChunkStream>, Infallible> {
    let frames = vec![Ok(Frame::data(Bytes::from_static(b"hello "))), Ok(Frame::data(Bytes::from_static(b"world\n")))];
    Ok(Response::new(StreamBody::new(stream::iter(frames))))
}

#[tokio::test]
async fn echo_with_content_length() {
    let request = b"POST /post-test HTTP/1.1\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello";
    let (result, response) = exchange(make_handler(echo), ConnectionOptions::default(), request).await;

    assert!(result.is_ok());
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-length: 5\r\n"));
    assert!(response.ends_with("\r\n\r\nhello"));
}

#[tokio::test]
async fn chunked_request_body_is_collected() {
    let request = indoc! {r"
        POST /post-test HTTP/1.1
        Transfer-Encoding: chunked
        Connection: close

    "}
    .to_owned()
        + "3\r\nabc\r\n2\r\nde\r\n0\r\n\r\n";
    let (result, response) = exchange(make_handler(echo), ConnectionOptions::default(), request.as_bytes()).await;

    assert!(result.is_ok());
    assert!(response.ends_with("content-length: 5\r\n\r\nabcde"));
}

#[tokio::test]
async fn unknown_size_body_is_chunked() {
    let request = b"GET /chunked-test HTTP/1.1\r\nConnection: close\r\n\r\n";
    let (_, response) = exchange(make_handler(chunks), ConnectionOptions::default(), request).await;

    assert!(response.contains("transfer-encoding: chunked\r\n"));
    assert!(response.ends_with("\r\n\r\n6\r\nhello \r\n6\r\nworld\n\r\n0\r\n\r\n"));
}

#[tokio::test]
async fn http10_peer_never_sees_chunked_framing() {
    let request = b"GET /chunked-test HTTP/1.0\r\n\r\n";
    let (result, response) = exchange(make_handler(chunks), ConnectionOptions::default(), request).await;

    assert!(result.is_ok());
    assert!(!response.contains("transfer-encoding"));
    assert!(response.contains("content-length: 12\r\n"));
    assert!(response.ends_with("hello world\n"));
}

#[tokio::test]
async fn keep_alive_serves_pipelined_requests() {
    let request = b"POST / HTTP/1.1\r\nContent-Length: 1\r\n\r\naPOST / HTTP/1.1\r\nContent-Length: 1\r\nConnection: close\r\n\r\nb";
    let (result, response) = exchange(make_handler(echo), ConnectionOptions::default(), request).await;

    assert!(result.is_ok());
    assert_eq!(response.matches("HTTP/1.1 200 OK").count(), 2);
    assert!(response.ends_with('b'));
}

#[tokio::test]
async fn http10_keep_alive_is_announced() {
    let request = b"GET / HTTP/1.0\r\nConnection: keep-alive\r\n\r\nGET / HTTP/1.0\r\n\r\n";
    let (result, response) = exchange(make_handler(chunks), ConnectionOptions::default(), request).await;

    assert!(result.is_ok());
    let responses: Vec<&str> = response.split("HTTP/1.1 200 OK\r\n").skip(1).collect();
    assert_eq!(responses.len(), 2);
    assert!(responses[0].contains("connection: keep-alive\r\n"));
    assert!(responses[1].contains("connection: close\r\n"));
}

#[tokio::test]
async fn connection_header_follows_persistence() {
    let request = b"POST / HTTP/1.1\r\nContent-Length: 1\r\n\r\naPOST / HTTP/1.1\r\nContent-Length: 1\r\nConnection: close\r\n\r\nb";
    let (_, response) = exchange(make_handler(echo), ConnectionOptions::default(), request).await;

    let responses: Vec<&str> = response.split("HTTP/1.1 200 OK\r\n").skip(1).collect();
    assert_eq!(responses.len(), 2);
    assert!(!responses[0].contains("connection:"));
    assert!(responses[1].contains("connection: close\r\n"));

    let options = ConnectionOptions { max_body_size: 4, ..ConnectionOptions::default() };
    let (_, response) = exchange(make_handler(echo), options, b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").await;
    assert!(response.contains("connection: close\r\n"));
}

#[tokio::test]
async fn custom_reason_phrase_reaches_the_status_line() {
    let handler = make_handler(|_req: Request<Bytes>| async {
        let mut response = Response::new(Full::new(Bytes::from_static(b"only GET is allowed")));
        *response.status_mut() = StatusCode::FORBIDDEN;
        response.extensions_mut().insert(ReasonPhrase::from_static("Request Forbidden"));
        Ok::<_, Infallible>(response)
    });
    let (_, response) = exchange(handler, ConnectionOptions::default(), b"PUT / HTTP/1.1\r\nConnection: close\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 403 Request Forbidden\r\n"));
}

#[tokio::test]
async fn malformed_request_gets_400() {
    let (result, response) = exchange(make_handler(echo), ConnectionOptions::default(), b"GET / HTTP/1.1\r\nbad header\r\n\r\n").await;

    assert!(result.is_err());
    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn oversized_body_gets_413() {
    let options = ConnectionOptions { max_body_size: 4, ..ConnectionOptions::default() };
    let (result, response) = exchange(make_handler(echo), options, b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello").await;

    assert!(result.is_err());
    assert!(response.starts_with("HTTP/1.1 413 "));
}

#[tokio::test]
async fn handler_error_gets_500() {
    let handler = make_handler(|_req: Request<Bytes>| async { Err::<Response<Full<Bytes>>, _>(io::Error::other("boom")) });
    let (result, response) = exchange(handler, ConnectionOptions::default(), b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").await;

    assert!(result.is_ok());
    assert!(response.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

/// Serves one canned response to the first client, returns its url.
async fn upstream(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0; 1024];
        let _ = stream.read(&mut buf).await.unwrap();
        stream.write_all(response).await.unwrap();
    });
    format!("http://{addr}/bar")
}

fn reproxy_handler(url: String) -> impl Handler<RespBody = Full<Bytes>, Error = Infallible> {
    make_handler(move |_req: Request<Bytes>| {
        let url = url.clone();
        async move {
            let mut response = Response::new(Full::new(Bytes::from_static(b"you should never see this!\n")));
            response.headers_mut().insert(X_REPROXY_URL, url.parse().unwrap());
            Ok::<_, Infallible>(response)
        }
    })
}

#[tokio::test]
async fn reproxy_substitutes_the_response() {
    let url = upstream(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nbar\n").await;
    let request = b"GET /reproxy-test HTTP/1.1\r\nConnection: close\r\n\r\n";
    let (result, response) = exchange(reproxy_handler(url), ConnectionOptions::default(), request).await;

    assert!(result.is_ok());
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains("content-type: text/plain\r\n"));
    assert!(response.ends_with("\r\n\r\nbar\n"));
    assert!(!response.contains("you should never see this!"));
}

#[tokio::test]
async fn reproxy_disabled_sends_handler_response() {
    let options = ConnectionOptions { reproxy: false, ..ConnectionOptions::default() };
    let request = b"GET /reproxy-test HTTP/1.1\r\nConnection: close\r\n\r\n";
    let (_, response) = exchange(reproxy_handler("http://example.com:81/bar".to_owned()), options, request).await;

    assert!(response.contains("x-reproxy-url: http://example.com:81/bar\r\n"));
    assert!(response.ends_with("you should never see this!\n"));
}

#[tokio::test]
async fn unreachable_upstream_gets_502() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let options = ConnectionOptions { reproxy_timeout: Duration::from_secs(2), ..ConnectionOptions::default() };
    let request = b"GET /reproxy-test HTTP/1.1\r\nConnection: close\r\n\r\n";
    let (_, response) = exchange(reproxy_handler(format!("http://{addr}/bar")), options, request).await;

    assert!(response.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
    assert!(!response.contains("you should never see this!"));
}
