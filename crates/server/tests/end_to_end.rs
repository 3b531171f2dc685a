use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use docserve::{Backend, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const DOCUMENT_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/htdocs");

struct Reply {
    head: String,
    body: Vec<u8>,
}

impl Reply {
    fn status_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.eq_ignore_ascii_case(name).then(|| value.trim())
        })
    }

    fn text(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap()
    }
}

async fn start(backend: Backend, reproxy: bool) -> SocketAddr {
    let server = Server::builder()
        .address((Ipv4Addr::LOCALHOST, 0))
        .document_root(DOCUMENT_ROOT)
        .backend(backend)
        .reproxy(reproxy)
        .reproxy_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let bound = server.bind().unwrap();
    let addr = bound.local_addr();
    tokio::spawn(bound.run());
    addr
}

async fn send(addr: SocketAddr, request: &[u8]) -> Reply {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();

    let split = raw.windows(4).position(|w| w == b"\r\n\r\n").expect("complete response head");
    let head = String::from_utf8(raw[..split].to_vec()).unwrap();
    let payload = &raw[split + 4..];

    let chunked = head.to_ascii_lowercase().contains("transfer-encoding: chunked");
    let body = if chunked { dechunk(payload) } else { payload.to_vec() };
    Reply { head, body }
}

async fn get(addr: SocketAddr, target: &str) -> Reply {
    send(addr, format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n").as_bytes()).await
}

fn dechunk(mut payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    loop {
        let line_end = payload.windows(2).position(|w| w == b"\r\n").unwrap();
        let size = usize::from_str_radix(std::str::from_utf8(&payload[..line_end]).unwrap(), 16).unwrap();
        payload = &payload[line_end + 2..];
        if size == 0 {
            return body;
        }
        body.extend_from_slice(&payload[..size]);
        payload = &payload[size + 2..];
    }
}

async fn builtin_routes(backend: Backend) {
    let addr = start(backend, false).await;

    let reply = get(addr, "/chunked-test").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(reply.header("content-type"), Some("text/plain"));
    assert_eq!(reply.header("transfer-encoding"), Some("chunked"));
    assert_eq!(reply.text(), "hello world\n");

    let reply = get(addr, "/reproxy-test").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(reply.header("x-reproxy-url"), Some("http://example.com:81/bar"));

    let reply = send(addr, b"DELETE /index.html HTTP/1.1\r\nConnection: close\r\n\r\n").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 403 Request Forbidden");
    assert_eq!(reply.text(), "only GET is allowed");

    let reply = send(addr, b"POST /other HTTP/1.1\r\nContent-Length: 1\r\nConnection: close\r\n\r\nx").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 403 Request Forbidden");
}

#[tokio::test]
async fn builtin_routes_with_reactor() {
    builtin_routes(Backend::Reactor).await;
}

#[tokio::test]
async fn builtin_routes_with_proactor() {
    builtin_routes(Backend::Proactor).await;
}

#[tokio::test]
async fn post_echo_sizes() {
    let addr = start(Backend::Proactor, false).await;

    let large: Vec<u8> = (0..256 * 1024).map(|i| b'a' + (i % 26) as u8).collect();
    for body in [&b""[..], &b"x"[..], &large[..]] {
        let mut request = format!("POST /post-test HTTP/1.1\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len()).into_bytes();
        request.extend_from_slice(body);

        let reply = send(addr, &request).await;
        assert_eq!(reply.status_line(), "HTTP/1.1 200 OK");
        assert_eq!(reply.header("content-type"), Some("text/plain; charset=utf-8"));
        assert_eq!(reply.body, body);
    }
}

#[tokio::test]
async fn static_files() {
    let addr = start(Backend::Reactor, false).await;

    let reply = get(addr, "/").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 200 OK");
    assert_eq!(reply.header("content-type"), Some("text/html"));
    assert!(reply.text().contains("It works!"));

    let reply = get(addr, "/docs/").await;
    assert!(reply.text().contains("<title>docs</title>"));

    let reply = get(addr, "/style.css?v=2").await;
    assert_eq!(reply.header("content-type"), Some("text/css"));
    assert_eq!(reply.header("content-length"), Some("20"));

    let reply = get(addr, "/hello.txt").await;
    assert_eq!(reply.text(), "hello file\n");

    let reply = get(addr, "/missing.html").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 404 File Not Found");
    assert_eq!(reply.text(), "not found");

    // a directory without trailing slash is not a file
    let reply = get(addr, "/docs").await;
    assert_eq!(reply.status_line(), "HTTP/1.1 404 File Not Found");
}

#[tokio::test]
async fn traversal_stays_in_document_root() {
    let addr = start(Backend::Proactor, false).await;

    for target in [
        "/../secret.txt",
        "/docs/../../secret.txt",
        "/%2e%2e/secret.txt",
        "/..%2fsecret.txt",
        "/..%5csecret.txt",
        "/docs/..%5c..%5csecret.txt",
        "/%ff/../secret.txt",
    ] {
        let reply = get(addr, target).await;
        assert_eq!(reply.status_line(), "HTTP/1.1 404 File Not Found", "{target}");
        assert!(!reply.text().contains("outside the document root"), "{target}");
    }

    let reply = get(addr, "/docs/../hello.txt").await;
    assert_eq!(reply.text(), "hello file\n");
}

#[tokio::test]
async fn keep_alive_and_http10() {
    let addr = start(Backend::Reactor, false).await;

    let reply = send(addr, b"GET /chunked-test HTTP/1.0\r\n\r\n").await;
    assert_eq!(reply.header("transfer-encoding"), None);
    assert_eq!(reply.header("content-length"), Some("12"));
    assert_eq!(reply.text(), "hello world\n");

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"GET /hello.txt HTTP/1.1\r\n\r\nGET /hello.txt HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    assert_eq!(raw.matches("hello file\n").count(), 2);
}

#[tokio::test]
async fn reproxy_literal_body_never_reaches_client() {
    let addr = start(Backend::Proactor, true).await;

    let reply = get(addr, "/reproxy-test").await;
    assert!(!reply.text().contains("you should never see this!"));
}

#[tokio::test]
async fn binding_used_address_fails() {
    let first = Server::builder().address((Ipv4Addr::LOCALHOST, 0)).build().unwrap().bind().unwrap();

    for backend in [Backend::Reactor, Backend::Proactor] {
        let result = Server::builder().address(first.local_addr()).backend(backend).build().unwrap().bind();
        assert!(result.is_err());
    }
}
