//! Response bodies and the canned responses of every route.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use docserve_http::connection::X_REPROXY_URL;
use docserve_http::protocol::ReasonPhrase;
use futures::Stream;
use http::{HeaderValue, Response, StatusCode, header};
use http_body::{Body, Frame, SizeHint};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, Take};
use tokio_util::io::ReaderStream;
use tracing::debug;

use crate::path::ResolvedPath;

const TEXT_PLAIN_UTF_8: HeaderValue = HeaderValue::from_static("text/plain; charset=utf-8");
const FILE_READ_BUFFER: usize = 16 * 1024;

/// The body of every response the dispatcher produces.
///
/// An inline buffer and a file are sent with `Content-Length`, a chunk list
/// always goes out chunked.
pub struct ResponseBody {
    kind: Kind,
}

enum Kind {
    Once(Option<Bytes>),
    Chunks(VecDeque<Bytes>),
    File { stream: ReaderStream<Take<File>>, len: u64 },
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self { kind: Kind::Once(None) }
    }

    pub fn once(bytes: Bytes) -> Self {
        Self { kind: Kind::Once(Some(bytes)) }
    }

    /// Empty buffers are dropped here, an empty chunk would end the body early.
    pub fn chunks<I>(buffers: I) -> Self
    where
        I: IntoIterator<Item = Bytes>,
    {
        Self { kind: Kind::Chunks(buffers.into_iter().filter(|buf| !buf.is_empty()).collect()) }
    }

    /// Streams at most `len` bytes of `file`.
    pub fn file(file: File, len: u64) -> Self {
        let stream = ReaderStream::with_capacity(file.take(len), FILE_READ_BUFFER);
        Self { kind: Kind::File { stream, len } }
    }
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::Once(bytes) => f.debug_tuple("Once").field(bytes).finish(),
            Kind::Chunks(chunks) => f.debug_tuple("Chunks").field(&chunks.len()).finish(),
            Kind::File { len, .. } => f.debug_struct("File").field("len", len).finish(),
        }
    }
}

impl From<&'static str> for ResponseBody {
    fn from(value: &'static str) -> Self {
        Self::once(Bytes::from_static(value.as_bytes()))
    }
}

impl Body for ResponseBody {
    type Data = Bytes;
    type Error = io::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match &mut self.get_mut().kind {
            Kind::Once(bytes) => Poll::Ready(bytes.take().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::Chunks(chunks) => Poll::Ready(chunks.pop_front().map(|bytes| Ok(Frame::data(bytes)))),
            Kind::File { stream, .. } => {
                let item = ready!(Pin::new(stream).poll_next(cx));
                Poll::Ready(item.map(|result| result.map(Frame::data)))
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.kind {
            Kind::Once(bytes) => bytes.is_none(),
            Kind::Chunks(chunks) => chunks.is_empty(),
            Kind::File { .. } => false,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.kind {
            Kind::Once(None) => SizeHint::with_exact(0),
            Kind::Once(Some(bytes)) => SizeHint::with_exact(bytes.len() as u64),
            Kind::Chunks(_) => SizeHint::default(),
            Kind::File { len, .. } => SizeHint::with_exact(*len),
        }
    }
}

/// `GET /chunked-test`
pub fn chunked_text() -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::chunks([Bytes::from_static(b"hello world\n")]));
    response.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}

/// A response the engine replaces with the resource at `url`; its own body
/// is only seen when reproxying is turned off.
pub fn reproxy(url: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from("you should never see this!\n"));
    response.headers_mut().insert(X_REPROXY_URL, HeaderValue::from_static(url));
    response
}

/// `POST /post-test`, the request body sent back as one chunk.
pub fn post_echo(body: Bytes) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::chunks([body]));
    response.headers_mut().insert(header::CONTENT_TYPE, TEXT_PLAIN_UTF_8);
    response
}

/// Plain text error response with a custom reason phrase.
pub fn error(status: StatusCode, reason: &'static str, message: &'static str) -> Response<ResponseBody> {
    let mut response = Response::new(ResponseBody::from(message));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, TEXT_PLAIN_UTF_8);
    if let Some(reason) = ReasonPhrase::new(reason) {
        response.extensions_mut().insert(reason);
    }
    response
}

pub fn forbidden() -> Response<ResponseBody> {
    error(StatusCode::FORBIDDEN, "Request Forbidden", "only GET is allowed")
}

pub fn not_found() -> Response<ResponseBody> {
    error(StatusCode::NOT_FOUND, "File Not Found", "not found")
}

/// Opens the resolved file, 404 on anything but a readable regular file.
pub async fn static_file(resolved: &ResolvedPath) -> Response<ResponseBody> {
    let file = match File::open(&resolved.path).await {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %resolved.path.display(), cause = %e, "can't open file");
            return not_found();
        }
    };

    let metadata = match file.metadata().await {
        Ok(metadata) => metadata,
        Err(e) => {
            debug!(path = %resolved.path.display(), cause = %e, "can't stat file");
            return not_found();
        }
    };

    if !metadata.is_file() {
        debug!(path = %resolved.path.display(), "not a regular file");
        return not_found();
    }

    let mut response = Response::new(ResponseBody::file(file, metadata.len()));
    if let Ok(content_type) = HeaderValue::from_str(resolved.mime.as_ref()) {
        response.headers_mut().insert(header::CONTENT_TYPE, content_type);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use docserve_http::protocol::reason_of;
    use http_body_util::BodyExt;
    use std::path::PathBuf;

    async fn collect(body: ResponseBody) -> Bytes {
        body.collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn chunked_text_has_unknown_size() {
        let response = chunked_text();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.body().size_hint().exact(), None);
        assert_eq!(collect(response.into_body()).await, "hello world\n");
    }

    #[test]
    fn empty_chunks_are_skipped() {
        let body = ResponseBody::chunks([Bytes::new(), Bytes::from_static(b"a"), Bytes::new()]);
        let Kind::Chunks(chunks) = &body.kind else { panic!("expect chunks") };
        assert_eq!(chunks.len(), 1);

        assert!(ResponseBody::chunks([Bytes::new()]).is_end_stream());
    }

    #[tokio::test]
    async fn post_echo_returns_body() {
        let response = post_echo(Bytes::from_static(b"ping"));
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain; charset=utf-8");
        assert_eq!(collect(response.into_body()).await, "ping");
    }

    #[test]
    fn reproxy_carries_url() {
        let response = reproxy("http://example.com:81/bar");
        assert_eq!(response.headers()[X_REPROXY_URL], "http://example.com:81/bar");
        assert_eq!(response.body().size_hint().exact(), Some(27));
    }

    #[test]
    fn error_responses_carry_reason() {
        let (parts, _) = forbidden().into_parts();
        let head = Response::from_parts(parts, ());
        assert_eq!(head.status(), StatusCode::FORBIDDEN);
        assert_eq!(reason_of(&head), "Request Forbidden");

        let (parts, _) = not_found().into_parts();
        assert_eq!(reason_of(&Response::from_parts(parts, ())), "File Not Found");
    }

    #[tokio::test]
    async fn static_file_streams_content() {
        let dir = std::env::temp_dir().join(format!("docserve-response-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("hello.txt");
        tokio::fs::write(&path, b"hello file\n").await.unwrap();

        let response = static_file(&ResolvedPath { path, mime: mime::TEXT_PLAIN }).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
        assert_eq!(response.body().size_hint().exact(), Some(11));
        assert_eq!(collect(response.into_body()).await, "hello file\n");

        let response = static_file(&ResolvedPath { path: dir.clone(), mime: mime::TEXT_HTML }).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn missing_file_is_404() {
        let resolved = ResolvedPath { path: PathBuf::from("does/not/exist.html"), mime: mime::TEXT_HTML };
        let response = static_file(&resolved).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(collect(response.into_body()).await, "not found");
    }
}
