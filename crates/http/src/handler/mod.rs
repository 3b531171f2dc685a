//! The per-request callback the connection driver invokes.
//!
//! The request body is already collected when a handler runs, so handlers see
//! a plain `Request<Bytes>`. Any `http_body::Body` with `Bytes` data can be
//! returned; the driver picks Content-Length or chunked framing from its size
//! hint.

use async_trait::async_trait;
use bytes::Bytes;
use std::error::Error;
use std::future::Future;

use http::{Request, Response};
use http_body::Body;

#[async_trait]
pub trait Handler: Send + Sync {
    type RespBody: Body;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// Adapts an async function into a [`Handler`], see [`make_handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F, Fut> Handler for HandlerFn<F>
where
    RespBody: Body,
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, RespBody, Err, Fut>(f: F) -> HandlerFn<F>
where
    RespBody: Body,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<Bytes>) -> Fut,
{
    HandlerFn { f }
}
