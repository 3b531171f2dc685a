//! Request routing.

use std::convert::Infallible;

use async_trait::async_trait;
use bytes::Bytes;
use docserve_http::handler::Handler;
use http::uri::PathAndQuery;
use http::{Method, Request, Response};
use tracing::debug;

use crate::mime::MimeMap;
use crate::path::{self, MAX_PATH_LEN};
use crate::response::{self, ResponseBody};

const REPROXY_TARGET: &str = "http://example.com:81/bar";

/// How a request is going to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ChunkedTest,
    ReproxyTest,
    StaticFile,
    PostEcho,
    Forbidden,
}

impl Route {
    /// First match wins. `target` is the request target as sent, query included.
    pub fn classify(method: &Method, target: &str) -> Self {
        if *method == Method::GET && target.len() <= MAX_PATH_LEN {
            match target {
                "/chunked-test" => Self::ChunkedTest,
                "/reproxy-test" => Self::ReproxyTest,
                _ => Self::StaticFile,
            }
        } else if *method == Method::POST && target == "/post-test" {
            Self::PostEcho
        } else {
            Self::Forbidden
        }
    }
}

/// Answers every request; there is no error path, failures become 403/404.
#[derive(Debug)]
pub struct Dispatcher {
    document_root: String,
    mimes: MimeMap,
}

impl Dispatcher {
    pub fn new(document_root: impl Into<String>, mimes: MimeMap) -> Self {
        Self { document_root: document_root.into(), mimes }
    }

    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub async fn dispatch(&self, request: Request<Bytes>) -> Response<ResponseBody> {
        let target = request.uri().path_and_query().map_or("/", PathAndQuery::as_str);
        let route = Route::classify(request.method(), target);

        let response = match route {
            Route::ChunkedTest => response::chunked_text(),
            Route::ReproxyTest => response::reproxy(REPROXY_TARGET),
            Route::StaticFile => match path::resolve(&self.document_root, target, &self.mimes) {
                Ok(resolved) => response::static_file(&resolved).await,
                Err(e) => {
                    debug!(path = target, cause = %e, "can't resolve path");
                    response::not_found()
                }
            },
            Route::PostEcho => response::post_echo(request.body().clone()),
            Route::Forbidden => response::forbidden(),
        };

        debug!(method = %request.method(), path = target, ?route, status = response.status().as_u16(), "dispatched request");
        response
    }
}

#[async_trait]
impl Handler for Dispatcher {
    type RespBody = ResponseBody;
    type Error = Infallible;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        Ok(self.dispatch(req).await)
    }
}
