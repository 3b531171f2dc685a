//! A small static file server on top of `docserve-http`.
//!
//! Besides serving files from a document root it answers a few built-in
//! routes used to exercise the engine:
//!
//! | request              | response                                          |
//! |----------------------|---------------------------------------------------|
//! | `GET /chunked-test`  | `hello world\n`, chunked                          |
//! | `GET /reproxy-test`  | `X-Reproxy-URL: http://example.com:81/bar`        |
//! | `POST /post-test`    | the request body, echoed                          |
//! | any other `GET`      | the file below the document root, or 404          |
//! | anything else        | 403 `Request Forbidden`                           |
//!
//! # Example
//!
//! ```no_run
//! use docserve::{Backend, Server};
//! use std::net::Ipv4Addr;
//!
//! let server = Server::builder()
//!     .address((Ipv4Addr::LOCALHOST, 7890))
//!     .document_root("htdocs")
//!     .backend(Backend::Proactor)
//!     .build()
//!     .unwrap();
//! server.run_blocking().unwrap();
//! ```

pub mod acceptor;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod mime;
pub mod path;
pub mod response;
pub mod server;

pub use acceptor::{Acceptor, Backend};
pub use config::Config;
pub use context::ServerContext;
pub use dispatcher::{Dispatcher, Route};
pub use error::{ServerBuildError, ServerError};
pub use server::{BoundServer, Server, ServerBuilder};
