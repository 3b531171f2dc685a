use std::io;
use std::net::SocketAddr;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("address must be set")]
    MissingAddress,

    #[error("document root must not be empty")]
    InvalidDocumentRoot,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("can't start runtime: {0}")]
    Runtime(#[source] io::Error),

    #[error("listener failed: {0}")]
    Accept(#[source] io::Error),
}
