//! Core HTTP protocol types shared by the codec and the connection driver.
//!
//! - **Message handling** ([`Message`], [`PayloadItem`], [`PayloadSize`]): the
//!   unit the codec produces and consumes
//! - **Request** ([`RequestHeader`]): the parsed request line and headers
//! - **Response** ([`ResponseHead`], [`ReasonPhrase`]): the outgoing status line and headers
//! - **Errors** ([`HttpError`], [`ParseError`], [`SendError`], [`ReproxyError`])

mod message;
pub use message::Message;
pub use message::PayloadItem;
pub use message::PayloadSize;

mod request;
pub use request::RequestHeader;

mod response;
pub use response::ReasonPhrase;
pub use response::ResponseHead;
pub use response::reason_of;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::ReproxyError;
pub use error::SendError;
