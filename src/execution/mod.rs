//! HTTP execution primitives shared by the dispatcher.

pub mod headers;
pub mod transport;

pub use headers::HttpHeaderBuilder;
pub use transport::{
    HttpRequestContext, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    ReqwestTransport, generate_request_id,
};
