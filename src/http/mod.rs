//! # HTTP Boundary
//!
//! The stream client consumes exactly two HTTP shapes: a chunked streaming
//! GET (push transport) and a single-shot GET held open server-side (long
//! polling). Both are expressed through the [`HttpClient`] trait so tests
//! can inject scripted fakes; [`ReqwestClient`] is the production
//! implementation.
//!
//! Cancellation is by dropping the returned future or byte stream; both
//! implementations abort the underlying request when dropped.

mod client;
mod url;

pub use client::{
    ByteStream, HttpClient, HttpError, HttpResult, JsonResponse, ReqwestClient, StaticToken,
    StreamResponse, TokenProvider,
};
pub use url::build_url;
