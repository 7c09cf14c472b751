//! # Echo Server
//!
//! Serves the transport independent [`echo_core::Dispatcher`] over gRPC with `tonic`.
//!
//! ## How it works
//!
//! 1. **[`EchoServer`]** is a hand written tower service registered under `echo.Echo`. Every
//!    method path, known or not, is accepted as a bidirectional stream of raw payloads.
//! 2. **[`RawCodec`]** moves the payloads through `tonic` untouched. Decoding into fields is left
//!    to the dispatcher's `MessageCodec`.
//! 3. **[`TonicCall`]** wraps the inbound `Streaming` and an outbound channel into a
//!    [`echo_core::CallContext`], and the dispatcher runs on its own task for the lifetime of
//!    the call.
//!
//! Since the wire format of a unary call is a stream of exactly one message, unary clients are
//! served by the same path.
pub mod call;
pub mod codec;
pub mod service;

pub use call::{ReplyStream, TonicCall};
pub use codec::RawCodec;
pub use service::EchoServer;
