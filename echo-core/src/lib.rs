//! # Echo Core
//!
//! `echo-core` is the transport independent heart of the echo server. It knows how to route a
//! call by method path, how to answer a unary echo and how to drive the receive → reply loop of
//! a streaming echo, but it never touches a socket or a protobuf schema directly.
//!
//! ## Key Components
//!
//! * **[`Dispatcher`]:** The entry point. Logs every incoming call and routes it to a handler,
//!   answering unknown methods with `UNIMPLEMENTED`.
//! * **[`UnaryHandler`] & [`StreamingHandler`]:** The two RPC patterns. The streaming handler is an
//!   explicit state machine ([`StreamState`]) with a single, at-most-once finalization path.
//! * **[`reply::build_reply`]:** Builds the encoded reply payload for a request text.
//!
//! ## Collaborators
//!
//! The core reaches the outside world through two narrow traits:
//!
//! * **[`CallContext`]:** One RPC invocation: its metadata and the send/receive primitives of the
//!   transport. `echo-server` implements it on top of `tonic`.
//! * **[`MessageCodec`]:** Transcodes payloads to field maps by schema name.
//!   [`DescriptorCodec`] implements it with `prost-reflect` dynamic messages.
pub mod call;
pub mod codec;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod reply;

pub use call::{CallContext, CallInfo, TransportError};
pub use codec::{CodecError, DescriptorCodec, FieldMap, MessageCodec};
pub use dispatcher::{Dispatcher, EchoConfig, Route};
pub use error::{CallError, DecodeError};
pub use handler::streaming::{StreamSession, StreamState, StreamingHandler};
pub use handler::unary::UnaryHandler;

// Re-exports
pub use prost_reflect;
pub use tonic;
