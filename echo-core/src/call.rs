//! # Call Context
//!
//! A [`CallContext`] is one RPC invocation as seen by the handlers: who called which method, and
//! the transport primitives to talk back. Implementations own the transport handle exclusively
//! for the lifetime of the call.
//!
//! Every operation is awaited before the next one is issued, so a call never has two operations
//! in flight at the same time.
use bytes::Bytes;
use futures_util::future::BoxFuture;
use tonic::{Code, Status, metadata::MetadataMap};

/// Metadata describing an incoming call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallInfo {
    /// The full method path (e.g. `/echo.Echo/Get`).
    pub method: String,
    /// The host the client addressed.
    pub host: String,
    /// The identity of the peer (usually its remote address).
    pub caller: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("The call is already closed")]
    Closed,
    #[error("Failed to receive a message from the peer: '{0}'")]
    Receive(#[source] Status),
}

#[tonic::async_trait]
pub trait CallContext: Send {
    fn info(&self) -> &CallInfo;

    /// Sends the initial metadata (response headers) of the call.
    async fn send_initial_metadata(&mut self, metadata: MetadataMap) -> Result<(), TransportError>;

    /// Receives the next request message.
    ///
    /// Returns `Ok(None)` once the peer signals end-of-stream.
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError>;

    /// Sends one message without completing the call.
    async fn send_message(&mut self, message: Bytes) -> Result<(), TransportError>;

    /// Sends the trailing status, completing the call.
    async fn send_status(&mut self, status: Status) -> Result<(), TransportError>;

    /// Sends the single response of a call followed by an `OK` status.
    async fn send_response(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.send_message(message).await?;
        self.send_status(Status::new(Code::Ok, "")).await
    }

    /// A future that resolves when the transport learns out-of-band that the peer went away.
    ///
    /// Calling it more than once yields futures that never resolve.
    fn close_notification(&mut self) -> BoxFuture<'static, ()>;

    /// Releases the transport handle. No operation succeeds afterwards.
    fn shutdown(&mut self);
}
