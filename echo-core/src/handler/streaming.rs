//! # Streaming Handler
//!
//! Drives the receive → reply loop of a streaming call as an explicit state machine:
//!
//! ```text
//! AwaitingInitialMetadataSent ──► AwaitingRequest ◄──► AwaitingCloseAfterReply
//!                                       │
//!                                       ▼
//!                                  Finalizing ──► Closed
//! ```
//!
//! Requests and replies strictly alternate: the next receive is only armed once the previous
//! reply has been handed to the transport.
//!
//! The call can end through two triggers, the receive loop seeing end-of-stream (or a malformed
//! message) and the transport's close notification. Both go through [`StreamSession::finalize`],
//! which sends the trailing status and shuts the transport down at most once.
use super::EchoReplier;
use crate::{
    call::{CallContext, TransportError},
    codec::MessageCodec,
    error::CallError,
};
use bytes::Bytes;
use tonic::{Code, Status, metadata::MetadataMap};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Initial metadata has been requested but not sent yet.
    AwaitingInitialMetadataSent,
    /// A receive is (about to be) in flight.
    AwaitingRequest,
    /// A reply is being sent. No receive is armed.
    AwaitingCloseAfterReply,
    /// The trailing status is being sent.
    Finalizing,
    /// Status sent and transport released.
    Closed,
}

/// The per-call state of a streaming echo.
#[derive(Debug)]
pub struct StreamSession {
    state: StreamState,
    replies: usize,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self {
            state: StreamState::AwaitingInitialMetadataSent,
            replies: 0,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of replies sent so far.
    pub fn replies(&self) -> usize {
        self.replies
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, StreamState::Finalizing | StreamState::Closed)
    }

    /// Sends `status` as the trailing status and shuts the call down.
    ///
    /// Only the first call performs the finalization, later calls return `false` and touch
    /// nothing.
    pub async fn finalize<T: CallContext>(&mut self, call: &mut T, status: Status) -> bool {
        if self.is_closed() {
            return false;
        }

        self.state = StreamState::Finalizing;

        let code = status.code();
        match call.send_status(status).await {
            Ok(()) => debug!(code = ?code, replies = self.replies, "Status sent"),
            Err(err) => debug!(code = ?code, error = %err, "Trailing status was not delivered"),
        }

        call.shutdown();
        self.state = StreamState::Closed;
        true
    }

    async fn send_reply<T: CallContext>(
        &mut self,
        call: &mut T,
        reply: Bytes,
    ) -> Result<(), TransportError> {
        self.state = StreamState::AwaitingCloseAfterReply;
        call.send_message(reply).await?;
        self.replies += 1;
        self.state = StreamState::AwaitingRequest;
        Ok(())
    }
}

/// What ended the receive loop.
enum Ending {
    EndOfStream,
    PeerGone,
    Rejected(CallError),
    Transport(TransportError),
}

#[derive(Debug, Clone)]
pub struct StreamingHandler<C> {
    replier: EchoReplier<C>,
}

impl<C: MessageCodec> StreamingHandler<C> {
    pub fn new(replier: EchoReplier<C>) -> Self {
        Self { replier }
    }

    /// Runs the call to completion and returns the number of replies sent.
    ///
    /// A graceful end-of-stream and a close notification both end with an `OK` status. A
    /// malformed message ends the call with the status of the corresponding [`CallError`],
    /// which is also returned.
    pub async fn handle<T: CallContext>(&self, call: &mut T) -> Result<usize, CallError> {
        let mut session = StreamSession::new();
        let mut closed = call.close_notification();

        if let Err(err) = call.send_initial_metadata(MetadataMap::new()).await {
            session.finalize(call, Status::unavailable(err.to_string())).await;
            return Err(err.into());
        }
        session.state = StreamState::AwaitingRequest;

        let ending = loop {
            let inbound = tokio::select! {
                biased;
                () = &mut closed => break Ending::PeerGone,
                inbound = call.recv() => inbound,
            };

            let payload = match inbound {
                Ok(Some(payload)) => payload,
                Ok(None) => break Ending::EndOfStream,
                Err(err) => break Ending::Transport(err),
            };

            let reply = match self.replier.reply_to(&payload) {
                Ok(reply) => reply,
                Err(err) => break Ending::Rejected(err),
            };

            if let Err(err) = session.send_reply(call, reply).await {
                break Ending::Transport(err);
            }
        };

        let method = call.info().method.clone();
        match ending {
            Ending::EndOfStream => {
                debug!(%method, replies = session.replies(), "Peer closed the stream");
                session.finalize(call, ok_status()).await;
                Ok(session.replies())
            }
            Ending::PeerGone => {
                debug!(%method, replies = session.replies(), "Peer went away");
                session.finalize(call, ok_status()).await;
                Ok(session.replies())
            }
            Ending::Rejected(err) => {
                warn!(%method, error = %err, "Closing stream after a malformed message");
                session.finalize(call, err.to_status()).await;
                Err(err)
            }
            Ending::Transport(err) => {
                warn!(%method, error = %err, "Stream aborted");
                session.finalize(call, Status::unavailable(err.to_string())).await;
                Err(err.into())
            }
        }
    }
}

fn ok_status() -> Status {
    Status::new(Code::Ok, "")
}
