//! # Unary Handler
//!
//! Single request → single response. The handler receives exactly once and sends at most one
//! response. Every failure other than a transport failure is reported to the peer with the
//! status from [`CallError::to_status`], so a call is never left unanswered.
use super::EchoReplier;
use crate::{call::CallContext, codec::MessageCodec, error::CallError};
use tonic::metadata::MetadataMap;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct UnaryHandler<C> {
    replier: EchoReplier<C>,
}

impl<C: MessageCodec> UnaryHandler<C> {
    pub fn new(replier: EchoReplier<C>) -> Self {
        Self { replier }
    }

    /// Answers the call and shuts it down.
    pub async fn handle<T: CallContext>(&self, call: &mut T) -> Result<(), CallError> {
        let result = self.respond(call).await;

        match &result {
            Ok(()) => debug!(method = %call.info().method, "Unary reply sent"),
            Err(CallError::TransportFailure(err)) => {
                warn!(method = %call.info().method, error = %err, "Unary call aborted")
            }
            Err(err) => {
                let status = err.to_status();
                warn!(method = %call.info().method, code = ?status.code(), error = %err, "Rejecting unary call");

                if let Err(send_err) = call.send_status(status).await {
                    debug!(error = %send_err, "Error status was not delivered");
                }
            }
        }

        call.shutdown();
        result
    }

    async fn respond<T: CallContext>(&self, call: &mut T) -> Result<(), CallError> {
        call.send_initial_metadata(MetadataMap::new()).await?;

        let payload = call.recv().await?.ok_or(CallError::StreamClosed)?;
        let reply = self.replier.reply_to(&payload)?;

        call.send_response(reply).await?;
        Ok(())
    }
}
