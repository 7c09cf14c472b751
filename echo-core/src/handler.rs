//! # Handlers
//!
//! The two RPC patterns served by the echo service. Both share an [`EchoReplier`], which turns a
//! request payload into the encoded reply for one mode.
pub mod streaming;
pub mod unary;

use crate::{
    codec::MessageCodec,
    error::CallError,
    reply::{build_reply, decode_text},
};
use bytes::Bytes;
use std::sync::Arc;

/// Decodes a request, prefixes its text and encodes the reply.
#[derive(Debug)]
pub struct EchoReplier<C> {
    codec: Arc<C>,
    request_schema: String,
    response_schema: String,
    prefix: String,
}

impl<C> Clone for EchoReplier<C> {
    fn clone(&self) -> Self {
        Self {
            codec: Arc::clone(&self.codec),
            request_schema: self.request_schema.clone(),
            response_schema: self.response_schema.clone(),
            prefix: self.prefix.clone(),
        }
    }
}

impl<C: MessageCodec> EchoReplier<C> {
    pub fn new(
        codec: Arc<C>,
        request_schema: impl Into<String>,
        response_schema: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            codec,
            request_schema: request_schema.into(),
            response_schema: response_schema.into(),
            prefix: prefix.into(),
        }
    }

    /// Returns the encoded reply for `payload`.
    ///
    /// # Errors
    ///
    /// * [`CallError::DecodeFailure`] - The payload does not match the request schema or has no `text`.
    /// * [`CallError::EncodeFailure`] - The reply could not be encoded with the response schema.
    pub fn reply_to(&self, payload: &[u8]) -> Result<Bytes, CallError> {
        let text = decode_text(self.codec.as_ref(), &self.request_schema, payload)?;

        build_reply(
            self.codec.as_ref(),
            &self.response_schema,
            &text,
            &self.prefix,
        )
        .map_err(CallError::EncodeFailure)
    }
}
