use crate::{call::TransportError, codec::CodecError};
use tonic::Status;

/// Why a request payload could not be turned into a request text.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Message '{schema}' has no string field '{field}'")]
    MissingField { schema: String, field: String },
}

/// The ways a call can end without a successful reply.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Malformed request: {0}")]
    DecodeFailure(#[from] DecodeError),
    #[error("The peer closed the stream before sending a request")]
    StreamClosed,
    #[error("Transport failure: {0}")]
    TransportFailure(#[from] TransportError),
    #[error("Failed to encode the reply: {0}")]
    EncodeFailure(#[source] CodecError),
    #[error("Method '{0}' is not implemented by this server")]
    UnknownMethod(String),
}

impl CallError {
    /// The trailing status reported to the peer for this error.
    pub fn to_status(&self) -> Status {
        match self {
            CallError::DecodeFailure(_) | CallError::StreamClosed => {
                Status::invalid_argument(self.to_string())
            }
            CallError::UnknownMethod(_) => Status::unimplemented(self.to_string()),
            CallError::EncodeFailure(_) => Status::internal(self.to_string()),
            CallError::TransportFailure(_) => Status::unavailable(self.to_string()),
        }
    }
}
