//! # Dispatcher
//!
//! Routes an incoming call to the handler of its method. The routing keys are the gRPC method
//! paths (`/{service}/{method}`) built from an [`EchoConfig`].
use crate::{
    call::CallContext,
    codec::MessageCodec,
    error::CallError,
    handler::{EchoReplier, streaming::StreamingHandler, unary::UnaryHandler},
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Names, schemas and reply prefixes of the echo service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoConfig {
    /// Fully qualified service name (e.g. `echo.Echo`).
    pub service: String,
    pub unary_method: String,
    pub streaming_method: String,
    pub request_schema: String,
    pub response_schema: String,
    pub unary_prefix: String,
    pub streaming_prefix: String,
}

impl Default for EchoConfig {
    fn default() -> Self {
        Self {
            service: "echo.Echo".to_string(),
            unary_method: "Get".to_string(),
            streaming_method: "Update".to_string(),
            request_schema: "echo.EchoRequest".to_string(),
            response_schema: "echo.EchoResponse".to_string(),
            unary_prefix: "nonstreaming echo ".to_string(),
            streaming_prefix: "streaming echo ".to_string(),
        }
    }
}

impl EchoConfig {
    pub fn unary_path(&self) -> String {
        format!("/{}/{}", self.service, self.unary_method)
    }

    pub fn streaming_path(&self) -> String {
        format!("/{}/{}", self.service, self.streaming_method)
    }
}

/// The handler a method path resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Unary,
    Streaming,
    Unknown,
}

#[derive(Debug)]
pub struct Dispatcher<C> {
    service: String,
    unary_path: String,
    streaming_path: String,
    unary: UnaryHandler<C>,
    streaming: StreamingHandler<C>,
}

impl<C: MessageCodec> Dispatcher<C> {
    pub fn new(codec: C, config: EchoConfig) -> Self {
        let codec = Arc::new(codec);

        let unary = UnaryHandler::new(EchoReplier::new(
            Arc::clone(&codec),
            config.request_schema.clone(),
            config.response_schema.clone(),
            config.unary_prefix.clone(),
        ));

        let streaming = StreamingHandler::new(EchoReplier::new(
            codec,
            config.request_schema.clone(),
            config.response_schema.clone(),
            config.streaming_prefix.clone(),
        ));

        Self {
            unary_path: config.unary_path(),
            streaming_path: config.streaming_path(),
            service: config.service,
            unary,
            streaming,
        }
    }

    /// The fully qualified name of the routed service.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn route(&self, method: &str) -> Route {
        if method == self.unary_path {
            Route::Unary
        } else if method == self.streaming_path {
            Route::Streaming
        } else {
            Route::Unknown
        }
    }

    /// Serves one call until it is closed.
    ///
    /// Calls to an unknown method are answered with `UNIMPLEMENTED` without running any handler.
    pub async fn dispatch<T: CallContext>(&self, mut call: T) -> Result<(), CallError> {
        let info = call.info().clone();

        info!(
            host = %info.host,
            method = %info.method,
            caller = %info.caller,
            "Received request"
        );

        match self.route(&info.method) {
            Route::Unary => self.unary.handle(&mut call).await,
            Route::Streaming => {
                let replies = self.streaming.handle(&mut call).await?;
                debug!(method = %info.method, replies, "Stream finished");
                Ok(())
            }
            Route::Unknown => {
                let err = CallError::UnknownMethod(info.method);
                warn!(error = %err, "No handler for method");

                if let Err(send_err) = call.send_status(err.to_status()).await {
                    debug!(error = %send_err, "Error status was not delivered");
                }
                call.shutdown();
                Err(err)
            }
        }
    }
}
