//! # Echo Service Wiring
//!
//! `tonic` has no generated server for `echo.Echo` here. [`EchoServer`] implements the tower
//! service by hand, the same way generated servers do, but instead of matching on the path it
//! forwards every call to the [`Dispatcher`], which owns the routing decision.
use crate::{
    call::{ReplyStream, TonicCall},
    codec::RawCodec,
};
use bytes::Bytes;
use echo_core::{CallInfo, Dispatcher, MessageCodec};
use std::{
    convert::Infallible,
    sync::Arc,
    task::{Context, Poll},
};
use tonic::{
    Status, Streaming,
    codegen::{Body, BoxFuture, Service, StdError, http},
    server::{NamedService, StreamingService},
};
use tracing::debug;

const UNKNOWN: &str = "unknown";

/// A `tonic` service serving `echo.Echo` through a [`Dispatcher`].
#[derive(Debug)]
pub struct EchoServer<C> {
    dispatcher: Arc<Dispatcher<C>>,
}

impl<C> Clone for EchoServer<C> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<C: MessageCodec> EchoServer<C> {
    pub fn new(dispatcher: Dispatcher<C>) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }
}

impl<C> NamedService for EchoServer<C> {
    const NAME: &'static str = "echo.Echo";
}

impl<C, B> Service<http::Request<B>> for EchoServer<C>
where
    C: MessageCodec,
    B: Body + Send + 'static,
    B::Error: Into<StdError> + Send + 'static,
{
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<B>) -> Self::Future {
        let method = CallSvc {
            dispatcher: Arc::clone(&self.dispatcher),
            info: CallInfo {
                method: req.uri().path().to_string(),
                host: host(&req),
                caller: UNKNOWN.to_string(),
            },
        };

        Box::pin(async move {
            let mut grpc = tonic::server::Grpc::new(RawCodec);
            Ok(grpc.streaming(method, req).await)
        })
    }
}

/// One call, served as a bidirectional stream of raw payloads.
struct CallSvc<C> {
    dispatcher: Arc<Dispatcher<C>>,
    info: CallInfo,
}

impl<C: MessageCodec> StreamingService<Bytes> for CallSvc<C> {
    type Response = Bytes;
    type ResponseStream = ReplyStream;
    type Future = BoxFuture<tonic::Response<Self::ResponseStream>, Status>;

    fn call(&mut self, request: tonic::Request<Streaming<Bytes>>) -> Self::Future {
        let dispatcher = Arc::clone(&self.dispatcher);
        let mut info = self.info.clone();

        if let Some(addr) = request.remote_addr() {
            info.caller = addr.to_string();
        }

        Box::pin(async move {
            let (call, parts) = TonicCall::new(info, request.into_inner());

            tokio::spawn(async move {
                if let Err(err) = dispatcher.dispatch(call).await {
                    debug!(error = %err, "Call ended with an error");
                }
            });

            // If the handler finished without sending headers there is nothing to add.
            let metadata = parts.headers.await.unwrap_or_default();

            let mut response = tonic::Response::new(parts.stream);
            *response.metadata_mut() = metadata;
            Ok(response)
        })
    }
}

fn host<B>(req: &http::Request<B>) -> String {
    req.uri()
        .authority()
        .map(|authority| authority.to_string())
        .or_else(|| {
            req.headers()
                .get(http::header::HOST)
                .and_then(|host| host.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| UNKNOWN.to_string())
}
