//! # Tonic Call
//!
//! [`TonicCall`] is the [`CallContext`] of a call served by `tonic`:
//!
//! * **Inbound**: the request `Streaming<Bytes>`. End-of-stream is the client's half-close.
//! * **Initial metadata**: sent through a oneshot to the service future, which only returns the
//!   `tonic::Response` once the handler provided its headers.
//! * **Outbound**: a bounded channel feeding the [`ReplyStream`] returned to `tonic`. An `OK`
//!   status ends the stream, any other status is yielded as the terminal error.
//! * **Close notification**: fires when `tonic` drops the [`ReplyStream`], which happens when the
//!   peer goes away.
use bytes::Bytes;
use echo_core::{CallContext, CallInfo, TransportError};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Code, Status, Streaming, metadata::MetadataMap};

type Reply = Result<Bytes, Status>;

/// The response body of a call.
#[derive(Debug)]
pub struct ReplyStream {
    inner: ReceiverStream<Reply>,
    // Dropped together with the stream, which wakes up the close notification.
    _closed: oneshot::Sender<()>,
}

impl Stream for ReplyStream {
    type Item = Reply;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// The halves of a call that `tonic` needs to build the response.
#[derive(Debug)]
pub struct ResponseParts {
    pub headers: oneshot::Receiver<MetadataMap>,
    pub stream: ReplyStream,
}

#[derive(Debug)]
pub struct TonicCall {
    info: CallInfo,
    inbound: Option<Streaming<Bytes>>,
    outbound: Option<mpsc::Sender<Reply>>,
    headers: Option<oneshot::Sender<MetadataMap>>,
    closed: Option<oneshot::Receiver<()>>,
}

impl TonicCall {
    pub fn new(info: CallInfo, inbound: Streaming<Bytes>) -> (Self, ResponseParts) {
        // A single slot keeps at most one reply queued ahead of the transport.
        let (tx, rx) = mpsc::channel(1);
        let (headers_tx, headers_rx) = oneshot::channel();
        let (closed_tx, closed_rx) = oneshot::channel();

        let call = Self {
            info,
            inbound: Some(inbound),
            outbound: Some(tx),
            headers: Some(headers_tx),
            closed: Some(closed_rx),
        };

        let parts = ResponseParts {
            headers: headers_rx,
            stream: ReplyStream {
                inner: ReceiverStream::new(rx),
                _closed: closed_tx,
            },
        };

        (call, parts)
    }

    /// Sends empty headers if the handler did not send any yet.
    fn flush_headers(&mut self) {
        if let Some(headers) = self.headers.take() {
            let _ = headers.send(MetadataMap::new());
        }
    }
}

#[tonic::async_trait]
impl CallContext for TonicCall {
    fn info(&self) -> &CallInfo {
        &self.info
    }

    async fn send_initial_metadata(&mut self, metadata: MetadataMap) -> Result<(), TransportError> {
        if self.outbound.is_none() {
            return Err(TransportError::Closed);
        }

        match self.headers.take() {
            Some(headers) => headers.send(metadata).map_err(|_| TransportError::Closed),
            None => Ok(()),
        }
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        let inbound = self.inbound.as_mut().ok_or(TransportError::Closed)?;
        inbound.message().await.map_err(TransportError::Receive)
    }

    async fn send_message(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.flush_headers();

        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound
            .send(Ok(message))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn send_status(&mut self, status: Status) -> Result<(), TransportError> {
        self.flush_headers();

        let outbound = self.outbound.take().ok_or(TransportError::Closed)?;

        // The reply stream is gone, nothing can carry the status anymore.
        if outbound.is_closed() {
            return Err(TransportError::Closed);
        }

        // The stream ending without an error is how tonic reports `OK`.
        if status.code() == Code::Ok {
            return Ok(());
        }

        outbound
            .send(Err(status))
            .await
            .map_err(|_| TransportError::Closed)
    }

    fn close_notification(&mut self) -> BoxFuture<'static, ()> {
        match self.closed.take() {
            Some(closed) => async move {
                let _ = closed.await;
            }
            .boxed(),
            None => futures_util::future::pending().boxed(),
        }
    }

    fn shutdown(&mut self) {
        self.inbound = None;
        self.outbound = None;
        self.headers = None;
    }
}
