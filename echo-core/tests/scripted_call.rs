use bytes::Bytes;
use echo_core::{CallContext, CallInfo, TransportError};
use echo_service::pb::{EchoRequest, EchoResponse};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use prost::Message;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tonic::{Code, Status, metadata::MetadataMap};

// Everything the handler did to the call, in order.
#[derive(Debug, Clone)]
pub enum Event {
    InitialMetadata,
    Receive,
    Message(Bytes),
    Status(Status),
    Shutdown,
}

enum Step {
    Deliver(Bytes),
    Fail(Status),
    Hang,
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// A `CallContext` that replays a scripted inbound side and records the outbound one.
///
/// Once the script is exhausted every receive reports end-of-stream.
pub struct ScriptedCall {
    info: CallInfo,
    script: VecDeque<Step>,
    events: EventLog,
    close: Option<BoxFuture<'static, ()>>,
    close_at_end: Option<oneshot::Sender<()>>,
    shut_down: bool,
}

impl ScriptedCall {
    pub fn new(method: &str) -> Self {
        Self {
            info: CallInfo {
                method: method.to_string(),
                host: "localhost:8081".to_string(),
                caller: "ipv4:127.0.0.1:50000".to_string(),
            },
            script: VecDeque::new(),
            events: Arc::new(Mutex::new(Vec::new())),
            close: None,
            close_at_end: None,
            shut_down: false,
        }
    }

    pub fn with_requests(mut self, texts: &[&str]) -> Self {
        for text in texts {
            let payload = EchoRequest {
                text: text.to_string(),
            }
            .encode_to_vec();
            self.script.push_back(Step::Deliver(Bytes::from(payload)));
        }
        self
    }

    pub fn with_payload(mut self, payload: &'static [u8]) -> Self {
        self.script
            .push_back(Step::Deliver(Bytes::from_static(payload)));
        self
    }

    pub fn with_receive_error(mut self, status: Status) -> Self {
        self.script.push_back(Step::Fail(status));
        self
    }

    /// The next receive never completes.
    pub fn with_hanging_receive(mut self) -> Self {
        self.script.push_back(Step::Hang);
        self
    }

    pub fn with_close_notification(mut self, closed: BoxFuture<'static, ()>) -> Self {
        self.close = Some(closed);
        self
    }

    /// The close notification fires as the script runs out, together with end-of-stream.
    pub fn with_close_at_end_of_stream(mut self) -> Self {
        let (tx, rx) = oneshot::channel();
        self.close_at_end = Some(tx);
        self.close = Some(
            async move {
                let _ = rx.await;
            }
            .boxed(),
        );
        self
    }

    pub fn events(&self) -> EventLog {
        Arc::clone(&self.events)
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.shut_down {
            Err(TransportError::Closed)
        } else {
            Ok(())
        }
    }
}

#[tonic::async_trait]
impl CallContext for ScriptedCall {
    fn info(&self) -> &CallInfo {
        &self.info
    }

    async fn send_initial_metadata(&mut self, _metadata: MetadataMap) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.record(Event::InitialMetadata);
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        self.ensure_open()?;
        self.record(Event::Receive);

        match self.script.pop_front() {
            Some(Step::Deliver(payload)) => Ok(Some(payload)),
            Some(Step::Fail(status)) => Err(TransportError::Receive(status)),
            Some(Step::Hang) => std::future::pending().await,
            None => {
                if let Some(closed) = self.close_at_end.take() {
                    let _ = closed.send(());
                }
                Ok(None)
            }
        }
    }

    async fn send_message(&mut self, message: Bytes) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.record(Event::Message(message));
        Ok(())
    }

    async fn send_status(&mut self, status: Status) -> Result<(), TransportError> {
        self.ensure_open()?;
        self.record(Event::Status(status));
        Ok(())
    }

    fn close_notification(&mut self) -> BoxFuture<'static, ()> {
        self.close
            .take()
            .unwrap_or_else(|| futures_util::future::pending().boxed())
    }

    fn shutdown(&mut self) {
        self.shut_down = true;
        self.record(Event::Shutdown);
    }
}

pub fn replies(events: &EventLog) -> Vec<String> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            Event::Message(bytes) => Some(EchoResponse::decode(bytes.clone()).unwrap().text),
            _ => None,
        })
        .collect()
}

pub fn status_codes(events: &EventLog) -> Vec<Code> {
    events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|event| match event {
            Event::Status(status) => Some(status.code()),
            _ => None,
        })
        .collect()
}

pub fn count(events: &EventLog, matches: impl Fn(&Event) -> bool) -> usize {
    events.lock().unwrap().iter().filter(|e| matches(e)).count()
}
