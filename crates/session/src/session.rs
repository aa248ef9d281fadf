use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use docchat_service::{DocumentService, ServiceResult};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use super::documents::{DocumentRecord, DocumentRegistry};
use super::events::SessionEvent;
use super::ids::{DocumentId, IdIssuer, MessageId, SequentialIds};
use super::message::{ChatMessage, Sender, Timeline};
use super::sequencer::{ReplyOrdering, ReplySequencer, Ticket};

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_GREETING: &str = "Hello! Upload your documents and ask me questions about them!";
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub query_timeout: Duration,
    pub reply_ordering: ReplyOrdering,
    /// Bot message the timeline opens with; `None` starts empty.
    pub greeting: Option<String>,
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            reply_ordering: ReplyOrdering::default(),
            greeting: Some(DEFAULT_GREETING.to_string()),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SessionOptions {
    pub fn with_query_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn with_reply_ordering(mut self, reply_ordering: ReplyOrdering) -> Self {
        self.reply_ordering = reply_ordering;
        self
    }

    pub fn with_greeting(mut self, greeting: Option<String>) -> Self {
        self.greeting = greeting;
        self
    }
}

/// Header line summarizing the registry.
pub fn status_line(document_count: usize) -> String {
    if document_count > 0 {
        format!("Ready to answer questions about {document_count} document(s)")
    } else {
        "Upload documents to get started".to_string()
    }
}

/// Point-in-time copy of everything a rendering layer draws.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub messages: Vec<ChatMessage>,
    pub documents: Vec<DocumentRecord>,
    pub input: String,
    pub busy: bool,
}

impl SessionSnapshot {
    pub fn status_line(&self) -> String {
        status_line(self.documents.len())
    }

    pub fn can_submit(&self) -> bool {
        !self.input.trim().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Query,
    Upload,
}

/// Handle to one in-flight coordinator request.
///
/// The request runs to completion whether or not the handle is awaited.
#[derive(Debug)]
pub struct PendingRequest {
    kind: RequestKind,
    ticket: Ticket,
    task: JoinHandle<()>,
}

impl PendingRequest {
    pub(crate) fn new(kind: RequestKind, ticket: Ticket, task: JoinHandle<()>) -> Self {
        Self { kind, ticket, task }
    }

    pub fn is_settled(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until the request's outcome has been applied to the session.
    pub async fn settled(self) {
        if let Err(error) = self.task.await {
            tracing::error!(
                kind = ?self.kind,
                ticket = self.ticket.get(),
                error = %error,
                "request task ended abnormally"
            );
        }
    }
}

/// Waits for every request in `requests`.
pub async fn settle_all(requests: impl IntoIterator<Item = PendingRequest>) {
    futures::future::join_all(requests.into_iter().map(PendingRequest::settled)).await;
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

struct SessionState {
    timeline: Timeline,
    registry: DocumentRegistry,
    input: String,
    busy: bool,
    sequencer: ReplySequencer<String>,
}

pub(crate) struct SessionInner {
    pub(crate) service: Arc<dyn DocumentService>,
    pub(crate) ids: Arc<dyn IdIssuer>,
    pub(crate) options: SessionOptions,
    state: Mutex<SessionState>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionInner {
    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine; the state itself is the source of truth.
        let _ = self.events.send(event);
    }

    fn append(&self, state: &mut SessionState, sender: Sender, text: String) -> MessageId {
        let message = ChatMessage::new(MessageId::new(self.ids.next_id()), sender, text);
        let id = message.id;
        tracing::debug!(message_id = %id, sender = ?sender, "timeline entry appended");
        state.timeline.append(message.clone());
        self.emit(SessionEvent::MessageAppended(message));
        id
    }

    fn set_busy(&self, state: &mut SessionState, busy: bool) {
        if state.busy != busy {
            state.busy = busy;
            self.emit(SessionEvent::BusyChanged(busy));
        }
    }

    fn replace_input(&self, state: &mut SessionState, input: String) {
        if state.input != input {
            state.input = input.clone();
            self.emit(SessionEvent::InputChanged(input));
        }
    }

    /// Records the user's question and marks the session busy in one step.
    pub(crate) fn begin_query(&self, question: &str) -> Ticket {
        let mut state = self.state.lock();
        self.append(&mut state, Sender::User, question.to_string());
        self.replace_input(&mut state, String::new());
        self.set_busy(&mut state, true);
        state.sequencer.issue()
    }

    pub(crate) fn begin_upload(&self) -> Ticket {
        let mut state = self.state.lock();
        self.set_busy(&mut state, true);
        state.sequencer.issue()
    }

    pub(crate) fn next_document_id(&self) -> DocumentId {
        DocumentId::new(self.ids.next_id())
    }

    /// Appends a bot message that needs no request, keeping its place in the reply order.
    pub(crate) fn report_failure(&self, text: String) {
        let mut state = self.state.lock();
        let ticket = state.sequencer.issue();
        self.release(&mut state, ticket, text);
    }

    fn release(&self, state: &mut SessionState, ticket: Ticket, reply: String) {
        let ready = state.sequencer.settle(ticket, reply);
        if ready.is_empty() {
            tracing::debug!(
                ticket = ticket.get(),
                parked = state.sequencer.parked(),
                "reply parked behind an earlier request"
            );
        }
        for text in ready {
            self.append(state, Sender::Bot, text);
        }
    }

    /// Applies a settled request: registers its document, releases replies, clears busy.
    pub(crate) fn finish_request(
        &self,
        ticket: Ticket,
        reply: String,
        document: Option<DocumentRecord>,
    ) {
        let mut state = self.state.lock();

        if let Some(document) = document {
            tracing::debug!(document_id = %document.id, name = %document.name, "document registered");
            state.registry.add(document.clone());
            self.emit(SessionEvent::DocumentAdded(document));
        }

        self.release(&mut state, ticket, reply);
        self.set_busy(&mut state, false);
    }
}

/// Owns the timeline, the document registry, the input buffer and the busy flag.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

impl Session {
    pub fn new(service: Arc<dyn DocumentService>, options: SessionOptions) -> Self {
        Self::with_id_issuer(service, Arc::new(SequentialIds::new()), options)
    }

    pub fn with_id_issuer(
        service: Arc<dyn DocumentService>,
        ids: Arc<dyn IdIssuer>,
        options: SessionOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(options.event_capacity.max(1));
        let state = SessionState {
            timeline: Timeline::new(),
            registry: DocumentRegistry::new(),
            input: String::new(),
            busy: false,
            sequencer: ReplySequencer::new(options.reply_ordering),
        };
        let inner = Arc::new(SessionInner {
            service,
            ids,
            options,
            state: Mutex::new(state),
            events,
        });

        if let Some(greeting) = inner
            .options
            .greeting
            .as_deref()
            .filter(|greeting| !greeting.trim().is_empty())
        {
            let mut state = inner.state.lock();
            inner.append(&mut state, Sender::Bot, greeting.to_string());
        }

        Self { inner }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        SessionSnapshot {
            messages: state.timeline.messages().to_vec(),
            documents: state.registry.documents().to_vec(),
            input: state.input.clone(),
            busy: state.busy,
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.inner.state.lock().timeline.messages().to_vec()
    }

    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.inner.state.lock().registry.documents().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state.lock().busy
    }

    pub fn input(&self) -> String {
        self.inner.state.lock().input.clone()
    }

    pub fn set_input(&self, input: impl Into<String>) {
        let mut state = self.inner.state.lock();
        self.inner.replace_input(&mut state, input.into());
    }

    pub fn can_submit(&self) -> bool {
        !self.inner.state.lock().input.trim().is_empty()
    }

    pub fn status_line(&self) -> String {
        status_line(self.inner.state.lock().registry.len())
    }

    /// Drops a document from the registry; unknown ids are ignored.
    pub fn remove_document(&self, id: DocumentId) -> Option<DocumentRecord> {
        let mut state = self.inner.state.lock();
        let removed = state.registry.remove(id);
        match &removed {
            Some(document) => {
                tracing::debug!(document_id = %id, name = %document.name, "document removed");
                self.inner.emit(SessionEvent::DocumentRemoved(id));
            }
            None => tracing::debug!(document_id = %id, "remove ignored for unknown document"),
        }
        removed
    }

    /// Asks the service whether it is up. Never touches session state.
    pub async fn probe_service(&self) -> ServiceResult<bool> {
        self.inner.service.health().await
    }
}
