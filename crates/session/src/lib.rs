#![deny(unsafe_code)]

//! Chat session coordinator for the document question-answering service.
//!
//! A [`Session`] owns the message timeline, the registry of uploaded
//! documents, the input buffer and the advisory busy flag. Questions and
//! uploads are submitted synchronously and settle on background tasks;
//! observers follow along through [`Session::subscribe`].

mod adapter;
mod documents;
mod error;
mod events;
mod ids;
mod message;
mod query;
mod sequencer;
mod session;
mod settings;
mod upload;

#[cfg(test)]
mod testing;

pub use adapter::{DragPhase, DropZone, EventDisposition, FileBatch, FilePicker, capture_files};
pub use documents::{
    DocumentRecord, DocumentRegistry, FALLBACK_MIME_TYPE, LocalFile, guess_mime_type,
};
pub use error::{SessionError, SessionResult};
pub use events::SessionEvent;
pub use ids::{DocumentId, IdIssuer, MessageId, SequentialIds};
pub use message::{ChatMessage, Sender, Timeline};
pub use query::{QUERY_FAILURE_FALLBACK, query_error_text};
pub use sequencer::{ReplyOrdering, ReplySequencer, Ticket};
pub use session::{
    DEFAULT_EVENT_CAPACITY, DEFAULT_GREETING, DEFAULT_QUERY_TIMEOUT, PendingRequest, RequestKind,
    Session, SessionOptions, SessionSnapshot, settle_all, status_line,
};
pub use settings::{ENV_PREFIX, SETTINGS_FILE_NAME, Settings, SettingsError};
pub use upload::{UPLOAD_FAILURE_FALLBACK, upload_error_text, upload_received_text};
