use super::documents::DocumentRecord;
use super::ids::DocumentId;
use super::message::ChatMessage;

/// Change notification published after each session mutation.
///
/// Events are sent while the mutation is applied, so subscribers observe them in
/// the same order the state changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    MessageAppended(ChatMessage),
    DocumentAdded(DocumentRecord),
    DocumentRemoved(DocumentId),
    InputChanged(String),
    BusyChanged(bool),
}
