use std::path::PathBuf;

use docchat_session::{
    DocumentId, DocumentRecord, DropZone, FilePicker, PendingRequest, Sender, Session,
    SessionEvent, settle_all,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, oneshot};

const HELP: &str = "\
commands:
  /upload <path>...   pick files to upload
  /drop <path>...     drop files onto the chat
  /docs               list uploaded documents
  /remove <id>        forget an uploaded document
  /status             show the session status
  /quit               wait for pending replies and exit
anything else is sent as a question";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Ask(String),
    Upload(Vec<PathBuf>),
    Drop(Vec<PathBuf>),
    Docs,
    Remove(DocumentId),
    Status,
    Help,
    Quit,
    Invalid(String),
}

impl Command {
    /// Parses one input line; blank lines yield `None`.
    pub(crate) fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Some(Self::Ask(line.trim_end_matches(['\r', '\n']).to_string()));
        };

        let mut words = rest.split_whitespace();
        let name = words.next().unwrap_or_default();
        let arguments = words.collect::<Vec<_>>();
        let paths = || arguments.iter().map(|argument| PathBuf::from(*argument)).collect::<Vec<_>>();

        let command = match name {
            "upload" | "drop" if arguments.is_empty() => {
                Self::Invalid(format!("/{name} needs at least one path"))
            }
            "upload" => Self::Upload(paths()),
            "drop" => Self::Drop(paths()),
            "docs" => Self::Docs,
            "remove" => match arguments.as_slice() {
                [id] => match id.trim_start_matches('#').parse::<DocumentId>() {
                    Ok(id) => Self::Remove(id),
                    Err(_) => Self::Invalid(format!("not a document id: {id}")),
                },
                _ => Self::Invalid("/remove takes exactly one document id".to_string()),
            },
            "status" => Self::Status,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Invalid(format!("unknown command: /{other}")),
        };
        Some(command)
    }
}

pub(crate) fn format_size(size_bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = size_bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{size_bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

pub(crate) fn document_line(document: &DocumentRecord) -> String {
    format!(
        "#{} {} ({}, {})",
        document.id,
        document.name,
        document.mime_type,
        format_size(document.size_bytes)
    )
}

/// Transcript line for an event, if it is worth printing.
pub(crate) fn render_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::MessageAppended(message) => Some(match message.sender {
            Sender::User => format!("you> {}", message.text),
            Sender::Bot => format!("bot> {}", message.text),
        }),
        SessionEvent::DocumentAdded(document) => Some(format!("[+] {}", document_line(document))),
        SessionEvent::DocumentRemoved(id) => Some(format!("[-] #{id}")),
        SessionEvent::BusyChanged(true) => Some("... waiting for the service".to_string()),
        SessionEvent::BusyChanged(false) | SessionEvent::InputChanged(_) => None,
    }
}

async fn print_events(
    mut events: broadcast::Receiver<SessionEvent>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if let Some(line) = render_event(&event) {
                        println!("{line}");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "transcript fell behind, some events were not shown");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            },
            _ = &mut shutdown => break,
        }
    }

    // Everything emitted before shutdown is already queued.
    while let Ok(event) = events.try_recv() {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
    }
}

/// Runs the interactive loop until `/quit` or end of input, then waits for
/// outstanding requests so their replies still reach the transcript.
pub(crate) async fn run<R>(session: Session, input: R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let snapshot = session.snapshot();
    for message in &snapshot.messages {
        if let Some(line) = render_event(&SessionEvent::MessageAppended(message.clone())) {
            println!("{line}");
        }
    }
    println!("{}", snapshot.status_line());

    let (stop_printer, printer_shutdown) = oneshot::channel();
    let printer = tokio::spawn(print_events(session.subscribe(), printer_shutdown));

    let mut picker = FilePicker::new(session.clone());
    let mut drop_zone = DropZone::new(session.clone());
    let mut pending = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        pending.retain(|request: &PendingRequest| !request.is_settled());

        let Some(command) = Command::parse(&line) else {
            continue;
        };
        match command {
            Command::Ask(question) => {
                session.set_input(question);
                pending.extend(session.submit_input());
            }
            Command::Upload(paths) => {
                picker.trigger();
                pending.extend(picker.on_change(paths).await.uploads);
            }
            Command::Drop(paths) => {
                let (_, batch) = drop_zone.on_drop_paths(&paths).await;
                pending.extend(batch.uploads);
            }
            Command::Docs => {
                let documents = session.documents();
                if documents.is_empty() {
                    println!("no documents uploaded");
                }
                for document in &documents {
                    println!("{}", document_line(document));
                }
            }
            Command::Remove(id) => {
                if session.remove_document(id).is_none() {
                    println!("no document #{id}");
                }
            }
            Command::Status => {
                let busy = if session.is_busy() { " (busy)" } else { "" };
                println!("{}{busy}", session.status_line());
            }
            Command::Help => println!("{HELP}"),
            Command::Quit => break,
            Command::Invalid(reason) => println!("!! {reason}"),
        }
    }

    settle_all(pending).await;
    let _ = stop_printer.send(());
    if let Err(error) = printer.await {
        tracing::warn!(error = %error, "transcript printer stopped unexpectedly");
    }
    Ok(())
}
