use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use super::documents::{DocumentRecord, LocalFile};
use super::error::SessionError;
use super::sequencer::Ticket;
use super::session::{PendingRequest, RequestKind, Session, panic_message};

/// Reason shown when the service rejects an upload without an `error` field.
pub const UPLOAD_FAILURE_FALLBACK: &str = "Upload failed";

pub fn upload_received_text(file_name: &str) -> String {
    format!("I've received \"{file_name}\". You can now ask me questions about it.")
}

pub fn upload_error_text(file_name: &str, description: &str) -> String {
    format!("Error processing \"{file_name}\": {description}")
}

impl Session {
    /// Sends one file to the ingestion endpoint.
    ///
    /// The busy flag is set before this returns. On acknowledgement the file's
    /// metadata is registered as a new document; either way one bot message
    /// reports the outcome. Must be called within a Tokio runtime.
    pub fn submit_upload(&self, file: LocalFile) -> PendingRequest {
        let ticket = self.inner.begin_upload();
        tracing::info!(
            ticket = ticket.get(),
            file_name = %file.name,
            size_bytes = file.size_bytes,
            "upload submitted"
        );

        let session = self.clone();
        let task = tokio::spawn(session.run_upload(ticket, file));
        PendingRequest::new(RequestKind::Upload, ticket, task)
    }

    /// Submits each file independently; one failure does not affect the others.
    pub fn submit_uploads(&self, files: impl IntoIterator<Item = LocalFile>) -> Vec<PendingRequest> {
        files
            .into_iter()
            .map(|file| self.submit_upload(file))
            .collect()
    }

    /// Reports a file that could not be read, in the same form as a failed upload.
    pub fn report_unreadable(&self, error: &SessionError) {
        self.inner
            .report_failure(upload_error_text(&error.file_label(), &error.user_description()));
    }

    async fn run_upload(self, ticket: Ticket, file: LocalFile) {
        let request = AssertUnwindSafe(async {
            self.inner.service.upload(file.to_upload_request()).await
        })
        .catch_unwind();

        let result = match request.await {
            Ok(result) => result,
            Err(payload) => {
                tracing::error!(
                    ticket = ticket.get(),
                    file_name = %file.name,
                    panic = panic_message(payload.as_ref()),
                    "upload request panicked"
                );
                let reply = upload_error_text(&file.name, UPLOAD_FAILURE_FALLBACK);
                self.inner.finish_request(ticket, reply, None);
                return;
            }
        };

        match result {
            Ok(receipt) => {
                // Identifier is issued only now that the service has acknowledged the file.
                let record = DocumentRecord::from_local_file(self.inner.next_document_id(), &file);
                tracing::info!(
                    ticket = ticket.get(),
                    document_id = %record.id,
                    file_name = %file.name,
                    processing_time = ?receipt.processing_time,
                    "upload acknowledged"
                );
                self.inner
                    .finish_request(ticket, upload_received_text(&file.name), Some(record));
            }
            Err(error) => {
                tracing::warn!(
                    ticket = ticket.get(),
                    file_name = %file.name,
                    error = %error,
                    "upload failed"
                );
                let description = error.user_description(UPLOAD_FAILURE_FALLBACK);
                self.inner.finish_request(
                    ticket,
                    upload_error_text(&file.name, &description),
                    None,
                );
            }
        }
    }
}
