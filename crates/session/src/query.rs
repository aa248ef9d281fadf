use std::panic::AssertUnwindSafe;

use docchat_service::ServiceError;
use futures::FutureExt;

use super::session::{PendingRequest, RequestKind, Session, panic_message};
use super::sequencer::Ticket;

/// Reason shown when the service rejects a question without saying why.
pub const QUERY_FAILURE_FALLBACK: &str = "Failed to get AI response";

pub fn query_error_text(description: &str) -> String {
    format!("Error: {description}")
}

impl Session {
    /// Sends `question` to the service and appends the answer when it arrives.
    ///
    /// Blank questions are ignored. Otherwise the user message, the cleared input
    /// and the busy flag are applied before this returns, and the reply follows
    /// once the request settles or times out. Must be called within a Tokio runtime.
    pub fn submit_question(&self, question: &str) -> Option<PendingRequest> {
        if question.trim().is_empty() {
            tracing::debug!("ignoring blank question");
            return None;
        }

        let ticket = self.inner.begin_query(question);
        tracing::info!(
            ticket = ticket.get(),
            question_len = question.len(),
            "question submitted"
        );

        let session = self.clone();
        let question = question.to_string();
        let task = tokio::spawn(session.run_query(ticket, question));
        Some(PendingRequest::new(RequestKind::Query, ticket, task))
    }

    /// Submits the current input buffer.
    pub fn submit_input(&self) -> Option<PendingRequest> {
        let input = self.input();
        self.submit_question(&input)
    }

    async fn run_query(self, ticket: Ticket, question: String) {
        let timeout = self.inner.options.query_timeout;

        // The call is made inside the guarded block so a panic while building the
        // request is caught too. Dropping it on expiry abandons the request, so a
        // late response can never reach the timeline.
        let request = AssertUnwindSafe(async { self.inner.service.ask(&question).await })
            .catch_unwind();
        let result = match tokio::time::timeout(timeout, request).await {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => {
                tracing::error!(
                    ticket = ticket.get(),
                    panic = panic_message(payload.as_ref()),
                    "question request panicked"
                );
                let reply = query_error_text(QUERY_FAILURE_FALLBACK);
                self.inner.finish_request(ticket, reply, None);
                return;
            }
            Err(_) => Err(ServiceError::TimedOut {
                stage: "query-timeout",
                after_secs: timeout.as_secs(),
            }),
        };

        let reply = match result {
            Ok(answer) => {
                tracing::info!(
                    ticket = ticket.get(),
                    answer_len = answer.len(),
                    "question answered"
                );
                answer
            }
            Err(error) => {
                tracing::warn!(
                    ticket = ticket.get(),
                    timed_out = error.is_timeout(),
                    error = %error,
                    "question failed"
                );
                query_error_text(&error.user_description(QUERY_FAILURE_FALLBACK))
            }
        };

        self.inner.finish_request(ticket, reply, None);
    }
}
