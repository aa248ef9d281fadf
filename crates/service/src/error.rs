use snafu::Snafu;

/// Text shown when a success response lacks the field the caller needs.
pub const INVALID_RESPONSE_FORMAT: &str = "Invalid response format from server";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ServiceError {
    #[snafu(display("failed to build http client on `{stage}`: {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to build request on `{stage}`: {source}"))]
    BuildRequest {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request failed on `{stage}`: {source}"))]
    Transport {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read response body on `{stage}`: {source}"))]
    ReadBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("service rejected request on `{stage}` with status {status}"))]
    Rejected {
        stage: &'static str,
        status: u16,
        description: Option<String>,
    },
    #[snafu(display("service returned an unusable payload on `{stage}`: {details}"))]
    InvalidResponse {
        stage: &'static str,
        details: String,
    },
    #[snafu(display("request timed out after {after_secs} seconds"))]
    TimedOut {
        stage: &'static str,
        after_secs: u64,
    },
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// Text suitable for the chat transcript.
    ///
    /// `fallback` is used when the service rejected the request without a usable
    /// description, so the transcript never shows an empty reason.
    pub fn user_description(&self, fallback: &str) -> String {
        match self {
            Self::Rejected { description, .. } => description
                .as_deref()
                .filter(|description| !description.trim().is_empty())
                .unwrap_or(fallback)
                .to_string(),
            Self::InvalidResponse { .. } => INVALID_RESPONSE_FORMAT.to_string(),
            Self::TimedOut { after_secs, .. } => {
                format!("request timed out after {after_secs} seconds")
            }
            Self::BuildClient { source, .. }
            | Self::BuildRequest { source, .. }
            | Self::Transport { source, .. }
            | Self::ReadBody { source, .. } => source.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_without_description_uses_fallback() {
        let error = ServiceError::Rejected {
            stage: "test",
            status: 500,
            description: None,
        };
        assert_eq!(error.user_description("Upload failed"), "Upload failed");

        let blank = ServiceError::Rejected {
            stage: "test",
            status: 500,
            description: Some("   ".to_string()),
        };
        assert_eq!(blank.user_description("Upload failed"), "Upload failed");
    }

    #[test]
    fn rejected_with_description_is_verbatim() {
        let error = ServiceError::Rejected {
            stage: "test",
            status: 504,
            description: Some("Processing timeout".to_string()),
        };
        assert_eq!(
            error.user_description("Failed to get AI response"),
            "Processing timeout"
        );
    }

    #[test]
    fn invalid_payload_ignores_fallback() {
        let error = ServiceError::InvalidResponse {
            stage: "test",
            details: "missing answer".to_string(),
        };
        assert_eq!(error.user_description("anything"), INVALID_RESPONSE_FORMAT);
    }

    #[test]
    fn timeout_reports_configured_duration() {
        let error = ServiceError::TimedOut {
            stage: "test",
            after_secs: 120,
        };
        assert!(error.is_timeout());
        assert_eq!(
            error.user_description("unused"),
            "request timed out after 120 seconds"
        );
    }
}
