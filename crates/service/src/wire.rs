use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use super::error::{InvalidResponseSnafu, RejectedSnafu, ServiceResult};

/// Body field carrying the failure reason of `POST /ask/`.
pub const ASK_ERROR_FIELD: &str = "detail";
/// Body field carrying the failure reason of `POST /upload/`.
pub const UPLOAD_ERROR_FIELD: &str = "error";

#[derive(Debug, Deserialize)]
struct AskReply {
    #[serde(default)]
    answer: Option<Value>,
}

/// Whatever the ingestion endpoint chose to report on success.
///
/// Nothing here is required; the coordinator only relies on the status code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub processing_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthReply {
    #[serde(default)]
    status: Option<String>,
}

/// Reads a string description out of a JSON error body.
///
/// Bodies that are not JSON objects, lack the field, or carry a non-string or
/// blank value all yield `None`.
pub fn error_description(body: &[u8], field: &str) -> Option<String> {
    let value = serde_json::from_slice::<Value>(body).ok()?;
    let description = value.as_object()?.get(field)?.as_str()?;
    if description.trim().is_empty() {
        return None;
    }
    Some(description.to_string())
}

pub fn decode_answer(status: StatusCode, body: &[u8]) -> ServiceResult<String> {
    if !status.is_success() {
        return RejectedSnafu {
            stage: "decode-ask-status",
            status: status.as_u16(),
            description: error_description(body, ASK_ERROR_FIELD),
        }
        .fail();
    }

    let reply = match serde_json::from_slice::<AskReply>(body) {
        Ok(reply) => reply,
        Err(error) => {
            return InvalidResponseSnafu {
                stage: "decode-ask-json",
                details: error.to_string(),
            }
            .fail();
        }
    };

    match reply.answer {
        Some(Value::String(answer)) if !answer.is_empty() => Ok(answer),
        Some(_) => InvalidResponseSnafu {
            stage: "decode-ask-answer",
            details: "answer field is empty or not a string".to_string(),
        }
        .fail(),
        None => InvalidResponseSnafu {
            stage: "decode-ask-answer",
            details: "answer field is missing".to_string(),
        }
        .fail(),
    }
}

pub fn decode_upload(status: StatusCode, body: &[u8]) -> ServiceResult<UploadReceipt> {
    if !status.is_success() {
        return RejectedSnafu {
            stage: "decode-upload-status",
            status: status.as_u16(),
            description: error_description(body, UPLOAD_ERROR_FIELD),
        }
        .fail();
    }

    // A 2xx is the acknowledgement; an unreadable body only loses the receipt details.
    Ok(serde_json::from_slice::<UploadReceipt>(body).unwrap_or_default())
}

pub fn decode_health(status: StatusCode, body: &[u8]) -> bool {
    status.is_success()
        && serde_json::from_slice::<HealthReply>(body)
            .ok()
            .and_then(|reply| reply.status)
            .is_some_and(|status| status == "healthy")
}
