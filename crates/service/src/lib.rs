#![deny(unsafe_code)]

//! Client side of the document question-answering service.
//!
//! The service exposes three endpoints: `POST /ask/` answers a question about
//! the ingested documents, `POST /upload/` ingests one file, and `GET /health`
//! reports liveness. [`DocumentService`] is the seam the session coordinator
//! talks through; [`HttpDocumentService`] is the production implementation.

mod error;
mod http;
mod wire;

use bytes::Bytes;
use futures::future::BoxFuture;

pub use error::{INVALID_RESPONSE_FORMAT, ServiceError, ServiceResult};
pub use http::{DEFAULT_BASE_URL, HttpDocumentService, UPLOAD_FIELD_NAME};
pub use wire::{
    ASK_ERROR_FIELD, UPLOAD_ERROR_FIELD, UploadReceipt, decode_answer, decode_health,
    decode_upload, error_description,
};

/// One file as handed to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Bytes,
}

impl UploadRequest {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

pub trait DocumentService: Send + Sync {
    /// Returns the answer text for `question`.
    ///
    /// Dropping the returned future abandons the request.
    fn ask<'a>(&'a self, question: &'a str) -> BoxFuture<'a, ServiceResult<String>>;
    fn upload<'a>(&'a self, request: UploadRequest) -> BoxFuture<'a, ServiceResult<UploadReceipt>>;
    fn health<'a>(&'a self) -> BoxFuture<'a, ServiceResult<bool>>;
}
