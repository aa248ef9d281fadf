use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use docchat_service::UploadRequest;
use snafu::{OptionExt, ResultExt};

use super::error::{FileMetadataSnafu, MissingFileNameSnafu, ReadFileSnafu, SessionResult};
use super::ids::DocumentId;

pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// A file handle as captured at selection time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Milliseconds since the Unix epoch.
    pub last_modified_ms: u64,
    pub bytes: Bytes,
}

impl LocalFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        last_modified_ms: u64,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            last_modified_ms,
            bytes,
        }
    }

    /// Reads a file from disk, guessing its mime type from the extension.
    pub async fn from_path(path: &Path) -> SessionResult<Self> {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .context(MissingFileNameSnafu {
                stage: "capture-file-name",
                path: path.to_path_buf(),
            })?;

        let metadata = tokio::fs::metadata(path).await.context(FileMetadataSnafu {
            stage: "capture-file-metadata",
            path: path.to_path_buf(),
        })?;
        let last_modified_ms = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);

        let contents = tokio::fs::read(path).await.context(ReadFileSnafu {
            stage: "capture-file-contents",
            path: path.to_path_buf(),
        })?;

        Ok(Self {
            mime_type: guess_mime_type(&name),
            size_bytes: metadata.len(),
            last_modified_ms,
            bytes: Bytes::from(contents),
            name,
        })
    }

    pub fn to_upload_request(&self) -> UploadRequest {
        UploadRequest::new(self.name.clone(), self.mime_type.clone(), self.bytes.clone())
    }
}

/// Guess MIME type from filename extension.
pub fn guess_mime_type(file_name: &str) -> String {
    let Some((_, extension)) = file_name.rsplit_once('.') else {
        return FALLBACK_MIME_TYPE.to_string();
    };

    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "json" => "application/json",
        "html" | "htm" => "text/html",
        "xml" => "application/xml",
        "rtf" => "application/rtf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        _ => FALLBACK_MIME_TYPE,
    }
    .to_string()
}

/// A document the service has acknowledged; never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub last_modified_ms: u64,
}

impl DocumentRecord {
    pub fn from_local_file(id: DocumentId, file: &LocalFile) -> Self {
        Self {
            id,
            name: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size_bytes,
            last_modified_ms: file.last_modified_ms,
        }
    }

    pub fn last_modified(&self) -> SystemTime {
        UNIX_EPOCH + std::time::Duration::from_millis(self.last_modified_ms)
    }
}

/// Documents acknowledged this session, in acknowledgement order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRegistry {
    documents: Vec<DocumentRecord>,
}

impl DocumentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, record: DocumentRecord) {
        debug_assert!(self.get(record.id).is_none(), "document id {} reused", record.id);
        self.documents.push(record);
    }

    /// Removes `id` if present; absent ids leave the registry untouched.
    pub fn remove(&mut self, id: DocumentId) -> Option<DocumentRecord> {
        let index = self.documents.iter().position(|record| record.id == id)?;
        Some(self.documents.remove(index))
    }

    pub fn get(&self, id: DocumentId) -> Option<&DocumentRecord> {
        self.documents.iter().find(|record| record.id == id)
    }

    pub fn documents(&self) -> &[DocumentRecord] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
