use std::path::{Path, PathBuf};

use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("path {path:?} has no file name on `{stage}`"))]
    MissingFileName { stage: &'static str, path: PathBuf },
    #[snafu(display("failed to read metadata of {path:?} on `{stage}`: {source}"))]
    FileMetadata {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to read {path:?} on `{stage}`: {source}"))]
    ReadFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;

impl SessionError {
    fn path(&self) -> &Path {
        match self {
            Self::MissingFileName { path, .. }
            | Self::FileMetadata { path, .. }
            | Self::ReadFile { path, .. } => path,
        }
    }

    /// File name to show for the failed file, or the whole path when it has none.
    pub fn file_label(&self) -> String {
        let path = self.path();
        path.file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    /// Reason suitable for the chat transcript.
    pub fn user_description(&self) -> String {
        match self {
            Self::MissingFileName { .. } => "not a file".to_string(),
            Self::FileMetadata { source, .. } | Self::ReadFile { source, .. } => source.to_string(),
        }
    }
}
