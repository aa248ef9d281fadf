use futures::future::BoxFuture;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, StatusCode};
use snafu::ResultExt;

use super::error::{BuildClientSnafu, BuildRequestSnafu, ReadBodySnafu, ServiceResult, TransportSnafu};
use super::wire::{UploadReceipt, decode_answer, decode_health, decode_upload};
use super::{DocumentService, UploadRequest};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// Multipart field the ingestion endpoint reads the file from.
pub const UPLOAD_FIELD_NAME: &str = "file";

#[derive(Debug, Clone)]
pub struct HttpDocumentService {
    client: Client,
    base_url: String,
}

impl HttpDocumentService {
    pub fn new(base_url: impl Into<String>) -> ServiceResult<Self> {
        let client = Client::builder().build().context(BuildClientSnafu {
            stage: "http-service-new",
        })?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_body(response: Response, stage: &'static str) -> ServiceResult<(StatusCode, Vec<u8>)> {
        let status = response.status();
        let body = response.bytes().await.context(ReadBodySnafu { stage })?;
        Ok((status, body.to_vec()))
    }

    async fn post_question(&self, question: &str) -> ServiceResult<String> {
        let url = self.endpoint("/ask/");
        tracing::debug!(url = %url, question_len = question.len(), "sending question");

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .form(&[("question", question)])
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-ask-request",
            })?;

        let (status, body) = Self::read_body(response, "read-ask-response").await?;
        tracing::debug!(status = status.as_u16(), body_len = body.len(), "ask response received");
        decode_answer(status, &body)
    }

    async fn post_upload(&self, request: UploadRequest) -> ServiceResult<UploadReceipt> {
        let url = self.endpoint("/upload/");
        let length = request.bytes.len() as u64;
        tracing::debug!(
            url = %url,
            file_name = %request.file_name,
            size_bytes = length,
            "sending upload"
        );

        let mut part = Part::stream_with_length(Body::from(request.bytes), length)
            .file_name(request.file_name);
        if !request.mime_type.trim().is_empty() {
            part = part.mime_str(&request.mime_type).context(BuildRequestSnafu {
                stage: "build-upload-part",
            })?;
        }
        let form = Form::new().part(UPLOAD_FIELD_NAME, part);

        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-upload-request",
            })?;

        let (status, body) = Self::read_body(response, "read-upload-response").await?;
        tracing::debug!(status = status.as_u16(), body_len = body.len(), "upload response received");
        decode_upload(status, &body)
    }

    async fn get_health(&self) -> ServiceResult<bool> {
        let response = self
            .client
            .get(self.endpoint("/health"))
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-health-request",
            })?;
        let (status, body) = Self::read_body(response, "read-health-response").await?;
        Ok(decode_health(status, &body))
    }
}

impl DocumentService for HttpDocumentService {
    fn ask<'a>(&'a self, question: &'a str) -> BoxFuture<'a, ServiceResult<String>> {
        Box::pin(self.post_question(question))
    }

    fn upload<'a>(&'a self, request: UploadRequest) -> BoxFuture<'a, ServiceResult<UploadReceipt>> {
        Box::pin(self.post_upload(request))
    }

    fn health<'a>(&'a self) -> BoxFuture<'a, ServiceResult<bool>> {
        Box::pin(self.get_health())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use mockito::{Matcher, Server};

    use super::*;

    fn service(base_url: &str) -> HttpDocumentService {
        let client = Client::builder().no_proxy().build().unwrap();
        HttpDocumentService::with_client(client, base_url)
    }

    #[test]
    fn base_url_is_normalized() {
        let service = service(" http://localhost:8000/ ");
        assert_eq!(service.base_url(), "http://localhost:8000");
        assert_eq!(service.endpoint("/ask/"), "http://localhost:8000/ask/");
    }

    #[tokio::test]
    async fn ask_posts_form_encoded_question() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/ask/")
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body("question=What+is+the+capital+of+France%3F")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status":"success","answer":"Paris"}"#)
            .create_async()
            .await;

        let answer = service(&format!("{}/", server.url()))
            .ask("What is the capital of France?")
            .await
            .unwrap();
        assert_eq!(answer, "Paris");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ask_surfaces_service_detail() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/ask/")
            .with_status(504)
            .with_body(r#"{"detail":"Processing timeout"}"#)
            .create_async()
            .await;

        let error = service(&server.url()).ask("slow question").await.unwrap_err();
        assert_eq!(
            error.user_description("Failed to get AI response"),
            "Processing timeout"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_sends_file_under_fixed_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/")
            .match_header(
                "content-type",
                Matcher::Regex("^multipart/form-data; boundary=".to_string()),
            )
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="file"; filename="notes.txt""#.to_string()),
                Matcher::Regex("hello world".to_string()),
            ]))
            .with_status(200)
            .with_body(r#"{"status":"success","filename":"notes.txt"}"#)
            .create_async()
            .await;

        let request = UploadRequest::new("notes.txt", "text/plain", Bytes::from_static(b"hello world"));
        let receipt = service(&server.url()).upload(request).await.unwrap();
        assert_eq!(receipt.filename.as_deref(), Some("notes.txt"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upload_rejection_reads_error_field() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/")
            .with_status(400)
            .with_body(r#"{"error":"Unsupported file type"}"#)
            .create_async()
            .await;

        let request = UploadRequest::new("image.png", "image/png", Bytes::from_static(b"\x89PNG"));
        let error = service(&server.url()).upload(request).await.unwrap_err();
        assert_eq!(error.user_description("Upload failed"), "Unsupported file type");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn health_reports_healthy_service() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body(r#"{"status":"healthy"}"#)
            .create_async()
            .await;

        assert!(service(&server.url()).health().await.unwrap());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unreachable_service_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let error = service(&format!("http://{address}"))
            .ask("anyone there?")
            .await
            .unwrap_err();
        assert!(matches!(error, crate::ServiceError::Transport { .. }));
        assert!(!error.user_description("fallback").is_empty());
    }
}
