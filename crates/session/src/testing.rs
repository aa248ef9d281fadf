use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docchat_service::{
    DocumentService, HttpDocumentService, ServiceError, ServiceResult, UploadReceipt,
    UploadRequest,
};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::ids::SequentialIds;
use crate::session::{Session, SessionOptions};

enum Script<T> {
    Ready(ServiceResult<T>),
    Gated(oneshot::Receiver<ServiceResult<T>>),
    Hang,
    Panic,
}

impl<T> Script<T> {
    async fn resolve(self) -> ServiceResult<T> {
        match self {
            Self::Ready(result) => result,
            Self::Gated(receiver) => match receiver.await {
                Ok(result) => result,
                Err(_) => Err(ServiceError::InvalidResponse {
                    stage: "scripted-gate-dropped",
                    details: "gate sender dropped".to_string(),
                }),
            },
            Self::Hang => futures::future::pending().await,
            Self::Panic => panic!("scripted service failure"),
        }
    }
}

/// Counts requests whose future was dropped before producing a result.
struct AbandonGuard<'a> {
    abandoned: &'a AtomicUsize,
    finished: bool,
}

impl Drop for AbandonGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.abandoned.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// In-memory service answering from per-question and per-file scripts.
///
/// Unscripted questions are answered with `answer: <question>` and unscripted
/// uploads are acknowledged.
pub(crate) struct ScriptedService {
    ask_scripts: Mutex<HashMap<String, Script<String>>>,
    upload_scripts: Mutex<HashMap<String, Script<UploadReceipt>>>,
    asked: Mutex<Vec<String>>,
    uploads: Mutex<Vec<UploadRequest>>,
    abandoned: AtomicUsize,
    healthy: AtomicBool,
}

impl Default for ScriptedService {
    fn default() -> Self {
        Self {
            ask_scripts: Mutex::new(HashMap::new()),
            upload_scripts: Mutex::new(HashMap::new()),
            asked: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            abandoned: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
        }
    }
}

impl ScriptedService {
    pub(crate) fn reply_to(&self, question: &str, result: ServiceResult<String>) {
        self.ask_scripts
            .lock()
            .insert(question.to_string(), Script::Ready(result));
    }

    pub(crate) fn gate_ask(&self, question: &str) -> oneshot::Sender<ServiceResult<String>> {
        let (sender, receiver) = oneshot::channel();
        self.ask_scripts
            .lock()
            .insert(question.to_string(), Script::Gated(receiver));
        sender
    }

    pub(crate) fn hang_ask(&self, question: &str) {
        self.ask_scripts
            .lock()
            .insert(question.to_string(), Script::Hang);
    }

    pub(crate) fn panic_on_ask(&self, question: &str) {
        self.ask_scripts
            .lock()
            .insert(question.to_string(), Script::Panic);
    }

    pub(crate) fn reply_to_upload(&self, file_name: &str, result: ServiceResult<UploadReceipt>) {
        self.upload_scripts
            .lock()
            .insert(file_name.to_string(), Script::Ready(result));
    }

    pub(crate) fn gate_upload(
        &self,
        file_name: &str,
    ) -> oneshot::Sender<ServiceResult<UploadReceipt>> {
        let (sender, receiver) = oneshot::channel();
        self.upload_scripts
            .lock()
            .insert(file_name.to_string(), Script::Gated(receiver));
        sender
    }

    pub(crate) fn panic_on_upload(&self, file_name: &str) {
        self.upload_scripts
            .lock()
            .insert(file_name.to_string(), Script::Panic);
    }

    pub(crate) fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub(crate) fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    pub(crate) fn uploaded(&self) -> Vec<String> {
        self.uploads
            .lock()
            .iter()
            .map(|request| request.file_name.clone())
            .collect()
    }

    pub(crate) fn upload_requests(&self) -> Vec<UploadRequest> {
        self.uploads.lock().clone()
    }

    pub(crate) fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

impl DocumentService for ScriptedService {
    fn ask<'a>(&'a self, question: &'a str) -> BoxFuture<'a, ServiceResult<String>> {
        self.asked.lock().push(question.to_string());
        let script = self.ask_scripts.lock().remove(question);

        Box::pin(async move {
            let mut guard = AbandonGuard {
                abandoned: &self.abandoned,
                finished: false,
            };
            let result = match script {
                Some(script) => script.resolve().await,
                None => Ok(format!("answer: {question}")),
            };
            guard.finished = true;
            result
        })
    }

    fn upload<'a>(&'a self, request: UploadRequest) -> BoxFuture<'a, ServiceResult<UploadReceipt>> {
        let script = self.upload_scripts.lock().remove(&request.file_name);
        self.uploads.lock().push(request);

        Box::pin(async move {
            let mut guard = AbandonGuard {
                abandoned: &self.abandoned,
                finished: false,
            };
            let result = match script {
                Some(script) => script.resolve().await,
                None => Ok(UploadReceipt::default()),
            };
            guard.finished = true;
            result
        })
    }

    fn health<'a>(&'a self) -> BoxFuture<'a, ServiceResult<bool>> {
        let healthy = self.healthy.load(Ordering::SeqCst);
        Box::pin(async move { Ok(healthy) })
    }
}

/// Options without a greeting so timelines start empty.
pub(crate) fn quiet_options() -> SessionOptions {
    SessionOptions::default().with_greeting(None)
}

pub(crate) fn session_with(options: SessionOptions) -> (Arc<ScriptedService>, Session) {
    let service = Arc::new(ScriptedService::default());
    let session = Session::with_id_issuer(
        service.clone(),
        Arc::new(SequentialIds::new()),
        options,
    );
    (service, session)
}

/// Session whose HTTP service points at a port nothing listens on.
pub(crate) fn unreachable_session(options: SessionOptions) -> Session {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let service = HttpDocumentService::with_client(client, format!("http://{address}"));
    Session::new(Arc::new(service), options)
}
