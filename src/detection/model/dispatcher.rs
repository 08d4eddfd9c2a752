//! Background inference dispatcher
//!
//! A worker task owns the model. Callers send plain-data requests tagged
//! with a correlation id; the worker answers through a pending-request
//! table keyed by that id. Each response echoes the chunk offset, and a
//! response whose offset did not survive the round trip is rejected.

use super::{NerModel, TokenPrediction};
use crate::domain::InferenceError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<InferenceResponse>>>>;

/// Blocking model loader run on the blocking thread pool
pub type ModelLoader =
    Box<dyn FnOnce() -> Result<Arc<dyn NerModel>, InferenceError> + Send + 'static>;

#[derive(Debug)]
struct InferenceRequest {
    id: u64,
    offset: usize,
    text: String,
}

#[derive(Debug)]
struct InferenceResponse {
    id: u64,
    offset: usize,
    result: Result<Vec<TokenPrediction>, InferenceError>,
}

/// Removes an abandoned request (timeout, cancellation) from the table
struct PendingGuard {
    pending: PendingTable,
    id: u64,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.pending).remove(&self.id);
    }
}

fn lock(
    pending: &PendingTable,
) -> std::sync::MutexGuard<'_, HashMap<u64, oneshot::Sender<InferenceResponse>>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// Client handle to the inference worker
pub struct InferenceDispatcher {
    requests: mpsc::Sender<InferenceRequest>,
    pending: PendingTable,
    next_id: AtomicU64,
    model_name: String,
    worker: JoinHandle<()>,
}

impl InferenceDispatcher {
    /// Start a worker around an already loaded model
    pub fn spawn(model: Arc<dyn NerModel>, queue_depth: usize) -> Self {
        let name = model.name().to_string();
        let loader: ModelLoader = Box::new(move || Ok(model));
        Self::start(name, queue_depth, loader)
    }

    /// Start a worker that first loads its model on the blocking pool
    ///
    /// Requests queue up while loading. If loading fails every request is
    /// answered with the load error.
    pub fn spawn_with_loader(name: impl Into<String>, queue_depth: usize, loader: ModelLoader) -> Self {
        Self::start(name.into(), queue_depth, loader)
    }

    fn start(model_name: String, queue_depth: usize, loader: ModelLoader) -> Self {
        let (requests_tx, requests_rx) = mpsc::channel(queue_depth.max(1));
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let worker = tokio::spawn(run_worker(loader, requests_rx, Arc::clone(&pending)));

        Self {
            requests: requests_tx,
            pending,
            next_id: AtomicU64::new(1),
            model_name,
            worker,
        }
    }

    /// Name of the dispatched model
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Number of requests awaiting a response
    pub fn pending_requests(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Run the model on one chunk
    ///
    /// `offset` is the chunk's start in the document; it travels with the
    /// request and must come back unchanged.
    pub async fn infer(
        &self,
        offset: usize,
        text: &str,
    ) -> Result<Vec<TokenPrediction>, InferenceError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id, tx);
        let _guard = PendingGuard {
            pending: Arc::clone(&self.pending),
            id,
        };

        let request = InferenceRequest {
            id,
            offset,
            text: text.to_string(),
        };
        self.requests.send(request).await.map_err(|_| {
            InferenceError::WorkerUnavailable("inference worker has shut down".to_string())
        })?;

        let response = rx.await.map_err(|_| {
            InferenceError::WorkerUnavailable("inference worker dropped the request".to_string())
        })?;

        if response.id != id || response.offset != offset {
            tracing::error!(
                request_id = id,
                response_id = response.id,
                expected_offset = offset,
                received_offset = response.offset,
                "Inference response does not match its request"
            );
            return Err(InferenceError::Other(format!(
                "response offset {} does not match request offset {offset}",
                response.offset
            )));
        }

        response.result
    }

    /// Stop accepting requests and wait for the worker to finish
    pub async fn shutdown(self) {
        drop(self.requests);
        if let Err(e) = self.worker.await {
            tracing::warn!(error = %e, "Inference worker ended abnormally");
        }
    }
}

async fn run_worker(
    loader: ModelLoader,
    mut requests: mpsc::Receiver<InferenceRequest>,
    pending: PendingTable,
) {
    let model = match tokio::task::spawn_blocking(loader).await {
        Ok(Ok(model)) => {
            tracing::info!(model = model.name(), "Inference model loaded");
            Ok(model)
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Inference model failed to load");
            Err(e)
        }
        Err(e) => {
            tracing::error!(error = %e, "Inference model loader panicked");
            Err(InferenceError::ModelNotFound(format!("model loader failed: {e}")))
        }
    };

    let (responses_tx, mut responses) = mpsc::unbounded_channel::<InferenceResponse>();
    let mut accepting = true;
    let mut in_flight = 0usize;

    loop {
        tokio::select! {
            request = requests.recv(), if accepting => match request {
                Some(request) => match &model {
                    Ok(model) => {
                        in_flight += 1;
                        let model = Arc::clone(model);
                        let responses_tx = responses_tx.clone();
                        tokio::spawn(async move {
                            let result = model.predict(&request.text).await;
                            let _ = responses_tx.send(InferenceResponse {
                                id: request.id,
                                offset: request.offset,
                                result,
                            });
                        });
                    }
                    Err(e) => resolve(
                        &pending,
                        InferenceResponse {
                            id: request.id,
                            offset: request.offset,
                            result: Err(e.clone()),
                        },
                    ),
                },
                None => accepting = false,
            },
            Some(response) = responses.recv(), if in_flight > 0 => {
                in_flight -= 1;
                resolve(&pending, response);
            }
            else => break,
        }

        if !accepting && in_flight == 0 {
            break;
        }
    }

    tracing::debug!("Inference worker stopped");
}

fn resolve(pending: &PendingTable, response: InferenceResponse) {
    let waiter = lock(pending).remove(&response.id);
    match waiter {
        Some(tx) => {
            let _ = tx.send(response);
        }
        None => tracing::debug!(
            request_id = response.id,
            "Dropping response for an abandoned request"
        ),
    }
}
