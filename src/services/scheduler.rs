use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};

use crate::models::{PredictionRequest, PredictionResult};
use crate::services::prediction::{PredictionError, PredictionTransport};

type Reply = Result<PredictionResult, PredictionError>;

struct Job {
    request: PredictionRequest,
    reply: oneshot::Sender<Reply>,
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<Job>,
    /// A drain task is running
    draining: bool,
}

struct Inner {
    transport: Arc<dyn PredictionTransport>,
    state: Mutex<QueueState>,
}

/// Serializes calls to an expensive transport.
///
/// Jobs run strictly in submission order with at most one in flight. The queue
/// is drained by a task that exists only while there is work; an idle
/// scheduler holds no task. Clones share the same queue.
#[derive(Clone)]
pub struct RequestScheduler {
    inner: Arc<Inner>,
}

/// Handle to a queued prediction. Dropping it abandons the slot; the worker
/// skips abandoned jobs instead of running them.
pub struct PendingPrediction {
    rx: oneshot::Receiver<Reply>,
}

impl PendingPrediction {
    pub async fn wait(self) -> Reply {
        self.rx.await.unwrap_or(Err(PredictionError::QueueClosed))
    }
}

impl RequestScheduler {
    pub fn new(transport: Arc<dyn PredictionTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// Append a job and start the drain task if the scheduler is idle
    pub async fn enqueue(&self, request: PredictionRequest) -> PendingPrediction {
        let (reply, rx) = oneshot::channel();

        let start_worker = {
            let mut state = self.inner.state.lock().await;
            state.jobs.push_back(Job { request, reply });
            !std::mem::replace(&mut state.draining, true)
        };

        if start_worker {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(inner.drain());
        }

        PendingPrediction { rx }
    }

    /// Jobs waiting to run, excluding the one in flight
    pub async fn queued(&self) -> usize {
        self.inner.state.lock().await.jobs.len()
    }
}

impl Inner {
    async fn drain(self: Arc<Self>) {
        loop {
            let job = {
                let mut state = self.state.lock().await;
                match state.jobs.pop_front() {
                    Some(job) => job,
                    None => {
                        state.draining = false;
                        return;
                    }
                }
            };

            if job.reply.is_closed() {
                tracing::debug!("Skipping abandoned prediction");
                continue;
            }

            // Run on its own task so a panicking transport cannot wedge the queue
            let transport = Arc::clone(&self.transport);
            let request = job.request;
            let result = tokio::spawn(async move { transport.predict(&request).await })
                .await
                .unwrap_or_else(|e| {
                    tracing::error!("Prediction task failed: {}", e);
                    Err(PredictionError::QueueClosed)
                });

            // The caller may have stopped waiting in the meantime
            let _ = job.reply.send(result);
        }
    }
}

#[async_trait]
impl PredictionTransport for RequestScheduler {
    fn name(&self) -> &'static str {
        "queued-spawn"
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictionError> {
        self.enqueue(request.clone()).await.wait().await
    }
}
