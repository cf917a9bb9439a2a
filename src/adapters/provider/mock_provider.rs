//! Mock generation provider for testing.
//!
//! Responses are consumed in order; once the queue is empty every call
//! succeeds with a sequential `task-N` id. A shared barrier can hold each call
//! until a given number of callers have arrived, which lets tests line up
//! concurrent admissions deterministically.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Barrier;

use crate::domain::foundation::TaskId;
use crate::domain::generation::GenerationRequest;
use crate::ports::{DispatchReceipt, GenerationProvider, ProviderError};

#[derive(Debug, Clone, Default)]
pub struct MockGenerationProvider {
    responses: Arc<Mutex<VecDeque<Result<DispatchReceipt, ProviderError>>>>,
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
    delay: Duration,
    barrier: Option<Arc<Barrier>>,
}

impl MockGenerationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues an accepted dispatch with the given task id.
    pub fn with_task_id(self, task_id: &str) -> Self {
        let receipt = match TaskId::new(task_id) {
            Ok(id) => Ok(DispatchReceipt::new(
                id,
                json!({ "task_id": task_id, "status": "queued" }),
            )),
            Err(e) => Err(ProviderError::MalformedResponse(e.to_string())),
        };
        self.push(receipt);
        self
    }

    /// Queues a failed dispatch.
    pub fn with_error(self, error: ProviderError) -> Self {
        self.push(Err(error));
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Holds every call until `parties` calls are waiting.
    pub fn with_barrier(mut self, parties: usize) -> Self {
        self.barrier = Some(Arc::new(Barrier::new(parties)));
        self
    }

    /// Number of dispatches received.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Requests received, in arrival order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, response: Result<DispatchReceipt, ProviderError>) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchReceipt, ProviderError> {
        let call_number = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(request.clone());
            calls.len()
        };

        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let scripted = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match scripted {
            Some(response) => response,
            None => {
                let id = format!("task-{}", call_number);
                let task_id = TaskId::new(&id)
                    .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
                Ok(DispatchReceipt::new(task_id, json!({ "task_id": id })))
            }
        }
    }
}
