use async_trait::async_trait;
use siga_lib::modules::import_jobs::{ImportApi, JobStatus, ProcessId, UploadFile};
use siga_lib::shared::ApiError;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One scripted poll response, optionally held back until a gate opens.
pub enum PollStep {
    Respond(Result<JobStatus, ApiError>),
    Gated(Arc<Notify>, Result<JobStatus, ApiError>),
}

/// Import API fake that replays scripted responses and records calls.
///
/// Once the poll script is exhausted every further poll reports the job as
/// still running at `idle_progress`.
pub struct ScriptedImportApi {
    upload_result: Mutex<Option<Result<ProcessId, ApiError>>>,
    upload_gate: Option<Arc<Notify>>,
    polls: Mutex<VecDeque<PollStep>>,
    idle_progress: u8,
    upload_calls: AtomicUsize,
    poll_calls: AtomicUsize,
    cancelled: Mutex<Vec<String>>,
}

impl ScriptedImportApi {
    pub fn accepting(process_id: &str) -> Self {
        Self {
            upload_result: Mutex::new(Some(Ok(ProcessId::parse(process_id).unwrap()))),
            upload_gate: None,
            polls: Mutex::new(VecDeque::new()),
            idle_progress: 0,
            upload_calls: AtomicUsize::new(0),
            poll_calls: AtomicUsize::new(0),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting(error: ApiError) -> Self {
        let api = Self::accepting("unused");
        *api.upload_result.lock().unwrap() = Some(Err(error));
        api
    }

    pub fn with_upload_gate(mut self, gate: Arc<Notify>) -> Self {
        self.upload_gate = Some(gate);
        self
    }

    pub fn with_polls<I>(self, steps: I) -> Self
    where
        I: IntoIterator<Item = PollStep>,
    {
        self.polls.lock().unwrap().extend(steps);
        self
    }

    pub fn with_idle_progress(mut self, progress: u8) -> Self {
        self.idle_progress = progress;
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn poll_calls(&self) -> usize {
        self.poll_calls.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

pub fn ok(status: JobStatus) -> PollStep {
    PollStep::Respond(Ok(status))
}

pub fn err(error: ApiError) -> PollStep {
    PollStep::Respond(Err(error))
}

#[async_trait]
impl ImportApi for ScriptedImportApi {
    async fn upload(&self, _file: UploadFile) -> Result<ProcessId, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.upload_gate {
            gate.notified().await;
        }
        self.upload_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ApiError::Transport {
                message: "no upload scripted".to_string(),
            }))
    }

    async fn poll(&self, _process_id: &ProcessId) -> Result<JobStatus, ApiError> {
        self.poll_calls.fetch_add(1, Ordering::SeqCst);
        let step = self.polls.lock().unwrap().pop_front();
        match step {
            Some(PollStep::Respond(result)) => result,
            Some(PollStep::Gated(gate, result)) => {
                gate.notified().await;
                result
            }
            None => Ok(JobStatus::running(self.idle_progress)),
        }
    }

    async fn cancel(&self, process_id: &ProcessId) -> Result<(), ApiError> {
        self.cancelled
            .lock()
            .unwrap()
            .push(process_id.to_string());
        Ok(())
    }
}
