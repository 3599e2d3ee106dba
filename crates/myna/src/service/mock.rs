use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;

use crate::errors::{ServiceError, ServiceResult};
use crate::models::event::RunEvent;
use crate::models::message::{Role, ThreadMessage};
use crate::models::run::{Run, RunStatus};
use crate::models::thread::Thread;
use crate::service::base::{Assistant, AssistantService, NewAssistant, RunEventStream};

/// A scripted assistants service for exercising the relay without HTTP.
///
/// Run statuses are consumed front to back, with the last one repeating
/// forever, so `vec![InProgress]` models a run that never finishes.
/// Stream events are handed out once, to the first subscription.
#[derive(Default)]
pub struct MockAssistantService {
    thread_counter: AtomicUsize,
    statuses: Mutex<Vec<RunStatus>>,
    replies: Mutex<Vec<ThreadMessage>>,
    events: Mutex<Vec<ServiceResult<RunEvent>>>,
    thread_error: Mutex<Option<ServiceError>>,
    run_error: Mutex<Option<ServiceError>>,
    /// Every (thread_id, content) pair handed to `add_message`.
    pub added_messages: Mutex<Vec<(String, String)>>,
}

impl MockAssistantService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Statuses returned by `create_run` and then successive `get_run`s.
    pub fn with_statuses(self, statuses: Vec<RunStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses;
        self
    }

    /// Messages returned by `list_messages`, newest first.
    pub fn with_replies(self, replies: Vec<ThreadMessage>) -> Self {
        *self.replies.lock().unwrap() = replies;
        self
    }

    /// Events replayed by the first `stream_run` subscription.
    pub fn with_events(self, events: Vec<ServiceResult<RunEvent>>) -> Self {
        *self.events.lock().unwrap() = events;
        self
    }

    /// Make `create_thread` fail once with this error.
    pub fn with_thread_error(self, error: ServiceError) -> Self {
        *self.thread_error.lock().unwrap() = Some(error);
        self
    }

    /// Make `create_run` and `stream_run` fail once with this error.
    pub fn with_run_error(self, error: ServiceError) -> Self {
        *self.run_error.lock().unwrap() = Some(error);
        self
    }

    fn next_status(&self) -> RunStatus {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.remove(0)
        } else {
            statuses.first().copied().unwrap_or(RunStatus::Completed)
        }
    }
}

#[async_trait]
impl AssistantService for MockAssistantService {
    async fn create_assistant(&self, req: NewAssistant) -> ServiceResult<Assistant> {
        Ok(Assistant {
            id: "asst_mock".to_string(),
            model: req.model,
        })
    }

    async fn create_thread(&self) -> ServiceResult<Thread> {
        if let Some(error) = self.thread_error.lock().unwrap().take() {
            return Err(error);
        }
        let n = self.thread_counter.fetch_add(1, Ordering::SeqCst);
        Ok(Thread {
            id: format!("thread_{n}"),
            created_at: 0,
        })
    }

    async fn add_message(&self, thread_id: &str, _role: Role, content: &str) -> ServiceResult<()> {
        self.added_messages
            .lock()
            .unwrap()
            .push((thread_id.to_string(), content.to_string()));
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str, _assistant_id: &str) -> ServiceResult<Run> {
        if let Some(error) = self.run_error.lock().unwrap().take() {
            return Err(error);
        }
        Ok(Run {
            id: "run_mock".to_string(),
            status: self.next_status(),
            last_error: None,
        })
    }

    async fn get_run(&self, _thread_id: &str, run_id: &str) -> ServiceResult<Run> {
        Ok(Run {
            id: run_id.to_string(),
            status: self.next_status(),
            last_error: None,
        })
    }

    async fn list_messages(&self, _thread_id: &str) -> ServiceResult<Vec<ThreadMessage>> {
        Ok(self.replies.lock().unwrap().clone())
    }

    async fn stream_run(
        &self,
        _thread_id: &str,
        _assistant_id: &str,
    ) -> ServiceResult<RunEventStream> {
        if let Some(error) = self.run_error.lock().unwrap().take() {
            return Err(error);
        }
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        Ok(futures::stream::iter(events).boxed())
    }
}
