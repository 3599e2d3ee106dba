use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::time::{sleep, Instant};

use crate::errors::{ServiceError, ServiceResult};
use crate::models::event::{RelayEvent, RunEvent};
use crate::models::message::{Role, ThreadMessage};
use crate::models::run::RunStatus;
use crate::models::thread::ThreadRecord;
use crate::service::base::AssistantService;
use crate::store::ThreadStore;

/// How `complete` waits on a run: a doubling poll interval bounded by a
/// cap, under an overall deadline.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Relays chat turns into the hosted assistants service.
///
/// The relay owns no conversation state beyond the injected thread
/// registry; transcripts, run lifecycle and tool wiring all live on the
/// remote side. Cloning is cheap and every clone shares the registry.
#[derive(Clone)]
pub struct RelayService {
    service: Arc<dyn AssistantService>,
    threads: Arc<dyn ThreadStore>,
    assistant_id: String,
    poll: PollPolicy,
}

impl RelayService {
    pub fn new(
        service: Arc<dyn AssistantService>,
        threads: Arc<dyn ThreadStore>,
        assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            service,
            threads,
            assistant_id: assistant_id.into(),
            poll: PollPolicy::default(),
        }
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    /// Create and register a fresh remote thread, returning its id.
    pub async fn create_thread(&self) -> ServiceResult<String> {
        let thread = self.service.create_thread().await?;
        self.threads.insert(ThreadRecord::new(thread.id.as_str()));
        Ok(thread.id)
    }

    /// Return the caller's thread when the registry knows it, otherwise
    /// mint a fresh one. An id this process never handed out gets the
    /// same treatment as no id at all.
    pub async fn resolve_or_create(&self, thread_id: Option<&str>) -> ServiceResult<String> {
        if let Some(id) = thread_id {
            if self.threads.contains(id) {
                return Ok(id.to_string());
            }
        }
        self.create_thread().await
    }

    /// Stream one chat turn as relay frames.
    ///
    /// The stream yields zero or more `content` frames followed by
    /// exactly one terminal frame; every failure along the way becomes
    /// that terminal `error` frame rather than a stream error. Nothing
    /// is sent upstream until the stream is first polled, and dropping
    /// it tears down the run subscription.
    pub fn stream(
        &self,
        message: String,
        thread_id: Option<String>,
    ) -> BoxStream<'static, RelayEvent> {
        let relay = self.clone();
        Box::pin(stream! {
            let thread_id = match relay.resolve_or_create(thread_id.as_deref()).await {
                Ok(id) => id,
                Err(err) => {
                    yield RelayEvent::error(err.to_string(), None);
                    return;
                }
            };

            if let Err(err) = relay
                .service
                .add_message(&thread_id, Role::User, &message)
                .await
            {
                yield RelayEvent::error(err.to_string(), Some(thread_id));
                return;
            }

            let mut events = match relay
                .service
                .stream_run(&thread_id, &relay.assistant_id)
                .await
            {
                Ok(events) => events,
                Err(err) => {
                    yield RelayEvent::error(err.to_string(), Some(thread_id));
                    return;
                }
            };

            while let Some(event) = events.next().await {
                match event {
                    Ok(RunEvent::MessageDelta { text }) => {
                        yield RelayEvent::content(text, thread_id.clone());
                    }
                    Ok(RunEvent::Completed) => {
                        yield RelayEvent::done(thread_id);
                        return;
                    }
                    Ok(RunEvent::Failed { message }) => {
                        yield RelayEvent::error(message, Some(thread_id));
                        return;
                    }
                    Ok(RunEvent::RequiresAction) => {
                        yield RelayEvent::action_required(thread_id);
                        return;
                    }
                    Err(err) => {
                        yield RelayEvent::error(err.to_string(), Some(thread_id));
                        return;
                    }
                }
            }

            // The feed closed without a terminal event. The consumer is
            // still owed exactly one terminal frame.
            yield RelayEvent::error(
                "run stream ended before the run finished".to_string(),
                Some(thread_id),
            );
        })
    }

    /// Run one chat turn to completion, polling the run until it reaches
    /// a terminal status.
    ///
    /// This never fails outward: remote errors and poll timeouts come
    /// back as the reply text, prefixed with `Error: `. The returned id
    /// is the resolved thread when resolution succeeded, otherwise
    /// whatever the caller passed in.
    pub async fn complete(
        &self,
        message: &str,
        thread_id: Option<String>,
    ) -> (String, Option<String>) {
        let resolved = match self.resolve_or_create(thread_id.as_deref()).await {
            Ok(id) => id,
            Err(err) => return (format!("Error: {err}"), thread_id),
        };

        if let Err(err) = self.service.add_message(&resolved, Role::User, message).await {
            return (format!("Error: {err}"), Some(resolved));
        }

        let mut run = match self.service.create_run(&resolved, &self.assistant_id).await {
            Ok(run) => run,
            Err(err) => return (format!("Error: {err}"), Some(resolved)),
        };

        let started = Instant::now();
        let mut interval = self.poll.initial_interval;
        while !run.status.is_terminal() {
            if started.elapsed() >= self.poll.timeout {
                let err = ServiceError::RunTimeout {
                    run_id: run.id,
                    timeout: self.poll.timeout,
                };
                return (format!("Error: {err}"), Some(resolved));
            }
            sleep(interval).await;
            interval = (interval * 2).min(self.poll.max_interval);
            run = match self.service.get_run(&resolved, &run.id).await {
                Ok(run) => run,
                Err(err) => return (format!("Error: {err}"), Some(resolved)),
            };
        }

        let text = match run.status {
            RunStatus::Completed => match self.service.list_messages(&resolved).await {
                Ok(messages) => latest_assistant_text(&messages)
                    .unwrap_or_else(|| "No response generated".to_string()),
                Err(err) => format!("Error: {err}"),
            },
            RunStatus::RequiresAction => {
                "Assistant requires action (tool calls needed)".to_string()
            }
            status => format!("Run failed with status: {status}"),
        };

        (text, Some(resolved))
    }
}

/// Concatenated text of the newest assistant message. The service lists
/// messages newest first, so the first assistant entry is the reply to
/// the run that just finished.
fn latest_assistant_text(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .find(|message| message.role == Role::Assistant)
        .map(ThreadMessage::text)
}
