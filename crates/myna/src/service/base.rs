use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::errors::ServiceResult;
use crate::models::event::RunEvent;
use crate::models::message::{Role, ThreadMessage};
use crate::models::run::Run;
use crate::models::thread::Thread;

/// A live subscription to a streaming run. Each item is either a decoded
/// event or the failure that ended the subscription; dropping the stream
/// tears the underlying connection down.
pub type RunEventStream = BoxStream<'static, ServiceResult<RunEvent>>;

/// Settings for registering an assistant with the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAssistant {
    pub model: String,
    pub instructions: String,
    /// When set, the assistant gets a `file_search` tool wired to this
    /// vector store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_store_id: Option<String>,
}

/// An assistant registered with the remote service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub model: String,
}

/// The remote assistants service, reduced to the primitives the relay
/// needs: assistants, threads, messages and runs.
///
/// The relay only ever talks to this trait, so tests swap in a scripted
/// transport and other hosted backends can slot in behind it.
#[async_trait]
pub trait AssistantService: Send + Sync {
    /// Register a new assistant and return its service-issued identity.
    async fn create_assistant(&self, req: NewAssistant) -> ServiceResult<Assistant>;

    /// Create an empty conversation thread.
    async fn create_thread(&self) -> ServiceResult<Thread>;

    /// Append a message to a thread.
    async fn add_message(&self, thread_id: &str, role: Role, content: &str) -> ServiceResult<()>;

    /// Start a run over a thread without subscribing to its events.
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> ServiceResult<Run>;

    /// Fetch the current state of a run.
    async fn get_run(&self, thread_id: &str, run_id: &str) -> ServiceResult<Run>;

    /// List a thread's messages, newest first.
    async fn list_messages(&self, thread_id: &str) -> ServiceResult<Vec<ThreadMessage>>;

    /// Start a run and subscribe to its event feed.
    async fn stream_run(&self, thread_id: &str, assistant_id: &str)
        -> ServiceResult<RunEventStream>;
}
