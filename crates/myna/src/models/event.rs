use serde::{Deserialize, Serialize};

/// An incremental notification from a streaming run.
///
/// The client narrows the service's event feed down to these variants;
/// every other event type is dropped before it reaches the relay.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A fragment of the assistant's reply text.
    MessageDelta { text: String },
    /// The run finished and the reply has been fully streamed.
    Completed,
    /// The run failed; carries the service's last recorded error.
    Failed { message: String },
    /// The run is waiting on tool output nobody here will provide.
    RequiresAction,
}

impl RunEvent {
    /// Terminal events end the turn; only deltas may follow each other.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunEvent::MessageDelta { .. })
    }
}

/// A frame relayed to HTTP consumers.
///
/// Serializes straight into the chat wire shape:
/// `{"type": ..., "data": ..., "thread_id": ...}`. An error frame emitted
/// before a thread was resolved carries no `thread_id` key at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    Content {
        data: String,
        thread_id: String,
    },
    Done {
        thread_id: String,
    },
    Error {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },
    ActionRequired {
        data: String,
        thread_id: String,
    },
}

impl RelayEvent {
    pub fn content<S: Into<String>>(data: S, thread_id: S) -> Self {
        RelayEvent::Content {
            data: data.into(),
            thread_id: thread_id.into(),
        }
    }

    pub fn done<S: Into<String>>(thread_id: S) -> Self {
        RelayEvent::Done {
            thread_id: thread_id.into(),
        }
    }

    pub fn error<S: Into<String>>(data: S, thread_id: Option<String>) -> Self {
        RelayEvent::Error {
            data: data.into(),
            thread_id,
        }
    }

    pub fn action_required<S: Into<String>>(thread_id: S) -> Self {
        RelayEvent::ActionRequired {
            data: "Tool calls required".to_string(),
            thread_id: thread_id.into(),
        }
    }

    /// Whether this frame ends the turn.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RelayEvent::Content { .. })
    }
}
