use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Lifecycle states of a remote run.
///
/// `queued`, `in_progress` and `cancelling` are the states a run can
/// still leave on its own; everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Completed,
    Failed,
    Incomplete,
    Expired,
}

impl RunStatus {
    /// Whether polling should stop at this status.
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling
        )
    }
}

/// The last error the service recorded on a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// A remote computation over a thread, owned by the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<RunError>,
}
