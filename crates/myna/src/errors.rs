use std::time::Duration;

use thiserror::Error;

/// Failures raised while talking to the remote assistants service.
///
/// These never travel to HTTP callers as-is: the relay folds them into
/// terminal error frames or failure text, so a broken upstream still
/// produces a well-formed response.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("request to assistants service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("assistants service returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("unexpected payload from assistants service: {0}")]
    Payload(String),

    #[error("run {run_id} did not finish within {timeout:?}")]
    RunTimeout { run_id: String, timeout: Duration },
}

pub type ServiceResult<T> = Result<T, ServiceError>;
