//! These models represent the objects passed between the relay and the
//! remote assistants service.
//!
//! There are two distinct shapes in play:
//! - the service's REST/event payloads (threads, messages, runs and the
//!   per-run event feed), deserialized here and nowhere else
//! - the relay's own frames, sent onward to HTTP consumers
//!
//! Remote payloads are converted into these structs at the client
//! boundary; everything above the client works only with these types.
pub mod event;
pub mod message;
pub mod run;
pub mod thread;
