//! Streaming chat conversation on top of [`chat_api`].
//!
//! [`ChatSession`] owns the message list, dispatches the whole history through
//! a [`chat_api::CompletionTransport`], and folds decoded frames into the list
//! with [`MessageAccumulator`]. Failures end up as one assistant message with a
//! user-facing [`notice`].

pub mod accumulator;
pub mod logging;
pub mod notice;
pub mod session;

pub use accumulator::MessageAccumulator;
pub use notice::failure_notice;
pub use session::{ChatSession, Interrupt, InterruptHandle, Outcome, Snapshot};
