//! Turn pipeline — selects and runs the stage sequence for one user turn.
//!
//! A text turn runs prompt assembly → generation; an audio turn runs
//! transcription → prompt assembly → generation → synthesis. Each turn is
//! handled synchronously within one call and persists exactly one agent
//! reply message.

pub mod context;
pub mod dispatcher;
pub mod prompt;

pub use context::{HistoryTurn, TurnContext, TurnKind};
pub use dispatcher::{TurnPipeline, TurnReply};
