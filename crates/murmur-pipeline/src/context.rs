//! Per-turn pipeline context.
//!
//! One [`TurnContext`] is built per submitted turn and threaded through the
//! stages; each stage reads the fields the previous stages wrote. The
//! context lives only for the duration of the pipeline run.

use std::path::PathBuf;

use murmur_core::types::{Message, Role};

/// Which stage sequence a turn takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    /// Prompt assembly → generation.
    Text,
    /// Transcription → prompt assembly → generation → synthesis.
    Audio,
}

/// One prior turn in the history window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: Role,
    pub text: String,
}

impl From<&Message> for HistoryTurn {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            text: msg.text.clone(),
        }
    }
}

/// The state threaded through the stages of one turn.
///
/// Reads/writes per stage:
/// - transcription: reads `user_audio_path`, writes `user_text`
/// - prompt assembly: reads `agent_name`, `system_prompt`, `history`, `user_text`
/// - generation: writes `agent_text`
/// - synthesis: reads `agent_text`, writes `agent_audio`
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub agent_name: String,
    pub system_prompt: String,
    /// Prior turns, oldest first.
    pub history: Vec<HistoryTurn>,
    pub user_text: Option<String>,
    pub user_audio_path: Option<PathBuf>,
    pub agent_text: Option<String>,
    pub agent_audio: Option<Vec<u8>>,
}

impl TurnContext {
    /// Context for a text turn: user text is known up front.
    pub fn for_text(
        agent_name: String,
        system_prompt: String,
        history: Vec<HistoryTurn>,
        user_text: String,
    ) -> Self {
        Self {
            agent_name,
            system_prompt,
            history,
            user_text: Some(user_text),
            user_audio_path: None,
            agent_text: None,
            agent_audio: None,
        }
    }

    /// Context for an audio turn: user text arrives from transcription.
    pub fn for_audio(
        agent_name: String,
        system_prompt: String,
        history: Vec<HistoryTurn>,
        user_audio_path: PathBuf,
    ) -> Self {
        Self {
            agent_name,
            system_prompt,
            history,
            user_text: None,
            user_audio_path: Some(user_audio_path),
            agent_text: None,
            agent_audio: None,
        }
    }
}
