//! External AI collaborator abstraction.
//!
//! The pipeline only ever talks to the three capabilities through these
//! traits, so any of them can be swapped for a deterministic fake in tests
//! or a different vendor in production.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod elevenlabs;
pub mod openai;
pub mod whisper;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use openai::OpenAiGenerator;
pub use whisper::WhisperTranscriber;

/// Role tag on one prompt segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptRole {
    System,
    User,
    Agent,
}

/// One role-tagged segment of an assembled prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSegment {
    pub role: PromptRole,
    pub content: String,
}

/// A fully assembled prompt: system persona first, history turns in
/// creation order, the current user turn last.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Prompt {
    pub segments: Vec<PromptSegment>,
}

impl Prompt {
    pub fn push(&mut self, role: PromptRole, content: impl Into<String>) {
        self.segments.push(PromptSegment {
            role,
            content: content.into(),
        });
    }
}

/// Speech-to-text collaborator: canonical WAV bytes in, transcript out.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, wav: &[u8]) -> anyhow::Result<String>;
}

/// Text-generation collaborator: assembled prompt in, agent text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> anyhow::Result<String>;
}

/// Speech-synthesis collaborator: agent text in, lossy audio bytes out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>>;
}
