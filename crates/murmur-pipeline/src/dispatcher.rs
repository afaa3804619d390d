//! Turn dispatch — validates a submitted turn, runs the stage sequence for
//! its modality, and persists the agent reply.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use murmur_core::config::Config;
use murmur_core::error::{MurmurError, Result};
use murmur_core::store::ChatStore;
use murmur_core::types::{Chat, Message, Modality, Role, TurnRequest};
use murmur_media::normalize::normalize_recording;
use murmur_media::{AudioStore, AGENT_AUDIO_EXT, USER_AUDIO_EXT};
use murmur_providers::{SpeechSynthesizer, SpeechToText, TextGenerator};

use crate::context::{HistoryTurn, TurnContext, TurnKind};
use crate::prompt;

/// A completed turn: the persisted agent reply and, for audio turns, the
/// synthesized reply audio.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub message: Message,
    pub audio: Option<Vec<u8>>,
}

/// The pipeline over injected collaborators. Stateless; a new instance can
/// be built per request or shared freely.
pub struct TurnPipeline {
    store: Arc<dyn ChatStore>,
    audio: Arc<dyn AudioStore>,
    transcriber: Arc<dyn SpeechToText>,
    generator: Arc<dyn TextGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: Arc<Config>,
}

impl TurnPipeline {
    pub fn new(
        store: Arc<dyn ChatStore>,
        audio: Arc<dyn AudioStore>,
        transcriber: Arc<dyn SpeechToText>,
        generator: Arc<dyn TextGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            store,
            audio,
            transcriber,
            generator,
            synthesizer,
            config,
        }
    }

    /// Run one turn end to end and persist exactly one agent reply.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnReply> {
        let kind = match (&request.text, &request.audio_message_id) {
            (Some(_), Some(_)) => {
                return Err(MurmurError::InvalidTurn(
                    "both text and audio reference provided".into(),
                ))
            }
            (None, None) => {
                return Err(MurmurError::InvalidTurn(
                    "neither text nor audio reference provided".into(),
                ))
            }
            (Some(_), None) => TurnKind::Text,
            (None, Some(_)) => TurnKind::Audio,
        };

        let chat = self.store.chat(request.chat_id).await?;

        match kind {
            TurnKind::Text => self.run_text_turn(&chat, request.text.unwrap_or_default()).await,
            TurnKind::Audio => {
                let message_id = request.audio_message_id.unwrap_or_default();
                self.run_audio_turn(&chat, message_id).await
            }
        }
    }

    /// Text pipeline: persist the user turn, then prompt assembly →
    /// generation.
    async fn run_text_turn(&self, chat: &Chat, user_text: String) -> Result<TurnReply> {
        let user_msg = self.persist_user_text(chat.id, &user_text).await?;
        let history = self.history_window(chat.id, Some(user_msg.id)).await?;
        let mut ctx = TurnContext::for_text(
            chat.agent.name.clone(),
            chat.agent.system_prompt.clone(),
            history,
            user_text,
        );

        self.generate(&mut ctx).await?;
        let agent_text = ctx.agent_text.unwrap_or_default();

        let message = self.persist_reply(chat.id, Modality::Text, &agent_text, None).await?;
        info!(chat_id = chat.id, message_id = message.id, "Text turn complete");
        Ok(TurnReply {
            message,
            audio: None,
        })
    }

    /// Audio pipeline: transcription → prompt assembly → generation →
    /// synthesis. Synthesis failure degrades the reply to text.
    async fn run_audio_turn(&self, chat: &Chat, user_message_id: u64) -> Result<TurnReply> {
        let user_msg = self.store.message(chat.id, user_message_id).await?;
        if !user_msg.is_audio() {
            return Err(MurmurError::MessageNotAudio(user_message_id));
        }

        let history = self.history_window(chat.id, Some(user_msg.id)).await?;
        let audio_path =
            self.audio
                .path_for(Role::User, chat.id, user_msg.id, USER_AUDIO_EXT);
        let mut ctx = TurnContext::for_audio(
            chat.agent.name.clone(),
            chat.agent.system_prompt.clone(),
            history,
            audio_path,
        );

        self.transcribe(&mut ctx, chat.id, user_msg.id).await?;
        self.generate(&mut ctx).await?;
        self.synthesize(&mut ctx, chat.id).await;

        let agent_text = ctx.agent_text.clone().unwrap_or_default();
        match ctx.agent_audio.take() {
            Some(bytes) => {
                let message = self
                    .persist_reply(chat.id, Modality::Audio, &agent_text, Some(&bytes))
                    .await?;
                info!(chat_id = chat.id, message_id = message.id, "Audio turn complete");
                Ok(TurnReply {
                    message,
                    audio: Some(bytes),
                })
            }
            None => {
                let message = self
                    .persist_reply(chat.id, Modality::Text, &agent_text, None)
                    .await?;
                Ok(TurnReply {
                    message,
                    audio: None,
                })
            }
        }
    }

    /// Transcription stage: canonical WAV at the context's audio path →
    /// user text, backfilled onto the user's audio message.
    async fn transcribe(&self, ctx: &mut TurnContext, chat_id: u64, message_id: u64) -> Result<()> {
        let path = ctx.user_audio_path.clone().ok_or_else(|| {
            MurmurError::InvalidTurn("audio turn without an upload reference".into())
        })?;
        let wav = tokio::fs::read(&path).await.map_err(|_| {
            MurmurError::UnsupportedAudioFormat(format!(
                "upload for message {message_id} was never accepted"
            ))
        })?;

        let text = self
            .transcriber
            .transcribe(&wav)
            .await
            .map_err(|e| MurmurError::TranscriptionFailed(e.to_string()))?;
        if text.is_empty() {
            return Err(MurmurError::TranscriptionFailed(
                "collaborator returned an empty transcript".into(),
            ));
        }

        self.store
            .set_message_text(chat_id, message_id, &text)
            .await?;
        debug!(chat_id, message_id, chars = text.len(), "Transcribed user audio");
        ctx.user_text = Some(text);
        Ok(())
    }

    /// Generation stage: assembled prompt → agent text.
    async fn generate(&self, ctx: &mut TurnContext) -> Result<()> {
        let user_text = ctx.user_text.clone().unwrap_or_default();
        let window = prompt::apply_window(&ctx.history, self.config.history_window());
        let assembled = prompt::assemble(&ctx.agent_name, &ctx.system_prompt, window, &user_text);

        let text = self
            .generator
            .complete(&assembled)
            .await
            .map_err(|e| MurmurError::GenerationFailed(e.to_string()))?;
        ctx.agent_text = Some(text);
        Ok(())
    }

    /// Synthesis stage: agent text → reply audio. On failure `agent_audio`
    /// stays unset and the reply degrades to text.
    async fn synthesize(&self, ctx: &mut TurnContext, chat_id: u64) {
        let text = ctx.agent_text.clone().unwrap_or_default();
        match self.synthesizer.synthesize(&text).await {
            Ok(bytes) => ctx.agent_audio = Some(bytes),
            Err(e) => {
                warn!(chat_id, error = %e, "Synthesis failed, replying with text only");
            }
        }
    }

    /// Persist the agent reply, honoring the ordering hazard: allocate the
    /// message id first, then write the artifact named after it, then
    /// insert the message.
    async fn persist_reply(
        &self,
        chat_id: u64,
        modality: Modality,
        text: &str,
        audio_bytes: Option<&[u8]>,
    ) -> Result<Message> {
        let id = self.store.allocate_message_id(chat_id).await?;

        if let Some(bytes) = audio_bytes {
            self.audio
                .write(Role::Agent, chat_id, id, AGENT_AUDIO_EXT, bytes)
                .await?;
        }

        let message = Message {
            id,
            chat_id,
            role: Role::Agent,
            modality,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.store.insert_message(&message).await?;
        Ok(message)
    }

    /// Persist the user's text turn before the stages run, so the turn is
    /// part of the recorded conversation whatever happens downstream.
    async fn persist_user_text(&self, chat_id: u64, text: &str) -> Result<Message> {
        let id = self.store.allocate_message_id(chat_id).await?;
        let message = Message {
            id,
            chat_id,
            role: Role::User,
            modality: Modality::Text,
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        self.store.insert_message(&message).await?;
        Ok(message)
    }

    /// The bounded history window for prompt assembly, oldest first,
    /// excluding the current turn when it is already persisted.
    async fn history_window(&self, chat_id: u64, before: Option<u64>) -> Result<Vec<HistoryTurn>> {
        let messages = self
            .store
            .recent(chat_id, before, self.config.history_window())
            .await?;
        Ok(messages.iter().map(HistoryTurn::from).collect())
    }

    /// Accept a user recording: normalize to the canonical container, then
    /// persist the audio message and its artifact. Rejects undecodable
    /// uploads before anything is persisted.
    pub async fn ingest_user_audio(&self, chat_id: u64, recording: &[u8]) -> Result<Message> {
        let chat = self.store.chat(chat_id).await?;
        let normalized = normalize_recording(recording)?;

        let id = self.store.allocate_message_id(chat.id).await?;
        self.audio
            .write(Role::User, chat.id, id, USER_AUDIO_EXT, &normalized.wav)
            .await?;

        let message = Message {
            id,
            chat_id: chat.id,
            role: Role::User,
            modality: Modality::Audio,
            text: String::new(),
            sent_at: Utc::now(),
        };
        self.store.insert_message(&message).await?;
        info!(
            chat_id = chat.id,
            message_id = id,
            sample_rate = normalized.sample_rate,
            "Ingested user audio"
        );
        Ok(message)
    }

    /// Download path: the audio artifact of a persisted audio message.
    pub async fn message_audio(&self, chat_id: u64, message_id: u64) -> Result<Vec<u8>> {
        let msg = self.store.message(chat_id, message_id).await?;
        if !msg.is_audio() {
            return Err(MurmurError::MessageNotAudio(message_id));
        }
        let ext = match msg.role {
            Role::User => USER_AUDIO_EXT,
            Role::Agent => AGENT_AUDIO_EXT,
        };
        self.audio.read(msg.role, chat_id, message_id, ext).await
    }
}
