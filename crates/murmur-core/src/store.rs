//! JSONL-based chat store — message logs as append-only JSONL files.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MurmurError, Result};
use crate::history::{page_backward, HistoryPage, StartIndex};
use crate::types::{AgentProfile, Chat, Message};

/// Persistence collaborator for chats and messages.
///
/// Message ids are allocated here, monotonically increasing per chat, and
/// must be allocated *before* any audio artifact is written under them.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_chat(&self, name: &str, agent: AgentProfile) -> Result<Chat>;

    async fn chat(&self, chat_id: u64) -> Result<Chat>;

    /// All chats, id ascending.
    async fn list_chats(&self) -> Result<Vec<Chat>>;

    /// Reserve the next message id for a chat.
    async fn allocate_message_id(&self, chat_id: u64) -> Result<u64>;

    /// Persist a message under a previously allocated id.
    async fn insert_message(&self, message: &Message) -> Result<()>;

    /// Backfill the text of an existing message (transcripts for audio
    /// messages). Role and modality are never rewritten.
    async fn set_message_text(&self, chat_id: u64, message_id: u64, text: &str) -> Result<()>;

    async fn message(&self, chat_id: u64, message_id: u64) -> Result<Message>;

    /// The history window: up to `n` most recent messages, ascending,
    /// optionally restricted to ids strictly below `before`.
    async fn recent(&self, chat_id: u64, before: Option<u64>, n: usize) -> Result<Vec<Message>>;

    /// One backward pagination page, shaped for display.
    async fn page(&self, chat_id: u64, start: StartIndex, n: usize) -> Result<HistoryPage>;
}

/// File-based chat store using JSONL for message logs.
///
/// Layout:
/// - `<base>/chats.json` — array of [`Chat`]
/// - `<base>/messages/<chat_id>.jsonl` — one message per line, id ascending
pub struct JsonlChatStore {
    base: PathBuf,
}

impl JsonlChatStore {
    pub fn new(base: PathBuf) -> Self {
        Self { base }
    }

    fn index_path(&self) -> PathBuf {
        self.base.join("chats.json")
    }

    fn messages_dir(&self) -> PathBuf {
        self.base.join("messages")
    }

    fn log_path(&self, chat_id: u64) -> PathBuf {
        self.messages_dir().join(format!("{chat_id}.jsonl"))
    }

    async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.base).await?;
        tokio::fs::create_dir_all(self.messages_dir()).await?;
        Ok(())
    }

    async fn load_index(&self) -> Result<Vec<Chat>> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let chats: Vec<Chat> = serde_json::from_str(&data)?;
        Ok(chats)
    }

    async fn save_index(&self, chats: &[Chat]) -> Result<()> {
        self.ensure_dirs().await?;
        let data = serde_json::to_string_pretty(chats)?;
        let path = self.index_path();
        // Atomic write: write to temp then rename
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn load_messages(&self, chat_id: u64) -> Result<Vec<Message>> {
        let path = self.log_path(chat_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&path).await?;
        let mut messages = Vec::new();
        for line in data.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let msg: Message = serde_json::from_str(line)
                .map_err(|e| MurmurError::Store(format!("corrupt message line: {e}")))?;
            messages.push(msg);
        }
        // Appends happen in allocation order, but a text backfill rewrite
        // must not be able to disturb the cursor invariant.
        messages.sort_by_key(|m| m.id);
        Ok(messages)
    }

    async fn save_messages(&self, chat_id: u64, messages: &[Message]) -> Result<()> {
        let path = self.log_path(chat_id);
        let mut data = String::new();
        for msg in messages {
            data.push_str(&serde_json::to_string(msg)?);
            data.push('\n');
        }
        let tmp = path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, data.as_bytes()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for JsonlChatStore {
    async fn create_chat(&self, name: &str, agent: AgentProfile) -> Result<Chat> {
        let mut chats = self.load_index().await?;
        let id = chats.iter().map(|c| c.id).max().unwrap_or(0) + 1;
        let chat = Chat {
            id,
            name: name.to_string(),
            agent,
            created_at: Utc::now(),
            last_message_at: None,
            next_message_id: 1,
        };
        chats.push(chat.clone());
        self.save_index(&chats).await?;
        debug!(chat_id = id, "Created chat");
        Ok(chat)
    }

    async fn chat(&self, chat_id: u64) -> Result<Chat> {
        let chats = self.load_index().await?;
        chats
            .into_iter()
            .find(|c| c.id == chat_id)
            .ok_or(MurmurError::ChatNotFound(chat_id))
    }

    async fn list_chats(&self) -> Result<Vec<Chat>> {
        let mut chats = self.load_index().await?;
        chats.sort_by_key(|c| c.id);
        Ok(chats)
    }

    async fn allocate_message_id(&self, chat_id: u64) -> Result<u64> {
        let mut chats = self.load_index().await?;
        let chat = chats
            .iter_mut()
            .find(|c| c.id == chat_id)
            .ok_or(MurmurError::ChatNotFound(chat_id))?;
        let id = chat.next_message_id;
        chat.next_message_id += 1;
        self.save_index(&chats).await?;
        Ok(id)
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        self.ensure_dirs().await?;

        let path = self.log_path(message.chat_id);
        let line = serde_json::to_string(message)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;

        let mut chats = self.load_index().await?;
        if let Some(chat) = chats.iter_mut().find(|c| c.id == message.chat_id) {
            chat.last_message_at = Some(message.sent_at);
            self.save_index(&chats).await?;
        }

        debug!(
            chat_id = message.chat_id,
            message_id = message.id,
            "Inserted message"
        );
        Ok(())
    }

    async fn set_message_text(&self, chat_id: u64, message_id: u64, text: &str) -> Result<()> {
        let mut messages = self.load_messages(chat_id).await?;
        let msg = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(MurmurError::MessageNotFound(message_id))?;
        msg.text = text.to_string();
        self.save_messages(chat_id, &messages).await?;
        Ok(())
    }

    async fn message(&self, chat_id: u64, message_id: u64) -> Result<Message> {
        let messages = self.load_messages(chat_id).await?;
        messages
            .into_iter()
            .find(|m| m.id == message_id)
            .ok_or(MurmurError::MessageNotFound(message_id))
    }

    async fn recent(&self, chat_id: u64, before: Option<u64>, n: usize) -> Result<Vec<Message>> {
        let messages = self.load_messages(chat_id).await?;
        let start = match before {
            Some(id) => StartIndex::Before(id),
            None => StartIndex::Latest,
        };
        Ok(page_backward(&messages, start, n).to_vec())
    }

    async fn page(&self, chat_id: u64, start: StartIndex, n: usize) -> Result<HistoryPage> {
        let messages = self.load_messages(chat_id).await?;
        Ok(HistoryPage::from_messages(
            page_backward(&messages, start, n),
            n,
        ))
    }
}
