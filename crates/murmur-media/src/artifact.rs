//! Audio artifact storage by derived filename.
//!
//! Artifacts are addressed as `{role}_{owner}_{message_id}.{ext}` so the
//! filename is fully determined by the owning message. User uploads are
//! always canonical WAV; agent replies are stored in a lossy container.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use murmur_core::error::Result;
use murmur_core::types::Role;

/// Extension for normalized user uploads.
pub const USER_AUDIO_EXT: &str = "wav";
/// Extension for synthesized agent replies.
pub const AGENT_AUDIO_EXT: &str = "mp3";

/// Storage collaborator for audio artifacts.
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Write an artifact and return its path. The owning message id must
    /// already be allocated before this is called.
    async fn write(
        &self,
        role: Role,
        owner: u64,
        message_id: u64,
        ext: &str,
        bytes: &[u8],
    ) -> Result<PathBuf>;

    async fn read(&self, role: Role, owner: u64, message_id: u64, ext: &str) -> Result<Vec<u8>>;

    /// Derived path for an artifact, whether or not it exists yet.
    fn path_for(&self, role: Role, owner: u64, message_id: u64, ext: &str) -> PathBuf;
}

/// Filesystem artifact store rooted at a single directory.
pub struct FsAudioStore {
    dir: PathBuf,
}

impl FsAudioStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

/// Derive the artifact filename for a message.
pub fn artifact_filename(role: Role, owner: u64, message_id: u64, ext: &str) -> String {
    format!("{}_{owner}_{message_id}.{ext}", role.as_str())
}

#[async_trait]
impl AudioStore for FsAudioStore {
    async fn write(
        &self,
        role: Role,
        owner: u64,
        message_id: u64,
        ext: &str,
        bytes: &[u8],
    ) -> Result<PathBuf> {
        let path = self.path_for(role, owner, message_id, ext);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), size = bytes.len(), "Wrote audio artifact");
        Ok(path)
    }

    async fn read(&self, role: Role, owner: u64, message_id: u64, ext: &str) -> Result<Vec<u8>> {
        let path = self.path_for(role, owner, message_id, ext);
        let bytes = tokio::fs::read(&path).await?;
        Ok(bytes)
    }

    fn path_for(&self, role: Role, owner: u64, message_id: u64, ext: &str) -> PathBuf {
        self.dir.join(artifact_filename(role, owner, message_id, ext))
    }
}
