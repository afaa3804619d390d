use thiserror::Error;

#[derive(Debug, Error)]
pub enum MurmurError {
    /// A turn must carry exactly one of text / audio reference.
    #[error("Invalid turn: {0}")]
    InvalidTurn(String),

    #[error("Unsupported audio format: {0}")]
    UnsupportedAudioFormat(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("Chat not found: {0}")]
    ChatNotFound(u64),

    #[error("Message not found: {0}")]
    MessageNotFound(u64),

    #[error("Message {0} is not an audio message")]
    MessageNotAudio(u64),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, MurmurError>;
