//! Media layer — canonical audio normalization and artifact storage.

pub mod artifact;
pub mod normalize;

pub use artifact::{AudioStore, FsAudioStore, AGENT_AUDIO_EXT, USER_AUDIO_EXT};
pub use normalize::{normalize_recording, NormalizedAudio};
