//! Whisper-style speech-to-text over the OpenAI/Groq transcription APIs.

use async_trait::async_trait;
use tracing::debug;

use murmur_core::config::TranscriptionConfig;

use crate::SpeechToText;

/// Get the transcription API URL for a given provider.
pub fn provider_url(config: &TranscriptionConfig) -> &'static str {
    match config.provider.as_str() {
        "groq" => "https://api.groq.com/openai/v1/audio/transcriptions",
        _ => "https://api.openai.com/v1/audio/transcriptions",
    }
}

pub struct WhisperTranscriber {
    url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    pub fn from_config(config: &TranscriptionConfig) -> anyhow::Result<Self> {
        let api_key = config
            .resolve_api_key()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok().filter(|v| !v.is_empty()))
            .ok_or_else(|| anyhow::anyhow!("No transcription API key configured"))?;
        Ok(Self {
            url: provider_url(config).to_string(),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| "whisper-large-v3-turbo".to_string()),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl SpeechToText for WhisperTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> anyhow::Result<String> {
        debug!(
            url = %self.url,
            model = %self.model,
            wav_bytes = wav.len(),
            "Sending audio for transcription"
        );

        let part = reqwest::multipart::Part::bytes(wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")?;

        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", part);

        let resp = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Transcription API error {status}: {body}");
        }

        let text = resp.text().await?;
        Ok(text.trim().to_string())
    }
}
