//! ElevenLabs text-to-speech client. Replies come back as mp3 bytes.

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use murmur_core::config::SynthesisConfig;

use crate::SpeechSynthesizer;

const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM"; // ElevenLabs "Rachel"
const DEFAULT_MODEL: &str = "eleven_turbo_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

pub struct ElevenLabsSynthesizer {
    api_key: String,
    voice: String,
    model: String,
    client: reqwest::Client,
}

/// Build the ElevenLabs TTS request URL for a given voice.
pub fn build_tts_url(voice: &str) -> String {
    format!("https://api.elevenlabs.io/v1/text-to-speech/{voice}?output_format={OUTPUT_FORMAT}")
}

impl ElevenLabsSynthesizer {
    pub fn from_config(config: &SynthesisConfig) -> anyhow::Result<Self> {
        let api_key = config
            .resolve_api_key()
            .or_else(|| {
                std::env::var("ELEVENLABS_API_KEY")
                    .ok()
                    .filter(|v| !v.is_empty())
            })
            .ok_or_else(|| anyhow::anyhow!("No synthesis API key configured"))?;
        Ok(Self {
            api_key,
            voice: config
                .voice
                .clone()
                .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> anyhow::Result<Vec<u8>> {
        let url = build_tts_url(&self.voice);

        debug!(voice = %self.voice, model = %self.model, text_len = text.len(), "Requesting TTS");

        let resp = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&json!({
                "text": text,
                "model_id": self.model,
            }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("TTS API error {status}: {body}");
        }

        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_url_construction() {
        let url = build_tts_url("Rachel");
        assert!(url.contains("Rachel"));
        assert!(url.contains("output_format=mp3_44100_128"));
        assert!(url.starts_with("https://api.elevenlabs.io"));
    }
}
