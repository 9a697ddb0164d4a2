use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Serialize;

use crate::errors::ProviderError;
use crate::providers::SpeechSynthesizer;
use crate::voices::Voice;

/// ElevenLabs text-to-speech client
pub struct ElevenLabs {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL of the API
    endpoint: String,
    /// Model identifier
    model: String,
    /// Requested PCM sample rate
    sample_rate: u32,
}

/// Text-to-speech request body
#[derive(Debug, Serialize)]
pub struct TextToSpeechRequest {
    /// Text to speak
    pub text: String,

    /// Model identifier
    pub model_id: String,
}

impl ElevenLabs {
    /// Create a new ElevenLabs client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        sample_rate: u32,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
            sample_rate,
        })
    }

    /// URL for one voice with the raw PCM output format
    pub fn speech_url(&self, voice_id: &str) -> String {
        let base = if self.endpoint.is_empty() {
            "https://api.elevenlabs.io"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        format!("{}/v1/text-to-speech/{}?output_format=pcm_{}", base, voice_id, self.sample_rate)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabs {
    // The API has no pacing control, so the hint is not forwarded
    async fn synthesize(&self, text: &str, _hint: Option<f64>, voice: &Voice) -> Result<Vec<u8>, ProviderError> {
        let request = TextToSpeechRequest {
            text: text.to_string(),
            model_id: self.model.clone(),
        };

        let response = self.client.post(self.speech_url(&voice.id))
            .header("Content-Type", "application/json")
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("ElevenLabs API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse("ElevenLabs TTS returned no audio".to_string()));
        }
        debug!("ElevenLabs returned {} bytes for voice {}", bytes.len(), voice.name);
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &str {
        "elevenlabs"
    }
}
