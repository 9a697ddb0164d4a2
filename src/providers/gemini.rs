use std::time::Duration;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::app_config::GEMINI_SAMPLE_RATE;
use crate::errors::ProviderError;
use crate::providers::{SpeechSynthesizer, TextRepairer};
use crate::voices::Voice;

/// Instruction sent ahead of caption text whose timestamps do not parse
pub const REPAIR_INSTRUCTION: &str = "The following subtitle text has malformed timestamps. \
Rewrite ONLY the timing lines so that every block is in SRT format: an index line, \
a line 'HH:MM:SS,mmm --> HH:MM:SS,mmm', then the text lines, with a blank line between blocks. \
Keep the indices, the wording and the intended timing unchanged. \
Return only the corrected subtitles, without code fences or commentary.";

/// Gemini client for speech synthesis and text generation
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL of the API
    endpoint: String,
    /// Model used for every request
    model: String,
}

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    /// Conversation turns
    contents: Vec<GeminiContent>,

    /// Output settings
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

/// A single turn
#[derive(Debug, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// One piece of a turn: text or inline binary data
#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

/// Base64 payload with its MIME type
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

/// generateContent response body
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
}

/// One candidate answer
#[derive(Debug, Deserialize)]
pub struct GeminiCandidate {
    pub content: Option<GeminiContent>,
}

impl GenerateContentRequest {
    /// Plain text generation request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: Some(prompt.into()),
                    inline_data: None,
                }],
            }],
            generation_config: None,
        }
    }

    /// Speech request with a prebuilt voice
    pub fn speech(prompt: impl Into<String>, voice_name: impl Into<String>) -> Self {
        Self {
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: Some(SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice_name.into(),
                        },
                    },
                }),
            }),
            ..Self::text(prompt)
        }
    }
}

/// Prompt carrying the pacing hint ahead of the text to speak
pub fn speech_prompt(text: &str, hint: Option<f64>) -> String {
    let guidance = match hint {
        Some(secs) if secs > 0.0 => format!(
            "Read this text fairly fast, but clearly and naturally, aiming for about {:.2} seconds of audio.",
            secs
        ),
        _ => "Read this text fairly fast, but clearly and naturally.".to_string(),
    };
    format!("{}\n\n{}", guidance, text)
}

/// `rate=` parameter of a MIME type such as `audio/L16;codec=pcm;rate=24000`
pub fn mime_sample_rate(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.trim().parse().ok())
}

impl Gemini {
    /// Create a new Gemini client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
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
        })
    }

    /// Send a generateContent request
    pub async fn generate(&self, request: &GenerateContentRequest) -> Result<GenerateContentResponse, ProviderError> {
        let base = if self.endpoint.is_empty() {
            "https://generativelanguage.googleapis.com"
        } else {
            self.endpoint.trim_end_matches('/')
        };
        let api_url = format!("{}/v1beta/models/{}:generateContent", base, self.model);

        let response = self.client.post(&api_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        response.json::<GenerateContentResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Gemini API response: {}", e)))
    }

    /// Decoded bytes of the first inline data part
    pub fn extract_audio(response: &GenerateContentResponse) -> Result<Vec<u8>, ProviderError> {
        let inline = response.candidates.iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.inline_data.as_ref())
            .ok_or_else(|| ProviderError::EmptyResponse("no inline audio in Gemini response".to_string()))?;

        debug!("Gemini audio part: {}", inline.mime_type);
        if let Some(rate) = mime_sample_rate(&inline.mime_type) {
            if rate != GEMINI_SAMPLE_RATE {
                return Err(ProviderError::ParseError(format!(
                    "Gemini returned {} Hz audio, expected {} Hz",
                    rate, GEMINI_SAMPLE_RATE
                )));
            }
        }
        let bytes = BASE64.decode(inline.data.as_bytes())
            .map_err(|e| ProviderError::ParseError(format!("Invalid base64 audio: {}", e)))?;

        if bytes.is_empty() {
            return Err(ProviderError::EmptyResponse("Gemini returned zero audio bytes".to_string()));
        }
        Ok(bytes)
    }

    /// Concatenated text parts of the first candidate
    pub fn extract_text(response: &GenerateContentResponse) -> String {
        response.candidates.first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SpeechSynthesizer for Gemini {
    async fn synthesize(&self, text: &str, hint: Option<f64>, voice: &Voice) -> Result<Vec<u8>, ProviderError> {
        let request = GenerateContentRequest::speech(speech_prompt(text, hint), voice.id.clone());
        let response = self.generate(&request).await?;
        Self::extract_audio(&response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl TextRepairer for Gemini {
    async fn repair(&self, malformed: &str) -> Result<String, ProviderError> {
        let request = GenerateContentRequest::text(format!("{}\n\n{}", REPAIR_INSTRUCTION, malformed));
        let response = self.generate(&request).await?;
        Ok(Self::extract_text(&response))
    }
}
