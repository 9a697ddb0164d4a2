/*!
 * Provider implementations for speech synthesis and transcript repair.
 *
 * This module contains client implementations for the external services
 * the narration engine depends on:
 * - Gemini: speech synthesis and timestamp repair
 * - ElevenLabs: speech synthesis
 * - Mock: deterministic stand-ins for tests
 */

use async_trait::async_trait;
use std::sync::Arc;

use crate::app_config::{Config, SpeechProvider};
use crate::errors::ProviderError;
use crate::voices::Voice;

/// Turns a line of text into raw speech audio
///
/// Implementations return little-endian signed 16-bit PCM at the sample rate
/// and channel count the engine was configured with.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` with `voice`
    ///
    /// # Arguments
    /// * `text` - The text to speak
    /// * `hint` - Desired length in seconds; a soft pacing request only
    /// * `voice` - Voice resolved from the provider's catalog
    async fn synthesize(&self, text: &str, hint: Option<f64>, voice: &Voice) -> Result<Vec<u8>, ProviderError>;

    /// Short provider name for logs
    fn name(&self) -> &str;
}

/// Reformats caption text whose timestamps do not parse
#[async_trait]
pub trait TextRepairer: Send + Sync {
    /// Return the text with timestamps rewritten, leaving indices and wording alone
    async fn repair(&self, malformed: &str) -> Result<String, ProviderError>;
}

/// Build the speech synthesizer selected in the configuration
pub fn create_synthesizer(config: &Config) -> Result<Arc<dyn SpeechSynthesizer>, ProviderError> {
    let synthesis = &config.synthesis;
    let timeout = std::time::Duration::from_secs(synthesis.get_timeout_secs());

    let synthesizer: Arc<dyn SpeechSynthesizer> = match synthesis.provider {
        SpeechProvider::Gemini => Arc::new(gemini::Gemini::new(
            synthesis.get_api_key(),
            synthesis.get_endpoint(),
            synthesis.get_model(),
            timeout,
        )?),
        SpeechProvider::ElevenLabs => Arc::new(elevenlabs::ElevenLabs::new(
            synthesis.get_api_key(),
            synthesis.get_endpoint(),
            synthesis.get_model(),
            config.audio.sample_rate,
            timeout,
        )?),
    };

    Ok(synthesizer)
}

/// Build the repair client
pub fn create_repairer(config: &Config) -> Result<Arc<dyn TextRepairer>, ProviderError> {
    let repair = &config.repair;
    Ok(Arc::new(gemini::Gemini::new(
        repair.get_api_key(),
        repair.endpoint.clone(),
        repair.model.clone(),
        std::time::Duration::from_secs(repair.timeout_secs),
    )?))
}

pub mod elevenlabs;
pub mod gemini;
pub mod mock;
