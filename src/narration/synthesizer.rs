use std::sync::Arc;
use log::debug;
use tokio_util::sync::CancellationToken;

use crate::audio::Fragment;
use crate::errors::{NarrationError, ProviderError};
use crate::narration::retry::{RetryError, RetryPolicy};
use crate::providers::SpeechSynthesizer;
use crate::transcript::Cue;
use crate::voices::Voice;

// @module: Per-cue speech synthesis with bounded retry

/// Pacing hint for a cue window: the window minus a margin, never below `min_hint`
pub fn duration_hint(window: f64, margin: f64, min_hint: f64) -> f64 {
    (window - margin).max(min_hint)
}

/// Synthesizes one cue at a time through an injected backend
pub struct CueSynthesizer {
    backend: Arc<dyn SpeechSynthesizer>,
    policy: RetryPolicy,
    hint_margin: f64,
    min_hint: f64,
    sample_rate: u32,
    channels: u16,
}

impl CueSynthesizer {
    pub fn new(
        backend: Arc<dyn SpeechSynthesizer>,
        policy: RetryPolicy,
        hint_margin: f64,
        min_hint: f64,
        sample_rate: u32,
        channels: u16,
    ) -> Self {
        CueSynthesizer {
            backend,
            policy,
            hint_margin,
            min_hint,
            sample_rate,
            channels,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Synthesize a cue's text into a fragment
    ///
    /// Returns `Ok(None)` without calling the backend when the cue has no
    /// text. Exhausting the retry budget is fatal for the job.
    pub async fn synthesize_cue(
        &self,
        cue: &Cue,
        voice: &Voice,
        cancel: &CancellationToken,
    ) -> Result<Option<Fragment>, NarrationError> {
        let text = cue.spoken_text();
        if text.is_empty() {
            debug!("Cue {}: empty text, leaving window silent", cue.index);
            return Ok(None);
        }

        let hint = duration_hint(cue.window(), self.hint_margin, self.min_hint);
        let label = format!("Synthesis of cue {} ({})", cue.index, self.backend.name());

        let result = self
            .policy
            .run(cancel, &label, |_| {
                let text = text.as_str();
                async move {
                    let bytes = self.backend.synthesize(text, Some(hint), voice).await?;
                    let fragment = Fragment::from_le_bytes(&bytes, self.sample_rate, self.channels)
                        .map_err(|e| ProviderError::ParseError(e.to_string()))?;
                    if fragment.is_empty() {
                        return Err(ProviderError::EmptyResponse(format!("{} bytes of audio", bytes.len())));
                    }
                    Ok::<Fragment, ProviderError>(fragment)
                }
            })
            .await;

        match result {
            Ok(fragment) => {
                debug!(
                    "Cue {}: synthesized {:.3}s for a {:.3}s window (hint {:.2}s)",
                    cue.index,
                    fragment.duration(),
                    cue.window(),
                    hint
                );
                Ok(Some(fragment))
            }
            Err(RetryError::Exhausted { attempts, last_error }) => Err(NarrationError::SynthesisExhausted {
                cue_index: cue.index,
                attempts,
                last_error,
            }),
            Err(RetryError::Cancelled) => Err(NarrationError::Cancelled),
        }
    }
}
