/*!
 * Mock provider implementations for testing.
 *
 * These stand in for the external services so the narration pipeline can be
 * exercised without network access or ffmpeg:
 * - `MockSynthesizer` - produces a tone of a chosen length, optionally failing first
 * - `MockRepairer` - replays scripted repair responses
 * - `MockStretcher` - resamples fragments in memory, slowly, or always fails
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::audio::pcm::{seconds_to_frames, Fragment};
use crate::audio::TempoStretcher;
use crate::errors::{AudioError, ProviderError};
use crate::providers::{SpeechSynthesizer, TextRepairer};
use crate::voices::Voice;

/// How long the synthesized audio should be
#[derive(Debug, Clone, PartialEq)]
pub enum MockDuration {
    /// Same length for every call
    Fixed(f64),
    /// Exactly the pacing hint (or the fallback when no hint is given)
    FollowHint { fallback: f64 },
    /// Keyed by the spoken text; unknown text uses the fallback
    PerText { lengths: Vec<(String, f64)>, fallback: f64 },
}

/// Behavior mode for the mock synthesizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails the first N calls, then succeeds
    FailFirst { failures: usize },
    /// Always fails with a rate limit error
    Failing,
    /// Succeeds after a delay (for cancellation testing)
    Slow { delay_ms: u64 },
}

/// Mock speech synthesizer producing a constant-level tone
#[derive(Debug)]
pub struct MockSynthesizer {
    behavior: MockBehavior,
    duration: MockDuration,
    sample_rate: u32,
    /// Total synthesize calls, including failed ones
    request_count: Arc<AtomicUsize>,
    /// Text and hint of every call, in call order
    requests: Mutex<Vec<(String, Option<f64>)>>,
}

impl MockSynthesizer {
    pub fn new(behavior: MockBehavior, duration: MockDuration, sample_rate: u32) -> Self {
        Self {
            behavior,
            duration,
            sample_rate,
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Always succeeds with audio of `seconds`
    pub fn working(seconds: f64, sample_rate: u32) -> Self {
        Self::new(MockBehavior::Working, MockDuration::Fixed(seconds), sample_rate)
    }

    /// Fails `failures` times before succeeding
    pub fn fail_first(failures: usize, seconds: f64, sample_rate: u32) -> Self {
        Self::new(MockBehavior::FailFirst { failures }, MockDuration::Fixed(seconds), sample_rate)
    }

    /// Never succeeds
    pub fn failing(sample_rate: u32) -> Self {
        Self::new(MockBehavior::Failing, MockDuration::Fixed(1.0), sample_rate)
    }

    /// Number of synthesize calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Recorded (text, hint) pairs
    pub fn requests(&self) -> Vec<(String, Option<f64>)> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn length_for(&self, text: &str, hint: Option<f64>) -> f64 {
        match &self.duration {
            MockDuration::Fixed(secs) => *secs,
            MockDuration::FollowHint { fallback } => hint.unwrap_or(*fallback),
            MockDuration::PerText { lengths, fallback } => lengths
                .iter()
                .find(|(t, _)| t == text)
                .map(|(_, secs)| *secs)
                .unwrap_or(*fallback),
        }
    }

    /// PCM bytes of a constant tone
    pub fn tone_bytes(seconds: f64, sample_rate: u32) -> Vec<u8> {
        let frames = seconds_to_frames(seconds, sample_rate);
        Fragment::new(vec![1000; frames], sample_rate, 1).to_le_bytes()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, hint: Option<f64>, _voice: &Voice) -> Result<Vec<u8>, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((text.to_string(), hint));
        }

        match self.behavior {
            MockBehavior::Working => {}
            MockBehavior::FailFirst { failures } if call < failures => {
                return Err(ProviderError::ConnectionError(format!("Simulated failure {}", call + 1)));
            }
            MockBehavior::FailFirst { .. } => {}
            MockBehavior::Failing => {
                return Err(ProviderError::RateLimitExceeded("Simulated quota exhaustion".to_string()));
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        Ok(Self::tone_bytes(self.length_for(text, hint), self.sample_rate))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Mock repairer replaying scripted responses
///
/// Each call returns the next response; once the script runs out the last
/// entry repeats.
#[derive(Debug)]
pub struct MockRepairer {
    responses: Vec<Result<String, String>>,
    request_count: Arc<AtomicUsize>,
}

impl MockRepairer {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses,
            request_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Always answers with `text`
    pub fn returning(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(text.into())])
    }

    /// Always fails
    pub fn failing() -> Self {
        Self::new(vec![Err("Simulated repair failure".to_string())])
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextRepairer for MockRepairer {
    async fn repair(&self, _malformed: &str) -> Result<String, ProviderError> {
        let call = self.request_count.fetch_add(1, Ordering::SeqCst);
        let scripted = self.responses.get(call).or_else(|| self.responses.last());
        match scripted {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(ProviderError::RequestFailed(message.clone())),
            None => Err(ProviderError::EmptyResponse("no scripted response".to_string())),
        }
    }
}

/// In-memory stretcher that changes the frame count by the stage product
#[derive(Debug, Default)]
pub struct MockStretcher {
    failing: bool,
    delay: Duration,
    calls: Mutex<Vec<Vec<f64>>>,
}

impl MockStretcher {
    pub fn working() -> Self {
        Self::default()
    }

    /// Fails every call, as an unavailable ffmpeg would
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    /// Works, but takes `delay_ms` per call (for cancellation testing)
    pub fn slow(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            ..Self::default()
        }
    }

    /// Stage lists of every call
    pub fn calls(&self) -> Vec<Vec<f64>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TempoStretcher for MockStretcher {
    async fn stretch(&self, fragment: &Fragment, stages: &[f64]) -> Result<Fragment, AudioError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(stages.to_vec());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing {
            return Err(AudioError::Tool {
                tool: "ffmpeg".to_string(),
                message: "simulated failure".to_string(),
            });
        }

        let factor: f64 = stages.iter().product();
        let frames = seconds_to_frames(fragment.duration() / factor, fragment.sample_rate);
        let width = fragment.channels as usize;
        // Nearest-frame resampling is enough to model the length change
        let samples = (0..frames)
            .flat_map(|frame| {
                let source = ((frame as f64 * factor) as usize).min(fragment.frames().saturating_sub(1));
                fragment.samples[source * width..(source + 1) * width].to_vec()
            })
            .collect();

        Ok(Fragment::new(samples, fragment.sample_rate, fragment.channels))
    }
}
