use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use futures::future::try_join_all;
use log::{debug, info};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::app_config::{Config, ReconcilerConfig};
use crate::audio::{Fragment, TempoStretcher};
use crate::errors::{CueError, NarrationError};
use crate::narration::compositor::{composite, Timeline};
use crate::narration::reconciler::{DurationReconciler, FitOutcome};
use crate::narration::repair::parse_or_repair;
use crate::narration::retry::RetryPolicy;
use crate::narration::synthesizer::CueSynthesizer;
use crate::providers::{SpeechSynthesizer, TextRepairer};
use crate::transcript::{Cue, Transcript};
use crate::voices::Voice;

/// Receives progress notifications from a running job
pub trait ProgressSink: Send + Sync {
    /// The transcript parsed into `total` cues
    fn on_start(&self, _total: usize) {}

    /// One more cue finished synthesis and fitting
    fn on_cue_done(&self, _cue: &Cue, _done: usize, _total: usize) {}

    /// The timeline was built
    fn on_finish(&self, _timeline: &Timeline) {}
}

/// Progress sink that ignores everything
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Tunables for one engine, usually taken from the configuration file
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub synthesis_retry: RetryPolicy,
    pub repair_retry: RetryPolicy,
    pub hint_margin_secs: f64,
    pub min_hint_secs: f64,
    pub max_concurrent: usize,
    pub reconciler: ReconcilerConfig,
    pub sample_rate: u32,
    pub channels: u16,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        EngineSettings {
            synthesis_retry: RetryPolicy::from_config(&config.synthesis.retry),
            repair_retry: RetryPolicy::from_config(&config.repair.retry),
            hint_margin_secs: config.synthesis.hint_margin_secs,
            min_hint_secs: config.synthesis.min_hint_secs,
            max_concurrent: config.synthesis.max_concurrent,
            reconciler: config.reconciler.clone(),
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings::from_config(&Config::default())
    }
}

/// Per-job counters logged when a narration finishes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrationStats {
    pub cues: usize,
    pub silent: usize,
    pub stretched: usize,
    pub degraded: usize,
    pub repairs_used: u32,
}

/// Turns caption text into one narration track
///
/// The engine owns its collaborators; nothing is shared between jobs except
/// what the caller passes in.
pub struct NarrationEngine {
    synthesizer: CueSynthesizer,
    repairer: Arc<dyn TextRepairer>,
    reconciler: DurationReconciler,
    settings: EngineSettings,
    progress: Arc<dyn ProgressSink>,
}

impl NarrationEngine {
    pub fn new(
        backend: Arc<dyn SpeechSynthesizer>,
        repairer: Arc<dyn TextRepairer>,
        stretcher: Arc<dyn TempoStretcher>,
        settings: EngineSettings,
    ) -> Self {
        let synthesizer = CueSynthesizer::new(
            backend,
            settings.synthesis_retry.clone(),
            settings.hint_margin_secs,
            settings.min_hint_secs,
            settings.sample_rate,
            settings.channels,
        );
        let reconciler = DurationReconciler::new(settings.reconciler.clone(), stretcher);

        NarrationEngine {
            synthesizer,
            repairer,
            reconciler,
            settings,
            progress: Arc::new(NoProgress),
        }
    }

    /// Attach a progress sink
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Run a whole job: repair, synthesize, fit and composite
    pub async fn narrate(
        &self,
        raw_text: &str,
        voice: &Voice,
        cancel: &CancellationToken,
    ) -> Result<Timeline, NarrationError> {
        self.narrate_with_stats(raw_text, voice, cancel).await.map(|(timeline, _)| timeline)
    }

    /// Like `narrate`, also returning per-job counters
    pub async fn narrate_with_stats(
        &self,
        raw_text: &str,
        voice: &Voice,
        cancel: &CancellationToken,
    ) -> Result<(Timeline, NarrationStats), NarrationError> {
        if cancel.is_cancelled() {
            return Err(NarrationError::Cancelled);
        }

        let repaired = parse_or_repair(raw_text, self.repairer.as_ref(), &self.settings.repair_retry, cancel).await?;
        let transcript = repaired.transcript;
        check_timing(&transcript)?;

        let total = transcript.len();
        info!(
            "Narrating {} cues ({:.3}s) with {} voice {}",
            total,
            transcript.end_time(),
            self.synthesizer.backend_name(),
            voice.name
        );
        self.progress.on_start(total);

        let permits = Semaphore::new(self.settings.max_concurrent.max(1));
        let done = AtomicUsize::new(0);

        let jobs = transcript.cues.iter().map(|cue| {
            let permits = &permits;
            let done = &done;
            async move {
                let _permit = permits.acquire().await.map_err(|_| NarrationError::Cancelled)?;
                if cancel.is_cancelled() {
                    return Err(NarrationError::Cancelled);
                }
                let result = self.process_cue(cue, voice, cancel).await?;
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                self.progress.on_cue_done(cue, finished, total);
                Ok::<_, NarrationError>(result)
            }
        });
        let results = try_join_all(jobs).await?;

        // Already-finished fragments are dropped along with the results
        if cancel.is_cancelled() {
            return Err(NarrationError::Cancelled);
        }

        let mut stats = NarrationStats {
            cues: total,
            repairs_used: repaired.repairs_used,
            ..NarrationStats::default()
        };
        let mut fragments = Vec::with_capacity(total);
        for (fragment, outcome) in results {
            match outcome {
                Some(FitOutcome::Stretched { .. }) => stats.stretched += 1,
                Some(FitOutcome::Degraded { .. }) => stats.degraded += 1,
                None => stats.silent += 1,
                _ => {}
            }
            fragments.push(fragment);
        }

        let timeline = composite(&transcript.cues, fragments, self.settings.sample_rate, self.settings.channels)?;
        info!(
            "Timeline ready: {:.3}s, {} fragments placed, {} silent, {} stretched, {} kept unfitted",
            timeline.duration(),
            timeline.placed,
            stats.silent,
            stats.stretched,
            stats.degraded
        );
        self.progress.on_finish(&timeline);

        Ok((timeline, stats))
    }

    async fn process_cue(
        &self,
        cue: &Cue,
        voice: &Voice,
        cancel: &CancellationToken,
    ) -> Result<(Option<Fragment>, Option<FitOutcome>), NarrationError> {
        let Some(fragment) = self.synthesizer.synthesize_cue(cue, voice, cancel).await? else {
            return Ok((None, None));
        };

        // Dropping the fit future kills a running ffmpeg
        let (fitted, outcome) = tokio::select! {
            _ = cancel.cancelled() => return Err(NarrationError::Cancelled),
            fitted = self.reconciler.fit(fragment, cue.window()) => fitted?,
        };
        debug!("Cue {}: {:?}", cue.index, outcome);
        Ok((Some(fitted), Some(outcome)))
    }
}

/// Reject cues that end before they start
pub fn check_timing(transcript: &Transcript) -> Result<(), NarrationError> {
    for cue in &transcript.cues {
        match cue.validate() {
            Ok(()) => {}
            Err(CueError::EndBeforeStart { index, start, end }) => {
                return Err(NarrationError::InvalidCueTiming { index, start, end });
            }
            Err(_) => {
                return Err(NarrationError::InvalidCueTiming {
                    index: cue.index,
                    start: cue.start,
                    end: cue.end,
                });
            }
        }
    }
    Ok(())
}
