use anyhow::{Result, Context, anyhow};
use log::{debug, warn, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::app_config::Config;
use crate::audio::Fragment;
use crate::audio::tempo::{probe_duration, tool_available, FfmpegStretcher};
use crate::audio::wav::write_wav;
use crate::errors::CueError;
use crate::file_utils::{FileManager, JobWorkspace};
use crate::narration::{EngineSettings, NarrationEngine, ProgressSink, Timeline};
use crate::providers::{create_repairer, create_synthesizer};
use crate::transcript::{self, Cue};
use crate::voices::{Voice, VoiceCatalog};

// @module: Application controller for narration jobs

/// Result of checking a transcript without synthesizing it
#[derive(Debug, Clone)]
pub struct CheckReport {
    pub cues: usize,
    pub rejected_blocks: usize,
    pub end_time: f64,
    pub defects: Vec<CueError>,
}

/// Progress sink drawing an indicatif bar
pub struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} cues ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        BarProgress { bar }
    }
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for BarProgress {
    fn on_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_message("Synthesizing");
    }

    fn on_cue_done(&self, cue: &Cue, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
        self.bar.set_message(format!("cue {}", cue.index));
    }

    fn on_finish(&self, _timeline: &Timeline) {
        self.bar.finish_and_clear();
    }
}

/// Main application controller for narration
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Voice for the configured provider, resolved from the catalog
    pub fn resolve_voice(&self) -> Voice {
        VoiceCatalog::for_provider(self.config.synthesis.provider).resolve(&self.config.synthesis.voice)
    }

    /// Parse a transcript file and report its defects without any network call
    pub fn check(&self, input_file: &Path) -> Result<CheckReport> {
        let raw = FileManager::read_to_string(input_file)?;
        Ok(Self::check_text(&raw))
    }

    pub fn check_text(raw: &str) -> CheckReport {
        let report = transcript::parse_with_report(&transcript::normalize(raw));
        let parsed = transcript::Transcript::new(report.cues);
        CheckReport {
            cues: parsed.len(),
            rejected_blocks: report.rejected_blocks,
            end_time: parsed.end_time(),
            defects: parsed.timing_defects(),
        }
    }

    /// Parsed cues rendered back as canonical `HH:MM:SS,mmm` SRT
    pub fn canonical_srt(raw: &str) -> String {
        transcript::Transcript::parse(&transcript::normalize(raw)).to_srt()
    }

    /// Build an engine backed by the configured providers and ffmpeg
    pub fn build_engine(&self, workspace: &JobWorkspace) -> Result<NarrationEngine> {
        let synthesizer = create_synthesizer(&self.config)
            .context("Failed to create speech provider")?;
        let repairer = create_repairer(&self.config)
            .context("Failed to create repair provider")?;
        let stretcher = Arc::new(FfmpegStretcher::new(
            self.config.audio.ffmpeg_path.clone(),
            workspace.path(),
            Duration::from_secs(self.config.audio.tool_timeout_secs),
        ));

        Ok(NarrationEngine::new(synthesizer, repairer, stretcher, EngineSettings::from_config(&self.config)))
    }

    /// Run a narration job from a transcript file to a WAV file
    pub async fn run(
        &self,
        input_file: PathBuf,
        output_file: PathBuf,
        force_overwrite: bool,
        cancel: CancellationToken,
    ) -> Result<PathBuf> {
        let start_time = std::time::Instant::now();

        if !FileManager::file_exists(&input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }
        if output_file.exists() && !force_overwrite {
            return Err(anyhow!("Output file already exists: {:?} (use -f to overwrite)", output_file));
        }

        if !tool_available(&self.config.audio.ffmpeg_path).await {
            warn!(
                "'{}' is not runnable; fragments that miss their window will be kept unfitted",
                self.config.audio.ffmpeg_path
            );
        }

        let raw = FileManager::read_to_string(&input_file)?;
        let voice = self.resolve_voice();
        let workspace = JobWorkspace::create(self.config.work_dir.as_deref().map(Path::new))?;
        info!(
            "Job {}: {} - {} ({})",
            workspace.job_id(),
            self.config.synthesis.provider.display_name(),
            self.config.synthesis.get_model(),
            voice
        );

        let engine = self.build_engine(&workspace)?
            .with_progress(Arc::new(BarProgress::new()));
        let track = self.narrate_to_file(&engine, &raw, &voice, &output_file, &cancel).await?;

        let timeout = Duration::from_secs(self.config.audio.tool_timeout_secs);
        match probe_duration(&self.config.audio.ffprobe_path, &output_file, timeout).await {
            Ok(probed) => debug!("ffprobe: {:.3}s on disk, {:.3}s composited", probed, track.duration()),
            Err(e) => debug!("Could not measure output duration: {}", e),
        }

        workspace.close()?;
        info!("Success: {:?} ({:.1}s)", output_file, start_time.elapsed().as_secs_f64());
        Ok(output_file)
    }

    /// Run an engine over caption text and write the timeline, returning the written track
    ///
    /// Nothing is written when the job fails or is cancelled.
    pub async fn narrate_to_file(
        &self,
        engine: &NarrationEngine,
        raw: &str,
        voice: &Voice,
        output_file: &Path,
        cancel: &CancellationToken,
    ) -> Result<Fragment> {
        let timeline = engine.narrate(raw, voice, cancel).await?;

        if let Some(parent) = output_file.parent() {
            FileManager::ensure_dir(parent)?;
        }
        let track = timeline.into_fragment();
        write_wav(output_file, &track)
            .with_context(|| format!("Failed to write narration to {:?}", output_file))?;

        Ok(track)
    }
}
