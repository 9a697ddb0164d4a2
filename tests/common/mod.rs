/*!
 * Common test utilities for the dubsync test suite
 */

use std::path::{Path, PathBuf};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use tempfile::TempDir;

use dubsync::app_config::SpeechProvider;
use dubsync::audio::TempoStretcher;
use dubsync::narration::{EngineSettings, NarrationEngine, RetryPolicy};
use dubsync::providers::{SpeechSynthesizer, TextRepairer};
use dubsync::voices::{Voice, VoiceCatalog};

/// Low sample rate keeps test buffers small
pub const TEST_SAMPLE_RATE: u32 = 1_000;

/// Two back-to-back cues, the second one on two lines
pub const SAMPLE_TRANSCRIPT: &str = "1
00:00:00,000 --> 00:00:02,000
First line.

2
00:00:02,000 --> 00:00:04,000
Second line,
split in two.
";

/// Route library logs to the test output
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// First Gemini voice
pub fn test_voice() -> Voice {
    VoiceCatalog::for_provider(SpeechProvider::Gemini).by_index(0)
}

/// Engine settings with no waits between attempts
pub fn fast_settings() -> EngineSettings {
    EngineSettings {
        synthesis_retry: RetryPolicy::fixed(10, Duration::ZERO),
        repair_retry: RetryPolicy::fixed(5, Duration::ZERO),
        sample_rate: TEST_SAMPLE_RATE,
        channels: 1,
        ..EngineSettings::default()
    }
}

/// Engine over the given collaborators
pub fn engine_with(
    synthesizer: Arc<dyn SpeechSynthesizer>,
    repairer: Arc<dyn TextRepairer>,
    stretcher: Arc<dyn TempoStretcher>,
    settings: EngineSettings,
) -> NarrationEngine {
    NarrationEngine::new(synthesizer, repairer, stretcher, settings)
}
