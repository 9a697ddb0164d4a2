/*!
 * Tests for the application controller
 */

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use dubsync::app_config::Config;
use dubsync::app_controller::Controller;
use dubsync::audio::wav::read_wav;
use dubsync::providers::mock::{MockRepairer, MockStretcher, MockSynthesizer};

use crate::common::{self, engine_with, fast_settings, test_voice, SAMPLE_TRANSCRIPT, TEST_SAMPLE_RATE};

/// Test the offline check
#[test]
fn test_check_withSampleFile_shouldReportCues() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "talk.srt", SAMPLE_TRANSCRIPT).unwrap();
    let controller = Controller::with_config(Config::default()).unwrap();

    let report = controller.check(&path).unwrap();

    assert_eq!(report.cues, 2);
    assert_eq!(report.rejected_blocks, 0);
    assert!((report.end_time - 4.0).abs() < 1e-9);
    assert!(report.defects.is_empty());
}

/// Test canonical rendering of short timestamps
#[test]
fn test_canonical_srt_withShortTimestamps_shouldUseFullGrammar() {
    let srt = Controller::canonical_srt("```srt\n1\n01:05.250 --> 01:06:000\nHi\n```");
    assert_eq!(srt, "1\n00:01:05,250 --> 00:01:06,000\nHi\n\n");
}

/// Test that the default voice comes from the catalog
#[test]
fn test_resolve_voice_withDefaults_shouldPickKore() {
    let controller = Controller::with_config(Config::default()).unwrap();
    assert_eq!(controller.resolve_voice().name, "Kore");
}

/// Test that a finished job writes a readable WAV file
#[tokio::test]
async fn test_narrate_to_file_shouldWriteTimeline() {
    let dir = common::create_temp_dir().unwrap();
    let output = dir.path().join("out").join("talk.narration.wav");
    let controller = Controller::with_config(Config::default()).unwrap();
    let engine = engine_with(
        Arc::new(MockSynthesizer::working(1.5, TEST_SAMPLE_RATE)),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let track = controller
        .narrate_to_file(&engine, SAMPLE_TRANSCRIPT, &test_voice(), &output, &CancellationToken::new())
        .await
        .unwrap();

    let written = read_wav(&output).unwrap();
    assert_eq!(written, track);
    assert!((written.duration() - 4.0).abs() < 1e-9);
}

/// Test that a failed job leaves no output behind
#[tokio::test]
async fn test_narrate_to_file_withFailingJob_shouldNotWrite() {
    let dir = common::create_temp_dir().unwrap();
    let output = dir.path().join("talk.narration.wav");
    let controller = Controller::with_config(Config::default()).unwrap();
    let engine = engine_with(
        Arc::new(MockSynthesizer::failing(TEST_SAMPLE_RATE)),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let result = controller
        .narrate_to_file(&engine, SAMPLE_TRANSCRIPT, &test_voice(), &output, &CancellationToken::new())
        .await;

    assert!(result.is_err());
    assert!(!output.exists());
}

/// Test that run refuses to overwrite without force
#[tokio::test]
async fn test_run_withExistingOutput_shouldRefuse() {
    let dir = common::create_temp_dir().unwrap();
    let input = common::create_test_file(dir.path(), "talk.srt", SAMPLE_TRANSCRIPT).unwrap();
    let output = common::create_test_file(dir.path(), "talk.narration.wav", "old").unwrap();
    let controller = Controller::with_config(Config::default()).unwrap();

    let result = controller.run(input, output.clone(), false, CancellationToken::new()).await;

    assert!(result.is_err());
    assert_eq!(std::fs::read_to_string(output).unwrap(), "old");
}
