/*!
 * Tests for the transcript repair loop
 */

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use dubsync::narration::repair::{parse_or_repair, RepairAttemptError};
use dubsync::narration::RetryPolicy;
use dubsync::providers::mock::{MockRepairer, MockStretcher, MockSynthesizer};
use dubsync::NarrationError;

use crate::common::{engine_with, fast_settings, test_voice, SAMPLE_TRANSCRIPT, TEST_SAMPLE_RATE};

/// Timestamps without milliseconds do not parse
const MALFORMED: &str = "1\n00:00:00 --> 00:00:02\nFirst line.\n\n2\n00:00:02 --> 00:00:04\nSecond line.";

fn policy() -> RetryPolicy {
    RetryPolicy::fixed(5, Duration::ZERO)
}

/// Test that one successful repair is enough
#[tokio::test]
async fn test_parse_or_repair_withMalformedText_shouldUseRepairedText() {
    let repairer = MockRepairer::returning(SAMPLE_TRANSCRIPT);

    let repaired = parse_or_repair(MALFORMED, &repairer, &policy(), &CancellationToken::new()).await.unwrap();

    assert_eq!(repaired.transcript.len(), 2);
    assert_eq!(repaired.repairs_used, 1);
    assert_eq!(repairer.request_count(), 1);
}

/// Test that fenced output from the repair service is accepted
#[tokio::test]
async fn test_parse_or_repair_withFencedAnswer_shouldStripFences() {
    let repairer = MockRepairer::returning(format!("```srt\n{}\n```", SAMPLE_TRANSCRIPT));

    let repaired = parse_or_repair(MALFORMED, &repairer, &policy(), &CancellationToken::new()).await.unwrap();

    assert_eq!(repaired.transcript.cues[1].text, "Second line,\nsplit in two.");
}

/// Test that blank, failed and still-broken answers each use an attempt
#[tokio::test]
async fn test_parse_or_repair_withMixedFailures_shouldKeepTrying() {
    crate::common::init_test_logging();
    let repairer = MockRepairer::new(vec![
        Ok("   \n ".to_string()),
        Err("timeout".to_string()),
        Ok(MALFORMED.to_string()),
        Ok(SAMPLE_TRANSCRIPT.to_string()),
    ]);

    let repaired = parse_or_repair(MALFORMED, &repairer, &policy(), &CancellationToken::new()).await.unwrap();

    assert_eq!(repaired.repairs_used, 4);
}

/// Test exhaustion after the fifth attempt
#[tokio::test]
async fn test_parse_or_repair_withUselessRepairs_shouldFailAfterFive() {
    let repairer = MockRepairer::returning("still nothing useful");

    let result = parse_or_repair("nonsense", &repairer, &policy(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(NarrationError::RepairExhausted { attempts: 5, last_error: RepairAttemptError::Unparseable { rejected_blocks: 1 } })
    ));
    assert_eq!(repairer.request_count(), 5);
}

/// Test that a blank last answer is reported as such
#[tokio::test]
async fn test_parse_or_repair_withBlankAnswers_shouldReportBlank() {
    let repairer = MockRepairer::returning(" \n ");

    let result = parse_or_repair(MALFORMED, &repairer, &policy(), &CancellationToken::new()).await;

    assert!(matches!(
        result,
        Err(NarrationError::RepairExhausted { last_error: RepairAttemptError::Blank, .. })
    ));
}

/// Test that the engine never synthesizes an unrepairable transcript
#[tokio::test]
async fn test_narrate_withUnrepairableText_shouldNotSynthesize() {
    let synthesizer = Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE));
    let engine = engine_with(
        synthesizer.clone(),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let result = engine.narrate(MALFORMED, &test_voice(), &CancellationToken::new()).await;

    match result {
        Err(NarrationError::RepairExhausted { attempts, last_error: RepairAttemptError::Provider(e) }) => {
            assert_eq!(attempts, 5);
            assert!(e.to_string().contains("Simulated repair failure"));
        }
        other => panic!("expected a provider-caused RepairExhausted, got {:?}", other.map(|t| t.duration())),
    }
    assert_eq!(synthesizer.request_count(), 0);
}

/// Test that repairs are reported in the job stats
#[tokio::test]
async fn test_narrate_withRepairedText_shouldReportRepairs() {
    let engine = engine_with(
        Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE)),
        Arc::new(MockRepairer::returning(SAMPLE_TRANSCRIPT)),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let (_, stats) = engine
        .narrate_with_stats(MALFORMED, &test_voice(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.repairs_used, 1);
    assert_eq!(stats.cues, 2);
}
