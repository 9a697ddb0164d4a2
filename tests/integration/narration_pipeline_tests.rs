/*!
 * End-to-end narration tests with mock providers
 */

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use dubsync::providers::mock::{MockBehavior, MockDuration, MockRepairer, MockStretcher, MockSynthesizer};
use dubsync::narration::EngineSettings;
use dubsync::NarrationError;

use crate::common::{self, engine_with, fast_settings, test_voice, SAMPLE_TRANSCRIPT, TEST_SAMPLE_RATE};

fn sample_lengths(first: f64, second: f64) -> MockDuration {
    MockDuration::PerText {
        lengths: vec![
            ("First line.".to_string(), first),
            ("Second line, split in two.".to_string(), second),
        ],
        fallback: 1.0,
    }
}

/// Test the reference layout: an accepted cue and a truncated overrun
#[tokio::test]
async fn test_narrate_withOverrunAndNoStretcher_shouldTruncateToWindow() {
    let synthesizer = Arc::new(MockSynthesizer::new(MockBehavior::Working, sample_lengths(1.9, 2.3), TEST_SAMPLE_RATE));
    let engine = engine_with(
        synthesizer.clone(),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::failing()),
        fast_settings(),
    );

    let (timeline, stats) = engine
        .narrate_with_stats(SAMPLE_TRANSCRIPT, &test_voice(), &CancellationToken::new())
        .await
        .unwrap();

    assert!((timeline.duration() - 4.0).abs() < 1e-9);
    assert_eq!(timeline.placed, 2);
    assert_eq!(stats.degraded, 1);
    assert_eq!(stats.repairs_used, 0);
    assert_eq!(synthesizer.request_count(), 2);
}

/// Test that the synthesizer receives whitespace-collapsed text and window hints
#[tokio::test]
async fn test_narrate_shouldSendCollapsedTextWithHints() {
    let synthesizer = Arc::new(MockSynthesizer::new(
        MockBehavior::Working,
        MockDuration::FollowHint { fallback: 1.0 },
        TEST_SAMPLE_RATE,
    ));
    let engine = engine_with(
        synthesizer.clone(),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    engine.narrate(SAMPLE_TRANSCRIPT, &test_voice(), &CancellationToken::new()).await.unwrap();

    let requests = synthesizer.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "First line.");
    assert_eq!(requests[1].0, "Second line, split in two.");
    for (_, hint) in requests {
        assert!((hint.unwrap() - 1.92).abs() < 1e-9);
    }
}

/// Test that a stretched fragment lands inside its window
#[tokio::test]
async fn test_narrate_withLongFragment_shouldCountStretch() {
    let synthesizer = Arc::new(MockSynthesizer::new(MockBehavior::Working, sample_lengths(2.0, 3.0), TEST_SAMPLE_RATE));
    let stretcher = Arc::new(MockStretcher::working());
    let engine = engine_with(synthesizer, Arc::new(MockRepairer::failing()), stretcher.clone(), fast_settings());

    let (timeline, stats) = engine
        .narrate_with_stats(SAMPLE_TRANSCRIPT, &test_voice(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(stats.stretched, 1);
    assert_eq!(stats.degraded, 0);
    assert_eq!(stretcher.calls(), vec![vec![1.5]]);
    assert!((timeline.duration() - 4.0).abs() < 1e-9);
}

/// Test that transient failures are retried
#[tokio::test]
async fn test_narrate_withTransientFailures_shouldRetryAndSucceed() {
    let synthesizer = Arc::new(MockSynthesizer::fail_first(3, 1.0, TEST_SAMPLE_RATE));
    let engine = engine_with(
        synthesizer.clone(),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let result = engine.narrate(SAMPLE_TRANSCRIPT, &test_voice(), &CancellationToken::new()).await;

    assert!(result.is_ok());
    assert_eq!(synthesizer.request_count(), 5);
}

/// Test that a cue that never synthesizes fails the whole job
#[tokio::test]
async fn test_narrate_withPermanentFailure_shouldFailAfterTenAttempts() {
    crate::common::init_test_logging();
    let synthesizer = Arc::new(MockSynthesizer::failing(TEST_SAMPLE_RATE));
    let engine = engine_with(
        synthesizer.clone(),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );
    let single = "7\n00:00:01,000 --> 00:00:02,000\nOnly cue";

    let result = engine.narrate(single, &test_voice(), &CancellationToken::new()).await;

    match result {
        Err(NarrationError::SynthesisExhausted { cue_index, attempts, .. }) => {
            assert_eq!(cue_index, 7);
            assert_eq!(attempts, 10);
        }
        other => panic!("expected SynthesisExhausted, got {:?}", other.map(|t| t.duration())),
    }
    assert_eq!(synthesizer.request_count(), 10);
}

/// Test that the fixed delay between synthesis attempts is honored
#[tokio::test(start_paused = true)]
async fn test_narrate_withDefaultRetryDelay_shouldWaitBetweenAttempts() {
    let synthesizer = Arc::new(MockSynthesizer::fail_first(2, 1.0, TEST_SAMPLE_RATE));
    let settings = EngineSettings {
        sample_rate: TEST_SAMPLE_RATE,
        channels: 1,
        ..EngineSettings::default()
    };
    let engine = engine_with(synthesizer, Arc::new(MockRepairer::failing()), Arc::new(MockStretcher::working()), settings);
    let single = "1\n00:00:00,000 --> 00:00:01,000\nHello";

    let started = tokio::time::Instant::now();
    engine.narrate(single, &test_voice(), &CancellationToken::new()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_secs(60));
}

/// Test cancellation while a synthesis call is in flight
#[tokio::test]
async fn test_narrate_whenCancelledMidJob_shouldReturnCancelled() {
    let synthesizer = Arc::new(MockSynthesizer::new(
        MockBehavior::Slow { delay_ms: 30_000 },
        MockDuration::Fixed(1.0),
        TEST_SAMPLE_RATE,
    ));
    let engine = engine_with(synthesizer, Arc::new(MockRepairer::failing()), Arc::new(MockStretcher::working()), fast_settings());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine.narrate(SAMPLE_TRANSCRIPT, &test_voice(), &cancel),
    )
    .await
    .expect("cancellation should end the job promptly");

    assert!(matches!(result, Err(NarrationError::Cancelled)));
}

/// Test cancellation while a fragment is being tempo-fitted
#[tokio::test]
async fn test_narrate_whenCancelledDuringStretch_shouldReturnCancelled() {
    let stretcher = Arc::new(MockStretcher::slow(30_000));
    let engine = engine_with(
        Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE)),
        Arc::new(MockRepairer::failing()),
        stretcher.clone(),
        fast_settings(),
    );
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        engine.narrate(SAMPLE_TRANSCRIPT, &test_voice(), &cancel),
    )
    .await
    .expect("cancellation should interrupt the stretch");

    assert!(matches!(result, Err(NarrationError::Cancelled)));
    assert_eq!(stretcher.calls().len(), 1);
}

/// Test that an already-cancelled job makes no provider call
#[tokio::test]
async fn test_narrate_withCancelledToken_shouldNotCallProviders() {
    let synthesizer = Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE));
    let repairer = Arc::new(MockRepairer::failing());
    let engine = engine_with(synthesizer.clone(), repairer.clone(), Arc::new(MockStretcher::working()), fast_settings());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine.narrate("garbage", &test_voice(), &cancel).await;

    assert!(matches!(result, Err(NarrationError::Cancelled)));
    assert_eq!(synthesizer.request_count(), 0);
    assert_eq!(repairer.request_count(), 0);
}

/// Test that concurrent synthesis still places each fragment at its own cue
#[tokio::test]
async fn test_narrate_withConcurrency_shouldKeepPlacement() {
    let synthesizer = Arc::new(MockSynthesizer::new(MockBehavior::Working, sample_lengths(0.5, 1.0), TEST_SAMPLE_RATE));
    let settings = EngineSettings {
        max_concurrent: 4,
        ..fast_settings()
    };
    let engine = engine_with(synthesizer, Arc::new(MockRepairer::failing()), Arc::new(MockStretcher::failing()), settings);

    let timeline = engine.narrate(SAMPLE_TRANSCRIPT, &test_voice(), &CancellationToken::new()).await.unwrap();

    // 0.5s at 0s, silence, then 1.0s at 2s
    assert_eq!(timeline.samples[499], 1000);
    assert_eq!(timeline.samples[500], 0);
    assert_eq!(timeline.samples[2000], 1000);
    assert!((timeline.duration() - 3.0).abs() < 1e-9);
}

/// Test that a reversed cue is rejected before any synthesis
#[tokio::test]
async fn test_narrate_withReversedCue_shouldFailWithInvalidTiming() {
    let synthesizer = Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE));
    let engine = engine_with(synthesizer.clone(), Arc::new(MockRepairer::failing()), Arc::new(MockStretcher::working()), fast_settings());
    let reversed = "1\n00:00:03,000 --> 00:00:01,000\nBackwards";

    let result = engine.narrate(reversed, &test_voice(), &CancellationToken::new()).await;

    assert!(matches!(result, Err(NarrationError::InvalidCueTiming { index: 1, .. })));
    assert_eq!(synthesizer.request_count(), 0);
}

/// Test the parsed transcript file helper against the engine
#[tokio::test]
async fn test_narrate_fromFile_shouldMatchInlineText() {
    let dir = common::create_temp_dir().unwrap();
    let path = common::create_test_file(dir.path(), "talk.srt", SAMPLE_TRANSCRIPT).unwrap();
    let raw = std::fs::read_to_string(path).unwrap();
    let engine = engine_with(
        Arc::new(MockSynthesizer::working(1.0, TEST_SAMPLE_RATE)),
        Arc::new(MockRepairer::failing()),
        Arc::new(MockStretcher::working()),
        fast_settings(),
    );

    let timeline = engine.narrate(&raw, &test_voice(), &CancellationToken::new()).await.unwrap();

    assert!((timeline.duration() - 4.0).abs() < 1e-9);
}
