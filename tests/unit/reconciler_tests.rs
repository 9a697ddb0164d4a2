/*!
 * Tests for duration reconciliation
 */

use std::sync::Arc;
use dubsync::app_config::ReconcilerConfig;
use dubsync::audio::Fragment;
use dubsync::narration::{decompose, tempo_factor, DurationReconciler, FitOutcome};
use dubsync::providers::mock::MockStretcher;
use dubsync::NarrationError;

use crate::common::TEST_SAMPLE_RATE;

fn fragment(seconds: f64) -> Fragment {
    Fragment::silence(seconds, TEST_SAMPLE_RATE, 1)
}

/// Test that the product of the stages stays within the unity band of the factor
#[test]
fn test_decompose_forManyFactors_shouldStayInRangeAndKeepProduct() {
    let config = ReconcilerConfig::default();
    let mut factor = 0.01;
    while factor < 40.0 {
        let stages = decompose(factor, &config).unwrap();
        for stage in &stages {
            assert!((0.5..=2.0).contains(stage), "stage {} out of range for {}", stage, factor);
        }
        let product: f64 = stages.iter().product();
        let ratio = factor / product;
        assert!((0.98..=1.02).contains(&ratio), "product {} too far from {}", product, factor);
        factor *= 1.37;
    }
}

/// Test the tempo factor direction
#[test]
fn test_tempo_factor_shouldBeNativeOverTarget() {
    assert_eq!(tempo_factor(3.0, 2.0).unwrap(), 1.5);
    assert_eq!(tempo_factor(1.0, 2.0).unwrap(), 0.5);
    assert!(matches!(tempo_factor(0.0, 2.0), Err(NarrationError::InvalidTempoFactor(_))));
}

/// Test that an on-target fragment is not touched
#[tokio::test]
async fn test_fit_withMatchingDuration_shouldAcceptWithoutStretching() {
    let stretcher = Arc::new(MockStretcher::working());
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), stretcher.clone());

    let (fitted, outcome) = reconciler.fit(fragment(1.0), 1.0).await.unwrap();

    assert_eq!(outcome, FitOutcome::Accepted);
    assert_eq!(fitted.duration(), 1.0);
    assert!(stretcher.calls().is_empty());
}

/// Test that a long fragment is stretched through chained stages
#[tokio::test]
async fn test_fit_withLongFragment_shouldStretchToTarget() {
    let stretcher = Arc::new(MockStretcher::working());
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), stretcher.clone());

    let (fitted, outcome) = reconciler.fit(fragment(5.0), 2.0).await.unwrap();

    assert!(matches!(outcome, FitOutcome::Stretched { .. }));
    assert!((fitted.duration() - 2.0).abs() < 0.01);
    let calls = stretcher.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0][0], 2.0);
    assert!((calls[0][1] - 1.25).abs() < 1e-9);
}

/// Test that a short fragment is slowed down
#[tokio::test]
async fn test_fit_withShortFragment_shouldSlowDown() {
    let stretcher = Arc::new(MockStretcher::working());
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), stretcher);

    let (fitted, _) = reconciler.fit(fragment(1.0), 1.6).await.unwrap();

    assert!((fitted.duration() - 1.6).abs() < 0.01);
}

/// Test the soft degradation when the stretch primitive fails
#[tokio::test]
async fn test_fit_withFailingStretcher_shouldKeepOriginal() {
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), Arc::new(MockStretcher::failing()));

    let (fitted, outcome) = reconciler.fit(fragment(3.0), 2.0).await.unwrap();

    assert!(matches!(outcome, FitOutcome::Degraded { .. }));
    assert_eq!(fitted.duration(), 3.0);
}

/// Test that zero-length windows are left alone
#[tokio::test]
async fn test_fit_withZeroWindow_shouldSkip() {
    let stretcher = Arc::new(MockStretcher::working());
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), stretcher.clone());

    let (_, outcome) = reconciler.fit(fragment(1.0), 0.0).await.unwrap();

    assert_eq!(outcome, FitOutcome::NoTarget);
    assert!(stretcher.calls().is_empty());
}

/// Test that an empty fragment yields an invalid tempo factor
#[tokio::test]
async fn test_fit_withEmptyFragment_shouldFailWithInvalidFactor() {
    let reconciler = DurationReconciler::new(ReconcilerConfig::default(), Arc::new(MockStretcher::working()));

    let result = reconciler.fit(fragment(0.0), 2.0).await;

    assert!(matches!(result, Err(NarrationError::InvalidTempoFactor(f)) if f == 0.0));
}

/// Test that custom thresholds change the acceptance decision
#[tokio::test]
async fn test_fit_withLooserThresholds_shouldAcceptMore() {
    let config = ReconcilerConfig {
        max_pct_deviation: 0.5,
        ..ReconcilerConfig::default()
    };
    let reconciler = DurationReconciler::new(config, Arc::new(MockStretcher::working()));

    let (_, outcome) = reconciler.fit(fragment(2.6), 2.0).await.unwrap();

    assert_eq!(outcome, FitOutcome::Accepted);
}
