/*!
 * Tests for timeline compositing
 */

use dubsync::audio::Fragment;
use dubsync::narration::composite;
use dubsync::transcript::Cue;
use dubsync::{AudioError, NarrationError};

use crate::common::TEST_SAMPLE_RATE;

fn tone(seconds: f64) -> Fragment {
    let frames = (seconds * TEST_SAMPLE_RATE as f64).round() as usize;
    Fragment::new(vec![500; frames], TEST_SAMPLE_RATE, 1)
}

/// Test the reference two-cue layout
#[test]
fn test_composite_withOverrunOnLastCue_shouldEndAtCueEnd() {
    let cues = vec![Cue::new(1, 0.0, 2.0, "A"), Cue::new(2, 2.0, 4.0, "B")];

    let timeline = composite(&cues, vec![Some(tone(1.9)), Some(tone(2.3))], TEST_SAMPLE_RATE, 1).unwrap();

    assert!((timeline.duration() - 4.0).abs() < 1e-9);
    assert_eq!(timeline.placed, 2);
}

/// Test that fragments start exactly at their cue offsets, whatever the cue order
#[test]
fn test_composite_withUnorderedCues_shouldPlaceByStartOffset() {
    let cues = vec![Cue::new(2, 3.0, 4.0, "later"), Cue::new(1, 1.0, 2.0, "earlier")];

    let timeline = composite(&cues, vec![Some(tone(0.5)), Some(tone(0.5))], TEST_SAMPLE_RATE, 1).unwrap();

    assert_eq!(timeline.samples[999], 0);
    assert_eq!(timeline.samples[1000], 500);
    assert_eq!(timeline.samples[1500], 0);
    assert_eq!(timeline.samples[3000], 500);
    assert!((timeline.duration() - 3.5).abs() < 1e-9);
}

/// Test that a short last fragment ends the timeline early
#[test]
fn test_composite_withShortLastFragment_shouldEndAtFragmentEnd() {
    let cues = vec![Cue::new(1, 0.0, 2.0, "A"), Cue::new(2, 2.0, 4.0, "B")];

    let timeline = composite(&cues, vec![Some(tone(1.0)), Some(tone(1.0))], TEST_SAMPLE_RATE, 1).unwrap();

    assert!((timeline.duration() - 3.0).abs() < 1e-9);
}

/// Test that a sample rate mismatch is rejected
#[test]
fn test_composite_withMismatchedRate_shouldFail() {
    let cues = vec![Cue::new(1, 0.0, 1.0, "A")];
    let fragment = Fragment::silence(0.5, 24_000, 1);

    let result = composite(&cues, vec![Some(fragment)], TEST_SAMPLE_RATE, 1);

    assert!(matches!(result, Err(NarrationError::Audio(AudioError::Format(_)))));
}

/// Test that all-empty input is fatal
#[test]
fn test_composite_withOnlyMissingFragments_shouldFail() {
    let cues = vec![Cue::new(1, 0.0, 1.0, ""), Cue::new(2, 1.0, 2.0, "")];
    let result = composite(&cues, vec![None, None], TEST_SAMPLE_RATE, 1);
    assert!(matches!(result, Err(NarrationError::NoFragmentsPlaced)));
}
