use log::debug;

use crate::audio::pcm::{seconds_to_frames, Fragment};
use crate::errors::{AudioError, NarrationError};
use crate::transcript::Cue;

// @module: Place cue fragments on one continuous track

/// The composited narration track for a whole job
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    // @field: Interleaved samples starting at t = 0
    pub samples: Vec<i16>,

    pub sample_rate: u32,

    pub channels: u16,

    // @field: Number of fragments that were placed
    pub placed: usize,
}

impl Timeline {
    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        (self.samples.len() / self.channels as usize) as f64 / self.sample_rate as f64
    }

    /// Hand the track over as a plain fragment for encoding
    pub fn into_fragment(self) -> Fragment {
        Fragment::new(self.samples, self.sample_rate, self.channels)
    }
}

/// Mix fragments onto a shared timeline at their cues' start offsets
///
/// `fragments[i]` belongs to `cues[i]`; `None` leaves the cue window silent.
/// A fragment longer than a positive cue window is cut at the cue's end frame
/// so it cannot run into the next cue. Overlapping samples are summed with
/// saturation.
pub fn composite(
    cues: &[Cue],
    fragments: Vec<Option<Fragment>>,
    sample_rate: u32,
    channels: u16,
) -> Result<Timeline, NarrationError> {
    let mut samples: Vec<i16> = Vec::new();
    let mut placed = 0;
    let width = channels as usize;

    for (cue, fragment) in cues.iter().zip(fragments) {
        let Some(mut fragment) = fragment else {
            continue;
        };
        if fragment.sample_rate != sample_rate || fragment.channels != channels {
            return Err(AudioError::Format(format!(
                "cue {} fragment is {} Hz/{} ch, timeline is {} Hz/{} ch",
                cue.index, fragment.sample_rate, fragment.channels, sample_rate, channels
            ))
            .into());
        }
        if fragment.is_empty() {
            continue;
        }

        // Both bounds are rounded the same way, so a cut fragment ends exactly on the cue's end frame
        let start_frame = seconds_to_frames(cue.start, sample_rate);
        let end_frame = seconds_to_frames(cue.end, sample_rate);
        if cue.window() > 0.0 {
            let window_frames = end_frame.saturating_sub(start_frame);
            if fragment.frames() > window_frames {
                debug!(
                    "Cue {}: truncating {:.3}s fragment to {} frames",
                    cue.index,
                    fragment.duration(),
                    window_frames
                );
                fragment.truncate_frames(window_frames);
            }
        }
        if fragment.is_empty() {
            continue;
        }

        let offset = start_frame * width;
        let end = offset + fragment.samples.len();
        if samples.len() < end {
            samples.resize(end, 0);
        }
        for (slot, sample) in samples[offset..end].iter_mut().zip(&fragment.samples) {
            *slot = slot.saturating_add(*sample);
        }
        placed += 1;
    }

    if placed == 0 {
        return Err(NarrationError::NoFragmentsPlaced);
    }

    Ok(Timeline {
        samples,
        sample_rate,
        channels,
        placed,
    })
}
