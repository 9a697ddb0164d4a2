use crate::errors::AudioError;

// @module: Raw PCM audio fragments

/// A block of signed 16-bit interleaved PCM samples
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    // @field: Interleaved samples
    pub samples: Vec<i16>,

    // @field: Samples per second per channel
    pub sample_rate: u32,

    // @field: Interleaved channel count
    pub channels: u16,
}

impl Fragment {
    pub fn new(samples: Vec<i16>, sample_rate: u32, channels: u16) -> Self {
        Fragment {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Decode little-endian signed 16-bit bytes
    ///
    /// A trailing odd byte is dropped since it cannot form a whole sample.
    pub fn from_le_bytes(bytes: &[u8], sample_rate: u32, channels: u16) -> Result<Self, AudioError> {
        if sample_rate == 0 || channels == 0 {
            return Err(AudioError::Format(format!(
                "invalid PCM layout: {} Hz, {} channels",
                sample_rate, channels
            )));
        }

        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();

        Ok(Fragment::new(samples, sample_rate, channels))
    }

    /// Encode the samples as little-endian bytes
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    /// Silent fragment of the given length
    pub fn silence(seconds: f64, sample_rate: u32, channels: u16) -> Self {
        let frames = seconds_to_frames(seconds, sample_rate);
        Fragment::new(vec![0; frames * channels as usize], sample_rate, channels)
    }

    /// Number of frames (one sample per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Cut the fragment down to at most `seconds`, keeping whole frames
    pub fn truncate_to(&mut self, seconds: f64) {
        self.truncate_frames(seconds_to_frames(seconds, self.sample_rate));
    }

    /// Keep at most `max_frames` frames
    pub fn truncate_frames(&mut self, max_frames: usize) {
        if max_frames < self.frames() {
            self.samples.truncate(max_frames * self.channels as usize);
        }
    }
}

/// Convert seconds to a whole frame count, rounding to the nearest frame
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> usize {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    (seconds * sample_rate as f64).round() as usize
}
