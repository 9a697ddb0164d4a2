use std::path::Path;
use std::io::Cursor;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::debug;

use crate::audio::pcm::Fragment;
use crate::errors::AudioError;

// @module: WAV container I/O for 16-bit PCM

fn spec_for(fragment: &Fragment) -> WavSpec {
    WavSpec {
        channels: fragment.channels,
        sample_rate: fragment.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write a fragment to disk as a 16-bit PCM WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, fragment: &Fragment) -> Result<(), AudioError> {
    let path = path.as_ref();
    let mut writer = WavWriter::create(path, spec_for(fragment))?;
    for sample in &fragment.samples {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;
    debug!("Wrote {:.3}s of audio to {:?}", fragment.duration(), path);
    Ok(())
}

/// Encode a fragment as in-memory WAV bytes
pub fn encode_wav(fragment: &Fragment) -> Result<Vec<u8>, AudioError> {
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec_for(fragment))?;
        for sample in &fragment.samples {
            writer.write_sample(*sample)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Read a 16-bit integer PCM WAV file
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<Fragment, AudioError> {
    let reader = WavReader::open(path.as_ref())?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(AudioError::Format(format!(
            "expected 16-bit integer PCM, found {:?} {}-bit",
            spec.sample_format, spec.bits_per_sample
        )));
    }

    let samples = reader
        .into_samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Fragment::new(samples, spec.sample_rate, spec.channels))
}
