use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::process::Command;
use uuid::Uuid;

use crate::audio::pcm::Fragment;
use crate::audio::wav::{read_wav, write_wav};
use crate::errors::AudioError;

// @module: Pitch-preserving tempo change through ffmpeg

/// Changes the playback rate of a fragment without shifting its pitch
///
/// `stages` are applied in order; their product is the overall tempo factor.
/// A factor above 1.0 shortens the audio.
#[async_trait]
pub trait TempoStretcher: Send + Sync {
    async fn stretch(&self, fragment: &Fragment, stages: &[f64]) -> Result<Fragment, AudioError>;
}

/// Render stages as an ffmpeg audio filter chain
pub fn atempo_filter(stages: &[f64]) -> String {
    stages
        .iter()
        .map(|s| format!("atempo={:.6}", s))
        .collect::<Vec<_>>()
        .join(",")
}

/// Tempo stretcher backed by the ffmpeg `atempo` filter
#[derive(Debug, Clone)]
pub struct FfmpegStretcher {
    ffmpeg_path: String,
    scratch_dir: PathBuf,
    timeout: Duration,
}

impl FfmpegStretcher {
    pub fn new(ffmpeg_path: impl Into<String>, scratch_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        FfmpegStretcher {
            ffmpeg_path: ffmpeg_path.into(),
            scratch_dir: scratch_dir.into(),
            timeout,
        }
    }
}

#[async_trait]
impl TempoStretcher for FfmpegStretcher {
    async fn stretch(&self, fragment: &Fragment, stages: &[f64]) -> Result<Fragment, AudioError> {
        if stages.is_empty() {
            return Ok(fragment.clone());
        }

        let stem = Uuid::new_v4().to_string();
        let input = self.scratch_dir.join(format!("{}_in.wav", stem));
        let output = self.scratch_dir.join(format!("{}_out.wav", stem));

        let result = self.run_ffmpeg(fragment, stages, &input, &output).await;

        // Scratch files go away on every path, including a failed write
        for path in [&input, &output] {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Could not remove scratch file {:?}: {}", path, e);
                }
            }
        }

        result
    }
}

impl FfmpegStretcher {
    async fn run_ffmpeg(
        &self,
        fragment: &Fragment,
        stages: &[f64],
        input: &Path,
        output: &Path,
    ) -> Result<Fragment, AudioError> {
        let owned = fragment.clone();
        let input_path = input.to_path_buf();
        tokio::task::spawn_blocking(move || write_wav(&input_path, &owned))
            .await
            .map_err(join_error)??;

        let filter = atempo_filter(stages);
        debug!("Stretching {:.3}s fragment with {}", fragment.duration(), filter);

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .arg("-hide_banner")
            .arg("-loglevel").arg("error")
            .arg("-y")
            .arg("-i").arg(input)
            .arg("-filter:a").arg(&filter)
            .arg("-ar").arg(fragment.sample_rate.to_string())
            .arg("-ac").arg(fragment.channels.to_string())
            .arg("-c:a").arg("pcm_s16le")
            .arg(output);
        run_tool("ffmpeg", command, self.timeout).await?;

        let output_path = output.to_path_buf();
        tokio::task::spawn_blocking(move || read_wav(&output_path))
            .await
            .map_err(join_error)?
    }
}

fn join_error(e: tokio::task::JoinError) -> AudioError {
    AudioError::Io(std::io::Error::other(format!("WAV task failed: {}", e)))
}

/// Measure the duration of an audio file with ffprobe
pub async fn probe_duration<P: AsRef<Path>>(
    ffprobe_path: &str,
    path: P,
    timeout: Duration,
) -> Result<f64, AudioError> {
    let mut command = Command::new(ffprobe_path);
    command
        .arg("-v").arg("error")
        .arg("-show_entries").arg("format=duration")
        .arg("-of").arg("default=noprint_wrappers=1:nokey=1")
        .arg(path.as_ref());

    let output = run_tool("ffprobe", command, timeout).await?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.trim().parse::<f64>().map_err(|e| AudioError::Tool {
        tool: "ffprobe".to_string(),
        message: format!("unparseable duration {:?}: {}", text.trim(), e),
    })
}

/// Check that an external tool can be spawned
pub async fn tool_available(path: &str) -> bool {
    let mut command = Command::new(path);
    command.arg("-version");
    run_tool(path, command, Duration::from_secs(10)).await.is_ok()
}

async fn run_tool(tool: &str, mut command: Command, timeout: Duration) -> Result<Output, AudioError> {
    command.kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(|e| AudioError::Tool {
            tool: tool.to_string(),
            message: format!("could not start: {}", e),
        })?,
        Err(_) => {
            return Err(AudioError::Timeout {
                tool: tool.to_string(),
                secs: timeout.as_secs(),
            })
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AudioError::Tool {
            tool: tool.to_string(),
            message: format!("exited with {}: {}", output.status, stderr.trim()),
        });
    }

    Ok(output)
}
