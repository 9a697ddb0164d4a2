/*!
 * Audio primitives for the narration pipeline.
 *
 * - `pcm`: in-memory 16-bit PCM fragments
 * - `wav`: WAV container I/O through hound
 * - `tempo`: pitch-preserving tempo change through ffmpeg
 */

pub mod pcm;
pub mod tempo;
pub mod wav;

pub use pcm::Fragment;
pub use tempo::{FfmpegStretcher, TempoStretcher};
