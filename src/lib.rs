/*!
 * # dubsync - Caption-Synchronized Narration
 *
 * A Rust library that turns subtitle cues into one narration track whose
 * lines start on their cues and never run into the next cue.
 *
 * ## Features
 *
 * - Tolerant subtitle parsing (HH:MM:SS, MM:SS or SS with `,` `.` or `:` milliseconds)
 * - Bounded repair of transcripts whose timestamps do not parse
 * - Per-cue speech synthesis with pacing hints and bounded retry:
 *   - Gemini TTS
 *   - ElevenLabs TTS
 * - Pitch-preserving tempo fitting through chained ffmpeg `atempo` stages
 * - Timeline compositing with overrun truncation
 * - Job-level cancellation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `transcript`: Cue timing model and caption parsing
 * - `narration`: The narration pipeline:
 *   - `narration::repair`: Transcript repair loop
 *   - `narration::synthesizer`: Per-cue synthesis
 *   - `narration::reconciler`: Duration reconciliation
 *   - `narration::compositor`: Timeline compositing
 *   - `narration::engine`: Job orchestration
 * - `audio`: PCM fragments, WAV I/O and the tempo stretch primitive
 * - `providers`: Speech and repair service clients
 * - `voices`: Voice catalogs and fuzzy voice lookup
 * - `file_utils`: File system operations and job workspaces
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod audio;
pub mod errors;
pub mod file_utils;
pub mod narration;
pub mod providers;
pub mod transcript;
pub mod voices;

// Re-export main types for easier usage
pub use app_config::Config;
pub use audio::Fragment;
pub use narration::{NarrationEngine, Timeline};
pub use transcript::{Cue, Transcript};
pub use voices::{Voice, VoiceCatalog};
pub use errors::{AppError, AudioError, CueError, NarrationError, ProviderError};
