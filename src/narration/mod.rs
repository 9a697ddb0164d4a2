/*!
 * Caption-synchronized narration.
 *
 * The pipeline for one job runs leaf-first through these modules:
 * - `repair`: parse caption text, asking a repair service to fix timestamps while nothing parses
 * - `synthesizer`: one speech request per non-empty cue, with bounded retry
 * - `reconciler`: accept or tempo-fit each fragment to its cue window
 * - `compositor`: place fragments at their cue offsets on one track
 * - `engine`: wires the stages together with cancellation and progress
 */

pub mod compositor;
pub mod engine;
pub mod reconciler;
pub mod repair;
pub mod retry;
pub mod synthesizer;

pub use compositor::{composite, Timeline};
pub use engine::{EngineSettings, NarrationEngine, NarrationStats, NoProgress, ProgressSink};
pub use reconciler::{decompose, needs_adjustment, tempo_factor, DurationReconciler, FitOutcome};
pub use retry::{RetryError, RetryPolicy};
pub use synthesizer::{duration_hint, CueSynthesizer};
