use std::sync::Mutex;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::errors::NarrationError;
pub use crate::errors::RepairAttemptError;
use crate::narration::retry::{RetryError, RetryPolicy};
use crate::providers::TextRepairer;
use crate::transcript::{self, Transcript};

// @module: Bounded repair of caption text that does not parse

/// A transcript that parsed, plus how many repair calls it took
#[derive(Debug, Clone)]
pub struct RepairedTranscript {
    pub transcript: Transcript,
    pub repairs_used: u32,
}

/// Parse `raw`, asking `repairer` to fix the timestamps while nothing parses
///
/// Each repair works on the output of the previous one. A blank answer or a
/// failed call uses up an attempt. Running out of attempts is fatal.
pub async fn parse_or_repair(
    raw: &str,
    repairer: &dyn TextRepairer,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<RepairedTranscript, NarrationError> {
    let text = transcript::normalize(raw);
    let report = transcript::parse_with_report(&text);
    if !report.is_degenerate() {
        return Ok(RepairedTranscript {
            transcript: Transcript::new(report.cues),
            repairs_used: 0,
        });
    }

    warn!(
        "Transcript has no parseable cues ({} blocks rejected), starting repair",
        report.rejected_blocks
    );

    let current = Mutex::new(text);
    let result = policy
        .run(cancel, "Transcript repair", |attempt| {
            let current = &current;
            async move {
                let input = current.lock().map(|t| t.clone()).unwrap_or_default();
                let repaired = match repairer.repair(&input).await {
                    Ok(text) => text,
                    Err(e) => return Err(RepairAttemptError::Provider(e)),
                };
                if repaired.trim().is_empty() {
                    return Err(RepairAttemptError::Blank);
                }

                let normalized = transcript::normalize(&repaired);
                let report = transcript::parse_with_report(&normalized);
                if report.is_degenerate() {
                    if let Ok(mut text) = current.lock() {
                        *text = normalized;
                    }
                    return Err(RepairAttemptError::Unparseable {
                        rejected_blocks: report.rejected_blocks,
                    });
                }

                info!("Transcript repaired on attempt {}: {} cues", attempt, report.cues.len());
                Ok(RepairedTranscript {
                    transcript: Transcript::new(report.cues),
                    repairs_used: attempt,
                })
            }
        })
        .await;

    match result {
        Ok(repaired) => Ok(repaired),
        Err(RetryError::Exhausted { attempts, last_error }) => {
            Err(NarrationError::RepairExhausted { attempts, last_error })
        }
        Err(RetryError::Cancelled) => Err(NarrationError::Cancelled),
    }
}
