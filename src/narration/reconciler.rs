use std::sync::Arc;
use log::{debug, warn};

use crate::app_config::ReconcilerConfig;
use crate::audio::{Fragment, TempoStretcher};
use crate::errors::NarrationError;

// @module: Fit synthesized fragments to their cue windows

/// What happened to a fragment during reconciliation
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    /// Close enough to the target, left untouched
    Accepted,

    /// The remaining correction was inside the unity band
    Negligible { factor: f64 },

    /// Replaced by a tempo-adjusted copy
    Stretched { factor: f64, stages: Vec<f64> },

    /// Stretching failed; the original fragment was kept
    Degraded { factor: f64, reason: String },

    /// The cue window has no length, so there is nothing to fit to
    NoTarget,
}

/// Whether `native` misses `target` by both the absolute and the relative threshold
pub fn needs_adjustment(config: &ReconcilerConfig, native: f64, target: f64) -> bool {
    let deviation = (native - target).abs();
    if deviation <= config.min_abs_deviation_secs {
        return false;
    }
    deviation / target > config.max_pct_deviation
}

/// Tempo factor that turns `native` seconds into `target` seconds
pub fn tempo_factor(native: f64, target: f64) -> Result<f64, NarrationError> {
    let factor = native / target;
    if !factor.is_finite() || factor <= 0.0 {
        return Err(NarrationError::InvalidTempoFactor(factor));
    }
    Ok(factor)
}

/// Split a tempo factor into stages the stretch primitive accepts
///
/// Whole `max_stretch` / `min_stretch` stages are peeled off first. The
/// residual is only kept when it lies outside the unity band, so the
/// product of the result can differ from `factor` by at most that band.
pub fn decompose(factor: f64, config: &ReconcilerConfig) -> Result<Vec<f64>, NarrationError> {
    if !factor.is_finite() || factor <= 0.0 {
        return Err(NarrationError::InvalidTempoFactor(factor));
    }

    let mut stages = Vec::new();
    let mut remaining = factor;

    while remaining > config.max_stretch {
        stages.push(config.max_stretch);
        remaining /= config.max_stretch;
    }
    while remaining < config.min_stretch {
        stages.push(config.min_stretch);
        remaining /= config.min_stretch;
    }

    if remaining < config.unity_low || remaining > config.unity_high {
        stages.push(remaining);
    }

    Ok(stages)
}

/// Applies the acceptance test and the stretch chain to fragments
pub struct DurationReconciler {
    config: ReconcilerConfig,
    stretcher: Arc<dyn TempoStretcher>,
}

impl DurationReconciler {
    pub fn new(config: ReconcilerConfig, stretcher: Arc<dyn TempoStretcher>) -> Self {
        DurationReconciler { config, stretcher }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Fit `fragment` to `target` seconds
    ///
    /// Only an invalid tempo factor is an error. A failed stretch keeps the
    /// original fragment and reports `FitOutcome::Degraded`.
    pub async fn fit(&self, fragment: Fragment, target: f64) -> Result<(Fragment, FitOutcome), NarrationError> {
        if target <= 0.0 {
            return Ok((fragment, FitOutcome::NoTarget));
        }

        let native = fragment.duration();
        if !needs_adjustment(&self.config, native, target) {
            return Ok((fragment, FitOutcome::Accepted));
        }

        let factor = tempo_factor(native, target)?;
        let stages = decompose(factor, &self.config)?;
        if stages.is_empty() {
            return Ok((fragment, FitOutcome::Negligible { factor }));
        }

        debug!(
            "Fitting {:.3}s to {:.3}s: atempo {:.4} in stages {:?}",
            native, target, factor, stages
        );

        match self.stretcher.stretch(&fragment, &stages).await {
            Ok(stretched) => Ok((stretched, FitOutcome::Stretched { factor, stages })),
            Err(e) => {
                warn!("Tempo fit failed, keeping {:.3}s fragment for a {:.3}s window: {}", native, target, e);
                Ok((fragment, FitOutcome::Degraded { factor, reason: e.to_string() }))
            }
        }
    }
}
