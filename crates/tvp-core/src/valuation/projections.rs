// Performance projection: recency-weighted history, shrinkage toward
// role priors, and the aging-adjusted expected-performance path.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Aging curve
// ---------------------------------------------------------------------------

/// Piecewise-linear aging adjustment around a peak age. Multipliers are
/// floored at zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgingCurve {
    pub peak_age: u32,
    pub rate_delta_before: f64,
    pub rate_delta_after: f64,
    pub usage_delta_before: f64,
    pub usage_delta_after: f64,
}

impl AgingCurve {
    /// A curve that never adjusts anything.
    pub fn flat(peak_age: u32) -> Self {
        Self {
            peak_age,
            rate_delta_before: 0.0,
            rate_delta_after: 0.0,
            usage_delta_before: 0.0,
            usage_delta_after: 0.0,
        }
    }

    pub fn hitter_default() -> Self {
        Self {
            peak_age: 27,
            rate_delta_before: 0.0,
            rate_delta_after: -0.03,
            usage_delta_before: 0.0,
            usage_delta_after: -0.02,
        }
    }

    pub fn pitcher_default() -> Self {
        Self {
            peak_age: 27,
            rate_delta_before: 0.0,
            rate_delta_after: -0.04,
            usage_delta_before: 0.0,
            usage_delta_after: -0.03,
        }
    }

    pub fn rate_multiplier(&self, age: u32) -> f64 {
        self.multiplier(age, self.rate_delta_before, self.rate_delta_after)
    }

    pub fn usage_multiplier(&self, age: u32) -> f64 {
        self.multiplier(age, self.usage_delta_before, self.usage_delta_after)
    }

    fn multiplier(&self, age: u32, before: f64, after: f64) -> f64 {
        let delta = f64::from(age) - f64::from(self.peak_age);
        let slope = if delta < 0.0 { before } else { after };
        (1.0 + delta * slope).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// History and projection types
// ---------------------------------------------------------------------------

/// One observed season: performance (WAR) and usage volume (PA or IP).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonHistory {
    pub season: i32,
    pub war: f64,
    pub usage: f64,
}

/// Posterior rate and usage after shrinkage, plus the observed inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateProjection {
    pub rate_obs: f64,
    pub usage_obs: f64,
    /// Total observed usage; the evidence weight `n` in the shrinkage.
    pub n_usage: f64,
    pub rate_post: f64,
    pub usage_post: f64,
}

/// Role-specific prior bundle used by the shrinkage estimator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShrinkagePriors {
    pub denom: f64,
    pub rate_prior: f64,
    pub k_rate: f64,
    pub usage_prior: f64,
    pub k_usage: f64,
}

/// Oldest-to-newest recency weights (Marcel-style 3:4:5).
pub const DEFAULT_RECENCY_WEIGHTS: [f64; 3] = [3.0, 4.0, 5.0];

/// The trailing `len` weights, so a short history keeps the newest weights.
fn trailing_weights(weights: &[f64], len: usize) -> &[f64] {
    &weights[weights.len().saturating_sub(len)..]
}

// ---------------------------------------------------------------------------
// Weighted observations
// ---------------------------------------------------------------------------

/// Weighted observed rate per `denom` units of usage, and the raw usage total.
///
/// History is ordered oldest to newest. Seasons with no usage carry no rate
/// information and are skipped.
pub fn weighted_rate(history: &[SeasonHistory], weights: &[f64], denom: f64) -> (f64, f64) {
    if history.is_empty() || denom <= 0.0 {
        return (0.0, 0.0);
    }
    let history = &history[history.len().saturating_sub(weights.len())..];
    let weights = trailing_weights(weights, history.len());

    let mut weighted_war = 0.0;
    let mut weighted_usage = 0.0;
    let mut usage_total = 0.0;
    for (weight, entry) in weights.iter().zip(history) {
        if entry.usage <= 0.0 {
            continue;
        }
        weighted_war += weight * entry.war;
        weighted_usage += weight * entry.usage;
        usage_total += entry.usage;
    }

    if weighted_usage <= 0.0 {
        return (0.0, usage_total);
    }
    (weighted_war / (weighted_usage / denom), usage_total)
}

/// Recency-weighted average usage per season (zero-usage seasons included).
pub fn weighted_usage(history: &[SeasonHistory], weights: &[f64]) -> f64 {
    if history.is_empty() {
        return 0.0;
    }
    let history = &history[history.len().saturating_sub(weights.len())..];
    let weights = trailing_weights(weights, history.len());

    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    let usage_sum: f64 = weights
        .iter()
        .zip(history)
        .map(|(w, entry)| w * entry.usage)
        .sum();
    usage_sum / total_weight
}

/// `(n * observed + k * prior) / (n + k)`; collapses to the prior with no
/// evidence.
pub fn shrink(observed: f64, n: f64, prior: f64, k: f64) -> f64 {
    let denom = n + k;
    if denom <= 0.0 {
        return prior;
    }
    (n * observed + k * prior) / denom
}

pub fn build_rate_projection(
    history: &[SeasonHistory],
    weights: &[f64],
    priors: &ShrinkagePriors,
) -> RateProjection {
    let (rate_obs, n_usage) = weighted_rate(history, weights, priors.denom);
    let usage_obs = weighted_usage(history, weights);
    RateProjection {
        rate_obs,
        usage_obs,
        n_usage,
        rate_post: shrink(rate_obs, n_usage, priors.rate_prior, priors.k_rate),
        usage_post: shrink(usage_obs, n_usage, priors.usage_prior, priors.k_usage),
    }
}

// ---------------------------------------------------------------------------
// Small-sample policy helpers
// ---------------------------------------------------------------------------

pub fn seasons_with_usage(history: &[SeasonHistory]) -> usize {
    history.iter().filter(|h| h.usage > 0.0).count()
}

pub fn total_usage(history: &[SeasonHistory]) -> f64 {
    history.iter().map(|h| h.usage.max(0.0)).sum()
}

/// Whether the lookback window is too thin to trust a league-average prior:
/// total usage below `usage_floor`, or fewer than two seasons with usage.
pub fn is_small_sample(history: &[SeasonHistory], usage_floor: f64) -> bool {
    total_usage(history) < usage_floor || seasons_with_usage(history) < 2
}

// ---------------------------------------------------------------------------
// Expected performance path
// ---------------------------------------------------------------------------

/// Aging-adjusted point-estimate WAR for each of `years` forward seasons.
pub fn expected_performance_path(
    rate_post: f64,
    usage_post: f64,
    age: u32,
    years: usize,
    denom: f64,
    aging: &AgingCurve,
) -> Vec<f64> {
    (0..years)
        .map(|t| {
            if denom <= 0.0 {
                return 0.0;
            }
            let age_t = age + t as u32;
            let rate_t = rate_post * aging.rate_multiplier(age_t);
            let usage_t = usage_post * aging.usage_multiplier(age_t);
            rate_t * (usage_t / denom)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
