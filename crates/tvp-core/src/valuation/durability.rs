// Durability / injury-risk mixture over full, partial, and lost seasons.

use serde::{Deserialize, Serialize};

/// Age after which durability risk starts to climb.
const DURABILITY_RISK_AGE: u32 = 27;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityLabel {
    Full,
    Partial,
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurabilityState {
    pub label: DurabilityLabel,
    pub probability: f64,
    pub usage_multiplier: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurabilityMixture {
    pub states: Vec<DurabilityState>,
}

impl DurabilityMixture {
    /// A single certain full-health state.
    pub fn certain() -> Self {
        Self {
            states: vec![DurabilityState {
                label: DurabilityLabel::Full,
                probability: 1.0,
                usage_multiplier: 1.0,
            }],
        }
    }

    /// Rescale probabilities to sum to 1. A mixture with no mass is returned
    /// unchanged.
    pub fn normalize(self) -> Self {
        let total: f64 = self.states.iter().map(|s| s.probability).sum();
        if total <= 0.0 {
            return self;
        }
        Self {
            states: self
                .states
                .into_iter()
                .map(|s| DurabilityState {
                    probability: s.probability / total,
                    ..s
                })
                .collect(),
        }
    }

    pub fn probability_of(&self, label: DurabilityLabel) -> f64 {
        self.states
            .iter()
            .filter(|s| s.label == label)
            .map(|s| s.probability)
            .sum()
    }

    /// Usage multiplier for a uniform roll in `[0, 1)`, walking cumulative
    /// probabilities. A roll past the last bucket (rounding) maps to zero usage.
    pub fn usage_multiplier_for_roll(&self, roll: f64) -> f64 {
        let mut cumulative = 0.0;
        for state in &self.states {
            cumulative += state.probability;
            if roll <= cumulative {
                return state.usage_multiplier;
            }
        }
        0.0
    }

    /// Probability-weighted usage multiplier.
    pub fn expected_usage_multiplier(&self) -> f64 {
        self.states
            .iter()
            .map(|s| s.probability * s.usage_multiplier)
            .sum()
    }
}

/// Base rates and penalties for one role family (hitters or pitchers).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurabilityConfig {
    pub full: f64,
    pub partial: f64,
    pub lost: f64,
    pub partial_multiplier: f64,
    pub lost_multiplier: f64,
    pub age_risk_per_year: f64,
    pub workload_spike_penalty: f64,
    pub il_penalty_per_year: f64,
    pub il_penalty_cap: f64,
}

impl DurabilityConfig {
    pub fn hitter_default() -> Self {
        Self {
            full: 0.80,
            partial: 0.15,
            lost: 0.05,
            partial_multiplier: 0.6,
            lost_multiplier: 0.15,
            age_risk_per_year: 0.008,
            workload_spike_penalty: 0.0,
            il_penalty_per_year: 0.02,
            il_penalty_cap: 0.2,
        }
    }

    pub fn pitcher_default() -> Self {
        Self {
            full: 0.68,
            partial: 0.20,
            lost: 0.12,
            partial_multiplier: 0.55,
            lost_multiplier: 0.05,
            age_risk_per_year: 0.012,
            workload_spike_penalty: 0.05,
            il_penalty_per_year: 0.02,
            il_penalty_cap: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DurabilityInputs {
    pub age: u32,
    pub workload_spike: bool,
    pub il_history_years: u32,
}

/// Build the normalized full/partial/lost mixture for one player.
///
/// Each year past 27 moves `age_risk_per_year` of mass out of `full`, split
/// evenly between `partial` and `lost`. Workload spikes and injured-list
/// history move mass from `full` to `lost`.
pub fn build_mixture(inputs: &DurabilityInputs, cfg: &DurabilityConfig) -> DurabilityMixture {
    let age_delta = inputs.age.saturating_sub(DURABILITY_RISK_AGE);
    let age_penalty = f64::from(age_delta) * cfg.age_risk_per_year;
    let workload_penalty = if inputs.workload_spike {
        cfg.workload_spike_penalty
    } else {
        0.0
    };
    let il_penalty =
        (f64::from(inputs.il_history_years) * cfg.il_penalty_per_year).min(cfg.il_penalty_cap);

    let full = (cfg.full - age_penalty - workload_penalty - il_penalty).max(0.0);
    let partial = (cfg.partial + age_penalty * 0.5).max(0.0);
    let lost = (cfg.lost + age_penalty * 0.5 + workload_penalty + il_penalty).max(0.0);

    DurabilityMixture {
        states: vec![
            DurabilityState {
                label: DurabilityLabel::Full,
                probability: full,
                usage_multiplier: 1.0,
            },
            DurabilityState {
                label: DurabilityLabel::Partial,
                probability: partial,
                usage_multiplier: cfg.partial_multiplier,
            },
            DurabilityState {
                label: DurabilityLabel::Lost,
                probability: lost,
                usage_multiplier: cfg.lost_multiplier,
            },
        ],
    }
    .normalize()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
