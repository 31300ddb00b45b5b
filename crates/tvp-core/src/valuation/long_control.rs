// Long-control boost: extra credit for a player the club keeps cheaply for
// many more years than a typical trade asset.

use serde::{Deserialize, Serialize};

use crate::valuation::contracts::{ContractSchedule, CostBasis};
use crate::valuation::simulate::{compute_quantiles, mean_and_std, Quantiles, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LongControlConfig {
    pub enabled: bool,
    /// Control years that earn no boost.
    pub baseline_years: usize,
    /// Average salary above which no boost applies, in $M.
    pub max_aav_m: f64,
    /// Boost per control year beyond the baseline.
    pub step_pct: f64,
    pub max_pct: f64,
}

impl Default for LongControlConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baseline_years: 4,
            max_aav_m: 15.0,
            step_pct: 0.15,
            max_pct: 0.6,
        }
    }
}

/// Audit record for the boost. `pct` is zero when the player does not
/// qualify.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LongControlBoost {
    /// Non-option, non-free-agent years in the schedule.
    pub control_years: usize,
    pub avg_salary_m: Option<f64>,
    pub pct: f64,
    /// Amount added to the point estimate.
    pub point_value: f64,
}

/// Boost earned by a schedule. Option years and free-agent years do not
/// count as control, and salaries are full-season figures.
pub fn long_control_boost(schedule: &ContractSchedule, cfg: &LongControlConfig) -> LongControlBoost {
    let salaries: Vec<f64> = schedule
        .years
        .iter()
        .filter(|y| !matches!(y.basis, CostBasis::Option | CostBasis::Fa))
        .map(|y| y.cost_m)
        .collect();
    let control_years = salaries.len();
    let avg_salary_m = (control_years > 0).then(|| salaries.iter().sum::<f64>() / control_years as f64);

    let qualifies = cfg.enabled
        && control_years > cfg.baseline_years
        && avg_salary_m.is_some_and(|avg| avg <= cfg.max_aav_m);
    let pct = if qualifies {
        (cfg.step_pct * (control_years - cfg.baseline_years) as f64).min(cfg.max_pct)
    } else {
        0.0
    };

    LongControlBoost {
        control_years,
        avg_salary_m,
        pct,
        point_value: 0.0,
    }
}

/// Scale a positive value by the boost; zero and negative values pass
/// through unchanged.
pub fn apply_boost(value: f64, pct: f64) -> f64 {
    if value > 0.0 {
        value * (1.0 + pct)
    } else {
        value
    }
}

/// Boost every positive simulated path and recompute the statistics.
pub fn boost_simulation(mut result: SimulationResult, pct: f64) -> SimulationResult {
    if pct == 0.0 {
        return result;
    }
    for sample in &mut result.samples {
        *sample = apply_boost(*sample, pct);
    }
    let q = compute_quantiles(&result.samples, &[0.10, 0.50, 0.90]);
    let (mean, std) = mean_and_std(&result.samples);
    result.quantiles = Quantiles {
        p10: q[0],
        p50: q[1],
        p90: q[2],
    };
    result.mean = mean;
    result.std = std;
    result
}
