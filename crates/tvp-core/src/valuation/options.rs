// Option exercise: the per-path hard threshold used by the simulator and the
// sigmoid expected-value pricing reported alongside it for audit.

use serde::{Deserialize, Serialize};

use crate::valuation::contracts::{OptionType, OptionYear};

// ---------------------------------------------------------------------------
// Hard-threshold decision (simulation path)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionDecision {
    pub exercised: bool,
    /// Cost incurred in the option year: the salary if exercised, otherwise
    /// the buyout.
    pub cost_m: f64,
}

/// Resolve one option year given the drawn value and the point-estimate
/// market comparator.
///
/// Club option: kept iff `value - salary > -buyout`. Player option: kept iff
/// `salary > market`. Mutual option: both sides must agree.
pub fn apply_option_decision(option: &OptionYear, value_m: f64, market_m: f64) -> OptionDecision {
    let team_keeps = (value_m - option.salary_m) > -option.buyout_m;
    let player_keeps = option.salary_m > market_m;
    let exercised = match option.option_type {
        OptionType::Club => team_keeps,
        OptionType::Player => player_keeps,
        OptionType::Mutual => team_keeps && player_keeps,
    };
    OptionDecision {
        exercised,
        cost_m: if exercised { option.salary_m } else { option.buyout_m },
    }
}

// ---------------------------------------------------------------------------
// Sigmoid expected value
// ---------------------------------------------------------------------------

/// Tunables for the smooth exercise-probability model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionPricing {
    /// Softness of the logistic curve in $M.
    pub sigmoid_k: f64,
    /// Fraction of projected value a player expects on the open market.
    pub fa_share: f64,
    /// Floor on the player's open-market expectation in $M.
    pub min_fa_m: f64,
}

impl Default for OptionPricing {
    fn default() -> Self {
        Self {
            sigmoid_k: 5.0,
            fa_share: 0.8,
            min_fa_m: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionValuation {
    pub season: i32,
    pub option_type: OptionType,
    pub exercise_probability: f64,
    pub expected_value_m: f64,
    pub pv_expected_value_m: f64,
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logistic(x: f64, k: f64) -> f64 {
    if k <= 0.0 {
        return if x > 0.0 { 1.0 } else { 0.0 };
    }
    sigmoid(x / k)
}

/// Expected surplus of an option year under a smooth exercise probability,
/// discounted `t` years at `discount_rate`.
pub fn option_expected_value(
    option: &OptionYear,
    season: i32,
    value_m: f64,
    t: usize,
    discount_rate: f64,
    pricing: &OptionPricing,
) -> OptionValuation {
    let surplus = value_m - option.salary_m;
    let p_team = logistic(surplus + option.buyout_m, pricing.sigmoid_k);
    let market = pricing.min_fa_m.max(pricing.fa_share * value_m);
    let p_player = logistic(option.salary_m - market, pricing.sigmoid_k);

    let (exercise_probability, expected_value_m) = match option.option_type {
        OptionType::Club => (p_team, p_team * surplus + (1.0 - p_team) * -option.buyout_m),
        OptionType::Player => (p_player, p_player * surplus),
        OptionType::Mutual => {
            let p = p_team * p_player;
            (p, p * surplus + (1.0 - p) * -option.buyout_m)
        }
    };

    let discount = 1.0 / (1.0 + discount_rate).powi(t as i32);
    OptionValuation {
        season,
        option_type: option.option_type,
        exercise_probability,
        expected_value_m,
        pv_expected_value_m: expected_value_m * discount,
    }
}
