// Contract terms and the per-season cost schedule.
//
// Resolution order for each horizon season: guaranteed salary, option
// salary, control-implied model cost (pre-arb minimum or arbitration share of
// expected value), otherwise free agency at zero cost.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::valuation::service_time::YearType;

// ---------------------------------------------------------------------------
// Input terms (as supplied by the contract scrapers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CO", alias = "club")]
    Club,
    #[serde(rename = "PO", alias = "player")]
    Player,
    #[serde(rename = "MO", alias = "mutual")]
    Mutual,
}

impl OptionType {
    pub fn code(self) -> &'static str {
        match self {
            OptionType::Club => "CO",
            OptionType::Player => "PO",
            OptionType::Mutual => "MO",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractYearTerms {
    pub season: i32,
    #[serde(default)]
    pub salary_m: Option<f64>,
    #[serde(default)]
    pub is_guaranteed: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionTerms {
    pub season: i32,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default)]
    pub salary_m: Option<f64>,
    #[serde(default)]
    pub buyout_m: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractTerms {
    #[serde(default)]
    pub contract_years: Vec<ContractYearTerms>,
    #[serde(default)]
    pub options: Vec<OptionTerms>,
    #[serde(default)]
    pub aav_m: Option<f64>,
    #[serde(default)]
    pub total_value_m: Option<f64>,
    #[serde(default)]
    pub years_remaining: Option<u32>,
    #[serde(default)]
    pub guaranteed_years_remaining: Option<u32>,
}

// ---------------------------------------------------------------------------
// Schedule types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostBasis {
    Guaranteed,
    /// Guaranteed stream restated at AAV (manual override or deferral
    /// normalization).
    CbtAav,
    Option,
    ModelCostPrearb,
    ModelCostArb,
    Fa,
}

impl CostBasis {
    pub fn as_str(self) -> &'static str {
        match self {
            CostBasis::Guaranteed => "guaranteed",
            CostBasis::CbtAav => "cbt_aav",
            CostBasis::Option => "option",
            CostBasis::ModelCostPrearb => "model_cost_prearb",
            CostBasis::ModelCostArb => "model_cost_arb",
            CostBasis::Fa => "fa",
        }
    }
}

impl fmt::Display for CostBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OptionYear {
    pub option_type: OptionType,
    pub salary_m: f64,
    pub buyout_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractYear {
    pub season: i32,
    pub cost_m: f64,
    pub basis: CostBasis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<OptionYear>,
}

impl ContractYear {
    pub fn new(season: i32, cost_m: f64, basis: CostBasis) -> Self {
        Self {
            season,
            cost_m,
            basis,
            option: None,
        }
    }
}

/// Exactly one entry per horizon season, ordered by season.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContractSchedule {
    pub years: Vec<ContractYear>,
}

// ---------------------------------------------------------------------------
// Cost helpers
// ---------------------------------------------------------------------------

/// League minimum `t` seasons after the snapshot, compounding from the
/// snapshot year regardless of the player's own service count.
pub fn min_salary_for_year(t: usize, min_salary_m: f64, growth: f64) -> f64 {
    min_salary_m * (1.0 + growth).powi(t as i32)
}

pub fn arb_cost(war_expected: f64, war_price: f64, arb_share: f64) -> f64 {
    war_expected * war_price * arb_share
}

/// Share for a zero-based arbitration tier, clamped to the last configured
/// share.
pub fn arb_share_for(tier_index: usize, arb_share: &[f64]) -> f64 {
    arb_share
        .get(tier_index)
        .or_else(|| arb_share.last())
        .copied()
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Guaranteed and option maps
// ---------------------------------------------------------------------------

/// Known guaranteed salary by season from the snapshot year on.
///
/// Non-guaranteed rows are ignored. A guaranteed row without a salary falls
/// back to the contract AAV. Duplicate seasons keep the larger salary. With no
/// per-year rows at all, `total_value_m / years_remaining` is spread over the
/// remaining years.
pub fn build_guaranteed_schedule(contract: &ContractTerms, snapshot_year: i32) -> BTreeMap<i32, f64> {
    let mut guaranteed: BTreeMap<i32, f64> = BTreeMap::new();
    for year in &contract.contract_years {
        if year.season < snapshot_year || year.is_guaranteed == Some(false) {
            continue;
        }
        let salary = year.salary_m.or(contract.aav_m).unwrap_or(0.0);
        guaranteed
            .entry(year.season)
            .and_modify(|existing| *existing = existing.max(salary))
            .or_insert(salary);
    }

    if guaranteed.is_empty() {
        if let (Some(total), Some(years)) = (contract.total_value_m, contract.years_remaining) {
            if years > 0 {
                let aav = total / f64::from(years);
                for i in 0..years as i32 {
                    guaranteed.insert(snapshot_year + i, aav);
                }
            }
        }
    }
    guaranteed
}

pub fn build_option_schedule(contract: &ContractTerms) -> BTreeMap<i32, OptionYear> {
    contract
        .options
        .iter()
        .map(|o| {
            (
                o.season,
                OptionYear {
                    option_type: o.option_type,
                    salary_m: o.salary_m.unwrap_or(0.0),
                    buyout_m: o.buyout_m.unwrap_or(0.0),
                },
            )
        })
        .collect()
}

/// Number of seasons from the snapshot through the last known contract or
/// option season (zero when nothing is known).
pub fn contract_horizon(contract: &ContractTerms, snapshot_year: i32) -> usize {
    let last_known = build_guaranteed_schedule(contract, snapshot_year)
        .keys()
        .chain(build_option_schedule(contract).keys())
        .copied()
        .filter(|season| *season >= snapshot_year)
        .max();
    last_known.map_or(0, |season| (season - snapshot_year + 1) as usize)
}

// ---------------------------------------------------------------------------
// Overrides and deferral normalization
// ---------------------------------------------------------------------------

/// Synthetic guaranteed stream for a contract that is public but not yet in
/// the scraped data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOverride {
    pub player_id: u32,
    pub aav_m: f64,
    pub term_start: i32,
    pub term_years: u32,
}

/// True when AAV materially exceeds the average cash still owed, i.e. the
/// deal is heavily deferred.
pub fn should_use_aav_for_deferrals(contract: &ContractTerms, snapshot_year: i32, multiplier: f64) -> bool {
    let Some(aav) = contract.aav_m.filter(|a| *a > 0.0) else {
        return false;
    };
    let remaining: Vec<f64> = contract
        .contract_years
        .iter()
        .filter(|y| y.season >= snapshot_year && y.is_guaranteed != Some(false))
        .filter_map(|y| y.salary_m)
        .collect();
    if remaining.is_empty() {
        return false;
    }
    let average_cash = remaining.iter().sum::<f64>() / remaining.len() as f64;
    if average_cash <= 0.0 {
        return true;
    }
    aav / average_cash >= multiplier
}

/// Apply a configured override, or restate a deferred contract at AAV.
/// Returns the adjusted terms and the cost basis for guaranteed years.
pub fn apply_contract_overrides(
    contract: &ContractTerms,
    player_id: u32,
    snapshot_year: i32,
    overrides: &[ContractOverride],
    deferral_multiplier: f64,
) -> (ContractTerms, CostBasis) {
    if let Some(ov) = overrides.iter().find(|o| o.player_id == player_id) {
        let term_end = ov.term_start + ov.term_years as i32;
        let first = ov.term_start.max(snapshot_year);
        let contract_years: Vec<ContractYearTerms> = (first..term_end)
            .map(|season| ContractYearTerms {
                season,
                salary_m: Some(ov.aav_m),
                is_guaranteed: Some(true),
            })
            .collect();
        let remaining = contract_years.len() as u32;
        let adjusted = ContractTerms {
            contract_years,
            options: contract
                .options
                .iter()
                .filter(|o| o.season >= term_end)
                .cloned()
                .collect(),
            aav_m: Some(ov.aav_m),
            total_value_m: Some(ov.aav_m * f64::from(remaining)),
            years_remaining: Some(remaining),
            guaranteed_years_remaining: Some(remaining),
        };
        return (adjusted, CostBasis::CbtAav);
    }

    if should_use_aav_for_deferrals(contract, snapshot_year, deferral_multiplier) {
        let aav = contract.aav_m.unwrap_or(0.0);
        let mut adjusted = contract.clone();
        for year in adjusted
            .contract_years
            .iter_mut()
            .filter(|y| y.season >= snapshot_year && y.is_guaranteed != Some(false))
        {
            year.salary_m = Some(aav);
        }
        return (adjusted, CostBasis::CbtAav);
    }

    (contract.clone(), CostBasis::Guaranteed)
}

// ---------------------------------------------------------------------------
// Schedule builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ScheduleParams<'a> {
    pub snapshot_year: i32,
    pub horizon_years: usize,
    pub control_year_types: &'a [YearType],
    /// Point-estimate expected WAR by season offset (never a simulated draw).
    pub expected_performance: &'a [f64],
    pub price_by_year: &'a [f64],
    pub arb_share: &'a [f64],
    pub min_salary_m: f64,
    pub min_salary_growth: f64,
    pub guaranteed_basis: CostBasis,
}

pub fn build_contract_schedule(contract: &ContractTerms, params: &ScheduleParams<'_>) -> ContractSchedule {
    let guaranteed = build_guaranteed_schedule(contract, params.snapshot_year);
    let options = build_option_schedule(contract);

    let years = (0..params.horizon_years)
        .map(|t| {
            let season = params.snapshot_year + t as i32;
            if let Some(salary) = guaranteed.get(&season) {
                return ContractYear::new(season, *salary, params.guaranteed_basis);
            }
            if let Some(option) = options.get(&season) {
                return ContractYear {
                    season,
                    cost_m: option.salary_m,
                    basis: CostBasis::Option,
                    option: Some(*option),
                };
            }
            match params.control_year_types.get(t).copied() {
                Some(YearType::PreArb) => ContractYear::new(
                    season,
                    min_salary_for_year(t, params.min_salary_m, params.min_salary_growth),
                    CostBasis::ModelCostPrearb,
                ),
                Some(year_type @ YearType::Arb(_)) => {
                    let share = arb_share_for(year_type.arb_index().unwrap_or(0), params.arb_share);
                    let war = params.expected_performance.get(t).copied().unwrap_or(0.0);
                    let price = params.price_by_year.get(t).copied().unwrap_or(0.0);
                    ContractYear::new(season, arb_cost(war, price, share), CostBasis::ModelCostArb)
                }
                None => ContractYear::new(season, 0.0, CostBasis::Fa),
            }
        })
        .collect();

    ContractSchedule { years }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
