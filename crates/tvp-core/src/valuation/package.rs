// Trade packages: several players' values (plus cash) combined into one
// package value.
//
// Adding assets has diminishing returns: a package of three 10-point players
// is worth less than one 30-point player.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::output::{PlayerOutput, RankMetric};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageMethod {
    /// Best asset times the first multiplier, next best times the second, ...
    #[default]
    Step,
    /// Sum of each value raised to `power_p`.
    Power,
}

/// A package to value, named in `[[package.trades]]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TradePackage {
    pub name: String,
    pub player_ids: Vec<u32>,
    #[serde(default)]
    pub cash_m: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackageConfig {
    pub method: PackageMethod,
    /// The last multiplier repeats for any further assets.
    pub step_multipliers: Vec<f64>,
    pub power_p: f64,
    pub cash_haircut: f64,
    /// Cash counts for at most this fraction of the non-cash value; 0
    /// disables the cap.
    pub cash_cap_pct: f64,
    pub trades: Vec<TradePackage>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            method: PackageMethod::Step,
            step_multipliers: vec![1.0],
            power_p: 0.92,
            cash_haircut: 1.0,
            cash_cap_pct: 0.0,
            trades: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageValue {
    pub non_cash_tvp: f64,
    pub cash_tvp_raw: f64,
    pub cash_tvp_capped: f64,
    pub package_tvp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuedTrade {
    pub name: String,
    /// `(player_id, value)` for every asset found in the run.
    pub assets: Vec<(u32, f64)>,
    /// Requested players with no valuation in this run.
    pub missing_ids: Vec<u32>,
    pub value: PackageValue,
}

pub fn step_package_value(values: &[f64], multipliers: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let mult = multipliers
                .get(i)
                .or(multipliers.last())
                .copied()
                .unwrap_or(1.0);
            v * mult
        })
        .sum()
}

/// Sign-preserving: a negative asset subtracts `|v|^p`.
pub fn power_package_value(values: &[f64], p: f64) -> f64 {
    values.iter().map(|v| v.signum() * v.abs().powf(p)).sum()
}

/// Haircut the cash, then cap it at `cash_cap_pct` of a positive non-cash
/// value. Returns `(cash_counted, total)`.
pub fn cap_cash_value(non_cash: f64, cash: f64, cfg: &PackageConfig) -> (f64, f64) {
    let cash_adj = cash * cfg.cash_haircut;
    if non_cash <= 0.0 || cfg.cash_cap_pct <= 0.0 {
        return (cash_adj, non_cash + cash_adj);
    }
    let counted = cash_adj.min(cfg.cash_cap_pct * non_cash);
    (counted, non_cash + counted)
}

pub fn compute_package_tvp(asset_values: &[f64], cash: f64, cfg: &PackageConfig) -> PackageValue {
    let non_cash = match cfg.method {
        PackageMethod::Step => step_package_value(asset_values, &cfg.step_multipliers),
        PackageMethod::Power => power_package_value(asset_values, cfg.power_p),
    };
    let (cash_counted, total) = cap_cash_value(non_cash, cash, cfg);
    PackageValue {
        non_cash_tvp: non_cash,
        cash_tvp_raw: cash,
        cash_tvp_capped: cash_counted,
        package_tvp: total,
    }
}

/// Value every configured trade from a run's player outputs, using `metric`
/// as each asset's value.
pub fn value_trades(players: &[PlayerOutput], metric: RankMetric, cfg: &PackageConfig) -> Vec<ValuedTrade> {
    cfg.trades
        .iter()
        .map(|trade| {
            let mut assets = Vec::new();
            let mut missing_ids = Vec::new();
            for id in &trade.player_ids {
                match players.iter().find(|p| p.player_id == *id) {
                    Some(player) => assets.push((*id, metric.value_of(player))),
                    None => missing_ids.push(*id),
                }
            }
            if !missing_ids.is_empty() {
                warn!("trade `{}`: no valuation for players {:?}", trade.name, missing_ids);
            }
            let values: Vec<f64> = assets.iter().map(|(_, v)| *v).collect();
            ValuedTrade {
                name: trade.name.clone(),
                value: compute_package_tvp(&values, trade.cash_m, cfg),
                assets,
                missing_ids,
            }
        })
        .collect()
}
