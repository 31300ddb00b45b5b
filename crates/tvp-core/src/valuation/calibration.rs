// League price-per-win: the growth curve and its calibration from recently
// signed free-agent contracts.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::CalibrationConfig;

// ---------------------------------------------------------------------------
// Price curve
// ---------------------------------------------------------------------------

/// $M per WAR in the snapshot season, growing geometrically thereafter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceCurve {
    pub dollars_per_war: f64,
    pub growth: f64,
}

impl Default for PriceCurve {
    fn default() -> Self {
        Self {
            dollars_per_war: 9.0,
            growth: 0.03,
        }
    }
}

impl PriceCurve {
    pub fn price_for_year(&self, t: usize) -> f64 {
        self.dollars_per_war * (1.0 + self.growth).powi(t as i32)
    }

    pub fn price_by_year(&self, years: usize) -> Vec<f64> {
        (0..years).map(|t| self.price_for_year(t)).collect()
    }

    /// Same growth, new base price.
    pub fn with_dollars_per_war(self, dollars_per_war: f64) -> Self {
        Self {
            dollars_per_war,
            ..self
        }
    }
}

// ---------------------------------------------------------------------------
// Calibration
// ---------------------------------------------------------------------------

/// A recent free-agent signing with the projection made at signing time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedContract {
    #[serde(default)]
    pub player_id: Option<u32>,
    #[serde(default)]
    pub name: Option<String>,
    pub signed_season: i32,
    pub aav_m: f64,
    pub years: u32,
    pub projected_war: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationSummary {
    pub applied: bool,
    pub qualifying_contracts: usize,
    pub trimmed_each_side: usize,
    pub default_dollars_per_war: f64,
    pub dollars_per_war: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Mean after dropping `floor(n * trim_pct)` values from each end. Trimming
/// is skipped when it would leave nothing. `None` for an empty input.
pub fn trimmed_mean(values: &[f64], trim_pct: f64) -> Option<(f64, usize)> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let mut k = ((n as f64) * trim_pct.max(0.0)).floor() as usize;
    if n <= 2 * k {
        k = 0;
    }
    let kept = &sorted[k..n - k];
    Some((kept.iter().sum::<f64>() / kept.len() as f64, k))
}

fn qualifies(contract: &SignedContract, snapshot_year: i32, cfg: &CalibrationConfig) -> bool {
    let earliest = snapshot_year - cfg.lookback_years as i32;
    contract.signed_season >= earliest
        && contract.signed_season <= snapshot_year
        && contract.aav_m >= cfg.min_aav_m
        && contract.years >= cfg.min_years
        && contract.projected_war >= cfg.min_war
        && contract.projected_war > 0.0
}

/// Price-per-win from the trimmed mean of `aav / projected_war` over
/// qualifying contracts. Falls back to `base` (with a warning) when
/// calibration is disabled or too few contracts qualify.
pub fn calibrate_price(
    contracts: &[SignedContract],
    snapshot_year: i32,
    base: PriceCurve,
    cfg: &CalibrationConfig,
) -> (PriceCurve, CalibrationSummary) {
    let ratios: Vec<f64> = contracts
        .iter()
        .filter(|c| qualifies(c, snapshot_year, cfg))
        .map(|c| c.aav_m / c.projected_war)
        .collect();

    let fallback = |warning: Option<String>| CalibrationSummary {
        applied: false,
        qualifying_contracts: ratios.len(),
        trimmed_each_side: 0,
        default_dollars_per_war: base.dollars_per_war,
        dollars_per_war: base.dollars_per_war,
        warning,
    };

    if !cfg.enabled {
        return (base, fallback(None));
    }
    if ratios.len() < cfg.min_contracts {
        let message = format!(
            "only {} qualifying contracts (need {}); using default ${:.2}M/WAR",
            ratios.len(),
            cfg.min_contracts,
            base.dollars_per_war
        );
        warn!("price calibration skipped: {message}");
        return (base, fallback(Some(message)));
    }
    let Some((dollars_per_war, trimmed)) = trimmed_mean(&ratios, cfg.trim_pct) else {
        return (base, fallback(None));
    };

    info!(
        "calibrated price: ${:.2}M/WAR from {} contracts (default ${:.2}M/WAR)",
        dollars_per_war,
        ratios.len(),
        base.dollars_per_war
    );
    (
        base.with_dollars_per_war(dollars_per_war),
        CalibrationSummary {
            applied: true,
            qualifying_contracts: ratios.len(),
            trimmed_each_side: trimmed,
            default_dollars_per_war: base.dollars_per_war,
            dollars_per_war,
            warning: None,
        },
    )
}
