// Context-stat nudge to the projected rate (OPS+ for hitters, FIP- for
// pitchers), sample-weighted and hard-clamped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricStat {
    OpsPlus,
    FipMinus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub enabled: bool,
    pub stat: MetricStat,
    pub league_avg: f64,
    /// Rate change per point of deviation from league average.
    pub coef: f64,
    pub higher_is_better: bool,
    /// Usage at which the stat receives full weight.
    pub min_sample: f64,
    /// Adjustment magnitude is capped at this fraction of `|base_rate|`.
    pub cap_fraction: f64,
}

impl MetricConfig {
    pub fn hitter_default() -> Self {
        Self {
            enabled: true,
            stat: MetricStat::OpsPlus,
            league_avg: 100.0,
            coef: 0.02,
            higher_is_better: true,
            min_sample: 600.0,
            cap_fraction: 0.25,
        }
    }

    pub fn pitcher_default() -> Self {
        Self {
            enabled: true,
            stat: MetricStat::FipMinus,
            league_avg: 100.0,
            coef: 0.03,
            higher_is_better: false,
            min_sample: 150.0,
            cap_fraction: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct MetricAdjustment {
    pub stat_value: Option<f64>,
    pub weight: f64,
    pub raw_adjustment: f64,
    pub adjustment: f64,
    pub capped: bool,
}

/// Usage-weighted average of a per-season stat; seasons without the stat or
/// without usage are ignored.
pub fn weighted_stat(seasons: &[(Option<f64>, f64)]) -> Option<f64> {
    let (sum, weight) = seasons
        .iter()
        .filter_map(|(value, usage)| value.filter(|_| *usage > 0.0).map(|v| (v * usage, *usage)))
        .fold((0.0, 0.0), |(s, w), (vs, u)| (s + vs, w + u));
    (weight > 0.0).then(|| sum / weight)
}

pub fn metric_adjustment(base_rate: f64, stat: Option<f64>, sample: f64, cfg: &MetricConfig) -> MetricAdjustment {
    let Some(value) = stat.filter(|_| cfg.enabled) else {
        return MetricAdjustment::default();
    };
    let weight = if cfg.min_sample > 0.0 {
        (sample / cfg.min_sample).clamp(0.0, 1.0)
    } else {
        1.0
    };
    let sign = if cfg.higher_is_better { 1.0 } else { -1.0 };
    let raw = cfg.coef * (value - cfg.league_avg) * sign * weight;
    let cap = cfg.cap_fraction.max(0.0) * base_rate.abs();
    let adjustment = raw.clamp(-cap, cap);

    MetricAdjustment {
        stat_value: Some(value),
        weight,
        raw_adjustment: raw,
        adjustment,
        capped: (adjustment - raw).abs() > f64::EPSILON,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn above_average_hitter_gets_boost() {
        let cfg = MetricConfig::hitter_default();
        let adj = metric_adjustment(4.0, Some(130.0), 600.0, &cfg);
        assert!((adj.adjustment - 0.6).abs() < 1e-12);
        assert!(!adj.capped);
    }

    #[test]
    fn lower_is_better_for_fip_minus() {
        let cfg = MetricConfig::pitcher_default();
        let adj = metric_adjustment(3.0, Some(90.0), 150.0, &cfg);
        assert!((adj.adjustment - 0.3).abs() < 1e-12);
        let worse = metric_adjustment(3.0, Some(110.0), 150.0, &cfg);
        assert!((worse.adjustment + 0.3).abs() < 1e-12);
    }

    #[test]
    fn adjustment_is_clamped_to_fraction_of_base() {
        let cfg = MetricConfig::hitter_default();
        let adj = metric_adjustment(2.0, Some(200.0), 600.0, &cfg);
        assert!(adj.capped);
        assert!((adj.adjustment - 0.5).abs() < 1e-12);
        assert!((adj.raw_adjustment - 2.0).abs() < 1e-12);
        // never flips a negative base
        let neg = metric_adjustment(-2.0, Some(10.0), 600.0, &cfg);
        assert!((neg.adjustment + 0.5).abs() < 1e-12);
    }

    #[test]
    fn small_sample_scales_weight() {
        let cfg = MetricConfig::hitter_default();
        let adj = metric_adjustment(4.0, Some(130.0), 300.0, &cfg);
        assert!((adj.weight - 0.5).abs() < 1e-12);
        assert!((adj.adjustment - 0.3).abs() < 1e-12);
    }

    #[test]
    fn missing_stat_or_disabled_is_zero() {
        let cfg = MetricConfig::hitter_default();
        assert_eq!(metric_adjustment(4.0, None, 600.0, &cfg), MetricAdjustment::default());
        let off = MetricConfig { enabled: false, ..cfg };
        assert_eq!(metric_adjustment(4.0, Some(150.0), 600.0, &off).adjustment, 0.0);
    }

    #[test]
    fn weighted_stat_ignores_missing_seasons() {
        let seasons = [(Some(120.0), 300.0), (None, 600.0), (Some(90.0), 100.0), (Some(500.0), 0.0)];
        let value = weighted_stat(&seasons).unwrap();
        assert!((value - (120.0 * 300.0 + 90.0 * 100.0) / 400.0).abs() < 1e-12);
        assert_eq!(weighted_stat(&[(None, 100.0)]), None);
    }
}
