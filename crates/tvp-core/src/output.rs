// Player output records, ranking cuts, and JSON/CSV emission.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::valuation::calibration::CalibrationSummary;
use crate::valuation::contracts::CostBasis;
use crate::valuation::durability::DurabilityMixture;
use crate::valuation::long_control::LongControlBoost;
use crate::valuation::metrics::MetricAdjustment;
use crate::valuation::options::OptionValuation;
use crate::valuation::projections::RateProjection;
use crate::valuation::role::Role;
use crate::valuation::simulate::OptionExerciseRate;

// ---------------------------------------------------------------------------
// Output records
// ---------------------------------------------------------------------------

/// One season of the point-estimate audit table. Year 0 war and cost are
/// prorated by the remaining-games fraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub season: i32,
    pub war: f64,
    pub price: f64,
    pub value: f64,
    pub cost: f64,
    pub surplus: f64,
    pub discount: f64,
    pub pv_surplus: f64,
    pub cost_basis: CostBasis,
}

/// Explainable booleans for downstream filtering. A flag never removes a
/// player from the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PlayerFlags {
    pub small_sample: bool,
    pub leaderboard_eligible: bool,
    pub role_change_risk: bool,
    pub pitcher_tail_risk: bool,
    pub super_two: bool,
    pub workload_spike: bool,
    /// Guaranteed years restated at AAV (override or deferral adjustment).
    pub cbt_aav: bool,
    pub metric_capped: bool,
}

/// Intermediate values kept for auditing a valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationComponents {
    pub usage_prior: f64,
    pub rate_projection: RateProjection,
    pub metric: MetricAdjustment,
    pub durability: DurabilityMixture,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter_probability: Option<f64>,
    pub expected_war: Vec<f64>,
    pub price_by_year: Vec<f64>,
    pub option_valuations: Vec<OptionValuation>,
    pub option_exercise_rates: Vec<OptionExerciseRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerOutput {
    pub player_id: u32,
    pub name: String,
    pub team: Option<String>,
    pub age: u32,
    pub role: Role,
    pub projection_role: Role,
    pub position: Option<String>,
    pub service_time: Option<String>,
    pub control_years_remaining: usize,
    pub horizon_years: usize,
    /// Sum of the breakdown's discounted surplus plus the long-control boost.
    pub tvp_point: f64,
    pub tvp_p10: f64,
    pub tvp_p50: f64,
    pub tvp_p90: f64,
    pub tvp_mean: f64,
    pub tvp_std: f64,
    pub tvp_risk_adj: f64,
    pub long_control: LongControlBoost,
    pub pa_window_total: f64,
    pub ip_window_total: f64,
    pub usage_window_seasons_present: usize,
    pub flags: PlayerFlags,
    pub breakdown: Vec<BreakdownRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<ValuationComponents>,
}

/// Run-level metadata written alongside the player list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunMetadata {
    pub generated_at: String,
    pub snapshot_date: String,
    pub war_source: String,
    pub dollars_per_war: f64,
    pub price_growth: f64,
    pub discount_rate: f64,
    pub risk_aversion: f64,
    pub sims: usize,
    pub seed: u64,
    pub in_season_fraction: f64,
    pub super_two_cutoff_days: u32,
    pub calibration: CalibrationSummary,
    pub player_count: usize,
    pub skipped_count: usize,
    pub coverage_warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    RiskAdj,
    P50,
    Mean,
    P90,
    Point,
}

impl RankMetric {
    pub fn value_of(self, player: &PlayerOutput) -> f64 {
        match self {
            RankMetric::RiskAdj => player.tvp_risk_adj,
            RankMetric::P50 => player.tvp_p50,
            RankMetric::Mean => player.tvp_mean,
            RankMetric::P90 => player.tvp_p90,
            RankMetric::Point => player.tvp_point,
        }
    }
}

/// Players ordered best first by `metric` (ties by player id). With
/// `leaderboard_only`, players not flagged leaderboard-eligible are left out
/// of this view.
pub fn rank_players(players: &[PlayerOutput], metric: RankMetric, leaderboard_only: bool) -> Vec<&PlayerOutput> {
    let mut ranked: Vec<&PlayerOutput> = players
        .iter()
        .filter(|p| !leaderboard_only || p.flags.leaderboard_eligible)
        .collect();
    ranked.sort_by(|a, b| {
        metric
            .value_of(b)
            .total_cmp(&metric.value_of(a))
            .then(a.player_id.cmp(&b.player_id))
    });
    ranked
}

pub fn top_n(players: &[PlayerOutput], metric: RankMetric, n: usize, leaderboard_only: bool) -> Vec<&PlayerOutput> {
    let mut ranked = rank_players(players, metric, leaderboard_only);
    ranked.truncate(n);
    ranked
}

/// Worst `n` players, worst first.
pub fn bottom_n(players: &[PlayerOutput], metric: RankMetric, n: usize, leaderboard_only: bool) -> Vec<&PlayerOutput> {
    let mut ranked = rank_players(players, metric, leaderboard_only);
    ranked.reverse();
    ranked.truncate(n);
    ranked
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct OutputDocument<'a> {
    meta: &'a RunMetadata,
    top_n: usize,
    rank_metric: RankMetric,
    players: &'a [&'a PlayerOutput],
}

#[derive(Serialize)]
struct CsvRow<'a> {
    rank: usize,
    player_id: u32,
    name: &'a str,
    team: Option<&'a str>,
    age: u32,
    role: &'static str,
    position: Option<&'a str>,
    service_time: Option<&'a str>,
    control_years_remaining: usize,
    tvp_point: f64,
    tvp_p10: f64,
    tvp_p50: f64,
    tvp_p90: f64,
    tvp_mean: f64,
    tvp_std: f64,
    tvp_risk_adj: f64,
    long_control_pct: f64,
    flags: String,
}

pub fn output_file_stem(top_n: usize, generated_at: DateTime<Utc>) -> String {
    format!("tvp_mlb_v1_top{top_n}_{}", generated_at.format("%Y%m%dT%H%M%SZ"))
}

/// Write the ranked list as `<stem>.json` and `<stem>.csv` under `dir`.
pub fn emit_outputs(
    dir: &Path,
    ranked: &[&PlayerOutput],
    meta: &RunMetadata,
    top_n: usize,
    rank_metric: RankMetric,
    generated_at: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    let stem = output_file_stem(top_n, generated_at);
    let json_path = dir.join(format!("{stem}.json"));
    let csv_path = dir.join(format!("{stem}.csv"));

    let document = OutputDocument {
        meta,
        top_n,
        rank_metric,
        players: ranked,
    };
    let json_file = std::fs::File::create(&json_path)
        .with_context(|| format!("failed to create {}", json_path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(json_file), &document)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let mut writer = csv::Writer::from_path(&csv_path)
        .with_context(|| format!("failed to create {}", csv_path.display()))?;
    for (index, player) in ranked.iter().enumerate() {
        let flags = serde_json::to_string(&player.flags).context("failed to encode flags")?;
        writer
            .serialize(CsvRow {
                rank: index + 1,
                player_id: player.player_id,
                name: &player.name,
                team: player.team.as_deref(),
                age: player.age,
                role: player.role.code(),
                position: player.position.as_deref(),
                service_time: player.service_time.as_deref(),
                control_years_remaining: player.control_years_remaining,
                tvp_point: player.tvp_point,
                tvp_p10: player.tvp_p10,
                tvp_p50: player.tvp_p50,
                tvp_p90: player.tvp_p90,
                tvp_mean: player.tvp_mean,
                tvp_std: player.tvp_std,
                tvp_risk_adj: player.tvp_risk_adj,
                long_control_pct: player.long_control.pct,
                flags,
            })
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", csv_path.display()))?;

    info!(
        "wrote {} players to {} and {}",
        ranked.len(),
        json_path.display(),
        csv_path.display()
    );
    Ok((json_path, csv_path))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
