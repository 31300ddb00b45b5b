// Valuation engine: service time, contracts, projections, durability,
// simulation, and the batch that ties them together.
//
// A run is two-phase. The cohort-wide pass (Super Two cutoff, price
// calibration, coverage checks) finishes before any single player is valued.

pub mod assembler;
pub mod calibration;
pub mod contracts;
pub mod durability;
pub mod long_control;
pub mod metrics;
pub mod options;
pub mod package;
pub mod projections;
pub mod role;
pub mod service_time;
pub mod simulate;

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::StatsDatabase;
use crate::inputs::{self, InputError, PlayerRecord, SeasonStats, ServiceTimeData};
use crate::output::{rank_players, PlayerOutput, RunMetadata};

use assembler::{build_player_output, SkipReason, ValuationContext};
use calibration::{calibrate_price, SignedContract};
use service_time::{compute_super_two, remaining_games_fraction};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RunError {
    #[error("data coverage shortfall: {}", .warnings.join("; "))]
    CoverageShortfall { warnings: Vec<String> },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("stats database error: {message}")]
    Database { message: String },
}

// ---------------------------------------------------------------------------
// Inputs and results
// ---------------------------------------------------------------------------

/// Everything a run needs, loaded up front.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub players: Vec<PlayerRecord>,
    /// Stat lines per player for the lookback window, oldest first.
    pub seasons: HashMap<u32, Vec<SeasonStats>>,
    pub service: ServiceTimeData,
    pub signed_contracts: Vec<SignedContract>,
    /// Seasons present anywhere in the stats source.
    pub available_seasons: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPlayer {
    pub player_id: u32,
    pub name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct ValuationRun {
    /// Every valued player, ordered by the configured rank metric.
    pub players: Vec<PlayerOutput>,
    pub skipped: Vec<SkippedPlayer>,
    pub metadata: RunMetadata,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load the roster, service time, signed contracts, and the lookback window
/// of season stats named by `config.paths`. A missing signed-contracts file
/// only disables calibration.
pub fn load_run_inputs(config: &Config, base_dir: &Path) -> Result<RunInputs, RunError> {
    let paths = &config.paths;
    let players = inputs::load_players(&base_dir.join(&paths.players))?;
    let service = inputs::load_service_time(&base_dir.join(&paths.service_time))?;

    let contracts_path = base_dir.join(&paths.signed_contracts);
    let signed_contracts = if contracts_path.exists() {
        inputs::load_signed_contracts(&contracts_path)?
    } else {
        warn!(
            "signed contracts file {} not found; price calibration disabled",
            contracts_path.display()
        );
        Vec::new()
    };

    let db_path = base_dir.join(&paths.stats_db);
    let db = StatsDatabase::open(&db_path.to_string_lossy()).map_err(database_error)?;
    let snapshot_year = config.snapshot_year();
    let first = snapshot_year - config.projection.lookback_seasons as i32;
    let seasons = db
        .load_seasons(first, snapshot_year - 1)
        .map_err(database_error)?;
    let available_seasons = db.available_seasons().map_err(database_error)?;

    info!(
        "loaded {} players, {} service records, {} signed contracts, stats for {} players",
        players.len(),
        service.records.len(),
        signed_contracts.len(),
        seasons.len()
    );

    Ok(RunInputs {
        players,
        seasons,
        service,
        signed_contracts,
        available_seasons,
    })
}

fn database_error(e: anyhow::Error) -> RunError {
    RunError::Database {
        message: format!("{e:#}"),
    }
}

// ---------------------------------------------------------------------------
// Coverage
// ---------------------------------------------------------------------------

/// Non-fatal data-coverage problems: lookback seasons absent from the stats
/// source and an implausible share of roster players without service time.
pub fn coverage_warnings(config: &Config, run: &RunInputs) -> Vec<String> {
    let mut warnings = Vec::new();
    let snapshot_year = config.snapshot_year();
    let first = snapshot_year - config.projection.lookback_seasons as i32;

    let missing: Vec<String> = (first..snapshot_year)
        .filter(|season| !run.available_seasons.contains(season))
        .map(|season| season.to_string())
        .collect();
    if !missing.is_empty() {
        warnings.push(format!("stats source is missing seasons {}", missing.join(", ")));
    }

    if !run.players.is_empty() {
        let zero_service = run
            .players
            .iter()
            .filter(|p| {
                run.service
                    .records
                    .get(&p.player_id)
                    .map_or(true, |r| r.total_service_days() == 0)
            })
            .count();
        let fraction = zero_service as f64 / run.players.len() as f64;
        if fraction > config.coverage.max_zero_service_fraction {
            warnings.push(format!(
                "{:.0}% of players have no service time (limit {:.0}%)",
                fraction * 100.0,
                config.coverage.max_zero_service_fraction * 100.0
            ));
        }
    }

    warnings
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

/// Value every player in `run`. Players missing required data are skipped
/// and reported; the batch never aborts for one player. With
/// `run.strict_coverage`, coverage warnings abort the run before any player
/// is valued.
pub fn value_players(config: &Config, run: &RunInputs, generated_at: DateTime<Utc>) -> Result<ValuationRun, RunError> {
    let snapshot_year = config.snapshot_year();

    // Phase 1: cohort-wide.
    let warnings = coverage_warnings(config, run);
    for w in &warnings {
        warn!("coverage: {w}");
    }
    if config.run.strict_coverage && !warnings.is_empty() {
        return Err(RunError::CoverageShortfall { warnings });
    }

    let super_two = compute_super_two(
        run.service.records.values(),
        &run.service.prior_season_days,
        config.service_time.super_two_min_days,
        config.service_time.super_two_top_pct,
    );
    info!(
        "super two: cutoff {} days, {} of {} eligible",
        super_two.cutoff_days,
        super_two.super_two_ids.len(),
        super_two.eligible_ids.len()
    );

    let (price_curve, calibration) = calibrate_price(
        &run.signed_contracts,
        snapshot_year,
        config.price_curve,
        &config.calibration,
    );
    let in_season_fraction = remaining_games_fraction(config.snapshot_date, &config.season);

    let ctx = ValuationContext {
        config,
        snapshot_year,
        in_season_fraction,
        price_curve,
        super_two: &super_two,
        service: &run.service,
    };

    // Phase 2: per player.
    let mut players = Vec::with_capacity(run.players.len());
    let mut skipped = Vec::new();
    for player in &run.players {
        let seasons = run
            .seasons
            .get(&player.player_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        match build_player_output(&ctx, player, seasons) {
            Ok(output) => players.push(output),
            Err(reason) => {
                warn!("skipping {} ({}): {}", player.name, player.player_id, reason);
                skipped.push(SkippedPlayer {
                    player_id: player.player_id,
                    name: player.name.clone(),
                    reason,
                });
            }
        }
    }

    let order: Vec<u32> = rank_players(&players, config.output.rank_metric, false)
        .iter()
        .map(|p| p.player_id)
        .collect();
    let mut by_id: HashMap<u32, PlayerOutput> = players.into_iter().map(|p| (p.player_id, p)).collect();
    let players: Vec<PlayerOutput> = order.iter().filter_map(|id| by_id.remove(id)).collect();

    info!(
        "valued {} players, skipped {} (price ${:.2}M/WAR, {} sims)",
        players.len(),
        skipped.len(),
        price_curve.dollars_per_war,
        config.simulation.sims
    );

    let metadata = RunMetadata {
        generated_at: generated_at.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        snapshot_date: config.snapshot_date.to_string(),
        war_source: config.price.source.clone(),
        dollars_per_war: price_curve.dollars_per_war,
        price_growth: price_curve.growth,
        discount_rate: config.price.discount_rate,
        risk_aversion: config.price.risk_aversion,
        sims: config.simulation.sims,
        seed: config.run.seed,
        in_season_fraction,
        super_two_cutoff_days: super_two.cutoff_days,
        calibration,
        player_count: players.len(),
        skipped_count: skipped.len(),
        coverage_warnings: warnings,
    };

    Ok(ValuationRun {
        players,
        skipped,
        metadata,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
