// Per-player valuation: resolves the role once, projects each role branch,
// builds the cost schedule, runs the simulation and assembles the output
// record with its breakdown and flags.

use thiserror::Error;
use tracing::debug;

use crate::config::{Config, EligibilityConfig};
use crate::inputs::{PlayerRecord, SeasonStats, ServiceTimeData};
use crate::output::{BreakdownRow, PlayerFlags, PlayerOutput, ValuationComponents};
use crate::valuation::calibration::PriceCurve;
use crate::valuation::contracts::{
    apply_contract_overrides, build_contract_schedule, contract_horizon, ContractSchedule, CostBasis,
    ScheduleParams,
};
use crate::valuation::durability::{build_mixture, DurabilityInputs, DurabilityLabel, DurabilityMixture};
use crate::valuation::long_control::{apply_boost, boost_simulation, long_control_boost};
use crate::valuation::metrics::{metric_adjustment, weighted_stat, MetricAdjustment};
use crate::valuation::options::{option_expected_value, OptionValuation};
use crate::valuation::projections::{
    build_rate_projection, expected_performance_path, is_small_sample, weighted_usage, RateProjection,
    SeasonHistory,
};
use crate::valuation::role::{
    resolve_role, usage_prior_for_player, Role, RoleDecision, RoleProfile, UsageSummary,
};
use crate::valuation::service_time::{control_timeline, SuperTwoResult};
use crate::valuation::simulate::{
    derive_player_seed, discount_factor, simulate_tvp, ProjectionBranch, SimulationInputs,
    SimulationSettings,
};

// ---------------------------------------------------------------------------
// Skips
// ---------------------------------------------------------------------------

/// Why a player was left out of the output. Never fatal to the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("no age on record")]
    MissingAge,

    #[error("no season history in the lookback window")]
    MissingHistory,

    #[error("neither service time nor any usage on record")]
    NoServiceOrUsage,
}

// ---------------------------------------------------------------------------
// Context
// ---------------------------------------------------------------------------

/// Run-wide values shared by every player. Built once, after the cohort-wide
/// Super Two pass and price calibration.
#[derive(Debug, Clone, Copy)]
pub struct ValuationContext<'a> {
    pub config: &'a Config,
    pub snapshot_year: i32,
    pub in_season_fraction: f64,
    /// Calibrated (or default) price curve for this run.
    pub price_curve: PriceCurve,
    pub super_two: &'a SuperTwoResult,
    pub service: &'a ServiceTimeData,
}

impl ValuationContext<'_> {
    /// Seasons in the lookback window, oldest first. The snapshot season
    /// itself is not included.
    pub fn lookback_seasons(&self) -> Vec<i32> {
        let n = self.config.projection.lookback_seasons as i32;
        (self.snapshot_year - n..self.snapshot_year).collect()
    }
}

// ---------------------------------------------------------------------------
// Small helpers
// ---------------------------------------------------------------------------

/// `mean - λ·std`.
pub fn risk_adjusted_value(mean: f64, std: f64, risk_aversion: f64) -> f64 {
    mean - risk_aversion * std
}

/// A player is valued only with a service record or some recorded usage.
pub fn is_player_eligible(has_service_record: bool, usage: &UsageSummary) -> bool {
    has_service_record || !usage.is_empty()
}

/// Leaderboard gate: enough lookback usage for the role, or enough service.
pub fn leaderboard_eligible(role: Role, usage: &UsageSummary, service_days: u32, cfg: &EligibilityConfig) -> bool {
    let enough_usage = match role {
        Role::Hitter => usage.pa >= cfg.leaderboard_min_pa,
        Role::Starter | Role::Reliever => usage.ip >= cfg.leaderboard_min_ip,
        Role::Hybrid => usage.pa >= cfg.leaderboard_min_pa || usage.ip >= cfg.leaderboard_min_ip,
    };
    enough_usage || service_days >= cfg.leaderboard_min_service_days
}

/// Latest-season innings jump over the season before, zero-filled.
pub fn derive_workload_spike(window: &[SeasonStats], spike_ip: f64) -> bool {
    match window {
        [.., prior, latest] => latest.ip - prior.ip > spike_ip,
        _ => false,
    }
}

/// One stat line per lookback season, zero-filled where the player has no row.
fn window_stats(seasons: &[SeasonStats], lookback: &[i32]) -> Vec<SeasonStats> {
    lookback
        .iter()
        .map(|season| {
            seasons
                .iter()
                .find(|s| s.season == *season)
                .copied()
                .unwrap_or(SeasonStats {
                    season: *season,
                    ..SeasonStats::default()
                })
        })
        .collect()
}

fn role_history(window: &[SeasonStats], role: Role) -> Vec<SeasonHistory> {
    window
        .iter()
        .map(|s| {
            if role.is_pitcher() {
                SeasonHistory {
                    season: s.season,
                    war: s.pitching_war,
                    usage: s.ip,
                }
            } else {
                SeasonHistory {
                    season: s.season,
                    war: s.batting_war,
                    usage: s.pa,
                }
            }
        })
        .collect()
}

fn role_stat(window: &[SeasonStats], role: Role) -> Option<f64> {
    let pairs: Vec<(Option<f64>, f64)> = window
        .iter()
        .map(|s| {
            if role.is_pitcher() {
                (s.fip_minus, s.ip)
            } else {
                (s.ops_plus, s.pa)
            }
        })
        .collect();
    weighted_stat(&pairs)
}

// ---------------------------------------------------------------------------
// Branch projection
// ---------------------------------------------------------------------------

/// Projection for one role branch of a player.
#[derive(Debug, Clone, PartialEq)]
struct BranchProjection {
    profile: RoleProfile,
    usage_prior: f64,
    small_sample: bool,
    rate: RateProjection,
    metric: MetricAdjustment,
    /// Posterior rate after the metric nudge.
    rate_post: f64,
    durability: DurabilityMixture,
}

impl BranchProjection {
    fn expected_path(&self, age: u32, years: usize) -> Vec<f64> {
        expected_performance_path(
            self.rate_post,
            self.rate.usage_post,
            age,
            years,
            self.profile.projection.denom,
            &self.profile.aging,
        )
    }

    fn simulation_branch(&self, probability: f64) -> ProjectionBranch {
        ProjectionBranch {
            probability,
            rate_post: self.rate_post,
            usage_post: self.rate.usage_post,
            denom: self.profile.projection.denom,
            talent_sd: self.profile.talent_sd,
            shock_sd: self.profile.shock_sd,
            aging: self.profile.aging,
            durability: self.durability.clone(),
        }
    }
}

fn project_branch(
    config: &Config,
    role: Role,
    window: &[SeasonStats],
    durability_inputs: &DurabilityInputs,
) -> BranchProjection {
    let profile = config.role_profile(role);
    let history = role_history(window, profile.role);
    let weights = &config.projection.recency_weights;

    let recent_usage = weighted_usage(&history, weights);
    let usage_prior = usage_prior_for_player(profile.role, recent_usage, &config.projection);
    let small_sample = is_small_sample(&history, profile.projection.small_sample_floor);
    let rate = build_rate_projection(&history, weights, &profile.priors(usage_prior, small_sample));

    let sample: f64 = history.iter().map(|h| h.usage.max(0.0)).sum();
    let metric = metric_adjustment(rate.rate_post, role_stat(window, profile.role), sample, &profile.metric);

    BranchProjection {
        profile,
        usage_prior,
        small_sample,
        rate_post: rate.rate_post + metric.adjustment,
        rate,
        metric,
        durability: build_mixture(durability_inputs, &profile.durability),
    }
}

/// Every branch a player is valued on. A hitter bats, a pitcher pitches, a
/// two-way player does both. Pitching branches are mutually exclusive and
/// drawn once per path with their probabilities.
#[derive(Debug, Clone, PartialEq)]
struct RoleBranches {
    /// Branch for the reported projection role.
    primary: BranchProjection,
    hitting: Option<BranchProjection>,
    pitching: Vec<(f64, BranchProjection)>,
}

impl RoleBranches {
    fn project(
        config: &Config,
        decision: &RoleDecision,
        window: &[SeasonStats],
        durability_inputs: &DurabilityInputs,
    ) -> Self {
        let primary = project_branch(config, decision.projection_role, window, durability_inputs);
        let branch = |role: Role| {
            if role == primary.profile.role {
                primary.clone()
            } else {
                project_branch(config, role, window, durability_inputs)
            }
        };

        let hitting = matches!(decision.role, Role::Hitter | Role::Hybrid).then(|| branch(Role::Hitter));
        let pitching = match (decision.role, decision.starter_probability) {
            (Role::Hitter, _) => Vec::new(),
            (_, Some(p)) => vec![(p, branch(Role::Starter)), (1.0 - p, branch(Role::Reliever))],
            (role, None) => vec![(1.0, branch(role))],
        };

        Self {
            primary,
            hitting,
            pitching,
        }
    }

    /// Hitting path plus the probability-weighted pitching paths.
    fn expected_path(&self, age: u32, years: usize) -> Vec<f64> {
        let mut path = match &self.hitting {
            Some(h) => h.expected_path(age, years),
            None => vec![0.0; years],
        };
        for (p, branch) in &self.pitching {
            for (total, war) in path.iter_mut().zip(branch.expected_path(age, years)) {
                *total += p * war;
            }
        }
        path
    }

    /// Drawn branches and the hitting branch played alongside them.
    fn simulation_branches(&self) -> (Vec<ProjectionBranch>, Option<ProjectionBranch>) {
        if self.pitching.is_empty() {
            let drawn = self.hitting.iter().map(|h| h.simulation_branch(1.0)).collect();
            return (drawn, None);
        }
        let drawn = self
            .pitching
            .iter()
            .map(|(p, branch)| branch.simulation_branch(*p))
            .collect();
        (drawn, self.hitting.as_ref().map(|h| h.simulation_branch(1.0)))
    }

    fn pitching_lost_probability(&self) -> Option<f64> {
        self.pitching
            .iter()
            .map(|(_, b)| b.durability.probability_of(DurabilityLabel::Lost))
            .reduce(f64::max)
    }
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// Point-estimate audit table. Year 0 performance and cost are prorated by
/// the remaining-games fraction; from the first free-agent year on the
/// player is gone and rows carry zero value and cost.
pub fn build_breakdown(
    schedule: &ContractSchedule,
    expected_war: &[f64],
    price_by_year: &[f64],
    discount_rate: f64,
    in_season_fraction: f64,
) -> Vec<BreakdownRow> {
    let mut gone = false;
    schedule
        .years
        .iter()
        .enumerate()
        .map(|(t, year)| {
            gone = gone || year.basis == CostBasis::Fa;
            let proration = if t == 0 { in_season_fraction } else { 1.0 };
            let (war, cost) = if gone {
                (0.0, 0.0)
            } else {
                (
                    expected_war.get(t).copied().unwrap_or(0.0) * proration,
                    year.cost_m * proration,
                )
            };
            let price = price_by_year.get(t).copied().unwrap_or(0.0);
            let value = war * price;
            let surplus = value - cost;
            let discount = discount_factor(discount_rate, t);
            BreakdownRow {
                season: year.season,
                war,
                price,
                value,
                cost,
                surplus,
                discount,
                pv_surplus: surplus * discount,
                cost_basis: year.basis,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Player assembly
// ---------------------------------------------------------------------------

/// Value one player. `seasons` holds the player's stat lines (any order);
/// only the lookback window is used.
pub fn build_player_output(
    ctx: &ValuationContext<'_>,
    player: &PlayerRecord,
    seasons: &[SeasonStats],
) -> Result<PlayerOutput, SkipReason> {
    let config = ctx.config;
    let age = player.age.ok_or(SkipReason::MissingAge)?;

    let lookback = ctx.lookback_seasons();
    if !seasons.iter().any(|s| lookback.contains(&s.season)) {
        return Err(SkipReason::MissingHistory);
    }
    let window = window_stats(seasons, &lookback);
    let usage = UsageSummary::from_seasons(&window);

    let service_record = ctx.service.records.get(&player.player_id);
    if !is_player_eligible(service_record.is_some(), &usage) {
        return Err(SkipReason::NoServiceOrUsage);
    }
    let service_days = service_record.map_or(0, |r| r.total_service_days());

    // Role, once.
    let decision = resolve_role(&usage, player.role_hint, age, &config.role);
    let workload_spike = player
        .workload_spike
        .unwrap_or_else(|| derive_workload_spike(&window, config.role.workload_spike_ip));
    let durability_inputs = DurabilityInputs {
        age,
        workload_spike,
        il_history_years: player.il_history_years,
    };

    let branches = RoleBranches::project(config, &decision, &window, &durability_inputs);
    let primary = &branches.primary;

    // Horizon: the longer of known contract and remaining control.
    let super_two = ctx.super_two.is_super_two(player.player_id);
    let timeline = control_timeline(service_days, super_two);
    let (contract, guaranteed_basis) = apply_contract_overrides(
        &player.contract,
        player.player_id,
        ctx.snapshot_year,
        &config.contracts.overrides,
        config.contracts.deferral_aav_multiplier,
    );
    let horizon = contract_horizon(&contract, ctx.snapshot_year)
        .max(timeline.team_control_years_remaining())
        .max(1)
        .min(config.run.max_horizon_years.max(1));

    // Point-estimate path: hitting plus the blended pitching branches.
    let expected_war = branches.expected_path(age, horizon);

    let price_by_year = ctx.price_curve.price_by_year(horizon);
    let year_types = timeline.year_types();
    let schedule = build_contract_schedule(
        &contract,
        &ScheduleParams {
            snapshot_year: ctx.snapshot_year,
            horizon_years: horizon,
            control_year_types: &year_types,
            expected_performance: &expected_war,
            price_by_year: &price_by_year,
            arb_share: &config.contracts.arb_share,
            min_salary_m: config.contracts.min_salary_m,
            min_salary_growth: config.contracts.min_salary_growth,
            guaranteed_basis,
        },
    );

    let discount_rate = config.price.discount_rate;
    let breakdown = build_breakdown(
        &schedule,
        &expected_war,
        &price_by_year,
        discount_rate,
        ctx.in_season_fraction,
    );
    let breakdown_point: f64 = breakdown.iter().map(|row| row.pv_surplus).sum();

    let mut long_control = long_control_boost(&schedule, &config.long_control);
    let tvp_point = apply_boost(breakdown_point, long_control.pct);
    long_control.point_value = tvp_point - breakdown_point;

    // Simulation.
    let (drawn, hitting) = branches.simulation_branches();
    let sim = simulate_tvp(
        &SimulationSettings {
            sims: config.simulation.sims,
            discount_rate,
        },
        &SimulationInputs {
            age,
            schedule: &schedule,
            price_by_year: &price_by_year,
            expected_war: &expected_war,
            in_season_fraction: ctx.in_season_fraction,
            branches: &drawn,
            hitting: hitting.as_ref(),
        },
        derive_player_seed(config.run.seed, player.player_id),
    );
    let sim = boost_simulation(sim, long_control.pct);
    let tvp_risk_adj = risk_adjusted_value(sim.mean, sim.std, config.price.risk_aversion);

    let option_valuations: Vec<OptionValuation> = schedule
        .years
        .iter()
        .enumerate()
        .filter_map(|(t, year)| {
            let option = year.option.as_ref()?;
            let value = expected_war.get(t).copied().unwrap_or(0.0) * price_by_year.get(t).copied().unwrap_or(0.0);
            Some(option_expected_value(option, year.season, value, t, discount_rate, &config.options))
        })
        .collect();

    let flags = PlayerFlags {
        small_sample: primary.small_sample,
        leaderboard_eligible: leaderboard_eligible(decision.role, &usage, service_days, &config.eligibility),
        role_change_risk: decision.role_change_risk,
        pitcher_tail_risk: branches
            .pitching_lost_probability()
            .is_some_and(|lost| lost >= config.eligibility.pitcher_tail_risk_lost),
        super_two,
        workload_spike,
        cbt_aav: guaranteed_basis == CostBasis::CbtAav,
        metric_capped: primary.metric.capped,
    };

    debug!(
        "valued {} ({}): role {}, horizon {}, point {:.2} (boost {:.0}%), mean {:.2}, risk-adj {:.2}",
        player.name,
        player.player_id,
        decision.role,
        horizon,
        tvp_point,
        long_control.pct * 100.0,
        sim.mean,
        tvp_risk_adj
    );

    let components = config.output.include_components.then(|| ValuationComponents {
        usage_prior: primary.usage_prior,
        rate_projection: primary.rate,
        metric: primary.metric,
        durability: primary.durability.clone(),
        starter_probability: decision.starter_probability,
        expected_war: expected_war.clone(),
        price_by_year: price_by_year.clone(),
        option_valuations,
        option_exercise_rates: sim.option_exercise_rates.clone(),
    });

    Ok(PlayerOutput {
        player_id: player.player_id,
        name: player.name.clone(),
        team: player.team.clone(),
        age,
        role: decision.role,
        projection_role: decision.projection_role,
        position: player.position.clone(),
        service_time: service_record.map(|r| {
            r.label
                .clone()
                .unwrap_or_else(|| format!("{}.{:03}", r.years, r.days))
        }),
        control_years_remaining: timeline.team_control_years_remaining(),
        horizon_years: horizon,
        tvp_point,
        tvp_p10: sim.quantiles.p10,
        tvp_p50: sim.quantiles.p50,
        tvp_p90: sim.quantiles.p90,
        tvp_mean: sim.mean,
        tvp_std: sim.std,
        tvp_risk_adj,
        long_control,
        pa_window_total: usage.pa,
        ip_window_total: usage.ip,
        usage_window_seasons_present: window.iter().filter(|s| s.pa > 0.0 || s.ip > 0.0).count(),
        flags,
        breakdown,
        components,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::valuation::contracts::{ContractTerms, ContractYear, ContractYearTerms, OptionTerms, OptionType};
    use crate::valuation::service_time::ServiceTimeRecord;
    use std::path::Path;

    const EPS: f64 = 1e-9;

    fn config() -> Config {
        let text = r#"
            [run]
            snapshot_date = "2026-01-15"

            [simulation]
            sims = 200
        "#;
        parse_config(text, Path::new("test.toml")).unwrap()
    }

    fn hitter_seasons(pa: f64, war: f64) -> Vec<SeasonStats> {
        (2023..=2025)
            .map(|season| SeasonStats {
                season,
                pa,
                batting_war: war,
                ops_plus: Some(100.0),
                ..SeasonStats::default()
            })
            .collect()
    }

    fn player(player_id: u32, age: Option<u32>) -> PlayerRecord {
        PlayerRecord {
            player_id,
            name: format!("Player {player_id}"),
            team: Some("SEA".into()),
            age,
            role_hint: None,
            position: None,
            contract: ContractTerms::default(),
            workload_spike: None,
            il_history_years: 0,
        }
    }

    fn value(
        config: &Config,
        service: &ServiceTimeData,
        record: &PlayerRecord,
        seasons: &[SeasonStats],
    ) -> Result<PlayerOutput, SkipReason> {
        let super_two = SuperTwoResult::default();
        let ctx = ValuationContext {
            config,
            snapshot_year: config.snapshot_year(),
            in_season_fraction: 1.0,
            price_curve: config.price_curve,
            super_two: &super_two,
            service,
        };
        build_player_output(&ctx, record, seasons)
    }

    fn service_for(player_id: u32, years: u32, days: u32) -> ServiceTimeData {
        let mut service = ServiceTimeData::default();
        service
            .records
            .insert(player_id, ServiceTimeRecord::new(player_id, years, days));
        service
    }

    #[test]
    fn risk_adjustment_penalizes_variance() {
        let low = risk_adjusted_value(20.0, 5.0, 0.5);
        let high = risk_adjusted_value(20.0, 15.0, 0.5);
        assert!(high < low);
        assert_eq!(risk_adjusted_value(20.0, 15.0, 0.0), 20.0);
    }

    #[test]
    fn missing_age_is_skipped() {
        let cfg = config();
        let result = value(&cfg, &ServiceTimeData::default(), &player(1, None), &hitter_seasons(600.0, 3.0));
        assert_eq!(result.unwrap_err(), SkipReason::MissingAge);
    }

    #[test]
    fn missing_history_is_skipped() {
        let cfg = config();
        let old = vec![SeasonStats {
            season: 2019,
            pa: 600.0,
            ..SeasonStats::default()
        }];
        let result = value(&cfg, &ServiceTimeData::default(), &player(1, Some(30)), &old);
        assert_eq!(result.unwrap_err(), SkipReason::MissingHistory);
    }

    #[test]
    fn no_service_and_no_usage_is_not_valued() {
        let cfg = config();
        let result = value(&cfg, &ServiceTimeData::default(), &player(1, Some(22)), &hitter_seasons(0.0, 0.0));
        assert_eq!(result.unwrap_err(), SkipReason::NoServiceOrUsage);
    }

    #[test]
    fn pre_arb_hitter_has_escalating_minimum_cost() {
        let cfg = config();
        let service = service_for(7, 1, 0);
        let out = value(&cfg, &service, &player(7, Some(23)), &hitter_seasons(600.0, 2.5)).unwrap();

        assert_eq!(out.role, Role::Hitter);
        assert_eq!(out.control_years_remaining, 5);
        assert_eq!(out.breakdown.len(), 5);
        assert_eq!(out.breakdown[0].cost_basis, CostBasis::ModelCostPrearb);
        assert!(out.breakdown[1].cost > out.breakdown[0].cost);
        assert!(out.tvp_point > 0.0);
        assert!(out.tvp_mean > 0.0);
        assert!(out.flags.leaderboard_eligible);
        assert!(!out.flags.small_sample);
    }

    #[test]
    fn breakdown_point_sums_pv_surplus() {
        let cfg = config();
        let service = service_for(7, 3, 0);
        let out = value(&cfg, &service, &player(7, Some(27)), &hitter_seasons(600.0, 4.0)).unwrap();
        let sum: f64 = out.breakdown.iter().map(|r| r.pv_surplus).sum();
        assert!((sum + out.long_control.point_value - out.tvp_point).abs() < EPS);
        for row in &out.breakdown {
            assert!((row.surplus - (row.value - row.cost)).abs() < EPS);
        }
    }

    #[test]
    fn breakdown_prorates_year_zero_and_zeroes_free_agency() {
        let schedule = ContractSchedule {
            years: vec![
                ContractYear::new(2026, 10.0, CostBasis::Guaranteed),
                ContractYear::new(2027, 0.0, CostBasis::Fa),
            ],
        };
        let rows = build_breakdown(&schedule, &[4.0, 4.0], &[10.0, 10.0], 0.0, 0.5);
        assert!((rows[0].war - 2.0).abs() < EPS);
        assert!((rows[0].cost - 5.0).abs() < EPS);
        assert!((rows[0].surplus - 15.0).abs() < EPS);
        assert_eq!(rows[1].war, 0.0);
        assert_eq!(rows[1].value, 0.0);
        assert_eq!(rows[1].cost_basis, CostBasis::Fa);
    }

    #[test]
    fn club_option_gets_sigmoid_valuation_and_exercise_rate() {
        let cfg = config();
        let mut record = player(9, Some(28));
        record.contract = ContractTerms {
            contract_years: vec![
                ContractYearTerms {
                    season: 2026,
                    salary_m: Some(5.0),
                    is_guaranteed: Some(true),
                },
                ContractYearTerms {
                    season: 2027,
                    salary_m: Some(5.0),
                    is_guaranteed: Some(true),
                },
            ],
            options: vec![OptionTerms {
                season: 2028,
                option_type: OptionType::Club,
                salary_m: Some(8.0),
                buyout_m: Some(1.0),
            }],
            ..ContractTerms::default()
        };
        let service = service_for(9, 7, 0);
        let out = value(&cfg, &service, &record, &hitter_seasons(650.0, 4.5)).unwrap();

        assert_eq!(out.horizon_years, 3);
        assert_eq!(out.breakdown[2].cost_basis, CostBasis::Option);
        let components = out.components.unwrap();
        assert_eq!(components.option_valuations.len(), 1);
        assert!(components.option_valuations[0].exercise_probability > 0.5);
        assert!(components.option_exercise_rates[0].rate > 0.5);
    }

    #[test]
    fn workload_spike_from_innings_jump() {
        let window = vec![
            SeasonStats {
                season: 2024,
                ip: 60.0,
                ..SeasonStats::default()
            },
            SeasonStats {
                season: 2025,
                ip: 150.0,
                ..SeasonStats::default()
            },
        ];
        assert!(derive_workload_spike(&window, 40.0));
        assert!(!derive_workload_spike(&window, 100.0));
        assert!(!derive_workload_spike(&window[1..], 40.0));
    }

    #[test]
    fn explicit_workload_flag_wins() {
        let cfg = config();
        let mut record = player(3, Some(27));
        record.workload_spike = Some(true);
        let service = service_for(3, 4, 0);
        let out = value(&cfg, &service, &record, &hitter_seasons(600.0, 3.0)).unwrap();
        assert!(out.flags.workload_spike);
    }

    #[test]
    fn leaderboard_gate_by_role_or_service() {
        let cfg = EligibilityConfig::default();
        let light = UsageSummary {
            pa: 50.0,
            ..UsageSummary::default()
        };
        assert!(!leaderboard_eligible(Role::Hitter, &light, 0, &cfg));
        assert!(leaderboard_eligible(Role::Hitter, &light, 400, &cfg));
        let arm = UsageSummary {
            ip: 60.0,
            ..UsageSummary::default()
        };
        assert!(leaderboard_eligible(Role::Reliever, &arm, 0, &cfg));
        assert!(!leaderboard_eligible(Role::Hitter, &arm, 0, &cfg));
    }

    #[test]
    fn pitcher_tail_risk_for_injury_history() {
        let cfg = config();
        let seasons: Vec<SeasonStats> = (2023..=2025)
            .map(|season| SeasonStats {
                season,
                ip: 170.0,
                games_pitched: 30.0,
                games_started: 30.0,
                pitching_war: 3.0,
                fip_minus: Some(95.0),
                ..SeasonStats::default()
            })
            .collect();
        let mut record = player(4, Some(33));
        record.il_history_years = 3;
        let service = service_for(4, 8, 0);
        let out = value(&cfg, &service, &record, &seasons).unwrap();
        assert_eq!(out.role, Role::Starter);
        assert!(out.flags.pitcher_tail_risk);
        assert!(out.flags.leaderboard_eligible);
    }

    fn two_way_seasons(pitching_war: f64) -> Vec<SeasonStats> {
        (2023..=2025)
            .map(|season| SeasonStats {
                season,
                pa: 600.0,
                batting_war: 4.0,
                ops_plus: Some(100.0),
                ip: 150.0,
                games_pitched: 25.0,
                games_started: 25.0,
                pitching_war,
                fip_minus: Some(100.0),
            })
            .collect()
    }

    #[test]
    fn two_way_player_is_valued_on_both_sides() {
        let cfg = config();
        let service = service_for(17, 4, 0);
        let bat_only = value(&cfg, &service, &player(17, Some(29)), &two_way_seasons(0.0)).unwrap();
        let both = value(&cfg, &service, &player(17, Some(29)), &two_way_seasons(5.0)).unwrap();

        assert_eq!(both.role, Role::Hybrid);
        assert_eq!(both.projection_role, Role::Hitter);
        assert!(both.flags.role_change_risk);
        let components = both.components.as_ref().unwrap();
        let p = components.starter_probability.expect("per-path starter draw");
        assert!(p > 0.5 && p <= 1.0);

        let bat_components = bat_only.components.as_ref().unwrap();
        assert!(components.expected_war[0] > bat_components.expected_war[0] + 1.0);
        assert!(both.tvp_point > bat_only.tvp_point);
        assert!(both.tvp_mean > bat_only.tvp_mean);
        // arbitration cost follows the combined value
        assert_eq!(both.breakdown[0].cost_basis, CostBasis::ModelCostArb);
        assert!(both.breakdown[0].cost > bat_only.breakdown[0].cost);
    }

    #[test]
    fn two_way_adds_pitching_to_the_hitter_projection() {
        let cfg = config();
        let service = service_for(18, 4, 0);
        let hitter = value(&cfg, &service, &player(18, Some(29)), &hitter_seasons(600.0, 4.0)).unwrap();
        let two_way = value(&cfg, &service, &player(18, Some(29)), &two_way_seasons(3.0)).unwrap();
        let hitter_war = &hitter.components.as_ref().unwrap().expected_war;
        let two_way_war = &two_way.components.as_ref().unwrap().expected_war;
        for (h, t) in hitter_war.iter().zip(two_way_war) {
            assert!(t > h);
        }
    }

    #[test]
    fn long_cheap_control_boosts_point_and_paths() {
        let mut cfg = config();
        let service = service_for(19, 0, 0);
        let boosted = value(&cfg, &service, &player(19, Some(22)), &hitter_seasons(600.0, 3.0)).unwrap();
        cfg.long_control.enabled = false;
        let plain = value(&cfg, &service, &player(19, Some(22)), &hitter_seasons(600.0, 3.0)).unwrap();

        // six control years: two steps beyond the four-year baseline
        assert_eq!(boosted.long_control.control_years, 6);
        assert!((boosted.long_control.pct - 0.30).abs() < EPS);
        assert!((boosted.tvp_point - plain.tvp_point * 1.3).abs() < 1e-6);
        assert!((boosted.long_control.point_value - plain.tvp_point * 0.3).abs() < 1e-6);
        assert!(boosted.tvp_mean > plain.tvp_mean);
        assert_eq!(boosted.breakdown, plain.breakdown);
        assert_eq!(plain.long_control.pct, 0.0);
    }

    #[test]
    fn valuation_is_reproducible() {
        let cfg = config();
        let service = service_for(7, 2, 50);
        let a = value(&cfg, &service, &player(7, Some(25)), &hitter_seasons(500.0, 2.0)).unwrap();
        let b = value(&cfg, &service, &player(7, Some(25)), &hitter_seasons(500.0, 2.0)).unwrap();
        assert_eq!(a, b);
    }
}
