// Role resolution, run once per player up front. The resolved role carries
// its constant bundle (denominator, priors, aging, durability, metric) through
// the rest of the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ProjectionConfig, RoleConfig, RoleProjection};
use crate::inputs::SeasonStats;
use crate::valuation::durability::DurabilityConfig;
use crate::valuation::metrics::MetricConfig;
use crate::valuation::projections::{AgingCurve, ShrinkagePriors};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "H", alias = "hitter")]
    Hitter,
    #[serde(rename = "SP", alias = "starter")]
    Starter,
    #[serde(rename = "RP", alias = "reliever")]
    Reliever,
    #[serde(rename = "HYB", alias = "hybrid")]
    Hybrid,
}

impl Role {
    pub fn code(self) -> &'static str {
        match self {
            Role::Hitter => "H",
            Role::Starter => "SP",
            Role::Reliever => "RP",
            Role::Hybrid => "HYB",
        }
    }

    pub fn is_pitcher(self) -> bool {
        matches!(self, Role::Starter | Role::Reliever)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// Usage summary
// ---------------------------------------------------------------------------

/// Lookback-window usage totals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct UsageSummary {
    pub pa: f64,
    pub ip: f64,
    pub games_pitched: f64,
    pub games_started: f64,
}

impl UsageSummary {
    pub fn from_seasons(seasons: &[SeasonStats]) -> Self {
        seasons.iter().fold(Self::default(), |acc, s| Self {
            pa: acc.pa + s.pa,
            ip: acc.ip + s.ip,
            games_pitched: acc.games_pitched + s.games_pitched,
            games_started: acc.games_started + s.games_started,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.pa <= 0.0 && self.ip <= 0.0
    }

    /// Games started per pitching appearance; zero without appearances.
    pub fn gs_share(&self) -> f64 {
        if self.games_pitched <= 0.0 {
            return 0.0;
        }
        (self.games_started / self.games_pitched).clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

fn pitcher_role(usage: &UsageSummary, cfg: &RoleConfig) -> Role {
    if usage.gs_share() >= cfg.starter_gs_share {
        Role::Starter
    } else {
        Role::Reliever
    }
}

/// Usage-driven decision tree. Trivial usage on either side (a pitcher with a
/// handful of plate appearances) does not make a player a hybrid. With no
/// usage at all the roster hint decides, defaulting to hitter.
pub fn determine_role(usage: &UsageSummary, hint: Option<Role>, cfg: &RoleConfig) -> Role {
    if usage.is_empty() {
        return hint.unwrap_or(Role::Hitter);
    }
    let hits = usage.pa > cfg.trivial_pa;
    let pitches = usage.ip > cfg.trivial_ip;

    match (hits, pitches) {
        (true, true) if usage.pa >= cfg.hybrid_min_pa && usage.ip >= cfg.hybrid_min_ip => Role::Hybrid,
        (true, true) => {
            if usage.pa / cfg.hybrid_min_pa >= usage.ip / cfg.hybrid_min_ip {
                Role::Hitter
            } else {
                pitcher_role(usage, cfg)
            }
        }
        (false, true) => pitcher_role(usage, cfg),
        (true, false) => Role::Hitter,
        (false, false) => {
            if usage.ip > 0.0 && usage.pa <= cfg.trivial_pa && hint != Some(Role::Hitter) {
                pitcher_role(usage, cfg)
            } else {
                hint.filter(|h| *h != Role::Hybrid).unwrap_or(Role::Hitter)
            }
        }
    }
}

/// The role reported as a player's projection role. A hybrid is valued on
/// both sides; its reported branch is the configured default role.
pub fn resolve_projection_role(role: Role, cfg: &RoleConfig) -> Role {
    match role {
        Role::Hybrid => cfg.hybrid_default_role,
        other => other,
    }
}

pub fn in_swing_band(gs_share: f64, cfg: &RoleConfig) -> bool {
    gs_share >= cfg.swing_band_low && gs_share <= cfg.swing_band_high
}

/// Probability a path is spent starting: an age-dependent prior blended with
/// the observed starts share, weighted by appearances.
pub fn starter_probability(age: u32, usage: &UsageSummary, cfg: &RoleConfig) -> f64 {
    let young = f64::from(cfg.starter_prior_young_age);
    let old = f64::from(cfg.starter_prior_old_age);
    let age = f64::from(age);
    let prior = if old <= young || age <= young {
        cfg.starter_prior_young
    } else if age >= old {
        cfg.starter_prior_old
    } else {
        let frac = (age - young) / (old - young);
        cfg.starter_prior_young + frac * (cfg.starter_prior_old - cfg.starter_prior_young)
    };

    let games = usage.games_pitched.max(0.0);
    let w = if games + cfg.starter_prior_games > 0.0 {
        games / (games + cfg.starter_prior_games)
    } else {
        0.0
    };
    (w * usage.gs_share() + (1.0 - w) * prior).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleDecision {
    pub role: Role,
    pub projection_role: Role,
    pub gs_share: f64,
    /// Present when each simulated path draws starter vs reliever: always
    /// for a hybrid, and for pitchers in the swing band.
    pub starter_probability: Option<f64>,
    pub role_change_risk: bool,
}

pub fn resolve_role(usage: &UsageSummary, hint: Option<Role>, age: u32, cfg: &RoleConfig) -> RoleDecision {
    let role = determine_role(usage, hint, cfg);
    let projection_role = resolve_projection_role(role, cfg);
    let gs_share = usage.gs_share();
    let swing = usage.games_pitched > 0.0 && in_swing_band(gs_share, cfg);

    let starter_probability = (role == Role::Hybrid || (projection_role.is_pitcher() && swing))
        .then(|| starter_probability(age, usage, cfg));

    RoleDecision {
        role,
        projection_role,
        gs_share,
        starter_probability,
        role_change_risk: role == Role::Hybrid || (projection_role.is_pitcher() && swing),
    }
}

// ---------------------------------------------------------------------------
// Constant bundle
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RoleProfile {
    pub role: Role,
    pub projection: RoleProjection,
    pub talent_sd: f64,
    pub shock_sd: f64,
    pub aging: AgingCurve,
    pub durability: DurabilityConfig,
    pub metric: MetricConfig,
}

impl RoleProfile {
    /// Shrinkage priors for this role. A small sample zeroes the rate prior
    /// so unproven players do not inherit a league-average rate.
    pub fn priors(&self, usage_prior: f64, small_sample: bool) -> ShrinkagePriors {
        ShrinkagePriors {
            denom: self.projection.denom,
            rate_prior: if small_sample { 0.0 } else { self.projection.rate_prior },
            k_rate: self.projection.k_rate,
            usage_prior,
            k_usage: self.projection.k_usage,
        }
    }
}

/// Playing-time prior by tier: hitters below the regular threshold get the
/// bench prior, starters without a real innings load fall back to the
/// reliever prior.
pub fn usage_prior_for_player(role: Role, recent_usage: f64, projection: &ProjectionConfig) -> f64 {
    match role {
        Role::Hitter | Role::Hybrid => {
            if recent_usage >= projection.regular_pa_threshold {
                projection.hitter.usage_prior
            } else {
                projection.bench_usage_prior
            }
        }
        Role::Starter => {
            if recent_usage >= projection.starter_ip_threshold {
                projection.starter.usage_prior
            } else {
                projection.reliever.usage_prior
            }
        }
        Role::Reliever => projection.reliever.usage_prior,
    }
}
