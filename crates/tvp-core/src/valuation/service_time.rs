// Service time, team-control timeline, and the cohort-wide Super Two cutoff.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days of major-league service that make up one full service year.
pub const SERVICE_DAYS_PER_YEAR: u32 = 172;

/// Service years after which a player is no longer under team control.
const FREE_AGENCY_SERVICE_YEARS: u32 = 6;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Accrued major-league service for one player, as of the last offseason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTimeRecord {
    pub player_id: u32,
    pub years: u32,
    pub days: u32,
    #[serde(default)]
    pub label: Option<String>,
}

impl ServiceTimeRecord {
    pub fn new(player_id: u32, years: u32, days: u32) -> Self {
        Self {
            player_id,
            years,
            days,
            label: None,
        }
    }

    pub fn total_service_days(&self) -> u32 {
        self.years * SERVICE_DAYS_PER_YEAR + self.days
    }
}

// ---------------------------------------------------------------------------
// Control timeline
// ---------------------------------------------------------------------------

/// Cost regime of a single remaining team-control year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum YearType {
    PreArb,
    /// Arbitration tier, 1-based (`arb1` .. `arb4`).
    Arb(u8),
}

impl YearType {
    /// Zero-based arbitration tier index, `None` for pre-arbitration years.
    pub fn arb_index(self) -> Option<usize> {
        match self {
            YearType::PreArb => None,
            YearType::Arb(tier) => Some(usize::from(tier.max(1)) - 1),
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw == "prearb" {
            return Some(YearType::PreArb);
        }
        raw.strip_prefix("arb")
            .and_then(|tier| tier.parse::<u8>().ok())
            .filter(|tier| *tier >= 1)
            .map(YearType::Arb)
    }
}

impl fmt::Display for YearType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearType::PreArb => write!(f, "prearb"),
            YearType::Arb(tier) => write!(f, "arb{tier}"),
        }
    }
}

impl From<YearType> for String {
    fn from(value: YearType) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for YearType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        YearType::parse(&value).ok_or_else(|| format!("unknown control year type `{value}`"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlYear {
    pub season_offset: usize,
    pub year_type: YearType,
}

/// Remaining team-control years only; free-agency years are never listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlTimeline {
    pub years: Vec<ControlYear>,
}

impl ControlTimeline {
    pub fn team_control_years_remaining(&self) -> usize {
        self.years.len()
    }

    pub fn year_types(&self) -> Vec<YearType> {
        self.years.iter().map(|y| y.year_type).collect()
    }
}

/// Walk forward from the player's current service year to service year 6,
/// labeling each remaining control year.
///
/// Super Two players reach arbitration one service year earlier and so carry
/// four arbitration years instead of three.
pub fn control_timeline(service_days_total: u32, super_two: bool) -> ControlTimeline {
    let full_years = service_days_total / SERVICE_DAYS_PER_YEAR;
    if full_years >= FREE_AGENCY_SERVICE_YEARS {
        return ControlTimeline::default();
    }

    let years = (full_years + 1..=FREE_AGENCY_SERVICE_YEARS)
        .enumerate()
        .map(|(season_offset, service_year)| {
            let year_type = match (service_year, super_two) {
                (1..=2, _) => YearType::PreArb,
                (3, false) => YearType::PreArb,
                (3, true) => YearType::Arb(1),
                (year, true) => YearType::Arb((year - 2) as u8),
                (year, false) => YearType::Arb((year - 3) as u8),
            };
            ControlYear {
                season_offset,
                year_type,
            }
        })
        .collect();

    ControlTimeline { years }
}

// ---------------------------------------------------------------------------
// Super Two
// ---------------------------------------------------------------------------

/// Outcome of the cohort-wide Super Two pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SuperTwoResult {
    pub cutoff_days: u32,
    pub eligible_ids: HashSet<u32>,
    pub super_two_ids: HashSet<u32>,
}

impl SuperTwoResult {
    pub fn is_super_two(&self, player_id: u32) -> bool {
        self.super_two_ids.contains(&player_id)
    }
}

pub const SUPER_TWO_MIN_DAYS: u32 = 86;
pub const SUPER_TWO_TOP_PCT: f64 = 0.22;

/// Flag the top `top_pct` of the 2-to-3-year cohort by prior-season days.
///
/// The cutoff is the day count at rank `floor(n * top_pct)` (at least rank 1);
/// everyone at or above it, ties included, is Super Two. `prior_season_days`
/// overrides the record's `days` when present. The result depends on the whole
/// cohort and must be recomputed whenever the cohort changes.
pub fn compute_super_two<'a, I>(
    records: I,
    prior_season_days: &HashMap<u32, u32>,
    eligibility_min_days: u32,
    top_pct: f64,
) -> SuperTwoResult
where
    I: IntoIterator<Item = &'a ServiceTimeRecord>,
{
    let mut eligible: Vec<(u32, u32)> = records
        .into_iter()
        .filter(|r| r.years == 2)
        .map(|r| {
            let days_last = prior_season_days
                .get(&r.player_id)
                .copied()
                .unwrap_or(r.days);
            (r.player_id, days_last)
        })
        .filter(|(_, days)| *days >= eligibility_min_days)
        .collect();

    if eligible.is_empty() {
        return SuperTwoResult::default();
    }

    eligible.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let rank = ((eligible.len() as f64) * top_pct).floor() as usize;
    let cutoff_index = rank.saturating_sub(1).min(eligible.len() - 1);
    let cutoff_days = eligible[cutoff_index].1;

    SuperTwoResult {
        cutoff_days,
        eligible_ids: eligible.iter().map(|(id, _)| *id).collect(),
        super_two_ids: eligible
            .iter()
            .filter(|(_, days)| *days >= cutoff_days)
            .map(|(id, _)| *id)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Season proration
// ---------------------------------------------------------------------------

/// Regular-season date range used to prorate the current season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl SeasonWindow {
    pub fn is_in_season(&self, snapshot: NaiveDate) -> bool {
        self.start <= snapshot && snapshot <= self.end
    }
}

/// Share of the season still to be played, counting the snapshot day itself.
/// Outside the window the whole season is ahead (or already banked), so 1.0.
pub fn remaining_games_fraction(snapshot: NaiveDate, window: &SeasonWindow) -> f64 {
    if !window.is_in_season(snapshot) {
        return 1.0;
    }
    let season_days = (window.end - window.start).num_days() + 1;
    if season_days <= 0 {
        return 1.0;
    }
    let remaining_days = (window.end - snapshot).num_days() + 1;
    (remaining_days as f64 / season_days as f64).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
