// Configuration loading and parsing (config/tvp.toml).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::output::RankMetric;
use crate::valuation::calibration::PriceCurve;
use crate::valuation::contracts::ContractOverride;
use crate::valuation::durability::DurabilityConfig;
use crate::valuation::long_control::LongControlConfig;
use crate::valuation::metrics::MetricConfig;
use crate::valuation::options::OptionPricing;
use crate::valuation::package::PackageConfig;
use crate::valuation::projections::{AgingCurve, DEFAULT_RECENCY_WEIGHTS};
use crate::valuation::role::{Role, RoleProfile};
use crate::valuation::service_time::{SeasonWindow, SUPER_TWO_MIN_DAYS, SUPER_TWO_TOP_PCT};

pub const CONFIG_FILE: &str = "tvp.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("unknown price source `{name}` (available: {available})")]
    UnknownPriceSource { name: String, available: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub run: RunConfig,
    /// `run.snapshot_date`, or today when unset.
    pub snapshot_date: NaiveDate,
    /// `[season]`, or March 27 through September 28 of the snapshot year.
    pub season: SeasonWindow,
    pub price: PriceConfig,
    /// The named price source, resolved at load time.
    pub price_curve: PriceCurve,
    pub contracts: ContractsConfig,
    pub service_time: ServiceTimeConfig,
    pub projection: ProjectionConfig,
    pub aging: AgingConfig,
    pub durability: DurabilityTables,
    pub simulation: SimulationConfig,
    pub role: RoleConfig,
    pub metrics: MetricsConfig,
    pub calibration: CalibrationConfig,
    pub eligibility: EligibilityConfig,
    pub coverage: CoverageConfig,
    pub long_control: LongControlConfig,
    pub package: PackageConfig,
    pub options: OptionPricing,
    pub paths: DataPaths,
    pub output: OutputConfig,
}

impl Config {
    pub fn snapshot_year(&self) -> i32 {
        chrono::Datelike::year(&self.snapshot_date)
    }

    /// Constant bundle for a projection role. Hybrid is resolved to the
    /// configured default role first; the assembler asks for each side of a
    /// two-way player explicitly.
    pub fn role_profile(&self, role: Role) -> RoleProfile {
        let role = match role {
            Role::Hybrid => self.role.hybrid_default_role,
            other => other,
        };
        let sim = &self.simulation;
        match role {
            Role::Starter => RoleProfile {
                role,
                projection: self.projection.starter,
                talent_sd: sim.talent_sd_starter,
                shock_sd: sim.shock_sd_starter,
                aging: self.aging.pitcher,
                durability: self.durability.pitcher,
                metric: self.metrics.pitcher,
            },
            Role::Reliever => RoleProfile {
                role,
                projection: self.projection.reliever,
                talent_sd: sim.talent_sd_reliever,
                shock_sd: sim.shock_sd_reliever,
                aging: self.aging.pitcher,
                durability: self.durability.pitcher,
                metric: self.metrics.pitcher,
            },
            Role::Hitter | Role::Hybrid => RoleProfile {
                role: Role::Hitter,
                projection: self.projection.hitter,
                talent_sd: sim.talent_sd_hitter,
                shock_sd: sim.shock_sd_hitter,
                aging: self.aging.hitter,
                durability: self.durability.hitter,
                metric: self.metrics.hitter,
            },
        }
    }
}

/// Raw shape of tvp.toml. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    run: RunConfig,
    season: Option<SeasonWindow>,
    price: PriceConfig,
    contracts: ContractsConfig,
    service_time: ServiceTimeConfig,
    projection: ProjectionConfig,
    aging: AgingConfig,
    durability: DurabilityTables,
    simulation: SimulationConfig,
    role: RoleConfig,
    metrics: MetricsConfig,
    calibration: CalibrationConfig,
    eligibility: EligibilityConfig,
    coverage: CoverageConfig,
    long_control: LongControlConfig,
    package: PackageConfig,
    options: OptionPricing,
    paths: DataPaths,
    output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Section structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub snapshot_date: Option<NaiveDate>,
    pub seed: u64,
    /// Escalate coverage warnings to a fatal error.
    pub strict_coverage: bool,
    pub max_horizon_years: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            snapshot_date: None,
            seed: 42,
            strict_coverage: false,
            max_horizon_years: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Key into `sources`.
    pub source: String,
    pub discount_rate: f64,
    /// λ in `mean - λ·std`.
    pub risk_aversion: f64,
    pub sources: HashMap<String, PriceCurve>,
}

impl Default for PriceConfig {
    fn default() -> Self {
        let mut sources = HashMap::new();
        sources.insert("bwar".to_string(), PriceCurve::default());
        sources.insert(
            "fwar".to_string(),
            PriceCurve {
                dollars_per_war: 8.5,
                growth: 0.03,
            },
        );
        Self {
            source: "bwar".into(),
            discount_rate: 0.08,
            risk_aversion: 0.5,
            sources,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub min_salary_m: f64,
    pub min_salary_growth: f64,
    /// Share of expected value paid in arbitration tiers 1..n.
    pub arb_share: Vec<f64>,
    pub deferral_aav_multiplier: f64,
    pub overrides: Vec<ContractOverride>,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            min_salary_m: 0.76,
            min_salary_growth: 0.03,
            arb_share: vec![0.25, 0.40, 0.60, 0.75],
            deferral_aav_multiplier: 1.3,
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceTimeConfig {
    pub super_two_min_days: u32,
    pub super_two_top_pct: f64,
}

impl Default for ServiceTimeConfig {
    fn default() -> Self {
        Self {
            super_two_min_days: SUPER_TWO_MIN_DAYS,
            super_two_top_pct: SUPER_TWO_TOP_PCT,
        }
    }
}

/// Projection constants for one role.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleProjection {
    /// Usage units per rate unit (600 PA, 180 IP, 65 IP).
    pub denom: f64,
    pub rate_prior: f64,
    pub k_rate: f64,
    pub usage_prior: f64,
    pub k_usage: f64,
    pub small_sample_floor: f64,
}

impl RoleProjection {
    pub fn hitter_default() -> Self {
        Self {
            denom: 600.0,
            rate_prior: 2.0,
            k_rate: 600.0,
            usage_prior: 550.0,
            k_usage: 400.0,
            small_sample_floor: 300.0,
        }
    }

    pub fn starter_default() -> Self {
        Self {
            denom: 180.0,
            rate_prior: 2.0,
            k_rate: 250.0,
            usage_prior: 160.0,
            k_usage: 150.0,
            small_sample_floor: 100.0,
        }
    }

    pub fn reliever_default() -> Self {
        Self {
            denom: 65.0,
            rate_prior: 0.6,
            k_rate: 120.0,
            usage_prior: 60.0,
            k_usage: 80.0,
            small_sample_floor: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Oldest-to-newest.
    pub recency_weights: Vec<f64>,
    pub lookback_seasons: u32,
    pub bench_usage_prior: f64,
    pub regular_pa_threshold: f64,
    pub starter_ip_threshold: f64,
    #[serde(deserialize_with = "hitter_projection")]
    pub hitter: RoleProjection,
    #[serde(deserialize_with = "starter_projection")]
    pub starter: RoleProjection,
    #[serde(deserialize_with = "reliever_projection")]
    pub reliever: RoleProjection,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            recency_weights: DEFAULT_RECENCY_WEIGHTS.to_vec(),
            lookback_seasons: 3,
            bench_usage_prior: 150.0,
            regular_pa_threshold: 350.0,
            starter_ip_threshold: 80.0,
            hitter: RoleProjection::hitter_default(),
            starter: RoleProjection::starter_default(),
            reliever: RoleProjection::reliever_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgingConfig {
    #[serde(deserialize_with = "hitter_aging")]
    pub hitter: AgingCurve,
    #[serde(deserialize_with = "pitcher_aging")]
    pub pitcher: AgingCurve,
}

impl Default for AgingConfig {
    fn default() -> Self {
        Self {
            hitter: AgingCurve::hitter_default(),
            pitcher: AgingCurve::pitcher_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DurabilityTables {
    #[serde(deserialize_with = "hitter_durability")]
    pub hitter: DurabilityConfig,
    #[serde(deserialize_with = "pitcher_durability")]
    pub pitcher: DurabilityConfig,
}

impl Default for DurabilityTables {
    fn default() -> Self {
        Self {
            hitter: DurabilityConfig::hitter_default(),
            pitcher: DurabilityConfig::pitcher_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    #[serde(deserialize_with = "hitter_metric")]
    pub hitter: MetricConfig,
    #[serde(deserialize_with = "pitcher_metric")]
    pub pitcher: MetricConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hitter: MetricConfig::hitter_default(),
            pitcher: MetricConfig::pitcher_default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub sims: usize,
    pub talent_sd_hitter: f64,
    pub talent_sd_starter: f64,
    pub talent_sd_reliever: f64,
    pub shock_sd_hitter: f64,
    pub shock_sd_starter: f64,
    pub shock_sd_reliever: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sims: 1000,
            talent_sd_hitter: 0.8,
            talent_sd_starter: 0.8,
            talent_sd_reliever: 0.4,
            shock_sd_hitter: 1.0,
            shock_sd_starter: 1.0,
            shock_sd_reliever: 0.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoleConfig {
    pub trivial_pa: f64,
    pub trivial_ip: f64,
    pub hybrid_min_pa: f64,
    pub hybrid_min_ip: f64,
    pub starter_gs_share: f64,
    pub swing_band_low: f64,
    pub swing_band_high: f64,
    /// Branch reported as a two-way player's projection role. Both the
    /// hitting and pitching sides are always valued.
    pub hybrid_default_role: Role,
    pub starter_prior_young_age: u32,
    pub starter_prior_old_age: u32,
    pub starter_prior_young: f64,
    pub starter_prior_old: f64,
    /// Appearances at which observed starts share and age prior weigh equally.
    pub starter_prior_games: f64,
    /// Season-over-season IP jump that counts as a workload spike.
    pub workload_spike_ip: f64,
}

impl Default for RoleConfig {
    fn default() -> Self {
        Self {
            trivial_pa: 50.0,
            trivial_ip: 10.0,
            hybrid_min_pa: 100.0,
            hybrid_min_ip: 20.0,
            starter_gs_share: 0.5,
            swing_band_low: 0.2,
            swing_band_high: 0.8,
            hybrid_default_role: Role::Hitter,
            starter_prior_young_age: 24,
            starter_prior_old_age: 32,
            starter_prior_young: 0.6,
            starter_prior_old: 0.3,
            starter_prior_games: 20.0,
            workload_spike_ip: 40.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub enabled: bool,
    pub lookback_years: u32,
    pub min_aav_m: f64,
    pub min_years: u32,
    pub min_war: f64,
    pub trim_pct: f64,
    pub min_contracts: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_years: 3,
            min_aav_m: 8.0,
            min_years: 2,
            min_war: 1.0,
            trim_pct: 0.1,
            min_contracts: 8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EligibilityConfig {
    pub leaderboard_min_pa: f64,
    pub leaderboard_min_ip: f64,
    pub leaderboard_min_service_days: u32,
    /// `lost` durability probability at which a pitcher is flagged.
    pub pitcher_tail_risk_lost: f64,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            leaderboard_min_pa: 200.0,
            leaderboard_min_ip: 50.0,
            leaderboard_min_service_days: 172,
            pitcher_tail_risk_lost: 0.10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    pub max_zero_service_fraction: f64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            max_zero_service_fraction: 0.35,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub players: String,
    pub stats_db: String,
    pub service_time: String,
    pub signed_contracts: String,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            players: "data/players.json".into(),
            stats_db: "data/stats.db".into(),
            service_time: "data/service_time.csv".into(),
            signed_contracts: "data/signed_contracts.csv".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
    pub top_n: usize,
    pub rank_metric: RankMetric,
    pub leaderboard_only: bool,
    /// Attach the audit components (projection, durability, options) to
    /// each player.
    pub include_components: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".into(),
            top_n: 100,
            rank_metric: RankMetric::RiskAdj,
            leaderboard_only: false,
            include_components: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-role tables
// ---------------------------------------------------------------------------
//
// A per-role table only overrides the keys it names; the rest come from that
// role's defaults (a partial `[durability.pitcher]` keeps pitcher base rates).

fn merge_onto<T>(base: T, overrides: toml::Table) -> Result<T, String>
where
    T: Serialize + DeserializeOwned,
{
    let toml::Value::Table(mut table) = toml::Value::try_from(&base).map_err(|e| e.to_string())? else {
        return Err("role defaults did not serialize to a table".into());
    };
    table.extend(overrides);
    toml::Value::Table(table)
        .try_into()
        .map_err(|e: toml::de::Error| e.to_string())
}

fn role_table<'de, D, T>(deserializer: D, base: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Serialize + DeserializeOwned,
{
    let overrides = toml::Table::deserialize(deserializer)?;
    merge_onto(base, overrides).map_err(serde::de::Error::custom)
}

fn hitter_projection<'de, D: Deserializer<'de>>(d: D) -> Result<RoleProjection, D::Error> {
    role_table(d, RoleProjection::hitter_default())
}

fn starter_projection<'de, D: Deserializer<'de>>(d: D) -> Result<RoleProjection, D::Error> {
    role_table(d, RoleProjection::starter_default())
}

fn reliever_projection<'de, D: Deserializer<'de>>(d: D) -> Result<RoleProjection, D::Error> {
    role_table(d, RoleProjection::reliever_default())
}

fn hitter_aging<'de, D: Deserializer<'de>>(d: D) -> Result<AgingCurve, D::Error> {
    role_table(d, AgingCurve::hitter_default())
}

fn pitcher_aging<'de, D: Deserializer<'de>>(d: D) -> Result<AgingCurve, D::Error> {
    role_table(d, AgingCurve::pitcher_default())
}

fn hitter_durability<'de, D: Deserializer<'de>>(d: D) -> Result<DurabilityConfig, D::Error> {
    role_table(d, DurabilityConfig::hitter_default())
}

fn pitcher_durability<'de, D: Deserializer<'de>>(d: D) -> Result<DurabilityConfig, D::Error> {
    role_table(d, DurabilityConfig::pitcher_default())
}

fn hitter_metric<'de, D: Deserializer<'de>>(d: D) -> Result<MetricConfig, D::Error> {
    role_table(d, MetricConfig::hitter_default())
}

fn pitcher_metric<'de, D: Deserializer<'de>>(d: D) -> Result<MetricConfig, D::Error> {
    role_table(d, MetricConfig::pitcher_default())
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

fn default_season(year: i32) -> Result<SeasonWindow, ConfigError> {
    let start = NaiveDate::from_ymd_opt(year, 3, 27);
    let end = NaiveDate::from_ymd_opt(year, 9, 28);
    match (start, end) {
        (Some(start), Some(end)) => Ok(SeasonWindow { start, end }),
        _ => Err(ConfigError::ValidationError {
            field: "season".into(),
            message: format!("cannot build a default season window for {year}"),
        }),
    }
}

/// Parse and validate a tvp.toml document. `path` is only used in errors.
pub fn parse_config(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let file: ConfigFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let snapshot_date = file
        .run
        .snapshot_date
        .unwrap_or_else(|| Local::now().date_naive());
    let season = match file.season {
        Some(window) => window,
        None => default_season(chrono::Datelike::year(&snapshot_date))?,
    };

    let price_curve = match file.price.sources.get(&file.price.source) {
        Some(curve) => *curve,
        None => {
            let mut available: Vec<&str> = file.price.sources.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(ConfigError::UnknownPriceSource {
                name: file.price.source.clone(),
                available: available.join(", "),
            });
        }
    };

    let config = Config {
        run: file.run,
        snapshot_date,
        season,
        price: file.price,
        price_curve,
        contracts: file.contracts,
        service_time: file.service_time,
        projection: file.projection,
        aging: file.aging,
        durability: file.durability,
        simulation: file.simulation,
        role: file.role,
        metrics: file.metrics,
        calibration: file.calibration,
        eligibility: file.eligibility,
        coverage: file.coverage,
        long_control: file.long_control,
        package: file.package,
        options: file.options,
        paths: file.paths,
        output: file.output,
    };

    validate(&config)?;

    Ok(config)
}

/// Load and validate `config/tvp.toml` relative to `base_dir`.
///
/// Lower-level primitive that does not copy defaults; prefer `load_config()`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE);
    let text = read_file(&path)?;
    parse_config(&text, &path)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying defaults
/// first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.run.max_horizon_years == 0 {
        return Err(invalid("run.max_horizon_years", "must be > 0".into()));
    }
    if config.season.start > config.season.end {
        return Err(invalid(
            "season",
            format!("start {} is after end {}", config.season.start, config.season.end),
        ));
    }

    // Price
    if config.price_curve.dollars_per_war <= 0.0 {
        return Err(invalid(
            "price.sources",
            format!("dollars_per_war must be > 0, got {}", config.price_curve.dollars_per_war),
        ));
    }
    if config.price.discount_rate < 0.0 {
        return Err(invalid(
            "price.discount_rate",
            format!("must be >= 0, got {}", config.price.discount_rate),
        ));
    }
    if config.price.risk_aversion < 0.0 {
        return Err(invalid(
            "price.risk_aversion",
            format!("must be >= 0, got {}", config.price.risk_aversion),
        ));
    }

    // Contracts
    if config.contracts.arb_share.is_empty() {
        return Err(invalid("contracts.arb_share", "must not be empty".into()));
    }
    if let Some(share) = config.contracts.arb_share.iter().find(|s| !(0.0..=1.0).contains(*s)) {
        return Err(invalid(
            "contracts.arb_share",
            format!("shares must be between 0.0 and 1.0, got {share}"),
        ));
    }

    let top_pct = config.service_time.super_two_top_pct;
    if !(0.0..=1.0).contains(&top_pct) {
        return Err(invalid(
            "service_time.super_two_top_pct",
            format!("must be between 0.0 and 1.0 inclusive, got {top_pct}"),
        ));
    }

    // Projection
    let projection = &config.projection;
    if projection.recency_weights.is_empty() || projection.recency_weights.iter().any(|w| *w <= 0.0) {
        return Err(invalid(
            "projection.recency_weights",
            "must be a non-empty list of positive weights".into(),
        ));
    }
    let denoms: &[(&str, f64)] = &[
        ("projection.hitter.denom", projection.hitter.denom),
        ("projection.starter.denom", projection.starter.denom),
        ("projection.reliever.denom", projection.reliever.denom),
    ];
    for (name, val) in denoms {
        if *val <= 0.0 {
            return Err(invalid(name, format!("must be > 0, got {val}")));
        }
    }

    // Durability base rates
    let rates: &[(&str, f64)] = &[
        ("durability.hitter.full", config.durability.hitter.full),
        ("durability.hitter.partial", config.durability.hitter.partial),
        ("durability.hitter.lost", config.durability.hitter.lost),
        ("durability.pitcher.full", config.durability.pitcher.full),
        ("durability.pitcher.partial", config.durability.pitcher.partial),
        ("durability.pitcher.lost", config.durability.pitcher.lost),
    ];
    for (name, val) in rates {
        if !(0.0..=1.0).contains(val) {
            return Err(invalid(name, format!("must be between 0.0 and 1.0 inclusive, got {val}")));
        }
    }

    if config.simulation.sims == 0 {
        return Err(invalid("simulation.sims", "must be > 0".into()));
    }

    // Role
    if config.role.hybrid_default_role == Role::Hybrid {
        return Err(invalid(
            "role.hybrid_default_role",
            "must be one of H, SP, RP".into(),
        ));
    }
    if config.role.swing_band_low > config.role.swing_band_high {
        return Err(invalid(
            "role.swing_band_low",
            format!(
                "must not exceed swing_band_high ({} > {})",
                config.role.swing_band_low, config.role.swing_band_high
            ),
        ));
    }

    let trim = config.calibration.trim_pct;
    if !(0.0..0.5).contains(&trim) {
        return Err(invalid(
            "calibration.trim_pct",
            format!("must be in [0.0, 0.5), got {trim}"),
        ));
    }

    if config.options.sigmoid_k < 0.0 {
        return Err(invalid(
            "options.sigmoid_k",
            format!("must be >= 0, got {}", config.options.sigmoid_k),
        ));
    }

    // Long control and packages
    let long_control = &config.long_control;
    if long_control.step_pct < 0.0 || long_control.max_pct < 0.0 {
        return Err(invalid(
            "long_control",
            format!(
                "step_pct and max_pct must be >= 0, got {} and {}",
                long_control.step_pct, long_control.max_pct
            ),
        ));
    }
    let package = &config.package;
    if let Some(m) = package.step_multipliers.iter().find(|m| **m < 0.0) {
        return Err(invalid(
            "package.step_multipliers",
            format!("multipliers must be >= 0, got {m}"),
        ));
    }
    if package.power_p <= 0.0 {
        return Err(invalid(
            "package.power_p",
            format!("must be > 0, got {}", package.power_p),
        ));
    }
    if package.cash_haircut < 0.0 || package.cash_cap_pct < 0.0 {
        return Err(invalid(
            "package",
            "cash_haircut and cash_cap_pct must be >= 0".into(),
        ));
    }

    if config.output.top_n == 0 {
        return Err(invalid("output.top_n", "must be > 0".into()));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
