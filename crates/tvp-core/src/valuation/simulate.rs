// Monte Carlo simulation of discounted surplus over the valuation horizon.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use serde::Serialize;

use crate::valuation::contracts::{ContractSchedule, CostBasis, OptionType, OptionYear};
use crate::valuation::durability::DurabilityMixture;
use crate::valuation::options::apply_option_decision;
use crate::valuation::projections::AgingCurve;

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationSettings {
    pub sims: usize,
    pub discount_rate: f64,
}

/// Projection constants for one role branch of a path.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionBranch {
    /// Probability a path takes this branch. Single-role players have one
    /// branch at 1.0.
    pub probability: f64,
    pub rate_post: f64,
    pub usage_post: f64,
    pub denom: f64,
    pub talent_sd: f64,
    pub shock_sd: f64,
    pub aging: AgingCurve,
    pub durability: DurabilityMixture,
}

#[derive(Debug, Clone)]
pub struct SimulationInputs<'a> {
    pub age: u32,
    pub schedule: &'a ContractSchedule,
    pub price_by_year: &'a [f64],
    /// Point-estimate WAR path; the market comparator for player options.
    pub expected_war: &'a [f64],
    /// Remaining-games fraction applied to year 0 usage and cost.
    pub in_season_fraction: f64,
    /// Mutually exclusive role branches; one is drawn per path.
    pub branches: &'a [ProjectionBranch],
    /// Hitting branch of a two-way player, played on every path next to the
    /// drawn pitching branch.
    pub hitting: Option<&'a ProjectionBranch>,
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Quantiles {
    pub p10: f64,
    pub p50: f64,
    pub p90: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionExerciseRate {
    pub season: i32,
    pub option_type: OptionType,
    pub paths_reached: usize,
    pub paths_exercised: usize,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub samples: Vec<f64>,
    pub quantiles: Quantiles,
    pub mean: f64,
    pub std: f64,
    pub expected_war: Vec<f64>,
    pub option_exercise_rates: Vec<OptionExerciseRate>,
}

// ---------------------------------------------------------------------------
// Statistics helpers
// ---------------------------------------------------------------------------

/// Nearest-rank quantile of an ascending slice: index `round((n-1) * q)`.
/// Empty input yields 0.0.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let last = sorted.len() - 1;
    let idx = ((last as f64) * q.clamp(0.0, 1.0)).round() as usize;
    sorted[idx.min(last)]
}

pub fn compute_quantiles(samples: &[f64], qs: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    qs.iter().map(|q| quantile(&sorted, *q)).collect()
}

/// Mean and population standard deviation; zeros for an empty set.
pub fn mean_and_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

pub fn discount_factor(discount_rate: f64, t: usize) -> f64 {
    1.0 / (1.0 + discount_rate).powi(t as i32)
}

/// Per-player seed derived from the run seed (splitmix64 finalizer), so the
/// result does not depend on the order players are processed in.
pub fn derive_player_seed(run_seed: u64, player_id: u32) -> u64 {
    let mut z = run_seed ^ u64::from(player_id).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

fn pick_branch(branches: &[ProjectionBranch], roll: f64) -> Option<&ProjectionBranch> {
    let mut cumulative = 0.0;
    for branch in branches {
        cumulative += branch.probability;
        if roll < cumulative {
            return Some(branch);
        }
    }
    branches.last()
}

/// WAR for one branch-year. `durability_roll` is shared by every branch a
/// player plays that year.
fn branch_war(branch: &ProjectionBranch, talent: f64, shock_z: f64, age: u32, proration: f64, durability_roll: f64) -> f64 {
    let rate = (talent + shock_z * branch.shock_sd) * branch.aging.rate_multiplier(age);
    let usage = branch.usage_post
        * branch.aging.usage_multiplier(age)
        * proration
        * branch.durability.usage_multiplier_for_roll(durability_roll);
    if branch.denom > 0.0 {
        rate * usage / branch.denom
    } else {
        0.0
    }
}

/// Option terms scaled to the share of the season still to play, so the
/// decision compares against value on the same basis.
fn prorated_option(option: &OptionYear, proration: f64) -> OptionYear {
    OptionYear {
        salary_m: option.salary_m * proration,
        buyout_m: option.buyout_m * proration,
        ..*option
    }
}

pub fn simulate_tvp(settings: &SimulationSettings, inputs: &SimulationInputs<'_>, seed: u64) -> SimulationResult {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let horizon = inputs.schedule.years.len();
    let mut samples = Vec::with_capacity(settings.sims);
    let mut reached = vec![0usize; horizon];
    let mut exercised = vec![0usize; horizon];

    for _ in 0..settings.sims {
        let talent_z: f64 = rng.sample(StandardNormal);
        let role_roll: f64 = if inputs.branches.len() > 1 { rng.gen() } else { 0.0 };
        let Some(branch) = pick_branch(inputs.branches, role_roll) else {
            samples.push(0.0);
            continue;
        };
        let talent = branch.rate_post + talent_z * branch.talent_sd;
        let hitting = inputs.hitting.map(|h| {
            let z: f64 = rng.sample(StandardNormal);
            (h, h.rate_post + z * h.talent_sd)
        });

        let mut total = 0.0;
        for (t, year) in inputs.schedule.years.iter().enumerate() {
            if year.basis == CostBasis::Fa {
                break;
            }
            let shock_z: f64 = rng.sample(StandardNormal);
            let durability_roll: f64 = rng.gen();
            let age_t = inputs.age + t as u32;
            let proration = if t == 0 { inputs.in_season_fraction } else { 1.0 };

            let mut war = branch_war(branch, talent, shock_z, age_t, proration, durability_roll);
            if let Some((h, h_talent)) = hitting {
                let h_shock: f64 = rng.sample(StandardNormal);
                war += branch_war(h, h_talent, h_shock, age_t, proration, durability_roll);
            }
            let price = inputs.price_by_year.get(t).copied().unwrap_or(0.0);
            let value = war * price;
            let discount = discount_factor(settings.discount_rate, t);

            let mut cost = year.cost_m * proration;
            if let Some(option) = &year.option {
                let market = inputs.expected_war.get(t).copied().unwrap_or(0.0) * price * proration;
                let terms = prorated_option(option, proration);
                let decision = apply_option_decision(&terms, value, market);
                reached[t] += 1;
                if !decision.exercised {
                    total -= option.buyout_m * discount;
                    break;
                }
                exercised[t] += 1;
                cost = decision.cost_m;
            }

            total += (value - cost) * discount;
        }
        samples.push(total);
    }

    let option_exercise_rates = inputs
        .schedule
        .years
        .iter()
        .enumerate()
        .filter_map(|(t, year)| {
            let option = year.option?;
            let rate = if reached[t] > 0 {
                exercised[t] as f64 / reached[t] as f64
            } else {
                0.0
            };
            Some(OptionExerciseRate {
                season: year.season,
                option_type: option.option_type,
                paths_reached: reached[t],
                paths_exercised: exercised[t],
                rate,
            })
        })
        .collect();

    let q = compute_quantiles(&samples, &[0.10, 0.50, 0.90]);
    let (mean, std) = mean_and_std(&samples);

    SimulationResult {
        quantiles: Quantiles {
            p10: q[0],
            p50: q[1],
            p90: q[2],
        },
        mean,
        std,
        expected_war: inputs.expected_war.to_vec(),
        option_exercise_rates,
        samples,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::valuation::contracts::{ContractYear, OptionYear};

    fn branch(rate_post: f64) -> ProjectionBranch {
        ProjectionBranch {
            probability: 1.0,
            rate_post,
            usage_post: 600.0,
            denom: 600.0,
            talent_sd: 0.5,
            shock_sd: 0.5,
            aging: AgingCurve::flat(27),
            durability: DurabilityMixture::certain(),
        }
    }

    fn option_schedule(salary_m: f64) -> ContractSchedule {
        let mut option_year = ContractYear::new(2028, salary_m, CostBasis::Option);
        option_year.option = Some(OptionYear {
            option_type: OptionType::Club,
            salary_m,
            buyout_m: 1.0,
        });
        ContractSchedule {
            years: vec![
                ContractYear::new(2026, 1.0, CostBasis::ModelCostPrearb),
                ContractYear::new(2027, 1.0, CostBasis::ModelCostPrearb),
                option_year,
            ],
        }
    }

    fn run(schedule: &ContractSchedule, branches: &[ProjectionBranch], seed: u64) -> SimulationResult {
        run_with(schedule, branches, None, 1.0, seed)
    }

    fn run_with(
        schedule: &ContractSchedule,
        branches: &[ProjectionBranch],
        hitting: Option<&ProjectionBranch>,
        in_season_fraction: f64,
        seed: u64,
    ) -> SimulationResult {
        let price = [10.0, 10.0, 10.0];
        let expected = [3.0, 3.0, 3.0];
        let inputs = SimulationInputs {
            age: 26,
            schedule,
            price_by_year: &price,
            expected_war: &expected,
            in_season_fraction,
            branches,
            hitting,
        };
        simulate_tvp(
            &SimulationSettings {
                sims: 500,
                discount_rate: 0.08,
            },
            &inputs,
            seed,
        )
    }

    #[test]
    fn quantiles_empty_returns_zero() {
        assert_eq!(compute_quantiles(&[], &[0.1, 0.5, 0.9]), vec![0.0, 0.0, 0.0]);
        assert_eq!(mean_and_std(&[]), (0.0, 0.0));
    }

    #[test]
    fn quantile_nearest_rank() {
        let samples: Vec<f64> = (0..11).rev().map(f64::from).collect();
        assert_eq!(compute_quantiles(&samples, &[0.0, 0.1, 0.5, 0.9, 1.0]), vec![0.0, 1.0, 5.0, 9.0, 10.0]);
        // round((4 - 1) * 0.5) = round(1.5) = 2
        assert_eq!(compute_quantiles(&[1.0, 2.0, 3.0, 4.0], &[0.5]), vec![3.0]);
    }

    #[test]
    fn population_std() {
        let (mean, std) = mean_and_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-12);
        assert!((std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn simulation_is_deterministic() {
        let schedule = option_schedule(10.0);
        let branches = [branch(3.0)];
        let a = run(&schedule, &branches, 42);
        let b = run(&schedule, &branches, 42);
        assert_eq!(a.samples, b.samples);
        assert_eq!(a.samples.len(), 500);
        let c = run(&schedule, &branches, 43);
        assert_ne!(a.samples, c.samples);
    }

    #[test]
    fn cheap_club_option_is_usually_exercised() {
        let result = run(&option_schedule(10.0), &[branch(3.0)], 7);
        assert_eq!(result.option_exercise_rates.len(), 1);
        let rate = &result.option_exercise_rates[0];
        assert_eq!(rate.season, 2028);
        assert_eq!(rate.paths_reached, 500);
        assert!(rate.rate > 0.5, "rate {}", rate.rate);
        assert!(result.mean > 0.0);
    }

    #[test]
    fn expensive_club_option_is_usually_declined() {
        let result = run(&option_schedule(80.0), &[branch(3.0)], 7);
        assert!(result.option_exercise_rates[0].rate < 0.5);
    }

    #[test]
    fn free_agent_year_ends_path() {
        let schedule = ContractSchedule {
            years: vec![ContractYear::new(2026, 0.0, CostBasis::Fa)],
        };
        let result = run(&schedule, &[branch(3.0)], 1);
        assert!(result.samples.iter().all(|s| *s == 0.0));
        assert_eq!(result.quantiles, Quantiles::default());
    }

    #[test]
    fn zero_denominator_produces_no_value() {
        let mut b = branch(3.0);
        b.denom = 0.0;
        let schedule = ContractSchedule {
            years: vec![ContractYear::new(2026, 1.0, CostBasis::ModelCostPrearb)],
        };
        let result = run(&schedule, &[b], 3);
        assert!(result.samples.iter().all(|s| (*s + 1.0).abs() < 1e-12));
    }

    #[test]
    fn role_mix_draws_between_branches() {
        let schedule = ContractSchedule {
            years: vec![ContractYear::new(2026, 0.0, CostBasis::ModelCostPrearb)],
        };
        let mut starter = branch(4.0);
        starter.probability = 0.5;
        starter.talent_sd = 0.0;
        starter.shock_sd = 0.0;
        let mut reliever = branch(1.0);
        reliever.probability = 0.5;
        reliever.talent_sd = 0.0;
        reliever.shock_sd = 0.0;
        let result = run(&schedule, &[starter, reliever], 11);
        let high = result.samples.iter().filter(|s| (**s - 40.0).abs() < 1e-9).count();
        let low = result.samples.iter().filter(|s| (**s - 10.0).abs() < 1e-9).count();
        assert_eq!(high + low, 500);
        assert!(high > 150 && low > 150);
    }

    fn fixed(rate_post: f64) -> ProjectionBranch {
        let mut b = branch(rate_post);
        b.talent_sd = 0.0;
        b.shock_sd = 0.0;
        b
    }

    #[test]
    fn two_way_hitting_adds_to_every_path() {
        let schedule = ContractSchedule {
            years: vec![ContractYear::new(2026, 0.0, CostBasis::ModelCostPrearb)],
        };
        let mut starter = fixed(4.0);
        starter.probability = 0.5;
        let mut reliever = fixed(1.0);
        reliever.probability = 0.5;
        let bat = fixed(2.0);

        let result = run_with(&schedule, &[starter, reliever], Some(&bat), 1.0, 11);
        // 2 WAR of hitting on top of the drawn 4 or 1 WAR of pitching, at $10M
        let high = result.samples.iter().filter(|s| (**s - 60.0).abs() < 1e-9).count();
        let low = result.samples.iter().filter(|s| (**s - 30.0).abs() < 1e-9).count();
        assert_eq!(high + low, 500);
        assert!(high > 150 && low > 150);
    }

    #[test]
    fn year_zero_option_decided_on_prorated_terms() {
        // Full season: 30 of value against a 20 salary, kept. Half a season
        // left: 15 of value against the prorated 10 salary, still kept.
        let mut option_year = ContractYear::new(2026, 20.0, CostBasis::Option);
        option_year.option = Some(OptionYear {
            option_type: OptionType::Club,
            salary_m: 20.0,
            buyout_m: 1.0,
        });
        let schedule = ContractSchedule {
            years: vec![option_year],
        };
        let result = run_with(&schedule, &[fixed(3.0)], None, 0.5, 5);
        let rate = &result.option_exercise_rates[0];
        assert_eq!(rate.paths_reached, 500);
        assert_eq!(rate.paths_exercised, 500);
        assert!(result.samples.iter().all(|s| (*s - 5.0).abs() < 1e-9));
    }

    #[test]
    fn declined_year_zero_option_pays_full_buyout() {
        let mut option_year = ContractYear::new(2026, 60.0, CostBasis::Option);
        option_year.option = Some(OptionYear {
            option_type: OptionType::Club,
            salary_m: 60.0,
            buyout_m: 2.0,
        });
        let schedule = ContractSchedule {
            years: vec![option_year],
        };
        let result = run_with(&schedule, &[fixed(3.0)], None, 0.5, 5);
        assert_eq!(result.option_exercise_rates[0].paths_exercised, 0);
        assert!(result.samples.iter().all(|s| (*s + 2.0).abs() < 1e-9));
    }

    #[test]
    fn player_seed_depends_on_both_inputs() {
        assert_eq!(derive_player_seed(42, 7), derive_player_seed(42, 7));
        assert_ne!(derive_player_seed(42, 7), derive_player_seed(42, 8));
        assert_ne!(derive_player_seed(42, 7), derive_player_seed(43, 7));
    }
}
