use serde::{Deserialize, Serialize};

use super::allocation::{allocate_greedy, allocation_gain, blended_rate};
use super::error::{CoreError, CoreResult};
use super::types::{Allocation, Product};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "period", content = "gain")]
pub enum GoalTarget {
    Annual(f64),
    Monthly(f64),
}

impl GoalTarget {
    pub fn annual_gain(self) -> f64 {
        match self {
            GoalTarget::Annual(gain) => gain,
            GoalTarget::Monthly(gain) => gain * 12.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalSolveConfig {
    /// Absolute distance from the target gain that counts as solved.
    pub tolerance: f64,
    pub max_iterations: u32,
    /// Capital the reference blended rate is measured at.
    pub probe_capital: f64,
    pub min_capital: f64,
    pub horizon_days: u32,
}

impl Default for GoalSolveConfig {
    fn default() -> Self {
        Self {
            tolerance: 10.0,
            max_iterations: 30,
            probe_capital: 100_000.0,
            min_capital: 1_000.0,
            horizon_days: 360,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_capital: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveResult {
    pub target_annual_gain: f64,
    pub capital: f64,
    pub allocation: Allocation,
    pub blended_rate: f64,
    pub achieved_gain: f64,
    pub reference_rate: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
    /// Set when the iteration cap was hit before the gain came within
    /// tolerance; `capital` is then the closest candidate seen.
    pub approximate: bool,
}

#[derive(Debug, Clone)]
struct CandidateEval {
    allocation: Allocation,
    gain: f64,
}

/// Bisects for the capital whose greedy allocation earns `target` over the
/// horizon. Running out of iterations is not an error: the closest
/// candidate is returned with `approximate` set.
pub fn solve_goal_capital(
    eligible: &[Product],
    target: GoalTarget,
    config: GoalSolveConfig,
) -> CoreResult<GoalSolveResult> {
    if eligible.is_empty() {
        return Err(CoreError::NoEligibleProducts);
    }
    validate_config(config)?;
    let target_gain = target.annual_gain();
    if !target_gain.is_finite() || target_gain <= 0.0 {
        return Err(CoreError::InvalidInput(
            "target gain must be > 0".to_string(),
        ));
    }

    let probe = allocate_greedy(eligible, config.probe_capital)?;
    let reference_rate = blended_rate(&probe, config.horizon_days)?;
    if reference_rate <= 0.0 {
        return Err(CoreError::InvalidInput(
            "eligible products earn no interest at the probe amount".to_string(),
        ));
    }

    let naive_estimate = target_gain / reference_rate * 100.0;
    let search_min = config.min_capital.max(0.5 * naive_estimate);
    let search_max = (2.0 * naive_estimate).max(search_min);

    let mut lo = search_min;
    let mut hi = search_max;
    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let mut best: Option<(f64, CandidateEval)> = None;
    let mut converged = false;

    let mut it = 0;
    while it < config.max_iterations {
        it += 1;
        let mid = (lo + hi) * 0.5;
        let eval = evaluate_candidate(eligible, mid, config.horizon_days)?;
        iterations.push(GoalSolveIteration {
            iteration: it,
            lower_bound: lo,
            upper_bound: hi,
            candidate_capital: mid,
            gain: eval.gain,
        });

        let miss = (eval.gain - target_gain).abs();
        let closer = best
            .as_ref()
            .is_none_or(|(_, b)| miss < (b.gain - target_gain).abs());
        let below = eval.gain < target_gain;
        if closer {
            best = Some((mid, eval));
        }

        if miss <= config.tolerance {
            converged = true;
            break;
        }
        if below {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let Some((capital, eval)) = best else {
        return Err(CoreError::InvalidInput(
            "max_iterations must be > 0".to_string(),
        ));
    };
    if !converged {
        tracing::warn!(
            target_gain,
            capital,
            achieved_gain = eval.gain,
            iterations = iterations.len(),
            "goal search hit the iteration cap; returning closest candidate"
        );
    }

    let blended = blended_rate(&eval.allocation, config.horizon_days)?;
    Ok(GoalSolveResult {
        target_annual_gain: target_gain,
        capital,
        allocation: eval.allocation,
        blended_rate: blended,
        achieved_gain: eval.gain,
        reference_rate,
        search_min,
        search_max,
        iterations,
        converged,
        approximate: !converged,
    })
}

fn evaluate_candidate(eligible: &[Product], capital: f64, days: u32) -> CoreResult<CandidateEval> {
    let allocation = allocate_greedy(eligible, capital)?;
    let gain = allocation_gain(&allocation, days)?;
    Ok(CandidateEval { allocation, gain })
}

fn validate_config(config: GoalSolveConfig) -> CoreResult<()> {
    let invalid = |msg: &str| Err(CoreError::InvalidInput(msg.to_string()));
    if !config.tolerance.is_finite() || config.tolerance <= 0.0 {
        return invalid("tolerance must be > 0");
    }
    if config.max_iterations == 0 {
        return invalid("max_iterations must be > 0");
    }
    if !config.probe_capital.is_finite() || config.probe_capital <= 0.0 {
        return invalid("probe_capital must be > 0");
    }
    if !config.min_capital.is_finite() || config.min_capital < 0.0 {
        return invalid("min_capital must be >= 0");
    }
    if config.horizon_days == 0 {
        return invalid("horizon_days must be > 0");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ProductKind;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn product(institution: &str, name: &str, rate: f64) -> Product {
        Product {
            institution: institution.to_string(),
            name: name.to_string(),
            base_rate: rate,
            minimum_amount: 0.0,
            maximum_amount: None,
            requires_membership: None,
            kind: ProductKind::Sight,
        }
    }

    fn sample_pool() -> Vec<Product> {
        let mut turbo = product("Nu México", "Cajita Turbo", 15.0);
        turbo.maximum_amount = Some(25_000.0);
        let mut didi = product("DiDi", "DiDi Ahorro", 8.5);
        didi.kind = ProductKind::HybridSight {
            premium_rate: 16.0,
            premium_ceiling: 10_000.0,
        };
        didi.maximum_amount = Some(10_000.0);
        let mp = product("Mercado Pago", "Rendimientos MP", 12.5);
        vec![turbo, didi, mp]
    }

    #[test]
    fn solves_each_order_of_magnitude_within_tolerance() {
        let pool = sample_pool();
        let config = GoalSolveConfig::default();
        for target in [1_000.0, 12_000.0, 120_000.0] {
            let result =
                solve_goal_capital(&pool, GoalTarget::Annual(target), config).expect("must solve");
            assert!(result.converged, "target {target} did not converge");
            assert!(!result.approximate);
            assert_close(result.achieved_gain, target, config.tolerance);

            let replay = allocate_greedy(&pool, result.capital).expect("valid");
            let replay_gain = allocation_gain(&replay, config.horizon_days).expect("valid");
            assert_close(replay_gain, target, config.tolerance);
            assert_eq!(replay, result.allocation);
        }
    }

    #[test]
    fn monthly_target_is_annualized() {
        let pool = sample_pool();
        let monthly = solve_goal_capital(&pool, GoalTarget::Monthly(1_000.0), GoalSolveConfig::default())
            .expect("must solve");
        assert_eq!(monthly.target_annual_gain, 12_000.0);
        assert_close(monthly.achieved_gain, 12_000.0, 10.0);
    }

    #[test]
    fn search_bounds_follow_reference_rate() {
        let pool = vec![product("A", "flat", 10.0)];
        let result =
            solve_goal_capital(&pool, GoalTarget::Annual(5_000.0), GoalSolveConfig::default())
                .expect("must solve");
        let naive = 5_000.0 / result.reference_rate * 100.0;
        assert_close(result.search_min, 0.5 * naive, 1e-6);
        assert_close(result.search_max, 2.0 * naive, 1e-6);
        assert_eq!(result.iterations[0].iteration, 1);
        assert_close(result.blended_rate, result.reference_rate, 1e-9);
    }

    #[test]
    fn small_targets_are_floored_at_minimum_capital() {
        let pool = vec![product("A", "flat", 10.0)];
        let result = solve_goal_capital(&pool, GoalTarget::Annual(20.0), GoalSolveConfig::default())
            .expect("best effort result");
        assert_eq!(result.search_min, 1_000.0);
        assert_eq!(result.search_max, 1_000.0);
        assert_eq!(result.capital, 1_000.0);
        assert!(result.approximate);
    }

    #[test]
    fn unreachable_target_returns_best_effort() {
        let mut capped = product("A", "capped", 10.0);
        capped.maximum_amount = Some(50_000.0);
        let config = GoalSolveConfig::default();
        let result = solve_goal_capital(&[capped], GoalTarget::Annual(100_000.0), config)
            .expect("not an error");
        assert!(result.approximate);
        assert!(!result.converged);
        assert_eq!(result.iterations.len(), config.max_iterations as usize);
        assert!(result.allocation.leftover_amount > 0.0);
    }

    #[test]
    fn empty_pool_fails() {
        assert_eq!(
            solve_goal_capital(&[], GoalTarget::Annual(1_000.0), GoalSolveConfig::default()),
            Err(CoreError::NoEligibleProducts)
        );
    }

    #[test]
    fn rejects_bad_targets_and_zero_yield_pools() {
        let pool = sample_pool();
        assert!(matches!(
            solve_goal_capital(&pool, GoalTarget::Annual(0.0), GoalSolveConfig::default()),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            solve_goal_capital(
                &[product("A", "zero", 0.0)],
                GoalTarget::Annual(1_000.0),
                GoalSolveConfig::default()
            ),
            Err(CoreError::InvalidInput(_))
        ));
        let config = GoalSolveConfig {
            max_iterations: 0,
            ..GoalSolveConfig::default()
        };
        assert!(solve_goal_capital(&pool, GoalTarget::Annual(1_000.0), config).is_err());
    }
}
