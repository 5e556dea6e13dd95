use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreResult, ensure_non_negative};
use super::types::{ContributionFrequency, InterestMethod, ProjectionRow, YearBasis};
use super::yields::{compound_interest, simple_interest};

/// Days in one projection step.
pub const DAYS_PER_MONTH: u32 = 30;

/// Lowest rate a decaying scenario falls to.
pub const DEFAULT_RATE_FLOOR: f64 = 1.0;

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateDecay {
    /// Percentage points dropped at the start of every quarter.
    pub per_quarter: f64,
    pub floor: f64,
}

impl RateDecay {
    pub fn none() -> Self {
        Self {
            per_quarter: 0.0,
            floor: DEFAULT_RATE_FLOOR,
        }
    }

    pub fn per_quarter(per_quarter: f64) -> Self {
        Self {
            per_quarter,
            floor: DEFAULT_RATE_FLOOR,
        }
    }

    fn validate(self) -> CoreResult<()> {
        ensure_non_negative("rate decay per quarter", self.per_quarter)?;
        ensure_non_negative("rate floor", self.floor)
    }

    /// A rate that already starts below the floor is left where it is.
    pub fn rate_at(self, annual_rate_pct: f64, month: u32) -> f64 {
        if self.per_quarter <= 0.0 {
            return annual_rate_pct;
        }
        let quarters_elapsed = (month / 3) as f64;
        let decayed = annual_rate_pct - self.per_quarter * quarters_elapsed;
        decayed.max(self.floor.min(annual_rate_pct))
    }
}

impl Default for RateDecay {
    fn default() -> Self {
        Self::none()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub amount: f64,
    pub frequency: ContributionFrequency,
}

impl Contribution {
    pub fn monthly_amount(self) -> f64 {
        self.amount * self.frequency.monthly_factor()
    }
}

pub fn generate_projection(
    principal: f64,
    annual_rate_pct: f64,
    method: InterestMethod,
    months: i64,
    decay: RateDecay,
) -> CoreResult<Vec<ProjectionRow>> {
    project(principal, annual_rate_pct, method, months, None, decay)
}

/// Contributions are credited at the end of each month, after that month's
/// interest, so they start earning the month after.
pub fn generate_projection_with_contributions(
    principal: f64,
    annual_rate_pct: f64,
    method: InterestMethod,
    months: i64,
    contribution: Contribution,
    decay: RateDecay,
) -> CoreResult<Vec<ProjectionRow>> {
    ensure_non_negative("contribution amount", contribution.amount)?;
    project(
        principal,
        annual_rate_pct,
        method,
        months,
        Some(contribution),
        decay,
    )
}

fn project(
    principal: f64,
    annual_rate_pct: f64,
    method: InterestMethod,
    months: i64,
    contribution: Option<Contribution>,
    decay: RateDecay,
) -> CoreResult<Vec<ProjectionRow>> {
    ensure_non_negative("principal", principal)?;
    ensure_non_negative("annual rate", annual_rate_pct)?;
    decay.validate()?;
    let months = u32::try_from(months)
        .map_err(|_| CoreError::InvalidInput("months must be between 0 and u32::MAX".to_string()))?;

    let monthly_contribution = contribution.map(Contribution::monthly_amount);
    let mut rows = Vec::with_capacity(months as usize + 1);
    let mut balance = principal;
    let mut interest_total = 0.0;
    let mut contributed = 0.0;

    for month in 0..=months {
        let rate = decay.rate_at(annual_rate_pct, month);
        if month > 0 {
            let step = match method {
                InterestMethod::Simple => {
                    simple_interest(balance, rate, DAYS_PER_MONTH, YearBasis::Commercial360)?
                }
                InterestMethod::Compound => compound_interest(balance, rate, DAYS_PER_MONTH, 365)?,
            };
            interest_total += step;
            balance += step;

            if let Some(amount) = monthly_contribution {
                contributed += amount;
                balance += amount;
            }
        }

        rows.push(ProjectionRow {
            month,
            principal: principal + contributed,
            interest: interest_total,
            total: balance,
            contributions: monthly_contribution.map(|_| contributed),
            rate,
        });
    }

    tracing::debug!(
        months,
        final_total = balance,
        ?method,
        "projection generated"
    );
    Ok(rows)
}

/// Adds trajectories month by month. Rows past the end of a shorter
/// trajectory are missing from it, so the result is as long as the longest.
/// The summed `rate` is the balance-weighted rate of the month.
pub fn sum_projections(projections: &[Vec<ProjectionRow>]) -> Vec<ProjectionRow> {
    let len = projections.iter().map(Vec::len).max().unwrap_or(0);
    let mut out = Vec::with_capacity(len);

    for idx in 0..len {
        let mut principal = 0.0;
        let mut interest = 0.0;
        let mut total = 0.0;
        let mut contributions: Option<f64> = None;
        let mut weighted_rate = 0.0;

        for row in projections.iter().filter_map(|p| p.get(idx)) {
            principal += row.principal;
            interest += row.interest;
            total += row.total;
            weighted_rate += row.rate * row.total;
            if let Some(c) = row.contributions {
                *contributions.get_or_insert(0.0) += c;
            }
        }

        out.push(ProjectionRow {
            month: idx as u32,
            principal,
            interest,
            total,
            contributions,
            rate: if total > 0.0 {
                weighted_rate / total
            } else {
                0.0
            },
        });
    }
    out
}
