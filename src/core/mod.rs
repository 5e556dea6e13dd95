mod allocation;
mod catalog;
mod error;
mod portfolio;
mod projection;
mod solver;
mod types;
mod yields;

pub use allocation::{allocate_greedy, allocation_gain, blended_rate, ranking_rate};
pub use catalog::{Catalog, Eligibility};
pub use error::{CoreError, CoreResult};
pub use portfolio::{
    Concentration, DEPOSIT_INSURANCE_LIMIT, DiversificationAnalysis, Holding, HoldingResult,
    PortfolioSummary, Recommendation, analyze_diversification, evaluate_portfolio, recommend,
};
pub use projection::{
    Contribution, DAYS_PER_MONTH, DEFAULT_RATE_FLOOR, RateDecay, generate_projection,
    generate_projection_with_contributions, sum_projections,
};
pub use solver::{GoalSolveConfig, GoalSolveIteration, GoalSolveResult, GoalTarget, solve_goal_capital};
pub use types::{
    Allocation, AllocationEntry, Compounding, ContributionFrequency, Institution, InterestMethod,
    Liquidity, Product, ProductKind, ProjectionRow, YearBasis,
};
pub use yields::{
    COMPOUND_YEAR_DAYS, Convention, compound_interest, compound_interest_with,
    compounded_product_interest, convention_for, effective_annual_rate, hybrid_tiered_interest,
    product_interest, simple_interest,
};
