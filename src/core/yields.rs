//! Interest formulas. No rounding happens here; currency rounding belongs to
//! whoever presents the numbers.

use serde::Serialize;

use super::error::{CoreError, CoreResult, ensure_non_negative};
use super::types::{Compounding, Product, ProductKind, YearBasis};

/// Day count used as `t` for every compound formula.
pub const COMPOUND_YEAR_DAYS: f64 = 365.0;

/// Which formula a product earns under.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Convention {
    CompoundDaily,
    Simple,
    TieredDaily,
}

pub fn simple_interest(
    principal: f64,
    annual_rate_pct: f64,
    days: u32,
    year_basis: YearBasis,
) -> CoreResult<f64> {
    ensure_non_negative("principal", principal)?;
    ensure_non_negative("annual rate", annual_rate_pct)?;
    if days == 0 {
        return Ok(0.0);
    }
    Ok(principal * (annual_rate_pct / 100.0) * (days as f64 / year_basis.days()))
}

pub fn compound_interest(
    principal: f64,
    annual_rate_pct: f64,
    days: u32,
    periods_per_year: u32,
) -> CoreResult<f64> {
    ensure_non_negative("principal", principal)?;
    ensure_non_negative("annual rate", annual_rate_pct)?;
    if periods_per_year == 0 {
        return Err(CoreError::InvalidInput(
            "periods per year must be > 0".to_string(),
        ));
    }
    if days == 0 {
        return Ok(0.0);
    }

    let n = periods_per_year as f64;
    let t = days as f64 / COMPOUND_YEAR_DAYS;
    let r = annual_rate_pct / 100.0;
    let final_amount = principal * (1.0 + r / n).powf(n * t);
    Ok(final_amount - principal)
}

pub fn compound_interest_with(
    principal: f64,
    annual_rate_pct: f64,
    days: u32,
    compounding: Compounding,
) -> CoreResult<f64> {
    compound_interest(
        principal,
        annual_rate_pct,
        days,
        compounding.periods_per_year(),
    )
}

/// First `premium_ceiling` compounds daily at `premium_rate`, the excess at
/// `base_rate`.
pub fn hybrid_tiered_interest(
    principal: f64,
    premium_rate: f64,
    premium_ceiling: f64,
    base_rate: f64,
    days: u32,
) -> CoreResult<f64> {
    ensure_non_negative("principal", principal)?;
    ensure_non_negative("premium rate", premium_rate)?;
    ensure_non_negative("premium ceiling", premium_ceiling)?;
    ensure_non_negative("base rate", base_rate)?;
    let daily = Compounding::Daily.periods_per_year();

    if principal <= premium_ceiling {
        return compound_interest(principal, premium_rate, days, daily);
    }

    let premium = compound_interest(premium_ceiling, premium_rate, days, daily)?;
    let excess = compound_interest(principal - premium_ceiling, base_rate, days, daily)?;
    Ok(premium + excess)
}

pub fn convention_for(product: &Product) -> Convention {
    match product.kind {
        ProductKind::Sight => Convention::CompoundDaily,
        ProductKind::Term { .. } => Convention::Simple,
        ProductKind::HybridSight { .. } => Convention::TieredDaily,
    }
}

/// Interest a product pays on `amount` under its own convention: sight
/// deposits compound daily, term deposits earn simple interest on the
/// 360-day basis, hybrids are tiered.
pub fn product_interest(product: &Product, amount: f64, days: u32) -> CoreResult<f64> {
    match product.kind {
        ProductKind::Sight => compound_interest_with(amount, product.base_rate, days, Compounding::Daily),
        ProductKind::Term { .. } => {
            simple_interest(amount, product.base_rate, days, YearBasis::Commercial360)
        }
        ProductKind::HybridSight {
            premium_rate,
            premium_ceiling,
        } => hybrid_tiered_interest(amount, premium_rate, premium_ceiling, product.base_rate, days),
    }
}

/// Interest with daily compounding for every kind, as used for blended
/// yields.
pub fn compounded_product_interest(product: &Product, amount: f64, days: u32) -> CoreResult<f64> {
    match product.kind {
        ProductKind::Sight | ProductKind::Term { .. } => {
            compound_interest_with(amount, product.base_rate, days, Compounding::Daily)
        }
        ProductKind::HybridSight {
            premium_rate,
            premium_ceiling,
        } => hybrid_tiered_interest(amount, premium_rate, premium_ceiling, product.base_rate, days),
    }
}

/// Annual rate a product effectively pays on `amount`. Only hybrids differ
/// from the quoted base rate.
pub fn effective_annual_rate(product: &Product, amount: f64) -> CoreResult<f64> {
    ensure_non_negative("amount", amount)?;
    match product.kind {
        ProductKind::HybridSight {
            premium_rate,
            premium_ceiling,
        } => {
            if amount <= 0.0 {
                return Ok(premium_rate);
            }
            let annual =
                hybrid_tiered_interest(amount, premium_rate, premium_ceiling, product.base_rate, 365)?;
            Ok(annual / amount * 100.0)
        }
        ProductKind::Sight | ProductKind::Term { .. } => Ok(product.base_rate),
    }
}
