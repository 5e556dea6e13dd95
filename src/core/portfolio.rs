//! Evaluation of a portfolio the user picked by hand: per-holding gains,
//! weighted yield, concentration and liquidity checks.

use serde::Serialize;

use super::allocation::ranking_rate;
use super::catalog::Catalog;
use super::error::{CoreError, CoreResult, ensure_non_negative};
use super::projection::{DAYS_PER_MONTH, RateDecay, generate_projection, sum_projections};
use super::types::{InterestMethod, Product, ProjectionRow};
use super::yields::{Convention, convention_for, effective_annual_rate, product_interest};

/// IPAB covers 25,000 UDIs per depositor and institution, about this much.
pub const DEPOSIT_INSURANCE_LIMIT: f64 = 200_000.0;

const HIGH_CONCENTRATION_PCT: f64 = 70.0;
const DIVERSIFIED_MAX_PCT: f64 = 50.0;
const DIVERSIFIED_MIN_INSTITUTIONS: usize = 3;
const LOW_LIQUIDITY_PCT: f64 = 20.0;
const HIGH_LIQUIDITY_PCT: f64 = 80.0;
const LOW_YIELD_PCT: f64 = 10.0;
const STRONG_YIELD_PCT: f64 = 14.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub product: Product,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingResult {
    pub institution: String,
    pub product: String,
    pub amount: f64,
    pub effective_rate: f64,
    pub convention: Convention,
    pub period_gain: f64,
    pub daily_gain: f64,
    pub monthly_gain: f64,
    pub annual_gain: f64,
    pub final_total: f64,
    pub projection: Vec<ProjectionRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSummary {
    pub months: u32,
    pub total_invested: f64,
    pub total_gain: f64,
    /// Gain over the horizon scaled to a year, in percent of invested capital.
    pub weighted_rate: f64,
    pub holdings: Vec<HoldingResult>,
    pub projection: Vec<ProjectionRow>,
}

pub fn evaluate_portfolio(holdings: &[Holding], months: u32) -> CoreResult<PortfolioSummary> {
    if months == 0 {
        return Err(CoreError::InvalidInput("months must be > 0".to_string()));
    }
    let days = months * DAYS_PER_MONTH;

    let mut results = Vec::with_capacity(holdings.len());
    for holding in holdings {
        ensure_non_negative("holding amount", holding.amount)?;
        let product = &holding.product;
        let effective_rate = effective_annual_rate(product, holding.amount)?;
        let convention = convention_for(product);
        let period_gain = product_interest(product, holding.amount, days)?;
        let daily_gain = period_gain / days as f64;

        let method = match convention {
            Convention::Simple => InterestMethod::Simple,
            Convention::CompoundDaily | Convention::TieredDaily => InterestMethod::Compound,
        };
        let projection = generate_projection(
            holding.amount,
            effective_rate,
            method,
            months as i64,
            RateDecay::none(),
        )?;

        results.push(HoldingResult {
            institution: product.institution.clone(),
            product: product.name.clone(),
            amount: holding.amount,
            effective_rate,
            convention,
            period_gain,
            daily_gain,
            monthly_gain: daily_gain * DAYS_PER_MONTH as f64,
            annual_gain: daily_gain * 365.0,
            final_total: holding.amount + period_gain,
            projection,
        });
    }

    let total_invested: f64 = results.iter().map(|r| r.amount).sum();
    let total_gain: f64 = results.iter().map(|r| r.period_gain).sum();
    let weighted_rate = if total_invested > 0.0 {
        total_gain / total_invested * (12.0 / months as f64) * 100.0
    } else {
        0.0
    };
    let projections: Vec<Vec<ProjectionRow>> =
        results.iter().map(|r| r.projection.clone()).collect();

    Ok(PortfolioSummary {
        months,
        total_invested,
        total_gain,
        weighted_rate,
        projection: sum_projections(&projections),
        holdings: results,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Concentration {
    pub institution: String,
    pub amount: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiversificationAnalysis {
    pub total_invested: f64,
    /// One entry per institution, in order of first appearance.
    pub concentrations: Vec<Concentration>,
    pub max_concentration: f64,
    pub institution_count: usize,
    pub immediate_liquidity: f64,
    pub liquid_percent: f64,
}

/// `None` when nothing is invested.
pub fn analyze_diversification(holdings: &[Holding]) -> Option<DiversificationAnalysis> {
    let total_invested: f64 = holdings.iter().map(|h| h.amount.max(0.0)).sum();
    if total_invested <= 0.0 {
        return None;
    }

    let mut concentrations: Vec<Concentration> = Vec::new();
    for holding in holdings {
        let amount = holding.amount.max(0.0);
        let existing = concentrations
            .iter()
            .position(|c| c.institution == holding.product.institution);
        match existing {
            Some(idx) => concentrations[idx].amount += amount,
            None => concentrations.push(Concentration {
                institution: holding.product.institution.clone(),
                amount,
                percent: 0.0,
            }),
        }
    }
    for c in &mut concentrations {
        c.percent = c.amount / total_invested * 100.0;
    }

    let max_concentration = concentrations
        .iter()
        .map(|c| c.percent)
        .fold(0.0, f64::max);
    let institution_count = concentrations.iter().filter(|c| c.percent > 0.0).count();
    let immediate_liquidity: f64 = holdings
        .iter()
        .filter(|h| h.product.is_immediate())
        .map(|h| h.amount.max(0.0))
        .sum();

    Some(DiversificationAnalysis {
        total_invested,
        concentrations,
        max_concentration,
        institution_count,
        immediate_liquidity,
        liquid_percent: immediate_liquidity / total_invested * 100.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Recommendation {
    SingleInstitution,
    HighConcentration { percent: f64 },
    WellDiversified,
    LowLiquidity { percent: f64 },
    HighLiquidity { percent: f64 },
    BalancedLiquidity { percent: f64 },
    LowYield { rate: f64 },
    StrongYield { rate: f64 },
    DepositInsurance { limit: f64 },
    AboveDepositInsurance {
        institution: String,
        amount: f64,
        limit: f64,
    },
    ConsiderProduct {
        institution: String,
        product: String,
        rate: f64,
    },
}

pub fn recommend(
    analysis: &DiversificationAnalysis,
    weighted_rate: f64,
    catalog: &Catalog,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if analysis.institution_count == 1 {
        out.push(Recommendation::SingleInstitution);
    } else if analysis.max_concentration > HIGH_CONCENTRATION_PCT {
        out.push(Recommendation::HighConcentration {
            percent: analysis.max_concentration,
        });
    } else if analysis.institution_count >= DIVERSIFIED_MIN_INSTITUTIONS
        && analysis.max_concentration < DIVERSIFIED_MAX_PCT
    {
        out.push(Recommendation::WellDiversified);
    }

    let percent = analysis.liquid_percent;
    out.push(if percent < LOW_LIQUIDITY_PCT {
        Recommendation::LowLiquidity { percent }
    } else if percent > HIGH_LIQUIDITY_PCT {
        Recommendation::HighLiquidity { percent }
    } else {
        Recommendation::BalancedLiquidity { percent }
    });

    if weighted_rate < LOW_YIELD_PCT {
        out.push(Recommendation::LowYield {
            rate: weighted_rate,
        });
    } else if weighted_rate >= STRONG_YIELD_PCT {
        out.push(Recommendation::StrongYield {
            rate: weighted_rate,
        });
    }

    out.push(Recommendation::DepositInsurance {
        limit: DEPOSIT_INSURANCE_LIMIT,
    });
    for c in &analysis.concentrations {
        if c.amount > DEPOSIT_INSURANCE_LIMIT {
            out.push(Recommendation::AboveDepositInsurance {
                institution: c.institution.clone(),
                amount: c.amount,
                limit: DEPOSIT_INSURANCE_LIMIT,
            });
        }
    }

    let held = |institution: &str| {
        analysis
            .concentrations
            .iter()
            .any(|c| c.institution == institution && c.percent > 0.0)
    };
    let best_unheld = catalog
        .products()
        .filter(|p| p.requires_membership.is_none() && !held(p.institution.as_str()))
        .fold(None::<&Product>, |best, p| match best {
            Some(b) if ranking_rate(b) >= ranking_rate(p) => Some(b),
            _ => Some(p),
        });
    if let Some(p) = best_unheld {
        out.push(Recommendation::ConsiderProduct {
            institution: p.institution.clone(),
            product: p.name.clone(),
            rate: ranking_rate(p),
        });
    }

    out
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

    fn holding(catalog: &Catalog, institution: &str, product: &str, amount: f64) -> Holding {
        Holding {
            product: catalog
                .product(institution, product)
                .expect("product exists")
                .clone(),
            amount,
        }
    }

    #[test]
    fn evaluates_each_holding_under_its_convention() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let holdings = vec![
            holding(&catalog, "Nu México", "Cajita Turbo", 25_000.0),
            holding(&catalog, "Ualá", "Ualá Plazo Fijo 28 días", 36_000.0),
        ];
        let summary = evaluate_portfolio(&holdings, 12).expect("valid");

        let turbo = &summary.holdings[0];
        assert_eq!(turbo.convention, Convention::CompoundDaily);
        let expected = 25_000.0 * (1.0 + 0.15 / 365.0_f64).powf(360.0) - 25_000.0;
        assert_close(turbo.period_gain, expected, 1e-6);
        assert_close(turbo.daily_gain, expected / 360.0, 1e-9);
        assert_close(turbo.annual_gain, expected / 360.0 * 365.0, 1e-9);

        let term = &summary.holdings[1];
        assert_eq!(term.convention, Convention::Simple);
        assert_close(term.period_gain, 3_960.0, 1e-6);
        assert_close(term.final_total, 39_960.0, 1e-6);
        assert_close(term.projection[12].total, 36_000.0 * (1.0 + 0.11 / 12.0_f64).powi(12), 1e-6);

        assert_close(summary.total_invested, 61_000.0, 1e-9);
        assert_close(summary.total_gain, expected + 3_960.0, 1e-6);
        assert_close(
            summary.weighted_rate,
            (expected + 3_960.0) / 61_000.0 * 100.0,
            1e-9,
        );
        assert_eq!(summary.projection.len(), 13);
        assert_close(summary.projection[0].total, 61_000.0, 1e-9);
    }

    #[test]
    fn hybrid_holding_reports_blended_rate() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let holdings = vec![holding(&catalog, "DiDi", "DiDi Ahorro", 20_000.0)];
        let summary = evaluate_portfolio(&holdings, 12).expect("valid");
        let didi = &summary.holdings[0];
        assert_eq!(didi.convention, Convention::TieredDaily);
        assert!(didi.effective_rate > 8.5 && didi.effective_rate < 16.0);
    }

    #[test]
    fn zero_months_is_rejected() {
        assert!(evaluate_portfolio(&[], 0).is_err());
        let empty = evaluate_portfolio(&[], 6).expect("empty portfolio is fine");
        assert_eq!(empty.weighted_rate, 0.0);
        assert!(empty.projection.is_empty());
    }

    #[test]
    fn diversification_groups_by_institution() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let holdings = vec![
            holding(&catalog, "Nu México", "Cajita Turbo", 25_000.0),
            holding(&catalog, "Nu México", "Plazo Fijo 90 días", 25_000.0),
            holding(&catalog, "Mercado Pago", "Rendimientos MP", 50_000.0),
        ];
        let analysis = analyze_diversification(&holdings).expect("non-empty");
        assert_eq!(analysis.institution_count, 2);
        assert_eq!(analysis.concentrations[0].institution, "Nu México");
        assert_close(analysis.concentrations[0].percent, 50.0, 1e-9);
        assert_close(analysis.max_concentration, 50.0, 1e-9);
        assert_close(analysis.immediate_liquidity, 75_000.0, 1e-9);
        assert_close(analysis.liquid_percent, 75.0, 1e-9);

        assert!(analyze_diversification(&[]).is_none());
    }

    #[test]
    fn recommendations_cover_concentration_liquidity_and_yield() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let holdings = vec![holding(
            &catalog,
            "Finsus",
            "Plazo Fijo 360 días",
            250_000.0,
        )];
        let analysis = analyze_diversification(&holdings).expect("non-empty");
        let recs = recommend(&analysis, 9.0, &catalog);

        assert_eq!(recs[0], Recommendation::SingleInstitution);
        assert!(recs.contains(&Recommendation::LowLiquidity { percent: 0.0 }));
        assert!(recs.contains(&Recommendation::LowYield { rate: 9.0 }));
        assert!(recs.iter().any(|r| matches!(
            r,
            Recommendation::AboveDepositInsurance { institution, .. } if institution == "Finsus"
        )));
        assert!(recs.contains(&Recommendation::ConsiderProduct {
            institution: "DiDi".to_string(),
            product: "DiDi Ahorro".to_string(),
            rate: 16.0,
        }));
    }

    #[test]
    fn well_diversified_liquid_portfolio() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let holdings = vec![
            holding(&catalog, "DiDi", "DiDi Ahorro", 10_000.0),
            holding(&catalog, "Nu México", "Cajita Turbo", 10_000.0),
            holding(&catalog, "Mercado Pago", "Rendimientos MP", 10_000.0),
        ];
        let analysis = analyze_diversification(&holdings).expect("non-empty");
        let recs = recommend(&analysis, 14.5, &catalog);
        assert_eq!(recs[0], Recommendation::WellDiversified);
        assert!(recs.contains(&Recommendation::HighLiquidity { percent: 100.0 }));
        assert!(recs.contains(&Recommendation::StrongYield { rate: 14.5 }));
        assert!(!recs.iter().any(|r| matches!(r, Recommendation::AboveDepositInsurance { .. })));
        // Membership-gated products are never suggested.
        assert!(recs.iter().all(|r| !matches!(
            r,
            Recommendation::ConsiderProduct { product, .. } if product == "Inversión Flexible Max"
        )));
    }

    #[test]
    fn negative_holding_is_rejected() {
        let product = Product {
            institution: "X".to_string(),
            name: "Y".to_string(),
            base_rate: 5.0,
            minimum_amount: 0.0,
            maximum_amount: None,
            requires_membership: None,
            kind: ProductKind::Sight,
        };
        let err = evaluate_portfolio(&[Holding { product, amount: -1.0 }], 3)
            .expect_err("negative amount");
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
