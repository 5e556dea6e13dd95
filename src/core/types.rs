use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreResult};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ProductKind {
    /// Demand deposit, withdrawable at any time.
    Sight,
    /// Fixed-term deposit locked for `term_days`.
    #[serde(rename_all = "camelCase")]
    Term { term_days: u32 },
    /// Demand deposit paying `premium_rate` up to `premium_ceiling` and the
    /// product's base rate on the excess.
    #[serde(rename_all = "camelCase")]
    HybridSight {
        premium_rate: f64,
        premium_ceiling: f64,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "days")]
pub enum Liquidity {
    Immediate,
    TermDays(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub institution: String,
    pub name: String,
    /// Annual percentage, 15.0 means 15%.
    pub base_rate: f64,
    #[serde(default)]
    pub minimum_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_membership: Option<String>,
    pub kind: ProductKind,
}

impl Product {
    pub fn liquidity(&self) -> Liquidity {
        match self.kind {
            ProductKind::Term { term_days } => Liquidity::TermDays(term_days),
            ProductKind::Sight | ProductKind::HybridSight { .. } => Liquidity::Immediate,
        }
    }

    pub fn is_immediate(&self) -> bool {
        self.liquidity() == Liquidity::Immediate
    }

    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |msg: &str| {
            Err(CoreError::InvalidCatalog(format!(
                "{} / {}: {msg}",
                self.institution, self.name
            )))
        };

        if self.name.trim().is_empty() {
            return invalid("product name must not be empty");
        }
        if !self.base_rate.is_finite() || self.base_rate < 0.0 {
            return invalid("base_rate must be >= 0");
        }
        if !self.minimum_amount.is_finite() || self.minimum_amount < 0.0 {
            return invalid("minimum_amount must be >= 0");
        }
        if let Some(max) = self.maximum_amount {
            if !max.is_finite() || max < self.minimum_amount {
                return invalid("maximum_amount must be >= minimum_amount");
            }
        }
        match self.kind {
            ProductKind::Sight => {}
            ProductKind::Term { term_days } => {
                if term_days == 0 {
                    return invalid("term_days must be > 0");
                }
            }
            ProductKind::HybridSight {
                premium_rate,
                premium_ceiling,
            } => {
                if !premium_rate.is_finite() || premium_rate < 0.0 {
                    return invalid("premium_rate must be >= 0");
                }
                if !premium_ceiling.is_finite() || premium_ceiling <= 0.0 {
                    return invalid("premium_ceiling must be > 0");
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub name: String,
    pub label: String,
    pub description: String,
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEntry {
    pub product: Product,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub entries: Vec<AllocationEntry>,
    pub leftover_amount: f64,
}

impl Allocation {
    pub fn allocated(&self) -> f64 {
        self.entries.iter().map(|e| e.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    pub month: u32,
    /// Money put in so far: starting principal plus credited contributions.
    pub principal: f64,
    /// Interest accumulated up to and including this month.
    pub interest: f64,
    pub total: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributions: Option<f64>,
    /// Annual rate in effect for this month's step.
    pub rate: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestMethod {
    Simple,
    Compound,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFrequency {
    Weekly,
    Biweekly,
    Monthly,
}

impl ContributionFrequency {
    /// Contributions credited per 30-day month.
    pub fn monthly_factor(self) -> f64 {
        match self {
            ContributionFrequency::Weekly => 4.33,
            ContributionFrequency::Biweekly => 2.0,
            ContributionFrequency::Monthly => 1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compounding {
    Daily,
    Monthly,
    Annual,
}

impl Compounding {
    pub fn periods_per_year(self) -> u32 {
        match self {
            Compounding::Daily => 365,
            Compounding::Monthly => 12,
            Compounding::Annual => 1,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum YearBasis {
    #[default]
    Commercial360,
    Actual365,
}

impl YearBasis {
    pub fn days(self) -> f64 {
        match self {
            YearBasis::Commercial360 => 360.0,
            YearBasis::Actual365 => 365.0,
        }
    }
}
