use super::error::{CoreError, CoreResult, ensure_non_negative};
use super::types::{Allocation, AllocationEntry, Product, ProductKind};
use super::yields::compounded_product_interest;

/// Rate a product is ranked by: hybrids compete with their premium tier.
pub fn ranking_rate(product: &Product) -> f64 {
    match product.kind {
        ProductKind::HybridSight { premium_rate, .. } => premium_rate,
        ProductKind::Sight | ProductKind::Term { .. } => product.base_rate,
    }
}

/// Single greedy pass in descending rate order. Ties keep the order of
/// `eligible`. Each product takes as much as its maximum allows; products
/// whose minimum exceeds what is left are skipped.
///
/// This is not a global optimum when minimums could be met by reordering,
/// and it is not meant to be.
pub fn allocate_greedy(eligible: &[Product], capital: f64) -> CoreResult<Allocation> {
    ensure_non_negative("capital", capital)?;
    if eligible.is_empty() {
        return Err(CoreError::NoEligibleProducts);
    }

    let mut ranked: Vec<&Product> = eligible.iter().collect();
    ranked.sort_by(|a, b| ranking_rate(b).total_cmp(&ranking_rate(a)));

    let mut remaining = capital;
    let mut entries = Vec::new();
    for product in ranked {
        if remaining <= 0.0 {
            break;
        }
        if product.minimum_amount > remaining {
            continue;
        }
        let amount = match product.maximum_amount {
            Some(max) => remaining.min(max),
            None => remaining,
        };
        if amount <= 0.0 {
            continue;
        }
        entries.push(AllocationEntry {
            product: product.clone(),
            amount,
        });
        remaining -= amount;
    }

    // Keep `allocated + leftover == capital` exact even after repeated
    // subtraction.
    let allocated: f64 = entries.iter().map(|e| e.amount).sum();
    let leftover_amount = (capital - allocated).max(0.0);

    tracing::debug!(
        capital,
        products = entries.len(),
        leftover_amount,
        "greedy allocation"
    );
    Ok(Allocation {
        entries,
        leftover_amount,
    })
}

/// Interest the allocation earns over `days`, every product compounding
/// daily.
pub fn allocation_gain(allocation: &Allocation, days: u32) -> CoreResult<f64> {
    allocation.entries.iter().try_fold(0.0, |acc, entry| {
        Ok(acc + compounded_product_interest(&entry.product, entry.amount, days)?)
    })
}

/// Capital-weighted yield of the allocated amount over `days`, in percent.
pub fn blended_rate(allocation: &Allocation, days: u32) -> CoreResult<f64> {
    let allocated = allocation.allocated();
    if allocated <= 0.0 {
        return Ok(0.0);
    }
    Ok(allocation_gain(allocation, days)? / allocated * 100.0)
}
