//! Rate catalog: reference data loaded once and only read afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreResult};
use super::types::{Institution, Product, ProductKind};

const BUILTIN_CATALOG_JSON: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    as_of: Option<String>,
    institutions: Vec<InstitutionFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstitutionFile {
    name: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: String,
    products: Vec<ProductFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductFile {
    name: String,
    base_rate: f64,
    #[serde(default)]
    minimum_amount: f64,
    #[serde(default)]
    maximum_amount: Option<f64>,
    #[serde(default)]
    requires_membership: Option<String>,
    kind: ProductKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_of: Option<String>,
    institutions: Vec<Institution>,
}

impl Catalog {
    /// The rate table shipped with the binary.
    pub fn builtin() -> CoreResult<Self> {
        Self::from_json(BUILTIN_CATALOG_JSON)
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| CoreError::InvalidCatalog(format!("malformed catalog JSON: {e}")))?;

        let mut seen = BTreeSet::new();
        let mut institutions = Vec::with_capacity(file.institutions.len());
        for inst in file.institutions {
            if !seen.insert(inst.name.clone()) {
                return Err(CoreError::InvalidCatalog(format!(
                    "duplicate institution '{}'",
                    inst.name
                )));
            }
            if inst.products.is_empty() {
                return Err(CoreError::InvalidCatalog(format!(
                    "institution '{}' has no products",
                    inst.name
                )));
            }

            let mut product_names = BTreeSet::new();
            let mut products = Vec::with_capacity(inst.products.len());
            for p in inst.products {
                if !product_names.insert(p.name.clone()) {
                    return Err(CoreError::InvalidCatalog(format!(
                        "duplicate product '{}' at '{}'",
                        p.name, inst.name
                    )));
                }
                let product = Product {
                    institution: inst.name.clone(),
                    name: p.name,
                    base_rate: p.base_rate,
                    minimum_amount: p.minimum_amount,
                    maximum_amount: p.maximum_amount,
                    requires_membership: p.requires_membership,
                    kind: p.kind,
                };
                product.validate()?;
                products.push(product);
            }

            institutions.push(Institution {
                label: inst.label.unwrap_or_else(|| inst.name.clone()),
                name: inst.name,
                description: inst.description,
                products,
            });
        }

        Ok(Self {
            as_of: file.as_of,
            institutions,
        })
    }

    pub fn institutions(&self) -> &[Institution] {
        &self.institutions
    }

    pub fn institution(&self, name: &str) -> Option<&Institution> {
        self.institutions.iter().find(|i| i.name == name)
    }

    /// Every product in catalog order.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.institutions.iter().flat_map(|i| i.products.iter())
    }

    /// Exact lookup; similarly named products are never substituted.
    pub fn product(&self, institution: &str, product: &str) -> CoreResult<&Product> {
        self.institution(institution)
            .and_then(|i| i.products.iter().find(|p| p.name == product))
            .ok_or_else(|| CoreError::UnknownProduct {
                institution: institution.to_string(),
                product: product.to_string(),
            })
    }

    pub fn eligible_products(&self, eligibility: &Eligibility) -> Vec<Product> {
        self.products()
            .filter(|p| eligibility.admits(p))
            .cloned()
            .collect()
    }
}

/// What the user says they hold and which institutions they want to avoid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Eligibility {
    pub capabilities: BTreeSet<String>,
    pub excluded_institutions: BTreeSet<String>,
}

impl Eligibility {
    pub fn admits(&self, product: &Product) -> bool {
        if self.excluded_institutions.contains(&product.institution) {
            return false;
        }
        match &product.requires_membership {
            Some(requirement) => self.capabilities.contains(requirement),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Liquidity;

    #[test]
    fn builtin_catalog_loads_in_order() {
        let catalog = Catalog::builtin().expect("builtin catalog must be valid");
        let names: Vec<&str> = catalog
            .institutions()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["Nu México", "DiDi", "Stori", "Klar", "Ualá", "Mercado Pago", "Finsus"]
        );
        assert_eq!(catalog.as_of.as_deref(), Some("2025-11"));
        assert!(catalog.products().all(|p| p.validate().is_ok()));
    }

    #[test]
    fn builtin_catalog_carries_capped_and_hybrid_products() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let turbo = catalog
            .product("Nu México", "Cajita Turbo")
            .expect("turbo exists");
        assert_eq!(turbo.maximum_amount, Some(25_000.0));
        assert_eq!(turbo.base_rate, 15.0);

        let didi = catalog.product("DiDi", "DiDi Ahorro").expect("didi exists");
        assert_eq!(
            didi.kind,
            ProductKind::HybridSight {
                premium_rate: 16.0,
                premium_ceiling: 10_000.0
            }
        );

        let term = catalog
            .product("Finsus", "Plazo Fijo 360 días")
            .expect("term exists");
        assert_eq!(term.liquidity(), Liquidity::TermDays(360));
    }

    #[test]
    fn product_lookup_is_exact() {
        let catalog = Catalog::builtin().expect("valid catalog");
        let err = catalog
            .product("Nu México", "Cajita turbo")
            .expect_err("case differs, must not match");
        assert!(matches!(err, CoreError::UnknownProduct { .. }));
        assert!(catalog.product("Nu", "Cajita Turbo").is_err());
    }

    #[test]
    fn eligibility_filters_memberships_and_exclusions() {
        let catalog = Catalog::builtin().expect("valid catalog");

        let open = catalog.eligible_products(&Eligibility::default());
        assert!(open.iter().all(|p| p.requires_membership.is_none()));
        assert!(open.iter().any(|p| p.name == "Cuenta Klar"));

        let mut eligibility = Eligibility::default();
        eligibility.capabilities.insert("Plus or Platinum".to_string());
        eligibility.excluded_institutions.insert("DiDi".to_string());
        let filtered = catalog.eligible_products(&eligibility);
        assert!(filtered.iter().any(|p| p.name == "Inversión Flexible Max"));
        assert!(filtered.iter().all(|p| p.institution != "DiDi"));
        assert!(!filtered.iter().any(|p| p.name == "Stori Cuenta+ (Con tarjeta)"));
    }

    #[test]
    fn from_json_rejects_invalid_products() {
        let json = r#"{
          "institutions": [
            { "name": "X", "products": [
              { "name": "Bad", "baseRate": 10, "kind": { "type": "hybrid-sight", "premiumRate": 12, "premiumCeiling": 0 } }
            ] }
          ]
        }"#;
        let err = Catalog::from_json(json).expect_err("zero ceiling is invalid");
        assert!(matches!(err, CoreError::InvalidCatalog(_)));
    }

    #[test]
    fn from_json_rejects_duplicates_and_garbage() {
        let json = r#"{
          "institutions": [
            { "name": "X", "products": [ { "name": "A", "baseRate": 1, "kind": { "type": "sight" } } ] },
            { "name": "X", "products": [ { "name": "B", "baseRate": 1, "kind": { "type": "sight" } } ] }
          ]
        }"#;
        assert!(Catalog::from_json(json).is_err());
        assert!(Catalog::from_json("not json").is_err());
    }

    #[test]
    fn from_json_defaults_label_to_name() {
        let json = r#"{
          "institutions": [
            { "name": "Solo", "products": [ { "name": "A", "baseRate": 3, "kind": { "type": "sight" } } ] }
          ]
        }"#;
        let catalog = Catalog::from_json(json).expect("valid");
        assert_eq!(catalog.institutions()[0].label, "Solo");
        assert_eq!(catalog.products().next().map(|p| p.institution.as_str()), Some("Solo"));
    }
}
