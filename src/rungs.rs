//! Production emissions, resolved through evidence rungs of decreasing quality.
//!
//! The rungs are tried in [`RUNGS`] order and the first one with enough evidence
//! wins; lower rungs are never consulted once a higher one resolves.
use serde::{Deserialize, Serialize};

use crate::{shopping::Product, Diagnostics, ReferenceTables};

/// kg CO2e per kg of a material absent from the materials table
pub const GENERIC_MATERIAL_EF: f64 = 2.0;
/// kg CO2e per kg of a matched category without a mass factor
pub const DEFAULT_CATEGORY_MASS_EF: f64 = 5.0;
/// kg CO2e per unit of currency when the category has no spend factor
pub const DEFAULT_SPEND_EF: f64 = 0.45;

/// One tier of the production-emissions fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rung {
    /// A: certified value from an environmental product declaration
    Certified,
    /// B: bill of materials
    BillOfMaterials,
    /// C: product mass times a category factor
    CategoryMass,
    /// D: price times a category spend factor
    CategorySpend,
}

/// What the rungs may draw on
pub struct Evidence<'a> {
    pub product: &'a Product,
    /// whether certified values may be used at all
    pub epd_enabled: bool,
    pub tables: &'a ReferenceTables,
}

type Resolver = fn(&Evidence, &mut Diagnostics) -> Option<f64>;

/// The rungs in strict precedence order
pub const RUNGS: [(Rung, Resolver); 4] = [
    (Rung::Certified, certified),
    (Rung::BillOfMaterials, bill_of_materials),
    (Rung::CategoryMass, category_mass),
    (Rung::CategorySpend, category_spend),
];

/// Returns the first rung that resolves and its production emissions in kg CO2e,
/// or `None` when there is no evidence at all.
pub fn resolve(evidence: &Evidence, diagnostics: &mut Diagnostics) -> Option<(Rung, f64)> {
    RUNGS.iter().find_map(|(rung, resolver)| {
        let value = resolver(evidence, diagnostics)?;
        log::debug!("production resolved by {rung:?}: {value} kg CO2e");
        Some((*rung, value))
    })
}

/// Rung A: the certified value, verbatim
pub fn certified(evidence: &Evidence, _: &mut Diagnostics) -> Option<f64> {
    evidence
        .epd_enabled
        .then_some(evidence.product.epd_hit_kgco2e)
        .flatten()
}

/// Rung B: sum of mass times material factor over the bill of materials
pub fn bill_of_materials(evidence: &Evidence, diagnostics: &mut Diagnostics) -> Option<f64> {
    let materials = &evidence.product.materials;
    if materials.is_empty() {
        return None;
    }
    Some(
        materials
            .iter()
            .map(|material| {
                let name = material.name.as_deref().unwrap_or_default();
                let ef = evidence.tables.material(name).unwrap_or_else(|| {
                    diagnostics.fallback(format!(
                        "material '{name}' is unknown; using {GENERIC_MATERIAL_EF} kg CO2e/kg"
                    ));
                    GENERIC_MATERIAL_EF
                });
                diagnostics.check_non_negative("materials.mass_kg", material.mass_kg);
                material.mass_kg * ef
            })
            .sum(),
    )
}

/// Rung C: product mass times the factor of a recognised category
pub fn category_mass(evidence: &Evidence, diagnostics: &mut Diagnostics) -> Option<f64> {
    let product = evidence.product;
    if product.weight_kg <= 0.0 {
        return None;
    }
    let category = evidence.tables.category(product.category.as_deref()?)?;
    let ef = category.mass_kgco2e_per_kg.unwrap_or_else(|| {
        diagnostics.fallback(format!(
            "category '{}' has no mass factor; using {DEFAULT_CATEGORY_MASS_EF} kg CO2e/kg",
            category.category
        ));
        DEFAULT_CATEGORY_MASS_EF
    });
    Some(product.weight_kg * ef)
}

/// Rung D: price times the spend factor of the category
pub fn category_spend(evidence: &Evidence, diagnostics: &mut Diagnostics) -> Option<f64> {
    let product = evidence.product;
    let price = product.price_value?;
    let ef = product
        .category
        .as_deref()
        .and_then(|text| evidence.tables.category(text))
        .and_then(|category| category.spend_kgco2e_per_unit)
        .unwrap_or_else(|| {
            diagnostics.fallback(format!(
                "no spend factor for category {:?}; using {DEFAULT_SPEND_EF} kg CO2e/unit",
                product.category.as_deref().unwrap_or_default()
            ));
            DEFAULT_SPEND_EF
        });
    diagnostics.check_non_negative("product.price_value", price);
    Some(price * ef)
}
