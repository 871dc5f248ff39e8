//! Footprint of a retail purchase over its life cycle.
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::Result,
    rungs::{self, Evidence, Rung},
    serde::{flag, list, number, optional, optional_number, optional_string, or_default},
    uncertainty::{self, Summary},
    Diagnostics, ReferenceTables,
};

/// kg CO2e per kg of a packaging material absent from the materials table
pub const GENERIC_PACKAGING_EF: f64 = 1.2;
/// kg CO2e per tonne-km of an unknown transport mode
pub const DEFAULT_TRANSPORT_EF: f64 = 0.12;
/// kg CO2e per kg of an unknown end-of-life pathway
pub const DEFAULT_END_OF_LIFE_EF: f64 = 0.02;
/// kg CO2e per kWh of an unspecified electricity grid
pub const DEFAULT_GRID_EF: f64 = 0.40;

/// Monte Carlo runs drawn at most, whatever `mc_runs` asks for
pub const MAX_MC_RUNS: usize = 100_000;
const KG_PER_TONNE: f64 = 1000.0;
const DAYS_PER_YEAR: f64 = 365.0;

/// Life-cycle stages included in a total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// production and packaging
    CradleToGate,
    /// [`Scope::CradleToGate`] plus logistics
    CradleToCustomer,
    /// everything, including use and end of life
    #[default]
    CradleToGrave,
}

impl Scope {
    /// Parses a scope selector; anything unrecognised is [`Scope::CradleToGrave`]
    pub fn parse(text: &str) -> Self {
        match crate::serde::normalize_key(text).as_str() {
            "cradle_to_gate" => Self::CradleToGate,
            "cradle_to_customer" => Self::CradleToCustomer,
            _ => Self::CradleToGrave,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialMass {
    #[serde(deserialize_with = "optional_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "number")]
    pub mass_kg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PackagingMass {
    #[serde(deserialize_with = "optional_string")]
    pub material: Option<String>,
    #[serde(deserialize_with = "number")]
    pub mass_kg: f64,
}

/// The purchased item
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Product {
    /// bill of materials
    #[serde(deserialize_with = "list")]
    pub materials: Vec<MaterialMass>,
    #[serde(deserialize_with = "list")]
    pub packaging: Vec<PackagingMass>,
    #[serde(deserialize_with = "number")]
    pub weight_kg: f64,
    /// free-text category, matched by keyword
    #[serde(deserialize_with = "optional_string")]
    pub category: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    pub price_value: Option<f64>,
    /// certified production emissions from an environmental product declaration
    #[serde(deserialize_with = "optional_number")]
    pub epd_hit_kgco2e: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EpdSettings {
    #[serde(deserialize_with = "flag")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Segment {
    #[serde(deserialize_with = "optional_string")]
    pub mode: Option<String>,
    #[serde(deserialize_with = "number")]
    pub distance_km: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogisticsProfile {
    #[serde(deserialize_with = "list")]
    pub segments: Vec<Segment>,
    #[serde(deserialize_with = "number")]
    pub shipped_mass_kg: f64,
    /// probability in [0, 1] that the item is shipped back
    #[serde(deserialize_with = "number")]
    pub return_probability: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UsePhaseProfile {
    #[serde(deserialize_with = "number")]
    pub years: f64,
    #[serde(deserialize_with = "optional_number")]
    pub grid_ef_kg_per_kwh: Option<f64>,
    /// annual consumption; takes precedence over `power_w` and `hours_per_day`
    #[serde(deserialize_with = "optional_number")]
    pub kwh_per_year: Option<f64>,
    #[serde(deserialize_with = "number")]
    pub power_w: f64,
    #[serde(deserialize_with = "number")]
    pub hours_per_day: f64,
}

impl UsePhaseProfile {
    /// Grid factor; a missing or zero factor is [`DEFAULT_GRID_EF`]
    pub fn grid_ef(&self) -> f64 {
        self.grid_ef_kg_per_kwh
            .filter(|ef| *ef != 0.0)
            .unwrap_or(DEFAULT_GRID_EF)
    }

    pub fn kwh_per_year(&self) -> f64 {
        self.kwh_per_year
            .unwrap_or(self.power_w / 1000.0 * self.hours_per_day * DAYS_PER_YEAR)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EndOfLifeShare {
    #[serde(deserialize_with = "optional_string")]
    pub pathway: Option<String>,
    #[serde(deserialize_with = "number")]
    pub fraction: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    #[serde(deserialize_with = "number")]
    pub mc_runs: f64,
    /// relative standard deviation of every component
    #[serde(deserialize_with = "number")]
    pub variation_pct: f64,
}

impl QualitySettings {
    /// Requested runs; fractions are truncated and negatives are 0
    pub fn runs(&self) -> usize {
        self.mc_runs.max(0.0) as usize
    }
}

/// Everything needed to estimate the footprint of a purchase
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShoppingPayload {
    #[serde(deserialize_with = "or_default")]
    pub product: Product,
    #[serde(deserialize_with = "optional_string")]
    pub scope: Option<String>,
    #[serde(deserialize_with = "or_default")]
    pub epd: EpdSettings,
    #[serde(deserialize_with = "or_default")]
    pub logistics: LogisticsProfile,
    #[serde(rename = "use", deserialize_with = "optional")]
    pub use_phase: Option<UsePhaseProfile>,
    #[serde(deserialize_with = "list")]
    pub eol: Vec<EndOfLifeShare>,
    #[serde(deserialize_with = "or_default")]
    pub quality: QualitySettings,
}

impl ShoppingPayload {
    /// # Error
    /// Errors if `value` is not a mapping
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(crate::serde::mapping(value)?)
    }

    pub fn scope(&self) -> Scope {
        self.scope.as_deref().map(Scope::parse).unwrap_or_default()
    }
}

/// The four life-cycle totals in kg CO2e
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Components {
    /// production including packaging
    pub production: f64,
    pub logistics: f64,
    pub use_phase: f64,
    pub end_of_life: f64,
}

impl Components {
    pub fn total(&self, scope: Scope) -> f64 {
        match scope {
            Scope::CradleToGate => self.production,
            Scope::CradleToCustomer => self.production + self.logistics,
            Scope::CradleToGrave => {
                self.production + self.logistics + self.use_phase + self.end_of_life
            }
        }
    }
}

/// A footprint estimate with its intermediate values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Footprint {
    /// the nominal total for `scope` in kg CO2e, rounded to 6 decimals
    pub total: f64,
    pub scope: Scope,
    /// the rung that resolved production, if any
    pub rung: Option<Rung>,
    pub production_core: f64,
    pub packaging: f64,
    pub components: Components,
    /// Monte Carlo spread; informative only, it never replaces `total`
    pub uncertainty: Option<Summary>,
    pub diagnostics: Vec<String>,
}

/// Sum of mass times packaging factor
pub fn packaging_kgco2e(
    packaging: &[PackagingMass],
    tables: &ReferenceTables,
    diagnostics: &mut Diagnostics,
) -> f64 {
    packaging
        .iter()
        .map(|item| {
            let material = item.material.as_deref().unwrap_or_default();
            let ef = tables.material(material).unwrap_or_else(|| {
                diagnostics.fallback(format!(
                    "packaging material '{material}' is unknown; using {GENERIC_PACKAGING_EF} kg CO2e/kg"
                ));
                GENERIC_PACKAGING_EF
            });
            diagnostics.check_non_negative("packaging.mass_kg", item.mass_kg);
            item.mass_kg * ef
        })
        .sum()
}

/// Freight emissions of all segments, scaled up by the chance of a return trip
pub fn logistics_kgco2e(
    logistics: &LogisticsProfile,
    tables: &ReferenceTables,
    diagnostics: &mut Diagnostics,
) -> f64 {
    if logistics.segments.is_empty() || logistics.shipped_mass_kg <= 0.0 {
        return 0.0;
    }
    let tonnes = logistics.shipped_mass_kg / KG_PER_TONNE;
    let base: f64 = logistics
        .segments
        .iter()
        .map(|segment| {
            let mode = segment.mode.as_deref().unwrap_or_default();
            let ef = tables.transport_mode(mode).unwrap_or_else(|| {
                diagnostics.fallback(format!(
                    "transport mode '{mode}' is unknown; using {DEFAULT_TRANSPORT_EF} kg CO2e/tkm"
                ));
                DEFAULT_TRANSPORT_EF
            });
            diagnostics.check_non_negative("segments.distance_km", segment.distance_km);
            tonnes * segment.distance_km * ef
        })
        .sum();
    base * (1.0 + logistics.return_probability.clamp(0.0, 1.0))
}

/// Electricity consumed over the years of use
pub fn use_phase_kgco2e(use_phase: Option<&UsePhaseProfile>) -> f64 {
    let Some(use_phase) = use_phase.filter(|u| u.years > 0.0) else {
        return 0.0;
    };
    use_phase.kwh_per_year() * use_phase.years * use_phase.grid_ef()
}

/// Disposal of the product; recycling carries a credit, so this may be negative
pub fn end_of_life_kgco2e(
    shares: &[EndOfLifeShare],
    weight_kg: f64,
    tables: &ReferenceTables,
    diagnostics: &mut Diagnostics,
) -> f64 {
    if weight_kg <= 0.0 {
        return 0.0;
    }
    shares
        .iter()
        .map(|share| {
            let pathway = share.pathway.as_deref().unwrap_or_default();
            let ef = tables.end_of_life(pathway).unwrap_or_else(|| {
                diagnostics.fallback(format!(
                    "end-of-life pathway '{pathway}' is unknown; using {DEFAULT_END_OF_LIFE_EF} kg CO2e/kg"
                ));
                DEFAULT_END_OF_LIFE_EF
            });
            weight_kg * share.fraction * ef
        })
        .sum()
}

/// Estimates the footprint of a purchase, drawing Monte Carlo samples from `rng`
/// when the payload asks for them.
pub fn estimate_shopping<R: Rng + ?Sized>(
    payload: &ShoppingPayload,
    tables: &ReferenceTables,
    rng: &mut R,
) -> Footprint {
    let mut diagnostics = Diagnostics::default();
    let product = &payload.product;
    let scope = payload.scope();
    diagnostics.check_non_negative("product.weight_kg", product.weight_kg);

    let evidence = Evidence {
        product,
        epd_enabled: payload.epd.enabled,
        tables,
    };
    let (rung, production_core) = match rungs::resolve(&evidence, &mut diagnostics) {
        Some((rung, value)) => (Some(rung), value),
        None => {
            diagnostics.fallback("no evidence for production emissions; using 0".to_string());
            (None, 0.0)
        }
    };
    let packaging = packaging_kgco2e(&product.packaging, tables, &mut diagnostics);

    let components = Components {
        production: production_core + packaging,
        logistics: logistics_kgco2e(&payload.logistics, tables, &mut diagnostics),
        use_phase: use_phase_kgco2e(payload.use_phase.as_ref()),
        end_of_life: end_of_life_kgco2e(&payload.eol, product.weight_kg, tables, &mut diagnostics),
    };
    let total = components.total(scope);

    let mut runs = payload.quality.runs();
    let variation = payload.quality.variation_pct;
    if runs > MAX_MC_RUNS && variation > 0.0 {
        diagnostics.fallback(format!(
            "{runs} Monte Carlo runs requested; drawing {MAX_MC_RUNS}"
        ));
        runs = MAX_MC_RUNS;
    }
    let uncertainty = (runs > 0 && variation > 0.0)
        .then(|| uncertainty::sample_totals(&components, scope, runs, variation, rng))
        .and_then(Summary::new);
    if let Some(summary) = &uncertainty {
        log::debug!(
            "{} Monte Carlo runs: mean {:.6}, p05 {:.6}, p95 {:.6} kg CO2e",
            summary.runs,
            summary.mean,
            summary.p05,
            summary.p95
        );
    }

    Footprint {
        total: crate::round6(total),
        scope,
        rung,
        production_core,
        packaging,
        components,
        uncertainty,
        diagnostics: diagnostics.into_messages(),
    }
}

/// Returns the footprint in kg CO2e of the purchase described by `payload`,
/// using the global reference tables and a thread-local random source.
/// # Error
/// Errors if `payload` is not a mapping
pub fn shopping_predict_carbon_footprint(payload: &Value) -> Result<f64> {
    let payload = ShoppingPayload::from_value(payload)?;
    Ok(estimate_shopping(&payload, ReferenceTables::global(), &mut rand::thread_rng()).total)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    fn estimate(payload: Value) -> Footprint {
        let payload = ShoppingPayload::from_value(&payload).unwrap();
        estimate_shopping(
            &payload,
            ReferenceTables::global(),
            &mut StdRng::seed_from_u64(0),
        )
    }

    #[test]
    fn scope_parsing() {
        assert_eq!(Scope::parse("Cradle_To_Gate"), Scope::CradleToGate);
        assert_eq!(Scope::parse("cradle_to_customer"), Scope::CradleToCustomer);
        assert_eq!(Scope::parse("cradle_to_grave"), Scope::CradleToGrave);
        assert_eq!(Scope::parse("whatever"), Scope::CradleToGrave);
    }

    #[test]
    fn packaging_is_additive() {
        let f = estimate(json!({
            "product": {
                "materials": [{"name": "steel", "mass_kg": 2.0}],
                "packaging": [
                    {"material": "cardboard", "mass_kg": 0.5},
                    {"material": "bubble_wrap", "mass_kg": 0.1},
                ],
            },
            "scope": "cradle_to_gate",
        }));
        assert_eq!(f.rung, Some(Rung::BillOfMaterials));
        assert_eq!(f.production_core, 4.0);
        assert_eq!(f.packaging, 0.5 * 0.8 + 0.1 * 1.2);
        assert_eq!(f.total, crate::round6(4.0 + 0.5 * 0.8 + 0.1 * 1.2));
    }

    #[test]
    fn logistics_with_return_risk() {
        let mut d = Diagnostics::default();
        let logistics = LogisticsProfile {
            segments: vec![
                Segment {
                    mode: Some("Truck".to_string()),
                    distance_km: 500.0,
                },
                Segment {
                    mode: Some("hyperloop".to_string()),
                    distance_km: 100.0,
                },
            ],
            shipped_mass_kg: 2000.0,
            return_probability: 3.0,
        };
        let tables = ReferenceTables::global();
        let base = 2.0 * 500.0 * 0.12 + 2.0 * 100.0 * 0.12;
        // clamped to 1
        assert_eq!(logistics_kgco2e(&logistics, tables, &mut d), base * 2.0);
        assert_eq!(d.messages().len(), 1);

        let logistics = LogisticsProfile {
            shipped_mass_kg: 0.0,
            ..logistics
        };
        assert_eq!(logistics_kgco2e(&logistics, tables, &mut d), 0.0);
    }

    #[test]
    fn use_phase() {
        assert_eq!(use_phase_kgco2e(None), 0.0);
        let profile = UsePhaseProfile {
            years: 2.0,
            kwh_per_year: Some(100.0),
            power_w: 1000.0,
            hours_per_day: 24.0,
            ..Default::default()
        };
        assert_eq!(use_phase_kgco2e(Some(&profile)), 100.0 * 2.0 * 0.40);

        let profile = UsePhaseProfile {
            kwh_per_year: None,
            power_w: 100.0,
            hours_per_day: 2.0,
            grid_ef_kg_per_kwh: Some(0.5),
            ..profile
        };
        assert_eq!(
            use_phase_kgco2e(Some(&profile)),
            100.0 / 1000.0 * 2.0 * 365.0 * 2.0 * 0.5
        );

        let profile = UsePhaseProfile {
            years: 0.0,
            ..profile
        };
        assert_eq!(use_phase_kgco2e(Some(&profile)), 0.0);
    }

    #[test]
    fn end_of_life_mix() {
        let mut d = Diagnostics::default();
        let shares = vec![
            EndOfLifeShare {
                pathway: Some("landfill".to_string()),
                fraction: 0.5,
            },
            EndOfLifeShare {
                pathway: Some("Incineration".to_string()),
                fraction: 0.5,
            },
        ];
        let tables = ReferenceTables::global();
        assert_eq!(
            end_of_life_kgco2e(&shares, 4.0, tables, &mut d),
            4.0 * 0.5 * 0.02 + 4.0 * 0.5 * 0.70
        );
        assert_eq!(end_of_life_kgco2e(&shares, 0.0, tables, &mut d), 0.0);
    }

    #[test]
    fn unknown_pathway_uses_default_factor() {
        let mut d = Diagnostics::default();
        let shares = vec![EndOfLifeShare {
            pathway: Some("composting".to_string()),
            fraction: 0.5,
        }];
        assert_eq!(
            end_of_life_kgco2e(&shares, 10.0, ReferenceTables::global(), &mut d),
            10.0 * 0.5 * DEFAULT_END_OF_LIFE_EF
        );
        assert_eq!(d.messages().len(), 1);

        let f = estimate(json!({
            "product": {"weight_kg": 10},
            "eol": [{"pathway": "composting", "fraction": 0.5}],
        }));
        assert_eq!(f.components.end_of_life, 10.0 * 0.5 * 0.02);
        assert!(f.diagnostics.iter().any(|m| m.contains("'composting'")));
    }

    #[test]
    fn scopes_select_components() {
        let payload = json!({
            "product": {"weight_kg": 1.0, "category": "toy"},
            "logistics": {
                "segments": [{"mode": "air", "distance_km": 1000}],
                "shipped_mass_kg": 1.0,
            },
            "use": {"years": 1, "kwh_per_year": 10},
            "eol": [{"pathway": "landfill", "fraction": 1.0}],
        });
        let f = estimate(payload.clone());
        assert_eq!(f.scope, Scope::CradleToGrave);
        assert_eq!(f.components.production, 4.0);
        assert_eq!(f.components.logistics, 0.001 * 1000.0 * 0.90);
        assert_eq!(f.components.use_phase, 10.0 * 1.0 * 0.40);
        assert_eq!(f.components.end_of_life, 1.0 * 1.0 * 0.02);
        assert_eq!(
            f.total,
            crate::round6(4.0 + 0.001 * 1000.0 * 0.90 + 10.0 * 0.40 + 0.02)
        );

        let mut gate = payload.clone();
        gate["scope"] = json!("cradle_to_gate");
        assert_eq!(estimate(gate).total, 4.0);

        let mut customer = payload;
        customer["scope"] = json!("cradle_to_customer");
        assert_eq!(estimate(customer).total, crate::round6(4.0 + 0.9));
    }

    #[test]
    fn no_evidence_is_zero() {
        let f = estimate(json!({}));
        assert_eq!(f.total, 0.0);
        assert_eq!(f.rung, None);
        assert!(!f.diagnostics.is_empty());
    }

    #[test]
    fn monte_carlo_does_not_change_total() {
        let payload = json!({
            "product": {"materials": [{"name": "copper", "mass_kg": 1.5}]},
            "quality": {"mc_runs": 200, "variation_pct": 0.25},
        });
        let f = estimate(payload);
        assert_eq!(f.total, 6.0);
        let summary = f.uncertainty.unwrap();
        assert_eq!(summary.runs, 200);
        assert!(summary.min > 0.0 && summary.min <= summary.max);
    }

    #[test]
    fn monte_carlo_runs_are_capped() {
        let payload = json!({
            "product": {"materials": [{"name": "steel", "mass_kg": 1}]},
            "quality": {"mc_runs": 1e19, "variation_pct": 0.1},
        });
        let f = estimate(payload.clone());
        assert_eq!(f.total, 2.0);
        assert_eq!(f.uncertainty.unwrap().runs, MAX_MC_RUNS);
        assert!(f.diagnostics.iter().any(|m| m.contains("Monte Carlo")));

        let total = shopping_predict_carbon_footprint(&payload).unwrap();
        assert_eq!(total, 2.0);
    }

    #[test]
    fn not_a_mapping() {
        assert!(ShoppingPayload::from_value(&json!([1, 2])).is_err());
    }
}
