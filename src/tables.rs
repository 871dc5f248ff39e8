//! Emission factor reference tables.
//!
//! Tables are read once from CSV and never mutated afterwards. The default set is
//! embedded at compile time; a directory with files of the same names can replace
//! any of them (e.g. a regional grid or a different factor database).
use std::{borrow::Cow, path::Path};

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::{
    csv::{self, Table},
    error::{Error, Result},
    serde::normalize_key,
    AircraftProfile, Airport,
};

static MATERIALS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/materials.csv"));
static TRANSPORT_MODES: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/src/transport_modes.csv"
));
static CATEGORIES: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/categories.csv"));
static END_OF_LIFE: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/end_of_life.csv"));
static AIRCRAFT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/aircraft.csv"));
static AIRPORTS: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/src/airports.csv"));

static GLOBAL: Lazy<ReferenceTables> = Lazy::new(|| {
    ReferenceTables::embedded().expect("embedded reference tables to be well-formed")
});

/// Material names that all resolve to the shared corrugated board factor
const CORRUGATE_ALIASES: [&str; 3] = ["cardboard", "corrugated_cardboard", "corrugate"];
const CORRUGATE: &str = "corrugate";

#[derive(Debug, Deserialize, Clone)]
struct MaterialFactor {
    name: String,
    kgco2e_per_kg: f64,
}

#[derive(Debug, Deserialize, Clone)]
struct TransportFactor {
    mode: String,
    kgco2e_per_tkm: f64,
}

/// Emission factors of a product category
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CategoryFactor {
    /// the keyword matched against free-text categories (e.g. `electronics`)
    pub category: String,
    /// kg CO2e per kg of product, when known
    pub mass_kgco2e_per_kg: Option<f64>,
    /// kg CO2e per unit of currency spent, when known
    pub spend_kgco2e_per_unit: Option<f64>,
}

#[derive(Debug, Deserialize, Clone)]
struct EndOfLifeFactor {
    pathway: String,
    kgco2e_per_kg: f64,
}

/// The complete, immutable set of lookup tables used by the estimators.
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    materials: Table<String, MaterialFactor>,
    transport_modes: Table<String, TransportFactor>,
    categories: Table<String, CategoryFactor>,
    end_of_life: Table<String, EndOfLifeFactor>,
    aircraft: Table<String, AircraftProfile>,
    airports: Table<String, Airport>,
}

impl ReferenceTables {
    /// The process-wide tables built from the embedded CSVs on first use.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Parses the tables shipped with the crate.
    /// # Error
    /// Errors if an embedded table is malformed
    pub fn embedded() -> Result<Self> {
        Self::load(None)
    }

    /// Loads tables from `dir`, using the embedded table for every file that
    /// does not exist there.
    /// # Error
    /// Errors if a file exists but cannot be read or parsed
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(dir.as_ref()))
    }

    fn load(dir: Option<&Path>) -> Result<Self> {
        let tables = Self {
            materials: csv::load(
                "materials",
                &read(dir, "materials.csv", MATERIALS)?,
                |mut f: MaterialFactor| {
                    f.name = normalize_key(&f.name);
                    (f.name.clone(), f)
                },
            )?,
            transport_modes: csv::load(
                "transport_modes",
                &read(dir, "transport_modes.csv", TRANSPORT_MODES)?,
                |mut f: TransportFactor| {
                    f.mode = normalize_key(&f.mode);
                    (f.mode.clone(), f)
                },
            )?,
            categories: csv::load(
                "categories",
                &read(dir, "categories.csv", CATEGORIES)?,
                |mut f: CategoryFactor| {
                    f.category = normalize_key(&f.category);
                    (f.category.clone(), f)
                },
            )?,
            end_of_life: csv::load(
                "end_of_life",
                &read(dir, "end_of_life.csv", END_OF_LIFE)?,
                |mut f: EndOfLifeFactor| {
                    f.pathway = normalize_key(&f.pathway);
                    (f.pathway.clone(), f)
                },
            )?,
            aircraft: csv::load(
                "aircraft",
                &read(dir, "aircraft.csv", AIRCRAFT)?,
                |mut a: AircraftProfile| {
                    a.icao = normalize_code(&a.icao);
                    (a.icao.clone(), a)
                },
            )?,
            airports: csv::load(
                "airports",
                &read(dir, "airports.csv", AIRPORTS)?,
                |mut a: Airport| {
                    a.iata = normalize_code(&a.iata);
                    (a.iata.clone(), a)
                },
            )?,
        };
        log::debug!(
            "reference tables: {} materials, {} transport modes, {} categories, {} end-of-life pathways, {} aircraft, {} airports",
            tables.materials.len(),
            tables.transport_modes.len(),
            tables.categories.len(),
            tables.end_of_life.len(),
            tables.aircraft.len(),
            tables.airports.len(),
        );
        Ok(tables)
    }

    /// kg CO2e per kg of a material. Cardboard-family names share the corrugate factor.
    pub fn material(&self, name: &str) -> Option<f64> {
        let name = normalize_key(name);
        self.materials
            .get(&name)
            .or_else(|| {
                CORRUGATE_ALIASES
                    .contains(&name.as_str())
                    .then(|| self.materials.get(&CORRUGATE.to_string()))
                    .flatten()
            })
            .map(|f| f.kgco2e_per_kg)
    }

    /// kg CO2e per tonne-km of a transport mode
    pub fn transport_mode(&self, mode: &str) -> Option<f64> {
        self.transport_modes
            .get(&normalize_key(mode))
            .map(|f| f.kgco2e_per_tkm)
    }

    /// The first category, in table order, whose keyword is contained in `text`
    pub fn category(&self, text: &str) -> Option<&CategoryFactor> {
        let text = normalize_key(text);
        if text.is_empty() {
            return None;
        }
        self.categories
            .iter()
            .find(|(key, _)| text.contains(key.as_str()))
            .map(|(_, factor)| factor)
    }

    /// kg CO2e per kg of product sent down an end-of-life pathway
    pub fn end_of_life(&self, pathway: &str) -> Option<f64> {
        self.end_of_life
            .get(&normalize_key(pathway))
            .map(|f| f.kgco2e_per_kg)
    }

    /// The fuel-burn profile of an aircraft type designator (e.g. `A320`)
    pub fn aircraft(&self, icao: &str) -> Option<&AircraftProfile> {
        self.aircraft.get(&normalize_code(icao))
    }

    /// The coordinates of an IATA airport code (e.g. `JFK`)
    pub fn airport(&self, iata: &str) -> Option<&Airport> {
        self.airports.get(&normalize_code(iata))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn read(dir: Option<&Path>, file: &str, embedded: &'static str) -> Result<Cow<'static, [u8]>> {
    let Some(path) = dir.map(|dir| dir.join(file)).filter(|path| path.exists()) else {
        return Ok(Cow::Borrowed(embedded.as_bytes()));
    };
    log::info!("loading {}", path.display());
    std::fs::read(&path)
        .map(Cow::Owned)
        .map_err(|source| Error::Io {
            path: path.display().to_string(),
            source,
        })
}
