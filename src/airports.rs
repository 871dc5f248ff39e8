use serde::Deserialize;

use crate::ReferenceTables;

/// An airport with known coordinates, keyed by its IATA code
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Airport {
    /// the IATA code (e.g. `JFK`)
    pub iata: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

impl Airport {
    pub fn pos(&self) -> (f64, f64) {
        (self.latitude_deg, self.longitude_deg)
    }

    /// Returns the great-circle distance to another [`Airport`] in km
    pub fn distance(&self, other: &Self) -> f64 {
        super::distance(self.pos(), other.pos())
    }
}

/// Returns the great-circle distance in km between two IATA codes, or `None`
/// when either airport is not in the coordinate table.
pub fn airport_distance(origin: &str, destination: &str, tables: &ReferenceTables) -> Option<f64> {
    let origin = tables.airport(origin)?;
    let destination = tables.airport(destination)?;
    Some(origin.distance(destination))
}
