use serde::Deserialize;

/// In-memory representation of the fuel burn of an aircraft type
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AircraftProfile {
    /// the ICAO type designator (e.g. `A320`)
    pub icao: String,
    /// block fuel burn in kg per hour
    pub fuel_kg_h: f64,
    /// typical number of seats in a commercial configuration
    pub typical_seats: u32,
}

impl AircraftProfile {
    /// Fuel burned in kg over a block of `hours`
    pub fn fuel_kg(&self, hours: f64) -> f64 {
        self.fuel_kg_h * hours
    }

    /// Number of occupied seats at a given load factor
    pub fn occupied_seats(&self, load_factor: f64) -> f64 {
        self.typical_seats as f64 * load_factor
    }
}
