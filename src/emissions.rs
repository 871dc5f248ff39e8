use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{Error, Result},
    serde::{list, optional_number, optional_string},
    Diagnostics, ReferenceTables,
};

// see https://www.iata.org/en/services/statistics/intelligence/co2-connect/iata-co2-connect-passenger-calculator/calculator-faq/
const FUEL_TO_CO2: f64 = 3.16; // kg CO2 / kg fuel
const RADIATIVE_INDEX: f64 = 1.3;
const LOAD_FACTOR: f64 = 0.85;
const BLOCK_SPEED_KMH: f64 = 900.0;
const FALLBACK_ECONOMY_EF: f64 = 0.09; // kg CO2 / pax-km

/// Cabin class of the passengers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CabinClass {
    #[default]
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl CabinClass {
    /// Parses `economy`, `premium_economy` (also `premium-economy`, `Premium Economy`),
    /// `business` or `first`.
    pub fn parse(text: &str) -> Option<Self> {
        match crate::serde::normalize_key(text)
            .replace(['-', ' '], "_")
            .as_str()
        {
            "economy" => Some(Self::Economy),
            "premium_economy" => Some(Self::PremiumEconomy),
            "business" => Some(Self::Business),
            "first" => Some(Self::First),
            _ => None,
        }
    }

    /// Share of the aircraft allocated to a seat relative to economy
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Economy => 1.0,
            Self::PremiumEconomy => 1.5,
            Self::Business => 2.5,
            Self::First => 3.5,
        }
    }
}

/// Represents a leg, also known as a [non-stop flight](https://en.wikipedia.org/wiki/Non-stop_flight)
/// between two airports.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FlightLeg {
    #[serde(deserialize_with = "optional_string")]
    pub origin_iata: Option<String>,
    #[serde(deserialize_with = "optional_string")]
    pub destination_iata: Option<String>,
    /// the ICAO type designator (e.g. `A320`)
    #[serde(deserialize_with = "optional_string")]
    pub aircraft_icao: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    pub block_time_minutes: Option<f64>,
}

impl FlightLeg {
    /// Gate-to-gate hours, when stated
    pub fn block_hours(&self) -> Option<f64> {
        self.block_time_minutes.map(|minutes| minutes / 60.0)
    }
}

/// A trip of one or more legs flown by the same party
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(from = "ItineraryFields")]
pub struct FlightItinerary {
    pub cabin_class: Option<String>,
    pub num_passengers: Option<f64>,
    pub legs: Vec<FlightLeg>,
}

/// An itinerary as written in a payload, where the legs may be under `legs` or
/// `itinerary`. `legs` wins when both are present.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ItineraryFields {
    #[serde(deserialize_with = "optional_string")]
    cabin_class: Option<String>,
    #[serde(deserialize_with = "optional_number")]
    num_passengers: Option<f64>,
    #[serde(deserialize_with = "legs")]
    legs: Option<Vec<FlightLeg>>,
    #[serde(deserialize_with = "legs")]
    itinerary: Option<Vec<FlightLeg>>,
}

impl From<ItineraryFields> for FlightItinerary {
    fn from(fields: ItineraryFields) -> Self {
        Self {
            cabin_class: fields.cabin_class,
            num_passengers: fields.num_passengers,
            legs: fields.legs.or(fields.itinerary).unwrap_or_default(),
        }
    }
}

/// Like [`list`], but items that are not legs still count, as legs without airports.
/// `null` is `None`, so that it does not shadow the other key.
fn legs<'de, D: serde::Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<FlightLeg>>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        value => Some(
            list::<_, Value>(value)
                .unwrap_or_default()
                .into_iter()
                .map(|leg| serde_json::from_value(leg).unwrap_or_default())
                .collect(),
        ),
    })
}

impl FlightItinerary {
    /// # Error
    /// Errors if `value` is not a mapping
    pub fn from_value(value: &Value) -> Result<Self> {
        Ok(crate::serde::mapping(value)?)
    }

    /// Number of passengers; anything below one or unreadable is one
    pub fn passengers(&self) -> u32 {
        self.num_passengers
            .map(|n| n.trunc().clamp(1.0, u32::MAX as f64) as u32)
            .unwrap_or(1)
    }
}

/// How the emissions of a leg were computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// fuel burn of a known aircraft over the block time
    FuelBurn,
    /// great-circle distance times an average factor per passenger-km
    Distance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegEstimate {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
    pub block_hours: f64,
    pub method: Method,
    /// kg CO2e of all passengers on this leg
    pub kgco2e: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlightEstimate {
    /// kg CO2e of all passengers over all legs
    pub total: f64,
    pub cabin_class: CabinClass,
    pub passengers: u32,
    pub legs: Vec<LegEstimate>,
    pub diagnostics: Vec<String>,
}

/// Returns per-passenger emissions of burning `fuel_kg` shared by `occupied_seats`, in kg of eCO2.
fn fuel_burn_emissions(fuel_kg: f64, occupied_seats: f64, class: CabinClass) -> f64 {
    let co2 = fuel_kg * FUEL_TO_CO2;
    let per_passenger = co2 / occupied_seats;
    per_passenger * class.multiplier() * RADIATIVE_INDEX
}

/// Returns per-passenger emissions over `distance` km using the average factor, in kg of eCO2.
fn distance_emissions(distance: f64, class: CabinClass) -> f64 {
    distance * (FALLBACK_ECONOMY_EF * class.multiplier()) * RADIATIVE_INDEX
}

fn estimate_leg(
    index: usize,
    leg: &FlightLeg,
    class: CabinClass,
    passengers: u32,
    tables: &ReferenceTables,
    diagnostics: &mut Diagnostics,
) -> Result<LegEstimate> {
    let origin = leg
        .origin_iata
        .as_deref()
        .ok_or(Error::MissingAirport {
            leg: index,
            field: "origin_iata",
        })?
        .to_uppercase();
    let destination = leg
        .destination_iata
        .as_deref()
        .ok_or(Error::MissingAirport {
            leg: index,
            field: "destination_iata",
        })?
        .to_uppercase();

    let distance_km = crate::airports::airport_distance(&origin, &destination, tables)
        .unwrap_or_else(|| {
            diagnostics.fallback(format!(
                "leg {index}: no coordinates for {origin}-{destination}; distance is 0 km"
            ));
            0.0
        });

    let block_hours = match leg.block_hours() {
        Some(hours) => hours,
        None if distance_km > 0.0 => distance_km / BLOCK_SPEED_KMH,
        None => 0.0,
    };

    let aircraft = leg.aircraft_icao.as_deref().and_then(|icao| {
        let profile = tables.aircraft(icao);
        if profile.is_none() {
            diagnostics.fallback(format!("leg {index}: aircraft '{icao}' is unknown"));
        }
        profile
    });

    let (method, per_passenger) = match aircraft {
        Some(profile) if block_hours > 0.0 => (
            Method::FuelBurn,
            fuel_burn_emissions(
                profile.fuel_kg(block_hours),
                profile.occupied_seats(LOAD_FACTOR),
                class,
            ),
        ),
        _ => (Method::Distance, distance_emissions(distance_km, class)),
    };
    let kgco2e = per_passenger * passengers as f64;
    log::debug!("leg {index} {origin}-{destination}: {method:?}, {kgco2e} kg CO2e");

    Ok(LegEstimate {
        origin,
        destination,
        distance_km,
        block_hours,
        method,
        kgco2e,
    })
}

/// Estimates the emissions of all passengers over all legs of `itinerary`.
/// # Error
/// Errors if a leg is missing its origin or destination airport code
pub fn estimate_flight(
    itinerary: &FlightItinerary,
    tables: &ReferenceTables,
) -> Result<FlightEstimate> {
    let mut diagnostics = Diagnostics::default();
    let cabin_class = match itinerary.cabin_class.as_deref() {
        None => CabinClass::Economy,
        Some(text) => CabinClass::parse(text).unwrap_or_else(|| {
            diagnostics.fallback(format!("cabin class '{text}' is unknown; using economy"));
            CabinClass::Economy
        }),
    };
    let passengers = itinerary.passengers();

    let legs = itinerary
        .legs
        .iter()
        .enumerate()
        .map(|(index, leg)| {
            estimate_leg(index, leg, cabin_class, passengers, tables, &mut diagnostics)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(FlightEstimate {
        total: legs.iter().fold(0.0, |total, leg| total + leg.kgco2e),
        cabin_class,
        passengers,
        legs,
        diagnostics: diagnostics.into_messages(),
    })
}

/// Returns the emissions in kg CO2e of all passengers of the itinerary described
/// by `payload`, using the global reference tables.
/// # Error
/// Errors if `payload` is not a mapping or a leg is missing an airport code
pub fn get_flight_emissions(payload: &Value) -> Result<f64> {
    let itinerary = FlightItinerary::from_value(payload)?;
    Ok(estimate_flight(&itinerary, ReferenceTables::global())?.total)
}
