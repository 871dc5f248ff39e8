use std::str::FromStr;

use rand::Rng;
use serde_json::Value;

use crate::{
    emissions::{estimate_flight, FlightItinerary},
    error::{Error, Result},
    shopping::{estimate_shopping, ShoppingPayload},
    ReferenceTables,
};

/// The estimators a caller can invoke by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Shopping,
    Flight,
}

impl Tool {
    pub const ALL: [Tool; 2] = [Tool::Shopping, Tool::Flight];

    /// The name under which the tool is registered
    pub fn name(&self) -> &'static str {
        match self {
            Self::Shopping => "shopping_predict_carbon_footprint",
            Self::Flight => "get_flight_emissions",
        }
    }

    /// Runs the tool on a JSON payload and returns kg CO2e.
    /// # Error
    /// Errors if `payload` is not a mapping or the estimator rejects it
    pub fn call<R: Rng + ?Sized>(
        &self,
        payload: &Value,
        tables: &ReferenceTables,
        rng: &mut R,
    ) -> Result<f64> {
        log::info!("calling {}", self.name());
        match self {
            Self::Shopping => {
                let payload = ShoppingPayload::from_value(payload)?;
                Ok(estimate_shopping(&payload, tables, rng).total)
            }
            Self::Flight => {
                let itinerary = FlightItinerary::from_value(payload)?;
                Ok(estimate_flight(&itinerary, tables)?.total)
            }
        }
    }
}

impl FromStr for Tool {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.name() == name.trim())
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
