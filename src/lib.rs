#![forbid(unsafe_code)]
mod aircraft;
mod airports;
mod csv;
mod emissions;
pub mod error;
pub mod rungs;
pub mod serde;
pub mod shopping;
mod tables;
mod tool;
pub mod uncertainty;

pub use aircraft::*;
pub use airports::*;
pub use emissions::*;
pub use error::{Error, Result};
pub use rungs::Rung;
pub use shopping::{estimate_shopping, shopping_predict_carbon_footprint, Footprint, Scope};
pub use tables::*;
pub use tool::*;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Returns the distance between two geo-points (latitude, longitude in degrees) in km,
/// using the haversine formula
pub fn distance(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (phi1, phi2) = (from.0.to_radians(), to.0.to_radians());
    let d_phi = (to.0 - from.0).to_radians();
    let d_lambda = (to.1 - from.1).to_radians();
    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Rounds to 6 decimal places
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Non-fatal notes about inputs that were replaced by defaults.
///
/// Never affects a result; it only makes silent defaults visible to the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    messages: Vec<String>,
}

impl Diagnostics {
    /// Records that a documented fallback was used
    pub fn fallback(&mut self, message: String) {
        log::debug!("{message}");
        self.messages.push(message);
    }

    /// Records negative quantities, which are accepted as-is
    pub fn check_non_negative(&mut self, field: &str, value: f64) {
        if value < 0.0 {
            let message = format!("{field} is negative ({value}); accepted as-is");
            log::warn!("{message}");
            self.messages.push(message);
        }
    }

    #[cfg(test)]
    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<String> {
        self.messages
    }
}
