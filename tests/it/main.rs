use std::error::Error;

use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};

use footprint::{shopping::ShoppingPayload, ReferenceTables, Rung, Scope, Tool};

fn abs_difference<T: std::ops::Sub<Output = T> + PartialOrd>(x: T, y: T) -> T {
    if x < y {
        y - x
    } else {
        x - y
    }
}

fn shopping(payload: &Value, seed: u64) -> footprint::Footprint {
    let payload = ShoppingPayload::from_value(payload).unwrap();
    footprint::estimate_shopping(
        &payload,
        ReferenceTables::global(),
        &mut StdRng::seed_from_u64(seed),
    )
}

/// Bill of materials only: 2 kg of steel at 2.0 kg CO2e/kg
#[test]
fn acceptance_bill_of_materials() -> Result<(), Box<dyn Error>> {
    let payload = json!({
        "product": {"materials": [{"name": "steel", "mass_kg": 2.0}], "packaging": []},
        "scope": "cradle_to_gate",
    });
    assert_eq!(footprint::shopping_predict_carbon_footprint(&payload)?, 4.0);
    Ok(())
}

/// Category mass: 5 kg of electronics at 10.0 kg CO2e/kg
#[test]
fn acceptance_category_mass() -> Result<(), Box<dyn Error>> {
    let payload = json!({
        "product": {"category": "electronics", "weight_kg": 5},
        "scope": "cradle_to_gate",
    });
    assert_eq!(footprint::shopping_predict_carbon_footprint(&payload)?, 50.0);
    assert_eq!(shopping(&payload, 0).rung, Some(Rung::CategoryMass));
    Ok(())
}

/// Fuel burn of an A320 over a 7 h block, one economy passenger
#[test]
fn acceptance_fuel_burn() -> Result<(), Box<dyn Error>> {
    let payload = json!({
        "cabin_class": "economy",
        "num_passengers": 1,
        "legs": [{
            "origin_iata": "JFK",
            "destination_iata": "LHR",
            "aircraft_icao": "A320",
            "block_time_minutes": 420,
        }],
    });
    let expected = 2430.0 * 7.0 * 3.16 / (150.0 * 0.85) * 1.0 * 1.3;
    assert_eq!(footprint::get_flight_emissions(&payload)?, expected);
    Ok(())
}

/// Recycling is an avoided burden, so the end of life may be a credit
#[test]
fn acceptance_recycling_credit() {
    let payload = json!({
        "product": {"weight_kg": 10},
        "eol": [{"pathway": "recycling", "fraction": 1.0}],
    });
    let f = shopping(&payload, 0);
    assert!(abs_difference(f.components.end_of_life, -3.0) < 1e-12);
    assert_eq!(f.total, -3.0);
}

#[test]
fn haversine_jfk_lhr() {
    let d = footprint::airport_distance("JFK", "LHR", ReferenceTables::global()).unwrap();
    assert!(abs_difference(d, 5540.0) < 50.0);
}

#[test]
fn certified_value_takes_precedence() {
    let payload = json!({
        "product": {
            "epd_hit_kgco2e": 1.25,
            "materials": [{"name": "aluminum", "mass_kg": 3.0}],
        },
        "epd": {"enabled": true},
        "scope": "cradle_to_gate",
    });
    let f = shopping(&payload, 0);
    assert_eq!(f.rung, Some(Rung::Certified));
    assert_eq!(f.production_core, 1.25);
    assert_eq!(f.total, 1.25);

    // the flag gates the certified value
    let mut disabled = payload;
    disabled["epd"]["enabled"] = json!(false);
    assert_eq!(shopping(&disabled, 0).total, 27.0);
}

#[test]
fn scopes_are_monotonic() {
    let payload = json!({
        "product": {
            "materials": [{"name": "pet", "mass_kg": 0.3}, {"name": "lithium_ion_battery", "mass_kg": 0.05}],
            "packaging": [{"material": "corrugate", "mass_kg": 0.2}],
            "weight_kg": 0.35,
        },
        "logistics": {
            "segments": [{"mode": "ocean", "distance_km": 12000}, {"mode": "van", "distance_km": 40}],
            "shipped_mass_kg": 0.55,
            "return_probability": 0.1,
        },
        "use": {"years": 3, "power_w": 5, "hours_per_day": 2},
        "eol": [{"pathway": "landfill", "fraction": 0.6}, {"pathway": "incineration", "fraction": 0.4}],
    });
    let total = |scope: &str| {
        let mut payload = payload.clone();
        payload["scope"] = json!(scope);
        shopping(&payload, 0).total
    };
    let gate = total("cradle_to_gate");
    let customer = total("cradle_to_customer");
    let grave = total("cradle_to_grave");
    assert!(gate <= customer, "{gate} > {customer}");
    assert!(customer <= grave, "{customer} > {grave}");
    assert!(gate > 0.0);
}

#[test]
fn estimates_are_deterministic() {
    let payload = json!({
        "product": {"category": "Apparel / Jackets", "price_value": "79.90"},
        "logistics": {"segments": [{"mode": "truck", "distance_km": 300}], "shipped_mass_kg": 1.2},
        "quality": {"mc_runs": 50, "variation_pct": 0.2},
    });
    let a = shopping(&payload, 11);
    let b = shopping(&payload, 11);
    assert_eq!(a, b);
    assert_eq!(a.rung, Some(Rung::CategorySpend));

    // sampling never moves the nominal total
    let c = shopping(&payload, 12);
    assert_eq!(a.total, c.total);
    let mut nominal = payload;
    nominal["quality"] = json!({});
    assert_eq!(shopping(&nominal, 0).total, a.total);
    assert_eq!(shopping(&nominal, 0).uncertainty, None);

    let flight = json!({"legs": [{"origin_iata": "SFO", "destination_iata": "ORD"}]});
    assert_eq!(
        footprint::get_flight_emissions(&flight).unwrap(),
        footprint::get_flight_emissions(&flight).unwrap()
    );
}

#[test]
fn unknown_aircraft_matches_missing_aircraft() -> Result<(), Box<dyn Error>> {
    let itinerary = |aircraft: Option<&str>| {
        json!({
            "cabin_class": "first",
            "num_passengers": 3,
            "legs": [{
                "origin_iata": "DXB",
                "destination_iata": "SIN",
                "aircraft_icao": aircraft,
            }],
        })
    };
    let unknown = footprint::get_flight_emissions(&itinerary(Some("ZZ99")))?;
    let missing = footprint::get_flight_emissions(&itinerary(None))?;
    assert_eq!(unknown, missing);
    assert!(missing > 0.0);
    Ok(())
}

#[test]
fn tools_by_name() -> Result<(), Box<dyn Error>> {
    let tables = ReferenceTables::global();
    let mut rng = StdRng::seed_from_u64(0);

    let tool: Tool = "get_flight_emissions".parse()?;
    let payload = json!({
        "itinerary": [
            {"origin_iata": "hnd", "destination_iata": "icn", "aircraft_icao": "b789", "block_time_minutes": 150},
        ],
    });
    let expected = 5000.0 * 2.5 * 3.16 / (280.0 * 0.85) * 1.0 * 1.3;
    assert_eq!(tool.call(&payload, tables, &mut rng)?, expected);

    let tool: Tool = "shopping_predict_carbon_footprint".parse()?;
    let payload = json!({"product": {"price_value": 10}, "scope": "cradle_to_gate"});
    assert_eq!(tool.call(&payload, tables, &mut rng)?, 4.5);
    assert_eq!(footprint::shopping::Scope::default(), Scope::CradleToGrave);
    Ok(())
}
