use std::{error::Error, io::Read};

use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use simple_logger::SimpleLogger;

use footprint::{
    estimate_flight, estimate_shopping, shopping::ShoppingPayload, FlightItinerary, ReferenceTables,
    Tool,
};

const ABOUT: &str = r#"Estimates the emissions (kg CO2e) described by a JSON payload and writes them to stdout.
* `shopping_predict_carbon_footprint`: a retail purchase over its life cycle
* `get_flight_emissions`: all passengers of a flight itinerary
"#;

#[derive(Parser, Debug)]
#[command(author, version, about = ABOUT)]
struct Cli {
    /// The tool to run
    #[arg(short, long, default_value_t = Tool::Shopping.name().to_string())]
    tool: String,
    /// Path to the JSON payload; `-` reads it from stdin
    #[arg(short, long, default_value = "-")]
    payload: String,
    /// Directory with reference tables overriding the embedded ones
    #[arg(long)]
    tables: Option<String>,
    /// Seed of the Monte Carlo sampler
    #[arg(long)]
    seed: Option<u64>,
    /// Writes every intermediate value as JSON instead of the total
    #[arg(short, long)]
    breakdown: bool,
    /// Logs fallbacks and intermediate values
    #[arg(short, long)]
    verbose: bool,
}

fn read_payload(path: &str) -> Result<serde_json::Value, Box<dyn Error>> {
    let data = if path == "-" {
        let mut data = String::new();
        std::io::stdin().read_to_string(&mut data)?;
        data
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&data)?)
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(if cli.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init()?;

    let tool = cli.tool.parse::<Tool>()?;
    let tables = match &cli.tables {
        Some(dir) => ReferenceTables::from_dir(dir)?,
        None => ReferenceTables::embedded()?,
    };
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let payload = read_payload(&cli.payload)?;

    if !cli.breakdown {
        println!("{}", tool.call(&payload, &tables, &mut rng)?);
        return Ok(());
    }

    let breakdown = match tool {
        Tool::Shopping => {
            let payload = ShoppingPayload::from_value(&payload)?;
            serde_json::to_string_pretty(&estimate_shopping(&payload, &tables, &mut rng))?
        }
        Tool::Flight => {
            let itinerary = FlightItinerary::from_value(&payload)?;
            serde_json::to_string_pretty(&estimate_flight(&itinerary, &tables)?)?
        }
    };
    println!("{breakdown}");
    Ok(())
}
