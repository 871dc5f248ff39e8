use thiserror::Error;

/// Errors that make an estimate impossible.
///
/// Missing or malformed numbers, unknown keys and unknown classes are not errors:
/// they resolve to documented fallback factors and are reported as diagnostics.
#[derive(Error, Debug)]
pub enum Error {
    /// A flight leg without an origin or destination airport code
    #[error("leg {leg} must include '{field}'")]
    MissingAirport { leg: usize, field: &'static str },

    #[error("reference table '{table}' is malformed: {source}")]
    Table {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("payload is not a valid JSON mapping: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("tool '{0}' not found")]
    UnknownTool(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
