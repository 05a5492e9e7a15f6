//! Errors raised by the accumulation pipeline.
//!
//! Every operation either produces its complete output or fails with one of these
//! variants; there are no partial results and nothing is retried.

use thiserror::Error;

/// Errors that can occur while loading registries, building the accumulation table
/// or fitting the accumulation curve
#[derive(Error, Debug)]
pub enum Error {
    /// Input document could not be parsed into a registry → extensions mapping
    #[error("Malformed registry data: {0}")]
    DataFormat(String),

    /// No registries, or a registry without any extensions
    #[error("No usable registry data: {0}")]
    EmptyInput(String),

    /// Fewer distinct `(x, y)` pairs than free parameters in the model
    #[error("Not enough data to fit curve: {distinct} distinct (x, y) pairs, at least {required} required")]
    InsufficientData { distinct: usize, required: usize },

    /// Points from which the logarithmic model cannot be fitted
    #[error("Cannot fit curve: {0}")]
    DegenerateInput(String),

    /// Evaluation domain of the fitted curve is unusable
    #[error("Invalid fit domain: {0}")]
    InvalidDomain(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
