use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the wave and sediment engine.
#[derive(Debug, Error)]
pub enum WaveSedError {
    /// The bathymetry file does not exist
    #[error("The given file cannot be found or the path is incomplete: {0}")]
    BathymetryNotFound(PathBuf),

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed line in a point file
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Point cloud does not describe a uniform rectangular grid
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// Plot selector that is not one of the known fields
    #[error("Unknown output field '{0}'")]
    UnknownField(String),

    /// Rendering backend failure
    #[error("Plot error: {0}")]
    Plot(String),
}

pub type Result<T> = std::result::Result<T, WaveSedError>;
