//! Error types

use thiserror::Error;

/// Errors surfaced to the application
#[derive(Error, Debug)]
pub enum GameError {
    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("Invalid word '{0}': letters must come from the glove keypad")]
    InvalidWord(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serialport::Error> for GameError {
    fn from(e: serialport::Error) -> Self {
        GameError::Serial(e.to_string())
    }
}

/// Classified failures of the background polling loop. None of these stop it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("read failed: {0}")]
    Io(String),

    #[error("undecodable frame: {0}")]
    Decode(String),
}

impl From<std::io::Error> for PollError {
    fn from(e: std::io::Error) -> Self {
        PollError::Io(e.to_string())
    }
}
