// Library surface for the binary and the headless integration tests.
pub mod app_dirs;
pub mod config;
pub mod decoder;
pub mod error;
pub mod game;
pub mod logger;
pub mod poller;
pub mod runtime;
pub mod serial;
pub mod session;
pub mod tier;
pub mod timer;
pub mod words;

pub use error::{GameError, PollError};
