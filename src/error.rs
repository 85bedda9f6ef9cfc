//! Application-wide error types.

use thiserror::Error;

use crate::event::EventError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("gateway error: {0}")]
    Gateway(String),

    #[error("command error: {0}")]
    Command(String),

    #[error("event error: {0}")]
    Event(#[from] EventError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
