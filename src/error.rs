use thiserror::Error;

use crate::{event::DelayError, store::StoreError};

/// Top-level error type for startup and background work.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Boxed because serenity's error is large.
    #[error(transparent)]
    Discord(#[from] Box<serenity::Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("No channel to announce {0} in")]
    NoChannel(String),
}

impl From<serenity::Error> for AppError {
    fn from(err: serenity::Error) -> Self {
        AppError::Discord(Box::new(err))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is not set.
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    /// Environment variable is set but cannot be parsed.
    #[error("Invalid value for environment variable {name}: {value:?}")]
    InvalidEnvVar { name: String, value: String },
}

/// Errors reported back to the member who invoked a command. The display
/// text is the reply they see.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommandError {
    #[error("You do not have permission to use this command.")]
    NotStaff,

    #[error("The bot is still starting up, please try again in a moment.")]
    NotReady,

    #[error(transparent)]
    InvalidDelay(#[from] DelayError),

    #[error("That event no longer exists.")]
    NotFound,

    #[error("That event has already started or is no longer scheduled.")]
    NotEditable,

    #[error("You can only edit events you created.")]
    NotCreator,

    #[error("Confirmation did not match the event name, nothing was deleted.")]
    ConfirmationMismatch,
}
