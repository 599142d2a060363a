use crate::{
    assertions::AssertionFailure, completion::CompletionError, config::ConfigurationError,
    validation::ValidationError,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Assertion failure: {0}")]
    Assertion(#[from] AssertionFailure),
    #[error("Failed to snapshot value for assertions: {0}")]
    Snapshot(#[from] serde_json::Error),
}
