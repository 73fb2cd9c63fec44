pub mod openrouter;
pub mod openrouter_types;
pub mod parser;
pub mod prompt;
pub mod types;

pub use openrouter::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Model service unreachable at {0}")]
    Connection(String),

    #[error("Model service returned error (status {status}): {body}")]
    ServiceError { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Model service returned no completion")]
    EmptyCompletion,

    #[error("Model service is not configured (missing API key)")]
    NotConfigured,
}
