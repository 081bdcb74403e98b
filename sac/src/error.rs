use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("no cylinder found in {iterations} iterations")]
    NoModelFound { iterations: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
