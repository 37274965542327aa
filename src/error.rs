use std::io;
use std::time::Duration;

use redis::RedisError;
use thiserror::Error;

/// Failure reported by a store backend for a single call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Redis(#[from] RedisError),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection already closed")]
    Closed,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Failure that ends a run. The underlying cause is kept as the error source
/// rather than repeated in the message.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("Connection error")]
    Connection(#[source] StoreError),

    #[error("Error {step}")]
    Command {
        step: String,
        #[source]
        source: StoreError,
    },

    #[error("failed to write output")]
    Output(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
