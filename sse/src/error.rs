//! Error types for the relay.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A background task was requested outside of a tokio runtime.
    NoRuntime,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoRuntime => write!(f, "No tokio runtime available to spawn the task"),
        }
    }
}

impl std::error::Error for Error {}
