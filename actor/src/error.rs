// Copyright 2024 Antonio Estévez
// SPDX-License-Identifier: Apache-2.0

//! # Errors module
//!

use crate::ActorPath;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for the actor system.
///
/// Only actor creation reports errors to the caller. Delivery problems never surface here:
/// they become dead letters.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum Error {
    /// Another actor already occupies the requested path.
    #[error("Actor {0} exists.")]
    Exists(ActorPath),
    /// The requested actor name can not be used as a path segment.
    #[error("Invalid actor name '{0}'.")]
    InvalidName(String),
    /// The actor failed in `pre_start` and was never registered as alive.
    #[error("An error occurred while starting an actor: {0}")]
    Start(String),
    /// The parent actor is stopping or already stopped.
    #[error("Actor {0} is not alive.")]
    NotAlive(ActorPath),
    /// The actor system is shutting down.
    #[error("The actor system is stopped.")]
    SystemStopped,
    /// Error that does not compromise the operation of the system.
    #[error("Error: {0}")]
    Functional(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = Error::Exists(ActorPath::from("/user/a"));
        assert_eq!(error.to_string(), "Actor /user/a exists.");
        let error = Error::InvalidName("a/b".to_owned());
        assert_eq!(error.to_string(), "Invalid actor name 'a/b'.");
    }
}
