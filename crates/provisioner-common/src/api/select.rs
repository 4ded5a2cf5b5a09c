//! `POST /rest/select`

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::Ack;
use crate::rest::{Action, Endpoint};
use crate::types::Username;

/// Keep `username` and release every other entry of `suggestions`.
///
/// An empty `username` releases the whole set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Select {
    /// The username to keep, or empty to keep none
    pub username: SmolStr,
    /// The previous suggest response, verbatim
    pub suggestions: Vec<Username>,
}

impl Select {
    /// Keep `username` out of `suggestions`.
    pub fn keep(username: &Username, suggestions: Vec<Username>) -> Self {
        Self {
            username: username.clone().into(),
            suggestions,
        }
    }

    /// Release all of `suggestions`.
    pub fn release(suggestions: Vec<Username>) -> Self {
        Self {
            username: SmolStr::default(),
            suggestions,
        }
    }

    /// Whether this call keeps nothing.
    pub fn is_release(&self) -> bool {
        self.username.is_empty()
    }
}

impl Endpoint for Select {
    const ACTION: Action = Action::Select;
    type Output = Ack;
}
