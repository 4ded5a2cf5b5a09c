pub mod config;
pub mod create;
pub mod select;
pub mod suggest;

use serde::{Deserialize, Serialize};

/// Plain acknowledgement returned by `select` and `create`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Ack {
    /// Human-readable confirmation, e.g. "User created successfully."
    #[serde(default)]
    pub message: Option<String>,
}
