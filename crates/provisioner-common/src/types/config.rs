//! Server configuration as published by `/rest/config`.

use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use smol_str::SmolStr;
use std::time::Duration;

/// How long suggestions stay reserved when the server doesn't say.
pub const DEFAULT_SUGGESTED_USERNAMES_TIMEOUT: u64 = 120;

/// Client-relevant part of the provisioning server's configuration.
///
/// Returned by `/rest/config`. The server sends the numeric fields as JSON
/// strings; plain numbers are accepted too.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    /// Directory domain accounts are created in
    pub domain: SmolStr,
    /// How many suggestions each suggest call returns
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub number_of_suggestions: u32,
    /// Seconds a suggestion set stays reserved for the caller
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    #[serde(default = "default_timeout")]
    pub suggested_usernames_timeout: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_SUGGESTED_USERNAMES_TIMEOUT
}

impl ServerConfig {
    /// Validity window of a suggestion set.
    pub fn suggestion_window(&self) -> Duration {
        Duration::from_secs(self.suggested_usernames_timeout)
    }
}
