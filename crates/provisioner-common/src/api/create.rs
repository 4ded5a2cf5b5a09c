//! `POST /rest/create`

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;

use super::Ack;
use crate::rest::{Action, Endpoint};
use crate::types::{AccountRequest, Username};

/// Create the directory account under a previously selected username.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Create {
    /// Selected username, without domain
    pub username: Username,
    /// First name
    #[serde(rename = "firstname")]
    pub first_name: SmolStr,
    /// Last name
    #[serde(rename = "lastname")]
    pub last_name: SmolStr,
    /// Initial password
    pub password: SmolStr,
}

impl Create {
    /// Combine a selected username with the rest of the account fields.
    pub fn new(username: Username, request: &AccountRequest) -> Self {
        Self {
            username,
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            password: request.password.clone(),
        }
    }
}

impl fmt::Debug for Create {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Create")
            .field("username", &self.username)
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Endpoint for Create {
    const ACTION: Action = Action::Create;
    type Output = Ack;
}
