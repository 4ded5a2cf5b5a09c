//! `POST /rest/suggest`

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

use crate::rest::{Action, Endpoint};
use crate::types::{AccountRequest, Username};

/// Ask the server for candidate usernames.
///
/// The server reserves every returned username until it is released by a
/// `select` or the suggestion timeout runs out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct Suggest {
    /// First name
    #[serde(rename = "firstname")]
    #[builder(into)]
    pub first_name: SmolStr,
    /// Last name
    #[serde(rename = "lastname")]
    #[builder(into)]
    pub last_name: SmolStr,
    /// Optional custom field
    #[serde(
        rename = "customfield",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    #[builder(into)]
    pub custom_field: Option<SmolStr>,
    /// Any further attributes, sent as top-level fields
    #[serde(flatten, default)]
    #[builder(default)]
    pub extra_fields: BTreeMap<SmolStr, SmolStr>,
}

impl From<&AccountRequest> for Suggest {
    fn from(request: &AccountRequest) -> Self {
        Self {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            custom_field: request.custom_field().map(SmolStr::new),
            extra_fields: request.extra_fields.clone(),
        }
    }
}

impl Endpoint for Suggest {
    const ACTION: Action = Action::Suggest;
    /// Ordered candidates, best first
    type Output = Vec<Username>;
}
