//! `POST /rest/config`

use serde::{Deserialize, Serialize};

use crate::error::EncodeError;
use crate::rest::{Action, Endpoint};
use crate::types::ServerConfig;

/// Request the client-relevant server configuration. Sent with an empty body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetConfig;

impl Endpoint for GetConfig {
    const ACTION: Action = Action::Config;
    type Output = ServerConfig;

    fn encode_body(&self) -> Result<Vec<u8>, EncodeError> {
        Ok(Vec::new())
    }
}
