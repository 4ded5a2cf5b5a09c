//! Common types for the provisioner implementation of the account provisioning API

#![warn(missing_docs)]
pub use smol_str;
pub use url;

/// Request and response records for each provisioning action.
pub mod api;
pub mod error;
/// HTTP client abstraction used by provisioner crates.
pub mod http_client;
/// Endpoint definitions, request building and response processing.
pub mod rest;
/// Account, username and server configuration types, plus the wire records.
pub mod types;

pub use error::{ClientError, RemoteError, TransportError};
pub use rest::{Action, Endpoint, RestClient, RestExt};
