//! Baseline provisioning data types.
//!
//! These are the client-side shapes of the things the provisioning API talks
//! about: the person an account is requested for, the username handed back by
//! the server, the finished account, and the server's public configuration.

pub mod account;
pub mod config;
pub mod username;

pub use account::{Account, AccountRequest, ValidationError};
pub use config::ServerConfig;
pub use username::{Username, UsernameError};
