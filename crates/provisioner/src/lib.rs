//! # Provisioner
//!
//! Client for the directory account provisioning REST API.
//!
//! Creating an account takes three calls. `suggest` reserves a handful of
//! usernames derived from the person's name for a limited time. `select`
//! keeps one of them and releases the rest. `create` makes the account. This
//! crate drives that sequence, keeps track of which suggestions are still
//! valid, and can push many people through it at once.
//!
//! ## Example
//!
//! Provision one account against a local server.
//!
//! ```no_run
//! use provisioner::client::BasicClient;
//! use provisioner::types::AccountRequest;
//! use provisioner::workflow::ProvisioningWorkflow;
//! use miette::IntoDiagnostic;
//!
//! #[tokio::main]
//! async fn main() -> miette::Result<()> {
//!     let host = url::Url::parse("http://localhost:8080").into_diagnostic()?;
//!     let workflow = ProvisioningWorkflow::connect(BasicClient::new(host)).await?;
//!
//!     let request = AccountRequest::builder()
//!         .first_name("Ada")
//!         .last_name("Lovelace")
//!         .password("eightchar")
//!         .build();
//!     let account = workflow.provision_one(&request).await?;
//!     println!("created {}", account.email());
//!     Ok(())
//! }
//! ```
//!
//! Interactive front ends should route calls through a
//! [`RequestQueue`](client::RequestQueue) so the server never sees two calls
//! from the same session at once, and use the step-by-step operations on
//! [`ProvisioningSession`](session::ProvisioningSession).

#![warn(missing_docs)]

/// Direct and queued provisioning clients
pub mod client;
pub mod error;
pub mod session;
pub mod suggestions;
#[cfg(feature = "tabular")]
pub mod tabular;
pub mod workflow;

pub use provisioner_common as common;
pub use provisioner_common::{api, types};

pub use error::{ProvisionError, ProvisionErrorKind};
pub use session::ProvisioningSession;
pub use suggestions::{SelectedUsername, SuggestionSet, SuggestionState};
pub use workflow::ProvisioningWorkflow;
