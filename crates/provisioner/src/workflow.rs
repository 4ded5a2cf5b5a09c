//! Provisioning workflow: one person interactively, or many at once.

use futures::future::join_all;
use provisioner_common::{
    error::ClientError,
    rest::RestClient,
    types::{Account, AccountRequest, ServerConfig, Username},
};

pub use crate::error::{ProvisionError, ProvisionErrorKind, Result};
use crate::session::ProvisioningSession;
use crate::suggestions::{SelectedUsername, SuggestionSet, SuggestionState};

/// Entry point for provisioning accounts against one server.
///
/// The step-by-step operations ([`suggest`](Self::suggest),
/// [`select`](Self::select), [`create`](Self::create)) act on a single
/// interactive session owned by the workflow. [`provision_one`] and
/// [`provision_batch`] give every request its own session over the shared
/// client, so concurrent requests never see each other's suggestion sets.
///
/// [`provision_one`]: Self::provision_one
/// [`provision_batch`]: Self::provision_batch
pub struct ProvisioningWorkflow<T> {
    session: ProvisioningSession<T>,
}

impl<T> ProvisioningWorkflow<T>
where
    T: RestClient + Send + Sync,
{
    /// Fetch the server configuration and set up the workflow.
    pub async fn connect(client: T) -> std::result::Result<Self, ClientError> {
        ProvisioningSession::connect(client)
            .await
            .map(|session| Self { session })
    }
}

impl<T> ProvisioningWorkflow<T> {
    /// Workflow over `client` with a known configuration.
    pub fn new(client: T, config: ServerConfig) -> Self {
        Self {
            session: ProvisioningSession::new(client, config),
        }
    }

    /// Server configuration in use
    pub fn config(&self) -> &ServerConfig {
        self.session.config()
    }

    /// The interactive session behind the step-by-step operations
    pub fn session(&self) -> &ProvisioningSession<T> {
        &self.session
    }

    /// Lifecycle state of the interactive session's suggestion set.
    pub async fn state(&self) -> SuggestionState {
        self.session.state().await
    }

    fn lane(&self) -> ProvisioningSession<T> {
        ProvisioningSession::from_shared(self.session.shared_client(), self.config().clone())
    }
}

impl<T> ProvisioningWorkflow<T>
where
    T: RestClient + Send + Sync,
{
    /// See [`ProvisioningSession::suggest`].
    pub async fn suggest(&self, request: &AccountRequest) -> Result<SuggestionSet> {
        self.session.suggest(request).await
    }

    /// See [`ProvisioningSession::select`].
    pub async fn select(
        &self,
        username: &Username,
        set: &SuggestionSet,
    ) -> Result<SelectedUsername> {
        self.session.select(username, set).await
    }

    /// See [`ProvisioningSession::create`].
    pub async fn create(
        &self,
        selected: &SelectedUsername,
        request: &AccountRequest,
    ) -> Result<Account> {
        self.session.create(selected, request).await
    }

    /// Release the interactive session's suggestions, if still held.
    pub async fn release(&self) -> Result<bool> {
        self.session.release().await
    }

    /// Suggest, pick the first suggestion, select it and create the account.
    ///
    /// Empty names yield [`ProvisionError::Skipped`] and out-of-range fields
    /// yield [`ProvisionError::Validation`], neither touching the server.
    pub async fn provision_one(&self, request: &AccountRequest) -> Result<Account> {
        self.lane().provision(request).await
    }

    /// Provision every request concurrently.
    ///
    /// One result per request, in input order. A failed request does not
    /// affect the others. Nothing is retried or throttled.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(count = requests.len())))]
    pub async fn provision_batch(&self, requests: &[AccountRequest]) -> Vec<Result<Account>> {
        let results = join_all(requests.iter().map(|request| self.provision_one(request))).await;

        #[cfg(feature = "tracing")]
        {
            let created = results.iter().filter(|r| r.is_ok()).count();
            let skipped = results
                .iter()
                .filter(|r| matches!(r, Err(e) if e.is_skipped()))
                .count();
            tracing::info!(
                created,
                skipped,
                failed = results.len() - created - skipped,
                "batch finished"
            );
        }

        results
    }
}
