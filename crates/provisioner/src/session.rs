//! Explicit per-session provisioning context.
//!
//! A [`ProvisioningSession`] owns what a front end needs between calls: the
//! client, the server configuration fetched at start, and the most recent
//! suggestion set. Create one when the session starts and drop it when it
//! ends.

use std::sync::Arc;

use provisioner_common::{
    api::{config::GetConfig, create::Create, select::Select, suggest::Suggest},
    error::ClientError,
    rest::RestClient,
    types::{Account, AccountRequest, ServerConfig, Username, ValidationError},
};
use tokio::sync::RwLock;

use crate::error::{ProvisionError, Result};
use crate::suggestions::{SelectedUsername, SuggestionSet, SuggestionState, SuggestionTracker};

/// Stateful suggest/select/create driver for one person at a time.
///
/// - Tracks the most recent suggestion set; only it can be selected from.
/// - Releases a still-valid set before requesting new suggestions.
/// - Refuses to create accounts from expired selections without contacting
///   the server.
pub struct ProvisioningSession<T> {
    client: Arc<T>,
    config: ServerConfig,
    tracker: RwLock<SuggestionTracker>,
}

impl<T> ProvisioningSession<T>
where
    T: RestClient + Send + Sync,
{
    /// Start a session by fetching the server configuration.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(host = %client.base_uri())))]
    pub async fn connect(client: T) -> std::result::Result<Self, ClientError> {
        let config = client.send(GetConfig).await?.into_output()?;
        #[cfg(feature = "tracing")]
        tracing::info!(
            domain = %config.domain,
            suggestions = config.number_of_suggestions,
            timeout_secs = config.suggested_usernames_timeout,
            "connected to provisioning server"
        );
        Ok(Self::new(client, config))
    }
}

impl<T> ProvisioningSession<T> {
    /// Start a session with an already known configuration.
    pub fn new(client: T, config: ServerConfig) -> Self {
        Self::from_shared(Arc::new(client), config)
    }

    pub(crate) fn from_shared(client: Arc<T>, config: ServerConfig) -> Self {
        Self {
            client,
            config,
            tracker: RwLock::new(SuggestionTracker::default()),
        }
    }

    /// Server configuration fetched when the session started
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Directory domain accounts are created in
    pub fn domain(&self) -> &str {
        &self.config.domain
    }

    /// The client this session dispatches through
    pub fn client(&self) -> &T {
        &self.client
    }

    pub(crate) fn shared_client(&self) -> Arc<T> {
        self.client.clone()
    }

    /// Lifecycle state of the most recent suggestion set.
    pub async fn state(&self) -> SuggestionState {
        self.tracker.read().await.state()
    }

    /// The most recent suggestion set, if one is held.
    pub async fn current(&self) -> Option<SuggestionSet> {
        self.tracker.read().await.current().cloned()
    }
}

impl<T> ProvisioningSession<T>
where
    T: RestClient + Send + Sync,
{
    /// Request username suggestions for `request`.
    ///
    /// If the previous set is still valid and nothing was selected from it,
    /// it is released first. A failed release is logged and does not stop the
    /// new suggest call; the server frees those usernames at the end of their
    /// window anyway.
    ///
    /// If another `suggest` on this session was started after this one, the
    /// suggestions this call got back are released and
    /// [`ProvisionError::StaleSuggestions`] is returned.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(first_name = %request.first_name, last_name = %request.last_name)))]
    pub async fn suggest(&self, request: &AccountRequest) -> Result<SuggestionSet> {
        if let Some(field) = empty_name(request) {
            return Err(ValidationError::EmptyName(field).into());
        }

        let (generation, release) = self.tracker.write().await.begin();
        if let Some(prior) = release {
            self.release_set(prior).await;
        }

        let outcome = self.client.send(Suggest::from(request)).await;
        let usernames = match outcome.and_then(|resp| resp.into_output()) {
            Ok(usernames) => usernames,
            Err(e) => {
                self.tracker.write().await.finish(generation, None);
                return Err(e.into());
            }
        };
        if usernames.is_empty() {
            self.tracker.write().await.finish(generation, None);
            return Err(ProvisionError::NoSuggestions);
        }

        let set = SuggestionSet::new(generation, usernames, self.config.suggestion_window());
        let current = self
            .tracker
            .write()
            .await
            .finish(generation, Some(set.clone()));
        if !current {
            // a later suggest call on this session finished first
            self.release_set(set).await;
            return Err(ProvisionError::StaleSuggestions);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(generation, count = set.len(), "suggestions reserved");
        Ok(set)
    }

    /// Keep `username` from `set` and release the other suggestions.
    ///
    /// `set` must be the one returned by this session's most recent
    /// [`suggest`](Self::suggest) and must not have expired.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(%username, generation = set.generation())))]
    pub async fn select(
        &self,
        username: &Username,
        set: &SuggestionSet,
    ) -> Result<SelectedUsername> {
        if set.is_expired() {
            self.tracker.write().await.mark_expired(set.generation());
            return Err(ProvisionError::ExpiredSuggestions);
        }
        if set.generation() != self.tracker.read().await.generation() {
            return Err(ProvisionError::StaleSuggestions);
        }
        if !set.contains(username) {
            return Err(ValidationError::NotSuggested(username.clone()).into());
        }

        self.client
            .send(Select::keep(username, set.usernames().to_vec()))
            .await?
            .into_output()?;

        self.tracker.write().await.mark_selected(set.generation());
        Ok(SelectedUsername::new(username.clone(), set))
    }

    /// Create the account for `request` under the selected username.
    ///
    /// Fails with [`ProvisionError::ExpiredSuggestions`] before any remote
    /// call when the selection's window has elapsed.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(username = %selected.username())))]
    pub async fn create(
        &self,
        selected: &SelectedUsername,
        request: &AccountRequest,
    ) -> Result<Account> {
        request.validate()?;
        if selected.is_expired() {
            self.tracker.write().await.mark_expired(selected.generation());
            return Err(ProvisionError::ExpiredSuggestions);
        }
        if selected.generation() != self.tracker.read().await.generation() {
            return Err(ProvisionError::StaleSuggestions);
        }

        self.client
            .send(Create::new(selected.username().clone(), request))
            .await?
            .into_output()?;

        self.tracker.write().await.consume(selected.generation());
        let account = Account {
            username: selected.username().clone(),
            domain: self.config.domain.clone(),
        };
        #[cfg(feature = "tracing")]
        tracing::info!(account = %account, "account created");
        Ok(account)
    }

    /// Release the current suggestion set, if it is still valid.
    ///
    /// Returns whether anything was released.
    pub async fn release(&self) -> Result<bool> {
        let Some(set) = self.tracker.write().await.take_valid() else {
            return Ok(false);
        };
        self.client
            .send(Select::release(set.usernames().to_vec()))
            .await?
            .into_output()?;
        Ok(true)
    }

    /// Suggest, keep the first suggestion, and create the account.
    ///
    /// Requests with an empty name are skipped and requests that fail local
    /// validation are rejected, both without contacting the server.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "info", skip_all, fields(first_name = %request.first_name, last_name = %request.last_name)))]
    pub async fn provision(&self, request: &AccountRequest) -> Result<Account> {
        match request.validate() {
            Ok(()) => {}
            Err(ValidationError::EmptyName(field)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(field, "skipping request");
                return Err(ProvisionError::Skipped { field });
            }
            Err(e) => return Err(e.into()),
        }

        let set = self.suggest(request).await?;
        let username = set.first().cloned().ok_or(ProvisionError::NoSuggestions)?;
        let selected = self.select(&username, &set).await?;
        self.create(&selected, request).await
    }

    async fn release_set(&self, set: SuggestionSet) {
        let outcome = self
            .client
            .send(Select::release(set.usernames().to_vec()))
            .await
            .and_then(|resp| resp.into_output());
        match outcome {
            Ok(_) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(generation = set.generation(), "released previous suggestions");
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(generation = set.generation(), error = %_e, "failed to release previous suggestions");
            }
        }
    }
}

fn empty_name(request: &AccountRequest) -> Option<&'static str> {
    match request.validate() {
        Err(ValidationError::EmptyName(field)) => Some(field),
        _ => None,
    }
}
