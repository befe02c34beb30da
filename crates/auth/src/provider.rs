use std::collections::BTreeMap;

use config::{AutoPrivilege, LmsConfig};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{
    attempts::AttemptCache,
    client::LmsClient,
    error::AuthFailure,
    mapper::{self, IdentityDirective},
};

/// Host-side capabilities the gateway needs: username canonicalization,
/// real-name queries, and directive application. A capability set rather
/// than a base class; hosts implement only what their identity model has.
pub trait IdentityStore: Send + Sync {
    /// The host's canonical form of a username, or `None` when it has none.
    fn canonicalize(&self, username: &str) -> Option<String>;

    /// The real name currently recorded for the identity, if any.
    fn real_name_of(&self, username: &str) -> Option<String>;

    /// Whether a different identity already uses this real name.
    fn real_name_taken(&self, real_name: &str, username: &str) -> bool;

    /// Apply one idempotent identity update.
    fn apply(&self, username: &str, directive: &IdentityDirective);
}

/// Decision of one authentication attempt.
///
/// There is deliberately no reject: any remote failure abstains, so an
/// unreachable remote system can never lock out an account that another
/// provider could still admit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Credentials verified against the remote system.
    Pass {
        /// The canonical username the attempt was keyed by.
        username: String,
    },
    /// The gateway expresses no opinion on this login.
    Abstain,
}

/// Actions a host can describe a request shape for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthAction {
    /// Logging in with existing credentials.
    Login,
    /// Creating a new account. Unsupported.
    Create,
    /// Linking an existing remote account. Unsupported.
    Link,
    /// Changing a password. Unsupported.
    ChangePassword,
}

/// The authentication provider: exchanges credentials against the remote
/// system and plans identity updates for the host.
pub struct AuthProvider {
    client: LmsClient,
    attempts: AttemptCache,
    auto_privileged: BTreeMap<String, AutoPrivilege>,
}

impl AuthProvider {
    /// Build a provider from configuration. Fails when the HTTP client
    /// cannot be constructed; a missing `base_url` never reaches this point
    /// because configuration loading already rejects it.
    pub fn new(config: &LmsConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: LmsClient::new(config)?,
            attempts: AttemptCache::new(config.attempt_ttl),
            auto_privileged: config.auto_privileged.clone(),
        })
    }

    /// Try to verify a username/password pair against the remote system.
    ///
    /// Abstains without touching the network when no password was supplied,
    /// either field is empty, or the username has no canonical form. Every
    /// remote failure also abstains, with the reason logged.
    pub async fn begin_authentication(
        &self,
        store: &dyn IdentityStore,
        username: &str,
        password: Option<&SecretString>,
    ) -> Outcome {
        let Some(password) = password else {
            log::debug!("No password in the request, abstaining");
            return Outcome::Abstain;
        };

        if username.is_empty() || password.expose_secret().is_empty() {
            log::debug!("Empty username or password, abstaining");
            return Outcome::Abstain;
        }

        let Some(canonical) = store.canonicalize(username) else {
            log::debug!("Username has no canonical form, abstaining");
            return Outcome::Abstain;
        };

        let token = match self.client.exchange(&canonical, password).await {
            Ok(token) => token,
            Err(failure) => return self.abstain(&canonical, failure),
        };

        let profile = match self.client.fetch(&token, &canonical).await {
            Ok(profile) => profile,
            Err(failure) => return self.abstain(&canonical, failure),
        };

        log::info!(
            "Verified '{canonical}' against the remote system as '{}'",
            profile.remote_username
        );

        self.attempts.store(canonical.clone(), token, profile);

        Outcome::Pass { username: canonical }
    }

    /// Apply the identity updates for a previously passed attempt.
    ///
    /// Consumes the pending attempt exactly once. When none is held (the
    /// attempt expired, a restart intervened, or a concurrent attempt got
    /// here first) the update is skipped silently: the login itself has
    /// already been committed by the host.
    pub fn post_authentication(&self, store: &dyn IdentityStore, username: &str) -> Vec<IdentityDirective> {
        let Some(canonical) = store.canonicalize(username) else {
            return Vec::new();
        };

        let Some((_token, profile)) = self.attempts.take(&canonical) else {
            log::warn!("Skipping identity update: {}", AuthFailure::StateLost(canonical));
            return Vec::new();
        };

        let plan = mapper::plan(&profile, &canonical, store, &self.auto_privileged);

        for directive in &plan {
            store.apply(&canonical, directive);
        }

        log::debug!("Applied {} identity directive(s) for '{canonical}'", plan.len());

        plan
    }

    /// The credential fields a request for the given action must carry.
    /// Only login is supported; everything else yields an empty shape.
    pub fn request_shape(&self, action: AuthAction) -> &'static [&'static str] {
        match action {
            AuthAction::Login => &["username", "password"],
            AuthAction::Create | AuthAction::Link | AuthAction::ChangePassword => &[],
        }
    }

    fn abstain(&self, username: &str, failure: AuthFailure) -> Outcome {
        log::warn!("Abstaining on '{username}': {failure}");
        Outcome::Abstain
    }
}
