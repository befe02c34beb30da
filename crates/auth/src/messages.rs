//! Request and response bodies of the authentication endpoints.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::{mapper::IdentityDirective, provider::AuthAction};

/// Body of `POST /authenticate`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthenticateRequest {
    /// Username as the user typed it; canonicalized before any remote call.
    pub username: String,
    /// The password. Absent when the host request carried no password
    /// field, which makes the gateway abstain outright.
    #[serde(default)]
    pub password: Option<SecretString>,
}

/// Body of the `POST /authenticate` response.
#[derive(Debug, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AuthenticateResponse {
    /// Credentials verified; the host may commit the login.
    Pass {
        /// Canonical username to key the session by.
        username: String,
    },
    /// No opinion; the host falls through to its other providers.
    Abstain,
}

/// Body of `POST /complete`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompleteRequest {
    /// The username the host committed the login for.
    pub username: String,
    /// Snapshot of the local identity the directives are planned against.
    #[serde(default)]
    pub identity: IdentitySnapshot,
}

/// What the host currently knows about the local identity.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySnapshot {
    /// The real name already recorded, if any. Absent on first login.
    #[serde(default)]
    pub real_name: Option<String>,
    /// Real names already used by other identities, for collision checks.
    #[serde(default)]
    pub taken_real_names: Vec<String>,
}

/// Body of the `POST /complete` response.
#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    /// The planned identity updates, in application order. Empty when no
    /// pending attempt matched.
    pub directives: Vec<IdentityDirective>,
}

/// Query of `GET /shape`.
#[derive(Debug, Deserialize)]
pub struct ShapeParams {
    /// The host action the shape is requested for.
    pub action: AuthAction,
}

/// Body of the `GET /shape` response.
#[derive(Debug, Serialize)]
pub struct ShapeResponse {
    /// Credential fields a request for the action must carry; empty when
    /// the action is unsupported.
    pub fields: &'static [&'static str],
}
