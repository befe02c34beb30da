//! Delegated authentication against a remote learning-management system.
//!
//! One authentication attempt is a strictly sequential flow: exchange the
//! credentials for a web-service token, fetch and validate the remote
//! profile behind it, then plan idempotent identity updates for the host.
//! Any remote failure makes the gateway abstain rather than reject, so the
//! host can fall through to its other providers.

#![deny(missing_docs)]

mod attempts;
mod client;
mod error;
mod mapper;
mod messages;
mod provider;
mod username;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use config::LmsConfig;

pub use client::RemoteProfile;
pub use error::AuthFailure;
pub use mapper::{IdentityDirective, PRIVILEGED_GROUP};
pub use messages::{
    AuthenticateRequest, AuthenticateResponse, CompleteRequest, CompleteResponse, IdentitySnapshot, ShapeParams,
    ShapeResponse,
};
pub use provider::{AuthAction, AuthProvider, IdentityStore, Outcome};
pub use username::canonicalize;

/// Creates an axum router for the authentication endpoints.
pub fn router(config: &LmsConfig) -> anyhow::Result<Router> {
    let provider = Arc::new(
        AuthProvider::new(config).map_err(|e| anyhow::anyhow!("Failed to initialize authentication provider: {e}"))?,
    );

    let routes = Router::new()
        .route("/authenticate", post(authenticate))
        .route("/complete", post(complete))
        .route("/shape", get(shape))
        .with_state(provider);

    Ok(Router::new().nest(&config.path, routes))
}

/// The primary-authentication hook: verify a username/password pair.
async fn authenticate(
    State(provider): State<Arc<AuthProvider>>,
    Json(request): Json<AuthenticateRequest>,
) -> Json<AuthenticateResponse> {
    log::debug!("Authentication requested for '{}'", request.username);

    let store = SnapshotStore::default();
    let outcome = provider
        .begin_authentication(&store, &request.username, request.password.as_ref())
        .await;

    let response = match outcome {
        Outcome::Pass { username } => AuthenticateResponse::Pass { username },
        Outcome::Abstain => AuthenticateResponse::Abstain,
    };

    Json(response)
}

/// The post-authentication hook: plan identity updates for a committed
/// login against the identity snapshot the host supplied.
async fn complete(
    State(provider): State<Arc<AuthProvider>>,
    Json(request): Json<CompleteRequest>,
) -> Json<CompleteResponse> {
    let store = SnapshotStore {
        identity: request.identity,
    };

    let directives = provider.post_authentication(&store, &request.username);

    Json(CompleteResponse { directives })
}

/// Declares which credential fields an action requires.
async fn shape(State(provider): State<Arc<AuthProvider>>, Query(params): Query<ShapeParams>) -> Json<ShapeResponse> {
    Json(ShapeResponse {
        fields: provider.request_shape(params.action),
    })
}

/// Identity store view over the snapshot a request carried. Directive
/// application is the caller's job (the plan travels back in the response),
/// so `apply` only records the decision in the log.
#[derive(Default)]
struct SnapshotStore {
    identity: IdentitySnapshot,
}

impl IdentityStore for SnapshotStore {
    fn canonicalize(&self, username: &str) -> Option<String> {
        username::canonicalize(username)
    }

    fn real_name_of(&self, _username: &str) -> Option<String> {
        self.identity.real_name.clone()
    }

    fn real_name_taken(&self, real_name: &str, _username: &str) -> bool {
        self.identity.taken_real_names.iter().any(|name| name == real_name)
    }

    fn apply(&self, username: &str, directive: &IdentityDirective) {
        log::debug!("Planned for '{username}': {directive:?}");
    }
}
