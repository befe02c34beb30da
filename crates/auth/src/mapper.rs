use std::collections::BTreeMap;

use config::AutoPrivilege;
use serde::{Deserialize, Serialize};

use crate::{client::RemoteProfile, provider::IdentityStore};

/// Group granted or revoked by the auto-privileged policy.
pub const PRIVILEGED_GROUP: &str = "bureaucrat";

/// Upper bound on real-name collision probing. The last candidate is used
/// even when still colliding: uniqueness is best effort, not a guarantee.
const REAL_NAME_CANDIDATES: u32 = 100;

/// One idempotent instruction for the host identity store.
///
/// Applying the same plan twice leaves the identity in the same state as
/// applying it once; hosts may safely retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum IdentityDirective {
    /// Record a display name for the identity.
    SetRealName {
        /// The chosen display name.
        value: String,
    },
    /// Record the email address reported by the remote system.
    SetEmail {
        /// The address to record.
        value: String,
    },
    /// Mark the recorded email address as confirmed.
    ConfirmEmail,
    /// Add the identity to a group.
    AddToGroup {
        /// Name of the group.
        group: String,
    },
    /// Remove the identity from a group.
    RemoveFromGroup {
        /// Name of the group.
        group: String,
    },
}

/// Decide how the local identity is updated after a verified login.
pub(crate) fn plan(
    profile: &RemoteProfile,
    username: &str,
    store: &dyn IdentityStore,
    auto_privileged: &BTreeMap<String, AutoPrivilege>,
) -> Vec<IdentityDirective> {
    let mut directives = Vec::new();

    // First login: the identity has no display name yet.
    if store.real_name_of(username).is_none() {
        let value = choose_real_name(&profile.full_name, username, store);
        directives.push(IdentityDirective::SetRealName { value });
    }

    directives.push(IdentityDirective::SetEmail {
        value: profile.email.clone(),
    });
    directives.push(IdentityDirective::ConfirmEmail);

    match auto_privileged.get(username) {
        Some(AutoPrivilege::Unset) => {
            directives.push(IdentityDirective::RemoveFromGroup {
                group: PRIVILEGED_GROUP.to_string(),
            });
        }
        Some(AutoPrivilege::Email(email)) if *email == profile.email => {
            directives.push(IdentityDirective::AddToGroup {
                group: PRIVILEGED_GROUP.to_string(),
            });
        }
        Some(AutoPrivilege::Email(_)) | None => {}
    }

    directives
}

fn choose_real_name(full_name: &str, username: &str, store: &dyn IdentityStore) -> String {
    let mut candidate = full_name.to_string();

    for suffix in 2..=REAL_NAME_CANDIDATES {
        if !store.real_name_taken(&candidate, username) {
            return candidate;
        }

        candidate = format!("{full_name} {suffix}");
    }

    log::debug!("Exhausted real-name candidates for '{username}', keeping '{candidate}'");

    candidate
}
