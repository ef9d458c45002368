//! Authorization guard: the decision taken before any edit/delete reaches the
//! gateway. Pure function over the current identity and the target's stored
//! ownership data; the remote key challenge lives in `secret`.

use crate::gateway::Collection;

use super::profile::{AuthMode, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Edit,
    Delete,
}

/// Resource kinds the guard knows how to gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Posts,
    Comments,
}

impl ResourceKind {
    pub fn collection(self) -> Collection {
        match self {
            ResourceKind::Posts => Collection::Posts,
            ResourceKind::Comments => Collection::Comments,
        }
    }
}

/// Outcome of the pure authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Proceed with the mutation.
    Granted,
    /// Proceed only after a successful secret-key challenge for this resource.
    KeyRequired,
    /// Block the mutation; surface a not-authorized outcome.
    Denied,
}

/// Decide whether `identity` may perform `action` on the target resource.
///
/// Anonymous-id mode permits iff the identity authored the resource.
/// Secret-key mode never grants from identity alone: every action on a new
/// resource requires its own key entry (see [`KeyGrant`] for the one
/// within-session exception). Comments carry no ownership data in the backend
/// schema at all, so comment deletion is open to everyone; that is the
/// reference behavior, preserved rather than silently tightened.
pub fn check(identity: &Identity, _action: Action, kind: ResourceKind, author_id: Option<&str>) -> Access {
    // Edit and delete share the same rule; the parameter stays for call-site clarity.
    if kind == ResourceKind::Comments {
        return Access::Granted;
    }
    match identity.auth_mode {
        AuthMode::AnonymousId => {
            if identity.is_author(author_id) { Access::Granted } else { Access::Denied }
        }
        AuthMode::SecretKey => Access::KeyRequired,
    }
}

/// Proof of a successful secret-key verification for one specific resource.
///
/// A grant is only honored for the resource it names, for the remainder of a
/// single edit session; mutating a different resource needs a fresh challenge.
/// It is produced by the board layer after `verify_secret_key` returns true
/// and cannot be constructed from outside the crate.
#[derive(Debug, Clone)]
pub struct KeyGrant {
    kind: ResourceKind,
    resource_id: String,
}

impl KeyGrant {
    pub(crate) fn new(kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        Self { kind, resource_id: resource_id.into() }
    }

    pub fn covers(&self, kind: ResourceKind, resource_id: &str) -> bool {
        self.kind == kind && self.resource_id == resource_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity(mode: AuthMode) -> Identity {
        Identity {
            id: "me".into(),
            created_at: Utc::now(),
            auth_mode: mode,
            display_name: None,
        }
    }

    #[test]
    fn anonymous_mode_requires_authorship() {
        let me = identity(AuthMode::AnonymousId);
        assert_eq!(check(&me, Action::Delete, ResourceKind::Posts, Some("me")), Access::Granted);
        assert_eq!(check(&me, Action::Edit, ResourceKind::Posts, Some("me")), Access::Granted);
        assert_eq!(check(&me, Action::Delete, ResourceKind::Posts, Some("you")), Access::Denied);
        assert_eq!(check(&me, Action::Edit, ResourceKind::Posts, None), Access::Denied);
    }

    #[test]
    fn secret_key_mode_always_challenges_for_posts() {
        let me = identity(AuthMode::SecretKey);
        // Even a matching user_id is not trusted in this mode.
        assert_eq!(check(&me, Action::Edit, ResourceKind::Posts, Some("me")), Access::KeyRequired);
        assert_eq!(check(&me, Action::Delete, ResourceKind::Posts, None), Access::KeyRequired);
    }

    #[test]
    fn comment_deletion_is_open() {
        // The comments schema stores no author or key; reference behavior.
        let anon = identity(AuthMode::AnonymousId);
        let keyed = identity(AuthMode::SecretKey);
        assert_eq!(check(&anon, Action::Delete, ResourceKind::Comments, None), Access::Granted);
        assert_eq!(check(&keyed, Action::Delete, ResourceKind::Comments, None), Access::Granted);
    }

    #[test]
    fn grant_covers_only_its_resource() {
        let g = KeyGrant::new(ResourceKind::Posts, "p1");
        assert!(g.covers(ResourceKind::Posts, "p1"));
        assert!(!g.covers(ResourceKind::Posts, "p2"));
        assert!(!g.covers(ResourceKind::Comments, "p1"));
    }
}
